// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::ExamRecordStore;
use crate::{
    error::AppError,
    models::test_track::{ExamRecord, ExamRecordChanges, NewExamRecord},
};

/// Process-local store. Every operation runs inside one critical section,
/// so multi-record writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryExamStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<i64, ExamRecord>,
}

impl Inner {
    fn clear_link(record: &mut ExamRecord) {
        record.linked_exam_id = None;
        record.final_score = None;
        record.updated_at = Utc::now();
    }

    fn insert(&mut self, user_id: i64, record: NewExamRecord) -> ExamRecord {
        self.next_id += 1;
        let now = Utc::now();

        let created = ExamRecord {
            id: self.next_id,
            user_id,
            exam_name: record.exam_name,
            exam_type: record.exam_type,
            ayt_field: record.ayt_field,
            linked_exam_id: None,
            subjects: record.scores.subjects,
            total_net: record.scores.total_net,
            exam_score: Some(record.scores.exam_score),
            final_score: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(created.id, created.clone());

        created
    }

    /// Both ids must exist.
    fn link(&mut self, id: i64, target_id: i64) {
        for record in self.records.values_mut() {
            let points_at_pair = matches!(record.linked_exam_id, Some(l) if l == id || l == target_id);
            if points_at_pair && record.id != id && record.id != target_id {
                Self::clear_link(record);
            }
        }

        let now = Utc::now();
        for (from, to) in [(id, target_id), (target_id, id)] {
            if let Some(record) = self.records.get_mut(&from) {
                record.linked_exam_id = Some(to);
                record.final_score = None;
                record.updated_at = now;
            }
        }
    }
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record verbatim, bypassing link maintenance.
    /// Used for seeding fixtures.
    pub async fn put(&self, record: ExamRecord) {
        let mut inner = self.inner.lock().await;
        inner.next_id = inner.next_id.max(record.id);
        inner.records.insert(record.id, record);
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Test track {} not found", id))
}

#[async_trait]
impl ExamRecordStore for MemoryExamStore {
    async fn create(&self, user_id: i64, record: NewExamRecord) -> Result<ExamRecord, AppError> {
        Ok(self.inner.lock().await.insert(user_id, record))
    }

    async fn create_linked(
        &self,
        user_id: i64,
        record: NewExamRecord,
        target_id: i64,
    ) -> Result<ExamRecord, AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.records.contains_key(&target_id) {
            return Err(not_found(target_id));
        }

        let id = inner.insert(user_id, record).id;
        inner.link(id, target_id);

        inner.records.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ExamRecord>, AppError> {
        Ok(self.inner.lock().await.records.get(&id).cloned())
    }

    async fn find_all_by_owner(&self, user_id: i64) -> Result<Vec<ExamRecord>, AppError> {
        let inner = self.inner.lock().await;
        let mut records: Vec<ExamRecord> = inner
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn update(&self, id: i64, changes: ExamRecordChanges) -> Result<ExamRecord, AppError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| not_found(id))?;

        record.exam_name = changes.exam_name;
        record.ayt_field = changes.ayt_field;
        record.subjects = changes.scores.subjects;
        record.total_net = changes.scores.total_net;
        record.exam_score = Some(changes.scores.exam_score);
        record.updated_at = Utc::now();

        Ok(record.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner.records.remove(&id).is_none() {
            return Err(not_found(id));
        }

        for record in inner.records.values_mut() {
            if record.linked_exam_id == Some(id) {
                Inner::clear_link(record);
            }
        }

        Ok(())
    }

    async fn link(&self, id: i64, target_id: i64) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        for needed in [id, target_id] {
            if !inner.records.contains_key(&needed) {
                return Err(not_found(needed));
            }
        }

        inner.link(id, target_id);
        Ok(())
    }

    async fn unlink(&self, id: i64) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.records.contains_key(&id) {
            return Err(not_found(id));
        }

        for record in inner.records.values_mut() {
            if record.id == id || record.linked_exam_id == Some(id) {
                Inner::clear_link(record);
            }
        }

        Ok(())
    }

    async fn set_final_score(&self, id: i64, final_score: Option<f64>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| not_found(id))?;
        record.final_score = final_score;
        Ok(())
    }
}
