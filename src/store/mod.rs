// src/store/mod.rs

//! Persistence of exam records.
//!
//! Handlers and services only see [`ExamRecordStore`]. Operations that touch
//! two records (create-and-link, link, unlink, delete) are atomic in every
//! implementation.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::test_track::{ExamRecord, ExamRecordChanges, NewExamRecord},
};

pub use memory::MemoryExamStore;
pub use postgres::PgExamStore;

#[async_trait]
pub trait ExamRecordStore: Send + Sync {
    /// Inserts a new record owned by `user_id`. `linked_exam_id` and
    /// `final_score` start empty.
    async fn create(&self, user_id: i64, record: NewExamRecord) -> Result<ExamRecord, AppError>;

    /// Inserts a new record and links it to `target_id` as one unit, with the
    /// same partner release as [`ExamRecordStore::link`]. Nothing is stored
    /// if the target no longer exists.
    async fn create_linked(
        &self,
        user_id: i64,
        record: NewExamRecord,
        target_id: i64,
    ) -> Result<ExamRecord, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ExamRecord>, AppError>;

    /// All records of one user, newest first.
    async fn find_all_by_owner(&self, user_id: i64) -> Result<Vec<ExamRecord>, AppError>;

    /// Replaces name, field track and scores. Link fields are left untouched.
    async fn update(&self, id: i64, changes: ExamRecordChanges) -> Result<ExamRecord, AppError>;

    /// Removes the record and clears `linked_exam_id`/`final_score` on every
    /// record that referenced it.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Points `id` and `target_id` at each other. Any other record that
    /// referenced either side is unlinked. Final scores on every touched
    /// record are reset.
    async fn link(&self, id: i64, target_id: i64) -> Result<(), AppError>;

    /// Clears the link of `id` and of every record referencing it.
    async fn unlink(&self, id: i64) -> Result<(), AppError>;

    async fn set_final_score(&self, id: i64, final_score: Option<f64>) -> Result<(), AppError>;
}
