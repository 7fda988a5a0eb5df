// src/services/records.rs

//! Create/read/update path for test track records.

use std::collections::BTreeMap;

use validator::Validate;

use crate::{
    config::subject_question_limit,
    error::AppError,
    models::test_track::{
        CreateTestTrackRequest, ExamRecord, ExamRecordChanges, ExamType, FieldTrack,
        NewExamRecord, SubjectTally, UpdateTestTrackRequest,
    },
    services::{links, scoring::score_exam},
    store::ExamRecordStore,
    utils::html::clean_html,
};

/// Loads a record and checks that `user_id` owns it.
pub async fn get_record(
    store: &dyn ExamRecordStore,
    user_id: i64,
    id: i64,
) -> Result<ExamRecord, AppError> {
    let record = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test track not found".to_string()))?;

    if record.user_id != user_id {
        return Err(AppError::Forbidden(
            "Test track belongs to another user".to_string(),
        ));
    }

    Ok(record)
}

pub async fn list_records(
    store: &dyn ExamRecordStore,
    user_id: i64,
) -> Result<Vec<ExamRecord>, AppError> {
    store.find_all_by_owner(user_id).await
}

/// Validates, scores and stores a new record. A requested link is written in
/// the same store operation as the insert.
pub async fn create_record(
    store: &dyn ExamRecordStore,
    user_id: i64,
    req: CreateTestTrackRequest,
) -> Result<ExamRecord, AppError> {
    req.validate()?;

    let exam_type = req
        .exam_type
        .ok_or_else(|| AppError::BadRequest("examType is required".to_string()))?;
    let exam_name = sanitize_exam_name(req.exam_name.as_deref().unwrap_or_default())?;
    check_field_track(exam_type, req.ayt_field)?;
    check_subjects(&req.subjects)?;

    // Reject a bad link target before anything is written.
    if let Some(target_id) = req.linked_exam_id {
        links::check_link_target(store, user_id, exam_type, None, target_id).await?;
    }

    let new_record = NewExamRecord {
        exam_name,
        exam_type,
        ayt_field: req.ayt_field,
        scores: score_exam(exam_type, &req.subjects),
    };

    let record = match req.linked_exam_id {
        Some(target_id) => store.create_linked(user_id, new_record, target_id).await?,
        None => store.create(user_id, new_record).await?,
    };

    tracing::info!(
        "User {} created test track {} ({}, score {:?}, linked {:?})",
        user_id,
        record.id,
        record.exam_type.as_str(),
        record.exam_score,
        record.linked_exam_id
    );

    Ok(record)
}

/// Applies a partial update. Derived fields are always recomputed from the
/// merged tallies; a linked pair gets its placement score refreshed.
pub async fn update_record(
    store: &dyn ExamRecordStore,
    user_id: i64,
    id: i64,
    req: UpdateTestTrackRequest,
) -> Result<ExamRecord, AppError> {
    let existing = get_record(store, user_id, id).await?;
    req.validate()?;

    if let Some(exam_type) = req.exam_type {
        if exam_type != existing.exam_type {
            return Err(AppError::BadRequest(
                "examType cannot be changed after creation".to_string(),
            ));
        }
    }

    let exam_name = match req.exam_name.as_deref() {
        Some(name) => sanitize_exam_name(name)?,
        None => existing.exam_name.clone(),
    };
    let ayt_field = req.ayt_field.or(existing.ayt_field);
    check_field_track(existing.exam_type, ayt_field)?;

    let tallies = req.subjects.unwrap_or_else(|| existing.tallies());
    check_subjects(&tallies)?;

    let relink = req
        .linked_exam_id
        .filter(|target_id| existing.linked_exam_id != Some(*target_id));
    if let Some(target_id) = relink {
        links::check_link_target(store, user_id, existing.exam_type, Some(id), target_id).await?;
    }

    let updated = store
        .update(
            id,
            ExamRecordChanges {
                exam_name,
                ayt_field,
                scores: score_exam(existing.exam_type, &tallies),
            },
        )
        .await?;

    tracing::info!("User {} updated test track {}", user_id, id);

    match relink {
        Some(target_id) => links::link_records(store, user_id, id, target_id).await,
        None if updated.linked_exam_id.is_some() => links::refresh_final_score(store, updated).await,
        None => Ok(updated),
    }
}

fn sanitize_exam_name(raw: &str) -> Result<String, AppError> {
    let cleaned = clean_html(raw.trim());
    let len = cleaned.chars().count();
    if len == 0 || len > 200 {
        return Err(AppError::BadRequest(
            "examName must be between 1 and 200 characters".to_string(),
        ));
    }
    Ok(cleaned)
}

/// `aytField` is required for AYT and must be absent for TYT.
pub fn check_field_track(exam_type: ExamType, ayt_field: Option<FieldTrack>) -> Result<(), AppError> {
    match (exam_type, ayt_field) {
        (ExamType::Field, None) => Err(AppError::BadRequest(
            "aytField is required for AYT exams".to_string(),
        )),
        (ExamType::General, Some(_)) => Err(AppError::BadRequest(
            "aytField is only allowed for AYT exams".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Checks subject names and the per-subject question caps.
pub fn check_subjects(subjects: &BTreeMap<String, SubjectTally>) -> Result<(), AppError> {
    for (name, tally) in subjects {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Subject names cannot be empty".to_string(),
            ));
        }

        if let Some(limit) = subject_question_limit(name) {
            if tally.total() > limit {
                return Err(AppError::BadRequest(format!(
                    "Total question count for {} ({}) exceeds the expected {}",
                    name,
                    tally.total(),
                    limit
                )));
            }
        }
    }
    Ok(())
}
