// src/services/links.rs

//! TYT/AYT pairing: link maintenance, pair resolution and consistency checks.

use std::collections::{HashMap, HashSet};

use crate::{
    error::AppError,
    models::test_track::{ConsistencyReport, ExamRecord, ExamType, LinkIssue, LinkedPair},
    services::{records::get_record, scoring::final_score},
    store::ExamRecordStore,
};

/// Validates that `target_id` can be linked to a record of `exam_type`.
/// `self_id` is the record being linked, if it already exists.
pub async fn check_link_target(
    store: &dyn ExamRecordStore,
    user_id: i64,
    exam_type: ExamType,
    self_id: Option<i64>,
    target_id: i64,
) -> Result<ExamRecord, AppError> {
    if self_id == Some(target_id) {
        return Err(AppError::BadRequest(
            "A test track cannot be linked to itself".to_string(),
        ));
    }

    let target = get_record(store, user_id, target_id).await?;

    if target.exam_type != exam_type.opposite() {
        return Err(AppError::BadRequest(format!(
            "A {} exam can only be linked to a {} exam",
            exam_type.as_str(),
            exam_type.opposite().as_str()
        )));
    }

    Ok(target)
}

/// Writes mutual references between `id` and `target_id`.
pub async fn link_records(
    store: &dyn ExamRecordStore,
    user_id: i64,
    id: i64,
    target_id: i64,
) -> Result<ExamRecord, AppError> {
    let record = get_record(store, user_id, id).await?;
    check_link_target(store, user_id, record.exam_type, Some(id), target_id).await?;

    store.link(id, target_id).await?;
    tracing::info!("User {} linked test tracks {} <-> {}", user_id, id, target_id);

    get_record(store, user_id, id).await
}

/// Removes the link of `id` on both sides.
pub async fn unlink_record(
    store: &dyn ExamRecordStore,
    user_id: i64,
    id: i64,
) -> Result<ExamRecord, AppError> {
    let record = get_record(store, user_id, id).await?;

    store.unlink(id).await?;
    tracing::info!(
        "User {} unlinked test track {} (was {:?})",
        user_id,
        id,
        record.linked_exam_id
    );

    get_record(store, user_id, id).await
}

/// Deletes a record owned by `user_id`. The store clears the counterpart's
/// reference in the same atomic operation.
pub async fn delete_record(
    store: &dyn ExamRecordStore,
    user_id: i64,
    id: i64,
) -> Result<(), AppError> {
    let record = get_record(store, user_id, id).await?;

    store.delete(id).await?;

    match record.linked_exam_id {
        Some(linked) => tracing::info!(
            "User {} deleted test track {} and released counterpart {}",
            user_id,
            id,
            linked
        ),
        None => tracing::info!("User {} deleted test track {}", user_id, id),
    }

    Ok(())
}

/// Recomputes the placement score of a linked record and its counterpart
/// after one side's raw score changed. Only pairs `pair_records` would form
/// are touched: the AYT side must point at the TYT side.
pub async fn refresh_final_score(
    store: &dyn ExamRecordStore,
    record: ExamRecord,
) -> Result<ExamRecord, AppError> {
    let Some(linked_id) = record.linked_exam_id else {
        return Ok(record);
    };

    let counterpart = match store.find_by_id(linked_id).await? {
        Some(c) if c.user_id == record.user_id && c.exam_type != record.exam_type => c,
        _ => return Ok(record),
    };

    let (general, field) = order_pair(&record, &counterpart);
    if field.linked_exam_id != Some(general.id) {
        return Ok(record);
    }

    let score = final_score(general.exam_score, field.exam_score);

    store.set_final_score(record.id, score).await?;
    store.set_final_score(counterpart.id, score).await?;

    Ok(ExamRecord {
        final_score: score,
        ..record
    })
}

/// Resolves the caller's TYT/AYT pairs and writes each pair's placement
/// score to both records.
pub async fn find_linked_pairs(
    store: &dyn ExamRecordStore,
    user_id: i64,
) -> Result<Vec<LinkedPair>, AppError> {
    let records = store.find_all_by_owner(user_id).await?;
    let pairs = pair_records(&records);

    let mut resolved = Vec::with_capacity(pairs.len());
    for (general, field) in pairs {
        let score = final_score(general.exam_score, field.exam_score);

        store.set_final_score(general.id, score).await?;
        store.set_final_score(field.id, score).await?;

        resolved.push(LinkedPair {
            exam1: ExamRecord {
                final_score: score,
                ..general.clone()
            },
            exam2: ExamRecord {
                final_score: score,
                ..field.clone()
            },
            final_score: score,
        });
    }

    tracing::debug!("Resolved {} linked pairs for user {}", resolved.len(), user_id);

    Ok(resolved)
}

/// Matches records into `(TYT, AYT)` pairs by dereferencing `linked_exam_id`
/// within `records`.
///
/// * Only an AYT record pointing at a TYT record forms a pair. A mutual
///   pair is found from its AYT side; a one-sided TYT -> AYT pointer and
///   same-type links are skipped (see the link report).
/// * Links to records outside `records` (missing or foreign) are ignored.
/// * One-sided AYT -> TYT links count, but mutual links are matched first so
///   a stray pointer cannot take a record away from its mutual partner.
/// * No record appears in more than one pair.
pub fn pair_records(records: &[ExamRecord]) -> Vec<(&ExamRecord, &ExamRecord)> {
    let by_id: HashMap<i64, &ExamRecord> = records.iter().map(|r| (r.id, r)).collect();

    let mut ordered: Vec<&ExamRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut paired: HashSet<i64> = HashSet::new();
    let mut pairs = Vec::new();

    for mutual_pass in [true, false] {
        for &record in &ordered {
            let Some(linked_id) = record.linked_exam_id else {
                continue;
            };
            let Some(&counterpart) = by_id.get(&linked_id) else {
                continue;
            };

            if counterpart.user_id != record.user_id
                || record.exam_type != ExamType::Field
                || counterpart.exam_type != ExamType::General
            {
                continue;
            }

            let mutual = counterpart.linked_exam_id == Some(record.id);
            if mutual != mutual_pass {
                continue;
            }

            if paired.contains(&record.id) || paired.contains(&counterpart.id) {
                continue;
            }

            paired.insert(record.id);
            paired.insert(counterpart.id);
            pairs.push(order_pair(record, counterpart));
        }
    }

    pairs
}

/// Lists asymmetric, dangling and same-type links among the caller's records.
pub async fn consistency_report(
    store: &dyn ExamRecordStore,
    user_id: i64,
) -> Result<ConsistencyReport, AppError> {
    let records = store.find_all_by_owner(user_id).await?;
    let report = build_report(&records);

    if !report.is_clean() {
        tracing::warn!(
            "User {} has inconsistent links: {} asymmetric, {} dangling, {} same-type",
            user_id,
            report.asymmetric.len(),
            report.dangling.len(),
            report.same_type.len()
        );
    }

    Ok(report)
}

fn build_report(records: &[ExamRecord]) -> ConsistencyReport {
    let by_id: HashMap<i64, &ExamRecord> = records.iter().map(|r| (r.id, r)).collect();
    let mut report = ConsistencyReport::default();

    let mut ordered: Vec<&ExamRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.id);

    for record in ordered {
        let Some(linked_id) = record.linked_exam_id else {
            continue;
        };
        let issue = LinkIssue {
            exam_id: record.id,
            linked_exam_id: linked_id,
        };

        match by_id.get(&linked_id) {
            None => report.dangling.push(issue),
            Some(target) if target.exam_type == record.exam_type => report.same_type.push(issue),
            Some(target) if target.linked_exam_id != Some(record.id) => {
                report.asymmetric.push(issue)
            }
            Some(_) => {}
        }
    }

    report
}

fn order_pair<'a>(a: &'a ExamRecord, b: &'a ExamRecord) -> (&'a ExamRecord, &'a ExamRecord) {
    if a.exam_type == ExamType::General {
        (a, b)
    } else {
        (b, a)
    }
}
