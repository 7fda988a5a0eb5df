// src/handlers/test_track.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::test_track::{CreateTestTrackRequest, LinkRequest, UpdateTestTrackRequest},
    services::{links, records},
    state::SharedStore,
    utils::jwt::Claims,
};

/// Lists the caller's test tracks, newest first.
pub async fn list_test_tracks(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let list = records::list_records(store.as_ref(), user_id).await?;

    Ok(Json(list))
}

/// Records a new mock exam result.
///
/// * Nets, total net and raw score are computed server-side.
/// * If `linkedExamId` is present the two exams are linked both ways.
///
/// Returns 201 Created and the stored record.
pub async fn create_test_track(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestTrackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let record = records::create_record(store.as_ref(), user_id, payload).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_test_track(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let record = records::get_record(store.as_ref(), user_id, id).await?;

    Ok(Json(record))
}

/// Updates a test track. Omitted fields keep their stored values.
pub async fn update_test_track(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTestTrackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let record = records::update_record(store.as_ref(), user_id, id, payload).await?;

    Ok(Json(record))
}

/// Deletes a test track and releases its counterpart, if any.
pub async fn delete_test_track(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    links::delete_record(store.as_ref(), user_id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the caller's TYT/AYT pairs with their placement scores.
pub async fn get_linked_test_tracks(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let pairs = links::find_linked_pairs(store.as_ref(), user_id).await?;

    Ok(Json(pairs))
}

pub async fn link_test_track(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<LinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let record = links::link_records(store.as_ref(), user_id, id, payload.linked_exam_id).await?;

    Ok(Json(record))
}

pub async fn unlink_test_track(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let record = links::unlink_record(store.as_ref(), user_id, id).await?;

    Ok(Json(record))
}

/// Reports asymmetric, dangling and same-type links. Read-only.
pub async fn get_link_report(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let report = links::consistency_report(store.as_ref(), user_id).await?;

    Ok(Json(report))
}
