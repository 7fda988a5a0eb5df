// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, types::Json};

use super::ExamRecordStore;
use crate::{
    error::AppError,
    models::test_track::{
        ExamRecord, ExamRecordChanges, ExamType, FieldTrack, NewExamRecord, ScoredSubject,
    },
};

const RECORD_COLUMNS: &str = "id, user_id, exam_name, exam_type, ayt_field, linked_exam_id, \
     subjects, total_net, exam_score, final_score, created_at, updated_at";

/// Raw row of the 'exam_records' table.
/// Enum columns are stored as TEXT and checked on conversion.
#[derive(Debug, FromRow)]
struct ExamRecordRow {
    id: i64,
    user_id: i64,
    exam_name: String,
    exam_type: String,
    ayt_field: Option<String>,
    linked_exam_id: Option<i64>,
    subjects: Json<BTreeMap<String, ScoredSubject>>,
    total_net: f64,
    exam_score: Option<f64>,
    final_score: Option<f64>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ExamRecordRow> for ExamRecord {
    type Error = AppError;

    fn try_from(row: ExamRecordRow) -> Result<Self, Self::Error> {
        let exam_type = row.exam_type.parse::<ExamType>()?;
        let ayt_field = row
            .ayt_field
            .as_deref()
            .map(str::parse::<FieldTrack>)
            .transpose()
            .map_err(AppError::InternalServerError)?;

        Ok(ExamRecord {
            id: row.id,
            user_id: row.user_id,
            exam_name: row.exam_name,
            exam_type,
            ayt_field,
            linked_exam_id: row.linked_exam_id,
            subjects: row.subjects.0,
            total_net: row.total_net,
            exam_score: row.exam_score,
            final_score: row.final_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed store. Multi-record writes run in one transaction.
#[derive(Debug, Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Test track {} not found", id))
}

/// Link statements shared by `link` and `create_linked`. Runs on the caller's
/// transaction; an error leaves it to be rolled back on drop.
async fn link_in(conn: &mut PgConnection, id: i64, target_id: i64) -> Result<(), AppError> {
    // Previous partners of either side lose their reference.
    sqlx::query(
        r#"
        UPDATE exam_records
        SET linked_exam_id = NULL, final_score = NULL, updated_at = NOW()
        WHERE linked_exam_id IN ($1, $2) AND id <> $1 AND id <> $2
        "#,
    )
    .bind(id)
    .bind(target_id)
    .execute(&mut *conn)
    .await?;

    // Target first, so a missing target is reported before the FK fires.
    for (from, to) in [(target_id, id), (id, target_id)] {
        let result = sqlx::query(
            r#"
            UPDATE exam_records
            SET linked_exam_id = $2, final_score = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(from)
        .bind(to)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(from));
        }
    }

    Ok(())
}

#[async_trait]
impl ExamRecordStore for PgExamStore {
    async fn create(&self, user_id: i64, record: NewExamRecord) -> Result<ExamRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO exam_records
            (user_id, exam_name, exam_type, ayt_field, subjects, total_net, exam_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ExamRecordRow>(&sql)
            .bind(user_id)
            .bind(&record.exam_name)
            .bind(record.exam_type.as_str())
            .bind(record.ayt_field.map(|f| f.as_str()))
            .bind(Json(&record.scores.subjects))
            .bind(record.scores.total_net)
            .bind(record.scores.exam_score)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert exam record: {:?}", e);
                AppError::from(e)
            })?;

        row.try_into()
    }

    async fn create_linked(
        &self,
        user_id: i64,
        record: NewExamRecord,
        target_id: i64,
    ) -> Result<ExamRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO exam_records
            (user_id, exam_name, exam_type, ayt_field, subjects, total_net, exam_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&record.exam_name)
        .bind(record.exam_type.as_str())
        .bind(record.ayt_field.map(|f| f.as_str()))
        .bind(Json(&record.scores.subjects))
        .bind(record.scores.total_net)
        .bind(record.scores.exam_score)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert exam record: {:?}", e);
            AppError::from(e)
        })?;

        link_in(&mut tx, id, target_id).await?;

        let sql = format!("SELECT {RECORD_COLUMNS} FROM exam_records WHERE id = $1");
        let row = sqlx::query_as::<_, ExamRecordRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ExamRecord>, AppError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM exam_records WHERE id = $1");

        sqlx::query_as::<_, ExamRecordRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ExamRecord::try_from)
            .transpose()
    }

    async fn find_all_by_owner(&self, user_id: i64) -> Result<Vec<ExamRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM exam_records WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );

        sqlx::query_as::<_, ExamRecordRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ExamRecord::try_from)
            .collect()
    }

    async fn update(&self, id: i64, changes: ExamRecordChanges) -> Result<ExamRecord, AppError> {
        let sql = format!(
            r#"
            UPDATE exam_records
            SET exam_name = $2, ayt_field = $3, subjects = $4,
                total_net = $5, exam_score = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ExamRecordRow>(&sql)
            .bind(id)
            .bind(&changes.exam_name)
            .bind(changes.ayt_field.map(|f| f.as_str()))
            .bind(Json(&changes.scores.subjects))
            .bind(changes.scores.total_net)
            .bind(changes.scores.exam_score)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))?
            .try_into()
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE exam_records
            SET linked_exam_id = NULL, final_score = NULL, updated_at = NOW()
            WHERE linked_exam_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM exam_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete exam record: {:?}", e);
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn link(&self, id: i64, target_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        link_in(&mut tx, id, target_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn unlink(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE exam_records
            SET linked_exam_id = NULL, final_score = NULL, updated_at = NOW()
            WHERE id = $1 OR linked_exam_id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn set_final_score(&self, id: i64, final_score: Option<f64>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE exam_records SET final_score = $2 WHERE id = $1")
            .bind(id)
            .bind(final_score)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }
}
