// src/db/upload_repo.rs

use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    models::UploadEntry,
};

// Metadados da fila de upload. Os bytes da imagem nunca passam por aqui.
#[derive(Clone)]
pub struct UploadRepository {
    pool: SqlitePool,
}

impl UploadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<Vec<UploadEntry>, AppError> {
        let entries = sqlx::query_as::<_, UploadEntry>(
            r#"
            SELECT id, location_id, description, status, retries, created_at
            FROM upload_queue
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// "UPSERT" por id: insere a entrada nova ou atualiza status/retries.
    pub async fn save(&self, entry: &UploadEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_queue (id, location_id, description, status, retries, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                status = excluded.status,
                retries = excluded.retries
            "#,
        )
        .bind(entry.id)
        .bind(entry.location_id)
        .bind(entry.description.as_deref())
        .bind(entry.status)
        .bind(entry.retries)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM upload_queue WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
