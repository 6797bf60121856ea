// src/db/pocket_repo.rs

use sqlx::SqlitePool;

use crate::{common::error::AppError, models::PocketEntry};

// Cópia local da tasca. Só é lida quando a fonte configurada é `local`.
#[derive(Clone)]
pub struct PocketRepository {
    pool: SqlitePool,
}

impl PocketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Devolve as entradas na ordem em que entraram na tasca.
    pub async fn load(&self) -> Result<Vec<PocketEntry>, AppError> {
        let entries = sqlx::query_as::<_, PocketEntry>(
            r#"
            SELECT item_id, origin_location_id, origin_location_name
            FROM pocket_entries
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Substitui a cópia inteira numa transação.
    pub async fn replace(&self, entries: &[PocketEntry]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM pocket_entries").execute(&mut *tx).await?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO pocket_entries (item_id, origin_location_id, origin_location_name, position)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(entry.item_id)
            .bind(entry.origin_location_id)
            .bind(entry.origin_location_name.as_deref())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
