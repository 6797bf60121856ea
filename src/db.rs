pub mod pocket_repo;
pub use pocket_repo::PocketRepository;
pub mod upload_repo;
pub use upload_repo::UploadRepository;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use crate::common::error::AppError;

/// Abre o banco local e aplica as migrações.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}
