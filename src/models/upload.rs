// src/models/upload.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::LocationRef;

// Transições válidas: Pending -> Uploading -> (removida | Error), Error -> Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Error,
}

/// Metadados de um item à espera de ser criado no servidor.
/// É só isto que sobrevive a um restart; a imagem fica em memória.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UploadEntry {
    pub id: i64,
    pub location_id: LocationRef,
    pub description: Option<String>,
    pub status: UploadStatus,
    pub retries: u32,
    pub created_at: DateTime<Utc>,
}

/// Foto capturada, já comprimida pela câmera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl ImagePayload {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "capture.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }
}
