// src/api/http_client.rs

use async_trait::async_trait;
use reqwest::{Client, Response, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::{
    api::InventoryApi,
    common::error::AppError,
    models::{ImagePayload, ItemId, ItemSummary, LocationRef},
};

// --- Payloads do backend ---

#[derive(Debug, Serialize)]
struct BulkMoveRequest<'a> {
    item_ids: &'a [ItemId],
    target_location_id: LocationRef,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    photo_path: String,
    thumbnail_path: String,
}

#[derive(Debug, Serialize)]
struct CreateItemRequest<'a> {
    location_id: LocationRef,
    description: Option<&'a str>,
    photo_path: &'a str,
    thumbnail_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    id: ItemId,
}

// O backend devolve `{"detail": "..."}` nos erros.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Clone)]
pub struct HttpInventoryApi {
    client: Client,
    base_url: String,
}

impl HttpInventoryApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Converte respostas não-2xx em `AppError::Api`.
    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        Err(AppError::Api { status: status.as_u16(), detail })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        Ok(Self::check(response).await?.json::<T>().await?)
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryApi {
    async fn move_items(&self, item_ids: &[ItemId], target: LocationRef) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.url("/items/bulk/move"))
            .json(&BulkMoveRequest { item_ids, target_location_id: target })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn pick_item(&self, item_id: ItemId) -> Result<ItemSummary, AppError> {
        let response = self
            .client
            .post(self.url(&format!("/items/{item_id}/pick")))
            .send()
            .await?;

        Self::json(response).await
    }

    async fn create_item(
        &self,
        location: LocationRef,
        description: Option<&str>,
        image: &ImagePayload,
    ) -> Result<ItemId, AppError> {
        // 1. Sobe a foto; o backend devolve os paths da foto e da thumbnail
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::json(response).await?;

        // 2. Cria o item apontando para a foto
        let response = self
            .client
            .post(self.url("/items"))
            .json(&CreateItemRequest {
                location_id: location,
                description,
                photo_path: &uploaded.photo_path,
                thumbnail_path: &uploaded.thumbnail_path,
            })
            .send()
            .await?;
        let created: CreatedItem = Self::json(response).await?;

        Ok(created.id)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<ItemSummary, AppError> {
        let response = self.client.get(self.url(&format!("/items/{item_id}"))).send().await?;
        Self::json(response).await
    }

    async fn list_in_hand(&self) -> Result<Vec<ItemSummary>, AppError> {
        let response = self.client.get(self.url("/items/in-hand")).send().await?;
        Self::json(response).await
    }
}
