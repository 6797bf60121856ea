// src/api.rs
//
// Contratos do backend REST. O resto da crate só conhece o trait,
// assim os serviços podem ser testados com uma API falsa.

pub mod http_client;

pub use http_client::HttpInventoryApi;

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::{ImagePayload, ItemId, ItemSummary, LocationRef},
};

#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Move um ou mais itens para a posição de destino (status volta a "available").
    async fn move_items(&self, item_ids: &[ItemId], target: LocationRef) -> Result<(), AppError>;

    /// Marca o item como "in hand" no servidor. Devolve o item com a posição de origem.
    async fn pick_item(&self, item_id: ItemId) -> Result<ItemSummary, AppError>;

    /// Cria um item novo numa posição a partir de uma foto. Devolve o id criado.
    async fn create_item(
        &self,
        location: LocationRef,
        description: Option<&str>,
        image: &ImagePayload,
    ) -> Result<ItemId, AppError>;

    /// Detalhe de um item. Para itens em mão, `location_id` é a caixa de origem.
    async fn get_item(&self, item_id: ItemId) -> Result<ItemSummary, AppError>;

    /// Itens cujo status autoritativo é "in hand". Aqui `location_id` vem nulo:
    /// o pick tira o item da caixa.
    async fn list_in_hand(&self) -> Result<Vec<ItemSummary>, AppError>;
}
