// src/models/item.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::LocationRef;

pub type ItemId = i64;

// Espelha o enum de status do backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    InHand,
    Lost,
    Loaned,
}

/// Item como devolvido pela API.
///
/// Para itens em mão, `/items/{id}` e `/items/{id}/pick` põem em `location_id`
/// a caixa de onde o item saiu; `/items/in-hand` devolve-o nulo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub location_id: Option<LocationRef>,
    pub location_name: Option<String>,
    pub description: Option<String>,
    pub status: ItemStatus,
}

/// Um item "na tasca" do utilizador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PocketEntry {
    pub item_id: ItemId,
    // Capturados no momento do pick, para o "repor" de um toque.
    pub origin_location_id: Option<LocationRef>,
    pub origin_location_name: Option<String>,
}

impl PocketEntry {
    pub fn new(item_id: ItemId) -> Self {
        Self { item_id, origin_location_id: None, origin_location_name: None }
    }
}

impl From<&ItemSummary> for PocketEntry {
    fn from(item: &ItemSummary) -> Self {
        Self {
            item_id: item.id,
            origin_location_id: item.location_id,
            origin_location_name: item.location_name.clone(),
        }
    }
}
