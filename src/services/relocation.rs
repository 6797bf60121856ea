// src/services/relocation.rs

use parking_lot::Mutex;
use std::sync::Arc;

use crate::models::ItemId;

/// Intenção pendente de mover um item específico ("mover" num card ou flash
/// move na busca). Sobrevive à navegação até a tela de scan.
///
/// Existe no máximo uma de cada vez. Só é consumida por um scan bem-sucedido
/// (`clear_if`) ou descartada quando o utilizador fecha o scanner.
#[derive(Clone, Default)]
pub struct RelocationSession {
    target: Arc<Mutex<Option<ItemId>>>,
}

impl RelocationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitui qualquer intenção anterior. Devolve a que foi substituída.
    pub fn begin(&self, item_id: ItemId) -> Option<ItemId> {
        let previous = self.target.lock().replace(item_id);
        tracing::debug!("🎯 Sessão de relocação para o item {} (anterior: {:?})", item_id, previous);
        previous
    }

    pub fn current(&self) -> Option<ItemId> {
        *self.target.lock()
    }

    /// Limpa só se a sessão ainda aponta para `item_id`.
    /// Uma sessão nova aberta durante o request não é apagada.
    pub fn clear_if(&self, item_id: ItemId) -> bool {
        let mut target = self.target.lock();
        if *target == Some(item_id) {
            *target = None;
            true
        } else {
            false
        }
    }

    pub fn discard(&self) -> Option<ItemId> {
        self.target.lock().take()
    }
}
