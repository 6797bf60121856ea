// src/models/scan.rs

use super::{ItemId, LocationRef};

/// Com que intenção o scanner foi aberto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    #[default]
    Navigate,
    Pocket,
}

/// Um payload decodificado pela câmera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Efeitos de UI pedidos pela lógica de scan. A camada de apresentação consome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notice { level: NoticeLevel, message: String },
    CloseScanner,
    Navigate(LocationRef),
}

impl UiEvent {
    pub fn success(message: impl Into<String>) -> Self {
        UiEvent::Notice { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        UiEvent::Notice { level: NoticeLevel::Error, message: message.into() }
    }
}

/// O que aconteceu com um scan reportado ao dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    InvalidCode,
    Moved { item_id: ItemId, location: LocationRef },
    BulkMoved { count: usize, location: LocationRef },
    Navigated(LocationRef),
    RelocationFailed { message: String },
    // Já havia uma relocação em curso, ou o fluxo já fechou.
    Ignored,
}
