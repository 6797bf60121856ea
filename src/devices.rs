// src/devices.rs
//
// Fronteira com o hardware: câmera, primitiva de decodificação e vibração.

pub mod keyboard;

pub use keyboard::{KeyboardWedge, TextDecoder};

use async_trait::async_trait;
use std::time::Duration;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Rear,
    Front,
}

/// Um quadro capturado. O conteúdo só interessa ao decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait Camera: Send + Sync {
    /// Falha com `CameraPermissionDenied` ou `CameraUnavailable`.
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn VideoSource>, AppError>;
}

#[async_trait]
pub trait VideoSource: Send {
    /// `None` quando a fonte terminou (dispositivo removido, EOF).
    async fn next_frame(&mut self) -> Option<Frame>;

    async fn release(&mut self);
}

/// A primitiva externa: um quadro entra, texto decodificado (ou nada) sai.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Option<String>;
}

pub trait Haptics: Send + Sync {
    fn pulse(&self, duration: Duration);
}

/// Para dispositivos sem motor de vibração.
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self, _duration: Duration) {}
}
