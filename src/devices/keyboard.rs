// src/devices/keyboard.rs
//
// Leitores de QR USB/Bluetooth se apresentam como teclado: digitam o conteúdo
// decodificado seguido de Enter. Cada linha vira um "quadro".

use async_trait::async_trait;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::Mutex,
};

use crate::{
    common::error::AppError,
    devices::{Camera, Facing, Frame, FrameDecoder, VideoSource},
};

pub struct KeyboardWedge<R> {
    // Compartilhado entre aquisições para não perder o que já está no buffer.
    lines: Arc<Mutex<Lines<R>>>,
}

impl KeyboardWedge<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send + 'static> KeyboardWedge<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: Arc::new(Mutex::new(reader.lines())) }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> Camera for KeyboardWedge<R> {
    // Não há lado nem permissão: o leitor está sempre "ligado".
    async fn acquire(&self, _facing: Facing) -> Result<Box<dyn VideoSource>, AppError> {
        Ok(Box::new(KeyboardSource { lines: Arc::clone(&self.lines) }))
    }
}

struct KeyboardSource<R> {
    lines: Arc<Mutex<Lines<R>>>,
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> VideoSource for KeyboardSource<R> {
    async fn next_frame(&mut self) -> Option<Frame> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => {
                let data = line.trim().as_bytes().to_vec();
                Some(Frame { width: data.len() as u32, height: 1, data })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("⚠️ Falha ao ler do leitor de QR: {}", e);
                None
            }
        }
    }

    async fn release(&mut self) {}
}

/// Decoder para quadros que já são texto.
pub struct TextDecoder;

impl FrameDecoder for TextDecoder {
    fn decode(&self, frame: &Frame) -> Option<String> {
        std::str::from_utf8(&frame.data)
            .ok()
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
    }
}
