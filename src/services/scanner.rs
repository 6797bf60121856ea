// src/services/scanner.rs

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    common::error::AppError,
    devices::{Camera, Facing, FrameDecoder, Haptics, VideoSource},
    models::ScanEvent,
};

pub const DEFAULT_FPS: u32 = 10;
pub const MAX_FPS: u32 = 60;
const HAPTIC_PULSE: Duration = Duration::from_millis(100);
// Quadros repetidos do mesmo QR chegam em rajada; o excesso é descartado.
const EVENT_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    /// Permissão negada ou câmera indisponível. Só sai daqui com um novo `start()`.
    Error(String),
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Loop de decodificação sobre a câmera: amostra quadros a `fps` e emite um
/// `ScanEvent` por payload decodificado.
///
/// Todo `start()` deve ter o seu `stop()`. O `stop()` cancela a amostragem e
/// só devolve depois de a câmera ter sido liberada.
pub struct ContinuousScanSource {
    camera: Arc<dyn Camera>,
    decoder: Arc<dyn FrameDecoder>,
    haptics: Arc<dyn Haptics>,
    fps: u32,
    state: Arc<Mutex<ScanState>>,
    running: Option<Running>,
}

impl ContinuousScanSource {
    pub fn new(
        camera: Arc<dyn Camera>,
        decoder: Arc<dyn FrameDecoder>,
        haptics: Arc<dyn Haptics>,
        fps: u32,
    ) -> Self {
        Self {
            camera,
            decoder,
            haptics,
            fps: fps.clamp(1, MAX_FPS),
            state: Arc::new(Mutex::new(ScanState::Idle)),
            running: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state.lock().clone()
    }

    pub async fn start(&mut self) -> Result<mpsc::Receiver<ScanEvent>, AppError> {
        // Uma sessão anterior mal fechada é encerrada antes de pegar a câmera de novo.
        self.stop().await;

        let source = match self.acquire().await {
            Ok(source) => source,
            Err(e) => {
                tracing::error!("🔥 Falha ao iniciar o scanner: {}", e);
                *self.state.lock() = ScanState::Error(e.user_message());
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let period = Duration::from_secs(1) / self.fps;

        let task = tokio::spawn(sample_loop(
            source,
            Arc::clone(&self.decoder),
            Arc::clone(&self.haptics),
            period,
            tx,
            cancel.clone(),
            Arc::clone(&self.state),
        ));

        *self.state.lock() = ScanState::Scanning;
        self.running = Some(Running { cancel, task });
        tracing::info!("🔍 Scanner ativo a {} fps", self.fps);

        Ok(rx)
    }

    /// Idempotente: sem sessão ativa não faz nada.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.task.await {
            tracing::warn!("⚠️ Loop do scanner terminou com erro: {}", e);
        }

        *self.state.lock() = ScanState::Idle;
        tracing::info!("📷 Scanner parado, câmera liberada");
    }

    // Traseira de preferência; a frontal só quando a traseira não existe.
    async fn acquire(&self) -> Result<Box<dyn VideoSource>, AppError> {
        match self.camera.acquire(Facing::Rear).await {
            Err(AppError::CameraUnavailable(reason)) => {
                tracing::debug!("Câmera traseira indisponível ({}), tentando a frontal", reason);
                self.camera.acquire(Facing::Front).await
            }
            other => other,
        }
    }
}

async fn sample_loop(
    mut source: Box<dyn VideoSource>,
    decoder: Arc<dyn FrameDecoder>,
    haptics: Arc<dyn Haptics>,
    period: Duration,
    events: mpsc::Sender<ScanEvent>,
    cancel: CancellationToken,
    state: Arc<Mutex<ScanState>>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = async {
                ticker.tick().await;
                source.next_frame().await
            } => frame,
        };

        let Some(frame) = frame else {
            tracing::warn!("⚠️ A fonte de vídeo terminou");
            *state.lock() = ScanState::Idle;
            break;
        };

        // Quadro sem QR é o caso normal: ignora.
        let Some(payload) = decoder.decode(&frame) else {
            continue;
        };

        haptics.pulse(HAPTIC_PULSE);
        if events.try_send(ScanEvent { payload }).is_err() {
            tracing::debug!("Evento de scan descartado (consumidor ocupado ou fechado)");
        }
    }

    source.release().await;
}
