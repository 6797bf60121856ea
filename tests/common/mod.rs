// Colaboradores falsos para os testes de integração.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{Notify, mpsc, oneshot},
    time::Instant,
};

use kaos_pocket::{
    AppError,
    api::InventoryApi,
    devices::{Camera, Facing, Frame, FrameDecoder, Haptics, VideoSource},
    models::{ImagePayload, ItemId, ItemStatus, ItemSummary, LocationRef},
};

pub fn loc(id: i64) -> LocationRef {
    LocationRef::new(id).expect("id positivo")
}

pub fn unavailable() -> AppError {
    AppError::Api { status: 503, detail: "Servizio non disponibile".into() }
}

pub fn in_hand(id: ItemId, origin: Option<(i64, &str)>) -> ItemSummary {
    ItemSummary {
        id,
        location_id: origin.map(|(l, _)| loc(l)),
        location_name: origin.map(|(_, n)| n.to_string()),
        description: None,
        status: ItemStatus::InHand,
    }
}

#[derive(Debug, Clone)]
pub struct CreateAttempt {
    pub location: LocationRef,
    pub description: Option<String>,
    pub at: Instant,
}

/// API roteirizada: respostas em fila, padrão é sucesso.
#[derive(Default)]
pub struct FakeApi {
    pub moves: Mutex<Vec<(Vec<ItemId>, LocationRef)>>,
    move_results: Mutex<VecDeque<Result<(), AppError>>>,
    move_hold: Mutex<Option<oneshot::Receiver<()>>>,
    pub move_started: Notify,

    pub picks: Mutex<Vec<ItemId>>,
    pick_results: Mutex<VecDeque<Result<ItemSummary, AppError>>>,

    create_results: Mutex<VecDeque<Result<ItemId, AppError>>>,
    create_hold: Mutex<Option<oneshot::Receiver<()>>>,
    pub create_started: Notify,
    attempts_tx: Mutex<Option<mpsc::UnboundedSender<CreateAttempt>>>,
    next_item_id: AtomicUsize,

    details: Mutex<HashMap<ItemId, ItemSummary>>,
    detail_failures: Mutex<VecDeque<AppError>>,
    pub detail_calls: Mutex<Vec<ItemId>>,

    in_hand_results: Mutex<VecDeque<Result<Vec<ItemSummary>, AppError>>>,
    pub in_hand_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { next_item_id: AtomicUsize::new(1000), ..Default::default() })
    }

    pub fn fail_next_move(&self, error: AppError) {
        self.move_results.lock().push_back(Err(error));
    }

    /// O próximo `move_items` fica pendurado até o sender ser usado (ou descartado).
    pub fn hold_next_move(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.move_hold.lock() = Some(rx);
        tx
    }

    pub fn script_pick(&self, result: Result<ItemSummary, AppError>) {
        self.pick_results.lock().push_back(result);
    }

    pub fn fail_next_create(&self, error: AppError) {
        self.create_results.lock().push_back(Err(error));
    }

    pub fn hold_next_create(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.create_hold.lock() = Some(rx);
        tx
    }

    pub fn attempts(&self) -> mpsc::UnboundedReceiver<CreateAttempt> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.attempts_tx.lock() = Some(tx);
        rx
    }

    /// O que `get_item` devolve para esse id (padrão: em mão, sem origem).
    pub fn script_item(&self, item: ItemSummary) {
        self.details.lock().insert(item.id, item);
    }

    pub fn fail_next_get_item(&self, error: AppError) {
        self.detail_failures.lock().push_back(error);
    }

    pub fn script_in_hand(&self, result: Result<Vec<ItemSummary>, AppError>) {
        self.in_hand_results.lock().push_back(result);
    }

    pub fn move_count(&self) -> usize {
        self.moves.lock().len()
    }
}

#[async_trait]
impl InventoryApi for FakeApi {
    async fn move_items(&self, item_ids: &[ItemId], target: LocationRef) -> Result<(), AppError> {
        self.moves.lock().push((item_ids.to_vec(), target));
        self.move_started.notify_one();

        let hold = self.move_hold.lock().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        self.move_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn pick_item(&self, item_id: ItemId) -> Result<ItemSummary, AppError> {
        self.picks.lock().push(item_id);
        self.pick_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(in_hand(item_id, None)))
    }

    async fn create_item(
        &self,
        location: LocationRef,
        description: Option<&str>,
        _image: &ImagePayload,
    ) -> Result<ItemId, AppError> {
        if let Some(tx) = self.attempts_tx.lock().as_ref() {
            let _ = tx.send(CreateAttempt {
                location,
                description: description.map(str::to_owned),
                at: Instant::now(),
            });
        }
        self.create_started.notify_one();

        let hold = self.create_hold.lock().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        let scripted = self.create_results.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(self.next_item_id.fetch_add(1, Ordering::SeqCst) as ItemId))
    }

    async fn get_item(&self, item_id: ItemId) -> Result<ItemSummary, AppError> {
        self.detail_calls.lock().push(item_id);
        if let Some(error) = self.detail_failures.lock().pop_front() {
            return Err(error);
        }
        let scripted = self.details.lock().get(&item_id).cloned();
        Ok(scripted.unwrap_or_else(|| in_hand(item_id, None)))
    }

    async fn list_in_hand(&self) -> Result<Vec<ItemSummary>, AppError> {
        self.in_hand_calls.fetch_add(1, Ordering::SeqCst);
        self.in_hand_results.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

// --- Câmera falsa ---

#[derive(Default)]
pub struct CameraStats {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

/// Câmera que entrega os quadros roteirizados e depois fica parada
/// (sem quadros) até ser liberada.
pub struct FakeCamera {
    pub stats: Arc<CameraStats>,
    frames: Mutex<Vec<&'static str>>,
    deny: bool,
    rear_missing: bool,
    pub facings: Mutex<Vec<Facing>>,
}

impl FakeCamera {
    pub fn with_frames(frames: &[&'static str]) -> Self {
        Self {
            stats: Arc::new(CameraStats::default()),
            frames: Mutex::new(frames.to_vec()),
            deny: false,
            rear_missing: false,
            facings: Mutex::new(Vec::new()),
        }
    }

    pub fn denied() -> Self {
        Self { deny: true, ..Self::with_frames(&[]) }
    }

    pub fn front_only(frames: &[&'static str]) -> Self {
        Self { rear_missing: true, ..Self::with_frames(frames) }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn VideoSource>, AppError> {
        self.facings.lock().push(facing);
        if self.deny {
            return Err(AppError::CameraPermissionDenied);
        }
        if self.rear_missing && facing == Facing::Rear {
            return Err(AppError::CameraUnavailable("sem câmera traseira".into()));
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSource {
            frames: self.frames.lock().drain(..).collect(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeSource {
    frames: VecDeque<&'static str>,
    stats: Arc<CameraStats>,
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn next_frame(&mut self) -> Option<Frame> {
        match self.frames.pop_front() {
            Some(text) => Some(Frame { data: text.as_bytes().to_vec(), width: 1, height: 1 }),
            // Câmera ligada, nada à frente.
            None => std::future::pending().await,
        }
    }

    async fn release(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Quadros vazios representam "nenhum QR no quadro".
pub struct EchoDecoder;

impl FrameDecoder for EchoDecoder {
    fn decode(&self, frame: &Frame) -> Option<String> {
        let text = String::from_utf8(frame.data.clone()).ok()?;
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Default)]
pub struct CountingHaptics {
    pub pulses: AtomicUsize,
}

impl Haptics for CountingHaptics {
    fn pulse(&self, _duration: Duration) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}
