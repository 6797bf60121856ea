// src/services/upload_queue.rs
//
// Fila de criação de itens (foto + metadados) capturados sem rede ou com o
// backend fora do ar. Processa um de cada vez, do mais antigo para o mais novo.

use chrono::Utc;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Notify, mpsc},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::InventoryApi,
    common::error::AppError,
    db::UploadRepository,
    models::{ImagePayload, ItemId, LocationRef, UploadEntry, UploadStatus},
    services::RetryScheduler,
};

/// Resultado de uma passada do processador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainStep {
    Uploaded { entry_id: i64, item_id: ItemId },
    Failed { entry_id: i64, retries: u32 },
    /// Há trabalho, mas a última falha ainda está na janela de espera.
    Backoff(Instant),
    /// Nada elegível para enviar.
    Idle,
    /// Já existe um envio em curso.
    Busy,
}

struct Queued {
    entry: UploadEntry,
    // Só existe em memória; o SQLite guarda apenas os metadados.
    image: Arc<ImagePayload>,
}

#[derive(Default)]
struct QueueState {
    entries: Vec<Queued>,
    last_id: i64,
}

enum PersistOp {
    Save(UploadEntry),
    Delete(i64),
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Notify,
    scheduler: RetryScheduler,
    persist: Option<mpsc::UnboundedSender<PersistOp>>,
}

#[derive(Clone)]
pub struct UploadQueue {
    shared: Arc<Shared>,
}

impl UploadQueue {
    /// Fila só em memória.
    pub fn new(backoff: Duration) -> Self {
        Self::build(backoff, None)
    }

    /// Passa a gravar cada mudança da fila no SQLite.
    ///
    /// As imagens não sobrevivem a um restart: o que ficou gravado de uma
    /// sessão anterior não pode ser enviado e é descartado (perda aceita).
    pub async fn restore(repo: UploadRepository, backoff: Duration) -> Result<Self, AppError> {
        for orphan in repo.load().await? {
            tracing::warn!(
                "⚠️ Upload {} para {} descartado: imagem perdida no restart ({} tentativas)",
                orphan.id,
                orphan.location_id,
                orphan.retries
            );
            repo.delete(orphan.id).await?;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<PersistOp>();
        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let result = match &op {
                    PersistOp::Save(entry) => repo.save(entry).await,
                    PersistOp::Delete(id) => repo.delete(*id).await,
                };
                if let Err(e) = result {
                    tracing::error!("🔥 Falha ao gravar a fila de upload: {}", e);
                }
            }
        });

        Ok(Self::build(backoff, Some(tx)))
    }

    fn build(backoff: Duration, persist: Option<mpsc::UnboundedSender<PersistOp>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                scheduler: RetryScheduler::new(backoff),
                persist,
            }),
        }
    }

    fn persist(&self, op: PersistOp) {
        if let Some(tx) = &self.shared.persist {
            // Só falha se a task de gravação morreu; a fila em memória segue.
            let _ = tx.send(op);
        }
    }

    /// Adiciona uma captura como `pending`. Nunca bloqueia nem falha.
    pub fn enqueue(
        &self,
        location: LocationRef,
        description: Option<String>,
        image: ImagePayload,
    ) -> UploadEntry {
        let entry = {
            let mut state = self.shared.state.lock();
            // Timestamp em ms, forçado a ser estritamente crescente.
            let id = Utc::now().timestamp_millis().max(state.last_id + 1);
            state.last_id = id;

            let entry = UploadEntry {
                id,
                location_id: location,
                description: description.filter(|d| !d.trim().is_empty()),
                status: UploadStatus::Pending,
                retries: 0,
                created_at: Utc::now(),
            };
            state.entries.push(Queued { entry: entry.clone(), image: Arc::new(image) });
            entry
        };

        tracing::info!("📸 Upload {} na fila para {}", entry.id, entry.location_id);
        self.persist(PersistOp::Save(entry.clone()));
        self.shared.wake.notify_one();
        entry
    }

    /// Todas as entradas com erro voltam a `pending` e a espera é cancelada.
    pub fn retry_all(&self) -> usize {
        let reset: Vec<UploadEntry> = {
            let mut state = self.shared.state.lock();
            state
                .entries
                .iter_mut()
                .filter(|q| q.entry.status == UploadStatus::Error)
                .map(|q| {
                    q.entry.status = UploadStatus::Pending;
                    q.entry.clone()
                })
                .collect()
        };

        let count = reset.len();
        for entry in reset {
            self.persist(PersistOp::Save(entry));
        }

        self.shared.scheduler.lift();
        self.shared.wake.notify_one();
        tracing::info!("🔁 {} uploads de volta para a fila", count);
        count
    }

    /// Remove uma entrada que não está a ser enviada.
    pub fn discard(&self, entry_id: i64) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            let before = state.entries.len();
            state
                .entries
                .retain(|q| q.entry.id != entry_id || q.entry.status == UploadStatus::Uploading);
            before != state.entries.len()
        };
        if removed {
            self.persist(PersistOp::Delete(entry_id));
        }
        removed
    }

    pub fn snapshot(&self) -> Vec<UploadEntry> {
        self.shared.state.lock().entries.iter().map(|q| q.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uma passada: pega a entrada mais antiga `pending`/`error`, envia e
    /// aplica o resultado. Nunca há mais de uma entrada em `uploading`.
    pub async fn drain_once(&self, api: &dyn InventoryApi) -> DrainStep {
        let (entry, image) = {
            let mut state = self.shared.state.lock();

            if state.entries.iter().any(|q| q.entry.status == UploadStatus::Uploading) {
                return DrainStep::Busy;
            }

            let Some(next) = state
                .entries
                .iter_mut()
                .find(|q| matches!(q.entry.status, UploadStatus::Pending | UploadStatus::Error))
            else {
                return DrainStep::Idle;
            };

            if let Some(until) = self.shared.scheduler.blocked_until() {
                return DrainStep::Backoff(until);
            }

            next.entry.status = UploadStatus::Uploading;
            (next.entry.clone(), Arc::clone(&next.image))
        };
        self.persist(PersistOp::Save(entry.clone()));

        // Se este future for abandonado no meio do envio, a entrada volta a `pending`.
        let mut claim = Claim { queue: self, entry_id: entry.id, settled: false };

        tracing::debug!("⬆️ Enviando upload {} (tentativa {})", entry.id, entry.retries + 1);
        let result = api
            .create_item(entry.location_id, entry.description.as_deref(), &image)
            .await;

        claim.settled = true;
        match result {
            Ok(item_id) => {
                self.shared.state.lock().entries.retain(|q| q.entry.id != entry.id);
                self.persist(PersistOp::Delete(entry.id));
                tracing::info!("✅ Upload {} criado como item {}", entry.id, item_id);
                DrainStep::Uploaded { entry_id: entry.id, item_id }
            }
            Err(e) => {
                let updated = self.update(entry.id, |q| {
                    q.status = UploadStatus::Error;
                    q.retries += 1;
                });
                let retries = updated.as_ref().map_or(entry.retries + 1, |u| u.retries);
                if let Some(updated) = updated {
                    self.persist(PersistOp::Save(updated));
                }
                self.shared.scheduler.record_failure();
                tracing::warn!(
                    "⚠️ Upload {} falhou ({} tentativas): {}. Nova tentativa em {:?}",
                    entry.id,
                    retries,
                    e,
                    self.shared.scheduler.backoff()
                );
                DrainStep::Failed { entry_id: entry.id, retries }
            }
        }
    }

    fn update(&self, entry_id: i64, f: impl FnOnce(&mut UploadEntry)) -> Option<UploadEntry> {
        let mut state = self.shared.state.lock();
        let queued = state.entries.iter_mut().find(|q| q.entry.id == entry_id)?;
        f(&mut queued.entry);
        Some(queued.entry.clone())
    }
}

struct Claim<'a> {
    queue: &'a UploadQueue,
    entry_id: i64,
    settled: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(entry) = self.queue.update(self.entry_id, |q| q.status = UploadStatus::Pending) {
            self.queue.persist(PersistOp::Save(entry));
        }
    }
}

// ---
// Worker em background
// ---

pub struct UploadWorker;

pub struct UploadWorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl UploadWorker {
    /// Drena a fila sempre que houver trabalho, respeitando a espera após falhas.
    pub fn spawn(queue: UploadQueue, api: Arc<dyn InventoryApi>) -> UploadWorkerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::info!("🚚 Worker de upload iniciado");
            loop {
                let step = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    step = queue.drain_once(api.as_ref()) => step,
                };

                match step {
                    DrainStep::Uploaded { .. } | DrainStep::Failed { .. } => continue,
                    DrainStep::Backoff(until) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = queue.shared.wake.notified() => {}
                            _ = tokio::time::sleep_until(until) => {}
                        }
                    }
                    DrainStep::Idle | DrainStep::Busy => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = queue.shared.wake.notified() => {}
                        }
                    }
                }
            }
            tracing::info!("🚚 Worker de upload parado");
        });

        UploadWorkerHandle { cancel, task }
    }
}

impl UploadWorkerHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("⚠️ Worker de upload terminou com erro: {}", e);
        }
    }
}
