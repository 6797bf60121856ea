// src/services/pocket.rs

use parking_lot::Mutex;
use std::{
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::watch;

use crate::{
    api::InventoryApi,
    common::error::AppError,
    db::PocketRepository,
    models::{ItemId, LocationRef, PocketEntry},
};

// ---
// PocketStore: o conjunto em memória
// ---

/// Os itens "na mão" do utilizador, sem duplicados, na ordem em que entraram.
///
/// Todas as operações são síncronas e atômicas; nenhuma faz I/O.
/// Cada mudança efetiva incrementa uma revisão observável por `subscribe()`.
#[derive(Clone)]
pub struct PocketStore {
    entries: Arc<Mutex<Vec<PocketEntry>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for PocketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PocketStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            revision: Arc::new(revision),
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// No-op se o item já está na tasca. Devolve `true` se entrou.
    pub fn add(&self, item_id: ItemId) -> bool {
        self.add_entry(PocketEntry::new(item_id))
    }

    /// Como `add`, guardando também a posição de origem.
    pub fn add_entry(&self, entry: PocketEntry) -> bool {
        let added = {
            let mut entries = self.entries.lock();
            if entries.iter().any(|e| e.item_id == entry.item_id) {
                false
            } else {
                entries.push(entry);
                true
            }
        };
        if added {
            self.bump();
        }
        added
    }

    pub fn remove(&self, item_id: ItemId) -> bool {
        self.remove_all(&[item_id]) == 1
    }

    /// Remove os ids indicados que ainda estiverem presentes.
    pub fn remove_all(&self, item_ids: &[ItemId]) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|e| !item_ids.contains(&e.item_id));
            before - entries.len()
        };
        if removed > 0 {
            self.bump();
        }
        removed
    }

    pub fn clear(&self) {
        let had_items = {
            let mut entries = self.entries.lock();
            let had_items = !entries.is_empty();
            entries.clear();
            had_items
        };
        if had_items {
            self.bump();
        }
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.entries.lock().iter().any(|e| e.item_id == item_id)
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn entry(&self, item_id: ItemId) -> Option<PocketEntry> {
        self.entries.lock().iter().find(|e| e.item_id == item_id).cloned()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.entries.lock().iter().map(|e| e.item_id).collect()
    }

    pub fn snapshot(&self) -> Vec<PocketEntry> {
        self.entries.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // Só para a hidratação: descarta duplicados vindos da fonte.
    fn replace_all(&self, incoming: Vec<PocketEntry>) {
        {
            let mut entries = self.entries.lock();
            entries.clear();
            for entry in incoming {
                if !entries.iter().any(|e| e.item_id == entry.item_id) {
                    entries.push(entry);
                }
            }
        }
        self.bump();
    }
}

// ---
// PocketService: hidratação e ações que falam com o servidor
// ---

/// De onde vem o conteúdo inicial da tasca. Exatamente uma fonte por instância.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PocketSource {
    /// `GET /items/in-hand`: o servidor é a fonte de verdade (multi-dispositivo).
    #[default]
    Server,
    /// Cópia local em SQLite, mantida a cada mudança.
    Local,
}

impl FromStr for PocketSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(PocketSource::Server),
            "local" => Ok(PocketSource::Local),
            other => Err(AppError::Config(format!("POCKET_SOURCE desconhecido: {other}"))),
        }
    }
}

#[derive(Clone)]
pub struct PocketService {
    store: PocketStore,
    api: Arc<dyn InventoryApi>,
    repo: Option<PocketRepository>,
    source: PocketSource,
    hydrated: Arc<AtomicBool>,
}

impl PocketService {
    /// `repo` só é usado quando `source` é `Local`.
    pub fn new(
        store: PocketStore,
        api: Arc<dyn InventoryApi>,
        repo: Option<PocketRepository>,
        source: PocketSource,
    ) -> Self {
        Self {
            store,
            api,
            repo,
            source,
            hydrated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &PocketStore {
        &self.store
    }

    pub fn source(&self) -> PocketSource {
        self.source
    }

    /// Carrega a tasca da fonte configurada. Só pode correr uma vez com sucesso;
    /// se falhar, pode ser tentado de novo.
    pub async fn hydrate(&self) -> Result<usize, AppError> {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            return Err(AppError::PocketAlreadyHydrated);
        }

        let loaded = match self.source {
            PocketSource::Server => self.fetch_in_hand().await,
            PocketSource::Local => match &self.repo {
                Some(repo) => repo.load().await,
                None => Err(AppError::Config("POCKET_SOURCE=local sem banco local".into())),
            },
        };

        let entries = match loaded {
            Ok(entries) => entries,
            Err(e) => {
                self.hydrated.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        self.store.replace_all(entries);
        let count = self.store.count();
        tracing::info!("✋ Tasca carregada ({:?}): {} itens", self.source, count);

        if let (PocketSource::Local, Some(repo)) = (self.source, &self.repo) {
            self.spawn_write_back(repo.clone());
        }

        Ok(count)
    }

    // `/items/in-hand` não diz de onde o item saiu; a origem vem do detalhe de
    // cada item. Qualquer falha aborta a hidratação, que pode ser repetida.
    async fn fetch_in_hand(&self) -> Result<Vec<PocketEntry>, AppError> {
        let held = self.api.list_in_hand().await?;
        let mut entries = Vec::with_capacity(held.len());
        for item in held {
            let entry = match item.location_id {
                Some(_) => PocketEntry::from(&item),
                None => PocketEntry::from(&self.api.get_item(item.id).await?),
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    // Grava a tasca no SQLite a cada revisão. Falhas só são logadas.
    fn spawn_write_back(&self, repo: PocketRepository) {
        let store = self.store.clone();
        let mut revisions = store.subscribe();

        tokio::spawn(async move {
            while revisions.changed().await.is_ok() {
                if let Err(e) = repo.replace(&store.snapshot()).await {
                    tracing::error!("🔥 Falha ao gravar a tasca localmente: {}", e);
                }
            }
        });
    }

    /// "Prendo": marca no servidor primeiro, só depois entra na tasca.
    pub async fn pick(&self, item_id: ItemId) -> Result<PocketEntry, AppError> {
        let item = self.api.pick_item(item_id).await?;
        let entry = PocketEntry::from(&item);
        self.store.add_entry(entry.clone());
        tracing::info!("✋ Item {} na tasca (origem: {:?})", item_id, entry.origin_location_id);
        Ok(entry)
    }

    /// Devolve o item à caixa de onde saiu, sem passar pelo scanner.
    pub async fn return_to_origin(&self, item_id: ItemId) -> Result<LocationRef, AppError> {
        let entry = self.store.entry(item_id).ok_or(AppError::NotInPocket(item_id))?;
        let origin = entry.origin_location_id.ok_or(AppError::OriginUnknown(item_id))?;

        self.api.move_items(&[item_id], origin).await?;
        self.store.remove(item_id);

        tracing::info!(
            "📦 Item {} reposto em {} ({})",
            item_id,
            origin,
            entry.origin_location_name.as_deref().unwrap_or("?")
        );
        Ok(origin)
    }

    /// Tira o item da tasca localmente.
    pub fn release(&self, item_id: ItemId) -> bool {
        self.store.remove(item_id)
    }
}
