// src/config.rs

use sqlx::SqlitePool;
use std::{env, str::FromStr, sync::Arc, time::Duration};
use tokio::sync::broadcast;

use crate::{
    api::{HttpInventoryApi, InventoryApi},
    common::error::AppError,
    db::{self, PocketRepository, UploadRepository},
    services::{
        PocketService, PocketSource, PocketStore, RelocationSession, ScanDispatcher, UiBus,
        UploadQueue,
        retry::DEFAULT_BACKOFF,
        scanner::{DEFAULT_FPS, MAX_FPS},
    },
};

const DEFAULT_DATABASE_URL: &str = "sqlite://kaos-pocket.db?mode=rwc";
const UI_EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub database_url: String,
    pub pocket_source: PocketSource,
    pub upload_retry: Duration,
    pub scan_fps: u32,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Lê o `.env` (se existir) e as variáveis de ambiente.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_base_url = lookup("API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("API_BASE_URL deve ser definida".into()))?;

        Ok(Self {
            api_base_url,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            pocket_source: match lookup("POCKET_SOURCE") {
                Some(value) => value.parse()?,
                None => PocketSource::default(),
            },
            upload_retry: Duration::from_secs(parse_or(
                &lookup,
                "UPLOAD_RETRY_SECS",
                DEFAULT_BACKOFF.as_secs(),
            )?),
            scan_fps: match parse_or(&lookup, "SCAN_FPS", DEFAULT_FPS)? {
                fps @ 1..=MAX_FPS => fps,
                fps => {
                    return Err(AppError::Config(format!(
                        "SCAN_FPS deve estar entre 1 e {MAX_FPS}: {fps}"
                    )));
                }
            },
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 15)?),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} inválido: {raw}"))),
        None => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: SqlitePool,
    pub api: Arc<dyn InventoryApi>,
    pub pocket: PocketService,
    pub session: RelocationSession,
    pub uploads: UploadQueue,
    pub dispatcher: ScanDispatcher,
    pub ui: UiBus,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco local e roda as migrações
        let db_pool = db::connect(&config.database_url).await?;
        tracing::info!("✅ Banco local pronto em {}", config.database_url);

        let api: Arc<dyn InventoryApi> =
            Arc::new(HttpInventoryApi::new(&config.api_base_url, config.http_timeout)?);

        // --- Monta o gráfico de dependências ---
        let store = PocketStore::new();
        let pocket_repo = match config.pocket_source {
            PocketSource::Local => Some(PocketRepository::new(db_pool.clone())),
            PocketSource::Server => None,
        };
        let pocket = PocketService::new(store.clone(), Arc::clone(&api), pocket_repo, config.pocket_source);

        let session = RelocationSession::new();
        let (ui, _) = broadcast::channel(UI_EVENT_BUFFER);
        let dispatcher = ScanDispatcher::new(Arc::clone(&api), store, session.clone(), ui.clone());

        let uploads =
            UploadQueue::restore(UploadRepository::new(db_pool.clone()), config.upload_retry).await?;

        Ok(Self {
            config,
            db_pool,
            api,
            pocket,
            session,
            uploads,
            dispatcher,
            ui,
        })
    }
}
