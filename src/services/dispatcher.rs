// src/services/dispatcher.rs
//
// Onde um QR lido vira efeito: mover um item, esvaziar a tasca ou navegar.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    api::InventoryApi,
    common::error::AppError,
    models::{ItemId, LocationRef, NoticeLevel, ScanEvent, ScanMode, ScanOutcome, UiEvent},
    services::{PocketStore, RelocationSession},
};

/// Canal de efeitos de UI. Quem não estiver inscrito simplesmente não recebe.
pub type UiBus = broadcast::Sender<UiEvent>;

/// Escreve no log cada efeito de UI até o canal fechar. Eventos perdidos por
/// atraso são só avisados. Devolve quantos eventos foram escritos.
pub async fn log_ui_events(mut events: broadcast::Receiver<UiEvent>) -> usize {
    let mut logged = 0;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("⚠️ {} eventos de UI perdidos", skipped);
                continue;
            }
            Err(RecvError::Closed) => return logged,
        };
        match event {
            UiEvent::Notice { level: NoticeLevel::Error, message } => tracing::warn!("{}", message),
            UiEvent::Notice { message, .. } => tracing::info!("{}", message),
            UiEvent::CloseScanner => tracing::debug!("Scanner fechado"),
            UiEvent::Navigate(location) => tracing::info!("🧭 {}", location.path()),
        }
        logged += 1;
    }
}

#[derive(Clone)]
pub struct ScanDispatcher {
    api: Arc<dyn InventoryApi>,
    pocket: PocketStore,
    session: RelocationSession,
    ui: UiBus,
}

impl ScanDispatcher {
    pub fn new(
        api: Arc<dyn InventoryApi>,
        pocket: PocketStore,
        session: RelocationSession,
        ui: UiBus,
    ) -> Self {
        Self { api, pocket, session, ui }
    }

    /// Abre um fluxo de scan (a tela do scanner) no modo indicado.
    pub fn open(&self, mode: ScanMode) -> ScanFlow {
        let flow = ScanFlow {
            id: Uuid::new_v4(),
            mode,
            dispatcher: self.clone(),
            in_flight: AtomicBool::new(false),
            closed: CancellationToken::new(),
        };
        tracing::info!(flow = %flow.id, ?mode, "📷 Fluxo de scan aberto");
        flow
    }

    fn notify(&self, event: UiEvent) {
        // Erro aqui só significa que não há ninguém a ouvir.
        let _ = self.ui.send(event);
    }
}

/// Como terminou `ScanFlow::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEnd {
    Closed,
    SourceEnded,
}

/// Uma sessão do scanner, do momento em que abre até fechar.
///
/// No máximo uma relocação em curso: scans que chegam enquanto um request está
/// pendente são ignorados. Depois de fechado, nada mais é despachado.
pub struct ScanFlow {
    id: Uuid,
    mode: ScanMode,
    dispatcher: ScanDispatcher,
    in_flight: AtomicBool,
    closed: CancellationToken,
}

// Libera o slot de request mesmo se o future for abandonado no meio.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScanFlow {
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Texto de instrução para o topo da tela do scanner.
    pub fn prompt(&self) -> String {
        let d = &self.dispatcher;
        if d.session.current().is_some() {
            return "📦 Escaneie onde pousar o objeto".to_string();
        }
        match (self.mode, d.pocket.count()) {
            (ScanMode::Pocket, n) if n > 0 => format!("📦 Escaneie onde pousar {n} objetos"),
            _ => "📷 Enquadre o QR da posição".to_string(),
        }
    }

    /// O utilizador fechou o scanner: a intenção de mover um item é descartada.
    pub fn cancel(&self) {
        if self.is_closed() {
            return;
        }
        if let Some(item_id) = self.dispatcher.session.discard() {
            tracing::info!(flow = %self.id, "Relocação do item {} cancelada", item_id);
        }
        self.closed.cancel();
    }

    /// Ponto de entrada único: texto decodificado pela câmera.
    ///
    /// Ordem das regras (a primeira que casar ganha):
    /// 1. texto não reconhecido -> aviso, nada muda;
    /// 2. sessão de relocação ativa -> move esse item;
    /// 3. modo `pocket` com a tasca não vazia -> move todos;
    /// 4. caso contrário -> fecha e navega para a posição.
    pub async fn report_decoded(&self, text: &str) -> ScanOutcome {
        if self.is_closed() {
            return ScanOutcome::Ignored;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(flow = %self.id, "Scan ignorado: relocação em curso");
            return ScanOutcome::Ignored;
        }
        let _slot = InFlight(&self.in_flight);

        let d = &self.dispatcher;

        let Some(location) = LocationRef::parse(text) else {
            tracing::debug!(flow = %self.id, "QR não reconhecido: {:?}", text);
            d.notify(UiEvent::error("❌ QR inválido"));
            return ScanOutcome::InvalidCode;
        };

        if let Some(item_id) = d.session.current() {
            return self.move_single(item_id, location).await;
        }

        if self.mode == ScanMode::Pocket {
            let held = d.pocket.item_ids();
            if !held.is_empty() {
                return self.move_bulk(held, location).await;
            }
        }

        tracing::info!(flow = %self.id, "🧭 Navegando para {}", location.path());
        self.finish(Some(UiEvent::Navigate(location)));
        ScanOutcome::Navigated(location)
    }

    async fn move_single(&self, item_id: ItemId, location: LocationRef) -> ScanOutcome {
        let d = &self.dispatcher;
        tracing::info!(flow = %self.id, "📦 Movendo o item {} para {}", item_id, location);

        match d.api.move_items(&[item_id], location).await {
            Ok(()) => {
                d.pocket.remove(item_id);
                d.session.clear_if(item_id);
                d.notify(UiEvent::success("✅ Objeto movido!"));
                self.finish(None);
                ScanOutcome::Moved { item_id, location }
            }
            Err(e) => self.failed(e),
        }
    }

    async fn move_bulk(&self, item_ids: Vec<ItemId>, location: LocationRef) -> ScanOutcome {
        let d = &self.dispatcher;
        tracing::info!(flow = %self.id, "📦 Movendo {} itens da tasca para {}", item_ids.len(), location);

        match d.api.move_items(&item_ids, location).await {
            Ok(()) => {
                // Só sai da tasca o que foi enviado; um pick feito durante o
                // request continua lá.
                d.pocket.remove_all(&item_ids);
                let count = item_ids.len();
                d.notify(UiEvent::success(format!("✅ {count} objetos movidos!")));
                self.finish(None);
                ScanOutcome::BulkMoved { count, location }
            }
            Err(e) => self.failed(e),
        }
    }

    // Falha de rede/API: nada muda, o fluxo continua aberto para novo scan.
    fn failed(&self, e: AppError) -> ScanOutcome {
        tracing::warn!(flow = %self.id, "⚠️ Relocação falhou: {}", e);
        let message = e.user_message();
        self.dispatcher.notify(UiEvent::error(format!("❌ {message}")));
        ScanOutcome::RelocationFailed { message }
    }

    // Fecha o fluxo. Se já foi fechado por fora (tela desmontada durante o
    // request), nenhuma transição de UI é emitida.
    fn finish(&self, then: Option<UiEvent>) {
        if self.is_closed() {
            tracing::debug!(flow = %self.id, "Fluxo já fechado, sem transição de UI");
            return;
        }
        self.closed.cancel();
        self.dispatcher.notify(UiEvent::CloseScanner);
        if let Some(event) = then {
            self.dispatcher.notify(event);
        }
    }

    /// Consome os eventos do scanner até o fluxo fechar ou a fonte acabar.
    /// Eventos acumulados durante um despacho são descartados.
    pub async fn run(&self, events: &mut mpsc::Receiver<ScanEvent>) -> FlowEnd {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.closed.cancelled() => return FlowEnd::Closed,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => return FlowEnd::SourceEnded,
                },
            };

            self.report_decoded(&event.payload).await;

            let mut dropped = 0usize;
            while events.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                tracing::debug!(flow = %self.id, "{} scans repetidos descartados", dropped);
            }
        }
    }
}
