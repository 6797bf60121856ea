//src/main.rs

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use kaos_pocket::{
    config::{AppConfig, AppState},
    devices::{KeyboardWedge, NoHaptics, TextDecoder},
    models::ScanMode,
    services::{ContinuousScanSource, FlowEnd, UploadWorker, log_ui_events},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()?;
    let app_state = AppState::new(config).await?;

    // Falha na hidratação não é fatal: a tasca começa vazia e o scanner segue usável.
    if let Err(e) = app_state.pocket.hydrate().await {
        tracing::error!("🔥 Falha ao carregar a tasca: {}", e);
    }

    let worker = UploadWorker::spawn(app_state.uploads.clone(), Arc::clone(&app_state.api));

    // A "camada de UI" deste binário é o log.
    tokio::spawn(log_ui_events(app_state.ui.subscribe()));

    let mut scanner = ContinuousScanSource::new(
        Arc::new(KeyboardWedge::stdin()),
        Arc::new(TextDecoder),
        Arc::new(NoHaptics),
        app_state.config.scan_fps,
    );

    loop {
        let mode = if app_state.pocket.store().count() > 0 {
            ScanMode::Pocket
        } else {
            ScanMode::Navigate
        };
        let flow = app_state.dispatcher.open(mode);

        let mut events = match scanner.start().await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("🔥 Scanner indisponível: {}", e);
                break;
            }
        };
        tracing::info!("{}", flow.prompt());

        let end = tokio::select! {
            end = flow.run(&mut events) => end,
            _ = tokio::signal::ctrl_c() => {
                flow.cancel();
                FlowEnd::SourceEnded
            }
        };
        scanner.stop().await;

        if end == FlowEnd::SourceEnded {
            break;
        }
    }

    worker.shutdown().await;
    tracing::info!("👋 Encerrado ({} uploads pendentes)", app_state.uploads.len());
    Ok(())
}
