// src/common/error.rs

use thiserror::Error;

// O tipo de erro da aplicação, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Permissão da câmera negada")]
    CameraPermissionDenied,

    #[error("Câmera indisponível: {0}")]
    CameraUnavailable(String),

    // Resposta não-2xx do backend. `detail` vem do corpo JSON quando existe.
    #[error("Erro da API ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Erro de rede: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Erro de banco de dados local")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Falha ao rodar as migrações: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("A tasca já foi carregada")]
    PocketAlreadyHydrated,

    #[error("Posição original do item {0} desconhecida")]
    OriginUnknown(i64),

    #[error("Item {0} não está na tasca")]
    NotInPocket(i64),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Falhas de rede/API: o estado local não foi alterado e repetir é seguro.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Http(_) => true,
            // 4xx de validação (location inválida, item inexistente) não se resolvem sozinhos.
            AppError::Api { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Texto curto para a notificação mostrada ao utilizador.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api { detail, .. } => detail.clone(),
            AppError::Http(e) if e.is_timeout() => "Tempo de resposta esgotado".to_string(),
            AppError::Http(_) => "Sem ligação ao servidor".to_string(),
            AppError::CameraPermissionDenied => "Permita o acesso à câmera".to_string(),
            ref e => e.to_string(),
        }
    }
}
