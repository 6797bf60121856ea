// src/models/location.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::LazyLock};

// Formato impresso nas etiquetas: https://<host>/loc/<id>
static LOC_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/loc/(\d+)").expect("regex literal válida"));

/// Identificador de uma posição (caixa) extraído de um QR.
/// Não tem ciclo de vida próprio, é só o resultado do parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct LocationRef(i64);

impl LocationRef {
    /// Só aceita ids positivos.
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn id(self) -> i64 {
        self.0
    }

    /// Extrai o id de um texto qualquer lido do QR.
    ///
    /// Reconhece `/loc/<dígitos>` em qualquer ponto do texto, ou um texto
    /// composto apenas por dígitos. Zeros à esquerda são lidos pelo valor
    /// (`"0482"` -> 482). Qualquer outra coisa devolve `None`, que não é erro:
    /// quem chama decide o que mostrar.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = match LOC_PATH.captures(text) {
            Some(caps) => caps.get(1)?.as_str(),
            None if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => text,
            None => return None,
        };

        // Estouro de i64 também conta como "sem match".
        digits.parse::<i64>().ok().and_then(Self::new)
    }

    /// Rota da tela de detalhe desta posição.
    pub fn path(self) -> String {
        format!("/loc/{}", self.0)
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
