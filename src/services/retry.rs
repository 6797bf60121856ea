// src/services/retry.rs

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Espera fixa depois de uma falha de upload, para não martelar um backend
/// fora do ar. Não cresce exponencialmente.
///
/// Usa o relógio do tokio, então os testes controlam o tempo com
/// `tokio::time::pause`.
pub struct RetryScheduler {
    backoff: Duration,
    not_before: Mutex<Option<Instant>>,
}

impl RetryScheduler {
    pub fn new(backoff: Duration) -> Self {
        Self { backoff, not_before: Mutex::new(None) }
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn record_failure(&self) -> Instant {
        let until = Instant::now() + self.backoff;
        *self.not_before.lock() = Some(until);
        until
    }

    /// `retry_all` manual: libera já.
    pub fn lift(&self) {
        *self.not_before.lock() = None;
    }

    /// `None` se pode tentar agora, senão o instante a partir do qual pode.
    pub fn blocked_until(&self) -> Option<Instant> {
        let mut not_before = self.not_before.lock();
        match *not_before {
            Some(until) if until > Instant::now() => Some(until),
            Some(_) => {
                *not_before = None;
                None
            }
            None => None,
        }
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF)
    }
}
