use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{AppError, AppResult};

/// Refuses a second submission of the same action while one is outstanding.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    in_flight: Mutex<HashSet<String>>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` until the returned ticket drops.
    pub fn begin(&self, key: impl Into<String>) -> AppResult<Ticket<'_>> {
        let key = key.into();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key.clone()) {
            debug!("Refusing re-entrant submission {}", key);
            return Err(AppError::InFlight(key));
        }
        Ok(Ticket { guard: self, key })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    fn release(&self, key: &str) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// Held for the duration of one submission.
#[derive(Debug)]
pub struct Ticket<'a> {
    guard: &'a SubmissionGuard,
    key: String,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.key);
    }
}

/// Monotonic request counter; only the latest request may apply its result.
#[derive(Debug, Default)]
pub struct Generations {
    latest: AtomicU64,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_is_refused_until_released() {
        let guard = SubmissionGuard::new();
        let ticket = guard.begin("register:sam@example.com").unwrap();
        assert!(matches!(
            guard.begin("register:sam@example.com"),
            Err(AppError::InFlight(_))
        ));
        assert!(guard.begin("register:other@example.com").is_ok());

        drop(ticket);
        assert!(!guard.is_busy("register:sam@example.com"));
        assert!(guard.begin("register:sam@example.com").is_ok());
    }

    #[test]
    fn only_the_latest_generation_is_current() {
        let generations = Generations::new();
        let first = generations.begin();
        let second = generations.begin();
        assert!(!generations.is_current(first));
        assert!(generations.is_current(second));
    }
}
