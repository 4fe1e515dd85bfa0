use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::domain::{DomainError, Result};

#[derive(Debug)]
struct ActiveRetrieval {
    generation: u64,
    token: CancellationToken,
}

type SessionKey = (String, String);

/// Tracks the in-flight retrieval of each caller's session. Starting a new
/// one cancels whatever that session was still running.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: Mutex<HashMap<SessionKey, ActiveRetrieval>>,
    generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, owner: &str, session_id: &str) -> Result<SessionGuard<'_>> {
        let key = (owner.to_string(), session_id.to_string());
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self
            .active
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .insert(
                key.clone(),
                ActiveRetrieval {
                    generation,
                    token: token.clone(),
                },
            );
        if let Some(previous) = previous {
            tracing::debug!(owner, session_id, "cancelling superseded retrieval");
            previous.token.cancel();
        }

        Ok(SessionGuard {
            registry: self,
            key,
            generation,
            token,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.active.lock().map(|m| m.len()).unwrap_or(0)
    }
}

/// Registration of one retrieval. Dropping it unregisters the session
/// unless a newer retrieval has already taken its place.
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    key: SessionKey,
    generation: u64,
    token: CancellationToken,
}

impl SessionGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.registry.active.lock() {
            if active
                .get(&self.key)
                .is_some_and(|a| a.generation == self.generation)
            {
                active.remove(&self.key);
            }
        }
    }
}
