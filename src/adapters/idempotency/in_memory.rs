//! In-memory idempotency store for tests and single-process runs.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::IdempotencyStore;

/// In-memory `IdempotencyStore`.
///
/// The mutex makes check-and-insert atomic, which is the whole contract;
/// everything else is a HashSet.
pub struct InMemoryIdempotencyStore {
    seen: Mutex<HashSet<String>>,
}

impl InMemoryIdempotencyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of recorded event ids (for test assertions).
    pub fn len(&self) -> usize {
        self.seen.lock().expect("idempotency lock poisoned").len()
    }

    /// Whether no event ids are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn insert_if_absent(&self, event_id: &str) -> Result<bool, DomainError> {
        let mut seen = self.seen.lock().expect("idempotency lock poisoned");
        Ok(seen.insert(event_id.to_string()))
    }

    async fn contains(&self, event_id: &str) -> Result<bool, DomainError> {
        let seen = self.seen.lock().expect("idempotency lock poisoned");
        Ok(seen.contains(event_id))
    }

    async fn remove(&self, event_id: &str) -> Result<(), DomainError> {
        let mut seen = self.seen.lock().expect("idempotency lock poisoned");
        seen.remove(event_id);
        Ok(())
    }
}
