// planet/src/registry.rs
//! 进行中注册表 - 协调调度周期之间的重复拉取

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// At most one task per subscription holds a claim at any time.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    claimed: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a subscription; `None` if another task already has it
    pub fn try_claim(&self, id: &str) -> Option<InFlightGuard> {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        claimed.insert(id.to_string()).then(|| InFlightGuard {
            registry: self.clone(),
            id: id.to_string(),
        })
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the claim when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    id: String,
}

impl InFlightGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
