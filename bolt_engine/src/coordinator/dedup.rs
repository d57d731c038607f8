use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use log::*;

/// The set of order ids currently being coordinated.
///
/// [`DedupSet::try_acquire`] checks and inserts under one lock, so two triggers racing for the same id can never both
/// win. The returned guard removes the id again when it is dropped.
#[derive(Clone, Default)]
pub struct DedupSet {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id`, or returns `None` if it is already claimed.
    pub fn try_acquire(&self, id: &str) -> Option<DedupGuard> {
        let mut set = match self.in_flight.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        if set.insert(id.to_string()) {
            Some(DedupGuard { id: id.to_string(), in_flight: Arc::clone(&self.in_flight) })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.in_flight.lock().map(|set| set.contains(id)).unwrap_or_else(|p| p.into_inner().contains(id))
    }

    pub fn len(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds a claimed order id until dropped.
pub struct DedupGuard {
    id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl DedupGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for DedupGuard {
    fn drop(&mut self) {
        let mut set = match self.in_flight.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.remove(&self.id);
        trace!("🔄️ Released order {}", self.id);
    }
}
