use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use log::*;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type Tasks = HashMap<String, JoinHandle<()>>;

/// Owns the debt reminder tasks, one per order id.
///
/// Reminder tasks outlive the coordinator run that started them, so they are not tied to any request or shutdown
/// token. The registry has its own token, which is only cancelled by [`DebtTaskRegistry::drain`].
#[derive(Clone, Default)]
pub struct DebtTaskRegistry {
    tasks: Arc<Mutex<Tasks>>,
    token: CancellationToken,
}

impl DebtTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tasks> {
        let mut tasks = match self.tasks.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.retain(|_, handle| !handle.is_finished());
        tasks
    }

    /// Starts a reminder task for `order_id` unless one is already running. `task` receives the registry's token.
    /// Returns false if the order was already tracked.
    pub fn spawn<F, Fut>(&self, order_id: &str, task: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        if tasks.contains_key(order_id) {
            debug!("💸️ Reminders for order {order_id} are already running");
            return false;
        }
        let handle = tokio::spawn(task(self.token.clone()));
        tasks.insert(order_id.to_string(), handle);
        debug!("💸️ Started reminders for order {order_id}");
        true
    }

    pub fn is_tracking(&self, order_id: &str) -> bool {
        self.lock().contains_key(order_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Stops every reminder task and waits for them to finish. Returns the number of tasks that were running.
    pub async fn drain(&self) -> usize {
        self.token.cancel();
        let handles = self.lock().drain().collect::<Vec<_>>();
        let count = handles.len();
        for (order_id, handle) in handles {
            if let Err(e) = handle.await {
                warn!("💸️ Reminder task for order {order_id} ended abnormally. {e}");
            }
        }
        info!("💸️ Stopped {count} debt reminder tasks");
        count
    }
}
