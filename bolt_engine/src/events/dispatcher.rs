//! Bounded ingress queue
//!
//! Inbound chat events are handed to a fixed pool of workers through a bounded queue. Publishing waits at most
//! `accept_timeout` for room in the queue, so a flood of events is pushed back to the sender (as "too many requests")
//! instead of piling up in memory.
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use thiserror::Error;
use tokio::sync::{mpsc, mpsc::error::SendTimeoutError, Mutex};
use tokio_util::sync::CancellationToken;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("The event queue is full")]
    Busy,
    #[error("The event queue has shut down")]
    Closed,
}

pub struct EventDispatcher<E: Send + 'static> {
    name: String,
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
    workers: usize,
    accept_timeout: Duration,
}

impl<E: Send + 'static> EventDispatcher<E> {
    pub fn new(name: &str, queue_size: usize, workers: usize, accept_timeout: Duration, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(queue_size.max(1));
        Self { name: name.to_string(), listener, sender, handler, workers: workers.max(1), accept_timeout }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone(), self.accept_timeout)
    }

    /// Runs the workers until every producer has been dropped or `shutdown` is cancelled. Events in progress are
    /// allowed to finish.
    pub async fn start_workers(self, shutdown: CancellationToken) {
        debug!("📬️ Starting {} {} event workers", self.workers, self.name);
        // drop the internal sender so that the queue closes once the last producer is gone
        drop(self.sender);
        let listener = Arc::new(Mutex::new(self.listener));
        let workers = (0..self.workers)
            .map(|n| {
                let listener = Arc::clone(&listener);
                let handler = Arc::clone(&self.handler);
                let shutdown = shutdown.clone();
                let name = self.name.clone();
                tokio::spawn(async move {
                    loop {
                        let event = {
                            let mut rx = listener.lock().await;
                            tokio::select! {
                                ev = rx.recv() => ev,
                                _ = shutdown.cancelled() => None,
                            }
                        };
                        let Some(event) = event else { break };
                        trace!("📬️ {name} worker {n} handling event");
                        (handler)(event).await;
                    }
                    trace!("📬️ {name} worker {n} stopped");
                })
            })
            .collect::<Vec<_>>();
        for worker in workers {
            if let Err(e) = worker.await {
                warn!("📬️ A {} event worker ended abnormally. {e}", self.name);
            }
        }
        debug!("📬️ {} event workers have shut down", self.name);
    }
}

pub struct EventProducer<E> {
    sender: mpsc::Sender<E>,
    accept_timeout: Duration,
}

impl<E> Clone for EventProducer<E> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone(), accept_timeout: self.accept_timeout }
    }
}

impl<E> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>, accept_timeout: Duration) -> Self {
        Self { sender, accept_timeout }
    }

    /// Queues the event, waiting up to the accept timeout for room.
    pub async fn publish(&self, event: E) -> Result<(), DispatchError> {
        self.sender.send_timeout(event, self.accept_timeout).await.map_err(|e| match e {
            SendTimeoutError::Timeout(_) => {
                warn!("📬️ Event queue is full. Rejecting event");
                DispatchError::Busy
            },
            SendTimeoutError::Closed(_) => {
                error!("📬️ Event queue is closed. Dropping event");
                DispatchError::Closed
            },
        })
    }
}
