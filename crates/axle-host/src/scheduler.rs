//! Scheduler — the repeating cycle that ticks every registered plugin.
//!
//! Each cycle enqueues one scheduled invocation per non-disabled handle.
//! Enqueueing is non-blocking, so a slow or stuck plugin delays only its
//! own mailbox and never the cycle or other plugins.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{info, trace};

use crate::handle::HandleState;
use crate::mailbox::Invocation;
use crate::registry::HandleRegistry;

/// Drives the repeating scheduled cycle over all registered handles.
#[derive(Debug)]
pub struct Scheduler {
    /// Registered plugin handles.
    registry: Arc<HandleRegistry>,
    /// Pause between cycles.
    tick_interval: Duration,
}

impl Scheduler {
    /// Create a scheduler over `registry`.
    pub fn new(registry: Arc<HandleRegistry>, tick_interval: Duration) -> Self {
        Self {
            registry,
            tick_interval,
        }
    }

    /// Run cycles until the cancel signal is received.
    ///
    /// The first cycle fires immediately; afterwards the scheduler sleeps
    /// `tick_interval` between cycles.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            "Scheduler started with tick_interval={}s",
            self.tick_interval.as_secs_f64()
        );

        loop {
            self.tick().await;

            tokio::select! {
                changed = cancel.changed() => {
                    match changed {
                        Ok(()) => {
                            if *cancel.borrow() {
                                info!("Scheduler received shutdown signal");
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                _ = time::sleep(self.tick_interval) => {}
            }
        }

        info!("Scheduler stopped");
    }

    /// Enqueue one scheduled invocation per non-disabled handle.
    pub async fn tick(&self) {
        let handles = self.registry.list().await;
        trace!("Scheduling cycle for {} plugins", handles.len());

        for handle in handles {
            if handle.state().await == HandleState::Disabled {
                trace!("Skipping disabled plugin '{}'", handle.name());
                continue;
            }
            handle.enqueue(Invocation::Scheduled).await;
        }
    }
}
