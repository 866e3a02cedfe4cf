//! In-process event bus.
//!
//! Plugins publish typed events; the bus stamps an envelope and fans it
//! out into every subscribed plugin's mailbox. Delivery is at-least-once
//! into the mailbox; a failing handler is never redelivered. Because each
//! publisher runs on a single task and fanout enqueues synchronously,
//! events from one sender arrive at every subscriber in publish order.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use axle_core::config::{EventConfig, ReservedRangePolicy};
use axle_core::error::HostError;
use axle_core::event::{Event, EventKind, EventPayload};
use axle_core::id::PluginId;
use axle_core::result::HostResult;

use crate::mailbox::{Invocation, MailboxSender, PushOutcome};

#[derive(Debug)]
struct Subscriber {
    name: String,
    sender: MailboxSender,
}

/// Routes published events into subscriber mailboxes.
#[derive(Debug)]
pub struct EventBus {
    subscribers: RwLock<HashMap<PluginId, Subscriber>>,
    deliver_to_sender: bool,
    reserved_range: ReservedRangePolicy,
}

impl EventBus {
    /// Create a bus with the configured delivery policies.
    pub fn new(config: &EventConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            deliver_to_sender: config.deliver_to_sender,
            reserved_range: config.reserved_range,
        }
    }

    /// Subscribe a plugin's mailbox to all published events.
    pub(crate) async fn subscribe(&self, id: PluginId, name: &str, sender: MailboxSender) {
        debug!(plugin = %name, plugin_id = %id, "Subscribed plugin to event bus");
        self.subscribers.write().await.insert(
            id,
            Subscriber {
                name: name.to_string(),
                sender,
            },
        );
    }

    /// Remove a plugin's subscription.
    pub async fn unsubscribe(&self, id: PluginId) {
        self.subscribers.write().await.remove(&id);
    }

    /// Number of subscribed plugins.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Publish an event and fan it out to subscriber mailboxes.
    ///
    /// `sender` is [`PluginId::GLOBAL`] for host lifecycle broadcasts,
    /// which may use the reserved kind range. A plugin publishing a
    /// reserved kind triggers the configured policy: warn and deliver, or
    /// refuse with an `EventRange` error before anything is delivered.
    ///
    /// Returns the number of mailboxes the event entered.
    pub async fn publish(
        &self,
        sender: PluginId,
        kind: EventKind,
        payload: EventPayload,
    ) -> HostResult<usize> {
        if kind.is_host_reserved() && !sender.is_global() {
            match self.reserved_range {
                ReservedRangePolicy::Warn => {
                    warn!(
                        sender = %sender,
                        kind = %kind,
                        "Plugin published event kind in the host-reserved range (below {})",
                        EventKind::FIRST_PLUGIN
                    );
                }
                ReservedRangePolicy::Reject => {
                    return Err(HostError::event_range(format!(
                        "Event kind {kind} is host-reserved (plugin kinds start at {})",
                        EventKind::FIRST_PLUGIN
                    )));
                }
            }
        }

        let event = Event::new(sender, kind, payload);
        let subscribers = self.subscribers.read().await;
        let mut delivered = 0usize;

        for (id, subscriber) in subscribers.iter() {
            if !self.deliver_to_sender && *id == sender {
                continue;
            }

            let outcome = subscriber
                .sender
                .push(Invocation::Event(event.clone()))
                .await;
            if let PushOutcome::DroppedOldest(old) = outcome {
                warn!(
                    plugin = %subscriber.name,
                    event_id = %event.id,
                    dropped = old.kind_label(),
                    "Invocation queue full, dropped oldest entry to deliver event"
                );
            }
            delivered += 1;
        }

        debug!(
            sender = %sender,
            kind = %kind,
            event_id = %event.id,
            delivered,
            "Event published"
        );
        Ok(delivered)
    }
}
