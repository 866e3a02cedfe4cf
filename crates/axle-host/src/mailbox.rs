//! Bounded per-plugin invocation queues.
//!
//! Every plugin handle owns one mailbox; the scheduler and the event bus
//! push invocations into it and the handle's runner consumes them one at a
//! time, which is what serializes a plugin's invocations. The queue is
//! bounded: at capacity the oldest entry is dropped in favour of the
//! newest, and at most one scheduled tick is ever pending since ticks
//! carry no payload.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, Notify};

use axle_core::event::Event;

/// One unit of work queued for a plugin.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// A scheduled cycle tick.
    Scheduled,
    /// A delivered event.
    Event(Event),
}

impl Invocation {
    /// Short label for logs.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Event(_) => "event",
        }
    }
}

/// Result of pushing into a mailbox.
#[derive(Debug)]
pub(crate) enum PushOutcome {
    /// The invocation was queued.
    Queued,
    /// A scheduled tick was already pending; this one was skipped.
    Coalesced,
    /// The queue was full; the oldest entry was dropped to make room.
    DroppedOldest(Invocation),
}

#[derive(Debug)]
struct Inner {
    queue: Mutex<VecDeque<Invocation>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
    in_flight: AtomicBool,
}

/// Consumer half of a plugin's invocation queue.
#[derive(Debug)]
pub(crate) struct Mailbox {
    inner: Arc<Inner>,
}

/// Producer half, held by the scheduler and the event bus.
#[derive(Debug, Clone)]
pub(crate) struct MailboxSender {
    inner: Arc<Inner>,
}

impl Mailbox {
    /// Create a mailbox holding at most `capacity` pending invocations.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                notify: Notify::new(),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// A new producer handle.
    pub(crate) fn sender(&self) -> MailboxSender {
        MailboxSender {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Receive the next invocation, waiting until one is queued.
    ///
    /// The popped invocation stays visible through
    /// [`in_flight`](Mailbox::in_flight) until [`finish`](Mailbox::finish)
    /// is called, so the mailbox never looks drained while its consumer
    /// still holds work it has not completed.
    pub(crate) async fn recv(&self) -> Invocation {
        loop {
            // Arm the notification before checking so a push between the
            // check and the await is not lost.
            let notified = self.inner.notify.notified();
            {
                let mut queue = self.inner.queue.lock().await;
                if let Some(invocation) = queue.pop_front() {
                    // Set under the queue lock: no observer can see the
                    // shorter queue without also seeing the in-flight
                    // marker.
                    self.inner.in_flight.store(true, Ordering::SeqCst);
                    return invocation;
                }
            }
            notified.await;
        }
    }

    /// Mark the invocation returned by the last `recv` as finished.
    pub(crate) fn finish(&self) {
        self.inner.in_flight.store(false, Ordering::SeqCst);
    }

    /// Whether a popped invocation has not yet been finished.
    pub(crate) fn in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Number of pending invocations.
    pub(crate) async fn len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Total invocations dropped due to a full queue.
    pub(crate) fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl MailboxSender {
    /// Push an invocation, applying the coalescing and drop-oldest rules.
    pub(crate) async fn push(&self, invocation: Invocation) -> PushOutcome {
        let mut queue = self.inner.queue.lock().await;

        if matches!(invocation, Invocation::Scheduled)
            && queue.iter().any(|i| matches!(i, Invocation::Scheduled))
        {
            return PushOutcome::Coalesced;
        }

        let outcome = if queue.len() >= self.inner.capacity {
            let dropped = queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            queue.push_back(invocation);
            match dropped {
                Some(old) => PushOutcome::DroppedOldest(old),
                None => PushOutcome::Queued,
            }
        } else {
            queue.push_back(invocation);
            PushOutcome::Queued
        };

        drop(queue);
        self.inner.notify.notify_one();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axle_core::event::{EventKind, EventPayload};
    use axle_core::id::PluginId;

    fn make_event(kind: u32) -> Invocation {
        Invocation::Event(Event::new(
            PluginId::new(),
            EventKind(kind),
            EventPayload::new(),
        ))
    }

    fn event_kind(invocation: &Invocation) -> u32 {
        match invocation {
            Invocation::Event(event) => event.kind.0,
            Invocation::Scheduled => panic!("expected event"),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let mailbox = Mailbox::new(8);
        let sender = mailbox.sender();
        sender.push(make_event(1000)).await;
        sender.push(make_event(1001)).await;
        sender.push(make_event(1002)).await;

        assert_eq!(event_kind(&mailbox.recv().await), 1000);
        assert_eq!(event_kind(&mailbox.recv().await), 1001);
        assert_eq!(event_kind(&mailbox.recv().await), 1002);
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let mailbox = Mailbox::new(2);
        let sender = mailbox.sender();
        sender.push(make_event(1000)).await;
        sender.push(make_event(1001)).await;

        let outcome = sender.push(make_event(1002)).await;
        match outcome {
            PushOutcome::DroppedOldest(old) => assert_eq!(event_kind(&old), 1000),
            other => panic!("expected drop, got {other:?}"),
        }

        assert_eq!(event_kind(&mailbox.recv().await), 1001);
        assert_eq!(event_kind(&mailbox.recv().await), 1002);
        assert_eq!(mailbox.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_tick_coalesces() {
        let mailbox = Mailbox::new(8);
        let sender = mailbox.sender();
        sender.push(Invocation::Scheduled).await;
        sender.push(make_event(1000)).await;

        let outcome = sender.push(Invocation::Scheduled).await;
        assert!(matches!(outcome, PushOutcome::Coalesced));
        assert_eq!(mailbox.len().await, 2);

        // After the pending tick is consumed, a new tick queues again.
        assert!(matches!(mailbox.recv().await, Invocation::Scheduled));
        let outcome = sender.push(Invocation::Scheduled).await;
        assert!(matches!(outcome, PushOutcome::Queued));
    }

    #[tokio::test]
    async fn test_popped_invocation_stays_visible_until_finished() {
        let mailbox = Mailbox::new(4);
        let sender = mailbox.sender();
        sender.push(make_event(1000)).await;
        assert!(!mailbox.in_flight());

        // Popping empties the queue but keeps the work visible until the
        // consumer marks it finished.
        let _invocation = mailbox.recv().await;
        assert_eq!(mailbox.len().await, 0);
        assert!(mailbox.in_flight());

        mailbox.finish();
        assert!(!mailbox.in_flight());
    }

    #[tokio::test]
    async fn test_recv_waits_for_push() {
        let mailbox = Mailbox::new(4);
        let sender = mailbox.sender();

        let pusher = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            sender.push(make_event(1000)).await;
        });

        assert_eq!(event_kind(&mailbox.recv().await), 1000);
        pusher.await.expect("pusher task");
    }
}
