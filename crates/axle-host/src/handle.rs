//! Plugin handles: per-plugin state, statistics, and the runner task.
//!
//! A handle wraps one plugin instance together with its context, its
//! invocation mailbox, and its run statistics. The handle's runner task is
//! the only consumer of the mailbox, so invocations of one plugin are
//! strictly serialized while different plugins run independently.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{Instrument, debug, error, info_span, trace, warn};

use axle_core::config::resolver::ConfigSection;
use axle_core::id::PluginId;

use crate::context::PluginContext;
use crate::mailbox::{Invocation, Mailbox, MailboxSender, PushOutcome};
use crate::plugin::{Plugin, PluginIdentity};

/// Lifecycle state of a plugin handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// Ready for the next invocation.
    Idle,
    /// An invocation is in flight.
    Running,
    /// The last invocation failed. Not sticky: the next invocation starts
    /// normally.
    Faulted,
    /// Disabled after too many consecutive failures. Invocations are
    /// dropped until the host restarts.
    Disabled,
}

impl HandleState {
    /// The string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Faulted => "faulted",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The invocation returned successfully.
    Completed,
    /// The invocation returned an error or panicked.
    Failed(String),
    /// The invocation was terminated during shutdown after the grace
    /// period expired.
    Cancelled,
}

impl RunOutcome {
    /// Whether this outcome counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed(message) => write!(f, "failed: {message}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Record of the most recent invocation.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    /// When the invocation started.
    pub at: DateTime<Utc>,
    /// How it ended.
    pub outcome: RunOutcome,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Point-in-time view of a handle, for listings and reports.
#[derive(Debug, Clone, Serialize)]
pub struct HandleSnapshot {
    /// The plugin's stable id.
    pub id: PluginId,
    /// The plugin's display name.
    pub name: String,
    /// Current lifecycle state.
    pub state: HandleState,
    /// Total invocations performed.
    pub invocations: u64,
    /// Invocations currently queued.
    pub queued: usize,
    /// Invocations dropped due to a full queue.
    pub dropped: u64,
    /// The most recent invocation, if any.
    pub last_run: Option<LastRun>,
}

/// One registered plugin with its execution state.
pub struct PluginHandle {
    identity: PluginIdentity,
    plugin: Arc<dyn Plugin>,
    context: PluginContext,
    mailbox: Mailbox,
    sender: MailboxSender,
    state: RwLock<HandleState>,
    last_run: RwLock<Option<LastRun>>,
    last_scheduled: RwLock<Option<LastRun>>,
    invocations: AtomicU64,
    consecutive_failures: AtomicU32,
    grace: Duration,
    disable_after: Option<u32>,
    shutdown: watch::Receiver<bool>,
}

impl PluginHandle {
    /// Build a handle for `plugin` with its resolved context.
    pub(crate) fn new(
        plugin: Arc<dyn Plugin>,
        context: PluginContext,
        queue_capacity: usize,
        grace: Duration,
        disable_after: Option<u32>,
    ) -> Self {
        let identity = plugin.identity();
        let mailbox = Mailbox::new(queue_capacity);
        let sender = mailbox.sender();
        let shutdown = context.shutdown.clone();
        Self {
            identity,
            plugin,
            context,
            mailbox,
            sender,
            state: RwLock::new(HandleState::Idle),
            last_run: RwLock::new(None),
            last_scheduled: RwLock::new(None),
            invocations: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
            grace,
            disable_after,
            shutdown,
        }
    }

    /// The plugin's identity.
    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    /// The plugin's stable id.
    pub fn id(&self) -> PluginId {
        self.identity.id
    }

    /// The plugin's display name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// The configuration snapshot this plugin runs with.
    pub fn config(&self) -> &ConfigSection {
        &self.context.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> HandleState {
        *self.state.read().await
    }

    /// The most recent invocation record, scheduled or event.
    pub async fn last_run(&self) -> Option<LastRun> {
        self.last_run.read().await.clone()
    }

    /// The most recent *scheduled* invocation record. Event deliveries do
    /// not touch this, so a one-shot run reports the scheduled outcome
    /// even when events drain afterwards.
    pub async fn last_scheduled_run(&self) -> Option<LastRun> {
        self.last_scheduled.read().await.clone()
    }

    /// Total invocations performed so far.
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Point-in-time view of this handle.
    pub async fn snapshot(&self) -> HandleSnapshot {
        HandleSnapshot {
            id: self.identity.id,
            name: self.identity.name.clone(),
            state: self.state().await,
            invocations: self.invocation_count(),
            queued: self.mailbox.len().await,
            dropped: self.mailbox.dropped_count(),
            last_run: self.last_run().await,
        }
    }

    /// Number of invocations waiting in the mailbox.
    pub(crate) async fn pending(&self) -> usize {
        self.mailbox.len().await
    }

    /// Whether the runner has popped an invocation it has not finished.
    /// Covers the window between the mailbox pop and the `Running` state
    /// write, so drain checks cannot miss an invocation mid-handoff.
    pub(crate) fn in_flight(&self) -> bool {
        self.mailbox.in_flight()
    }

    /// A producer handle for this plugin's mailbox.
    pub(crate) fn mailbox_sender(&self) -> MailboxSender {
        self.sender.clone()
    }

    /// Queue an invocation, logging queue-full drops.
    pub(crate) async fn enqueue(&self, invocation: Invocation) {
        let label = invocation.kind_label();
        match self.sender.push(invocation).await {
            PushOutcome::Queued => {}
            PushOutcome::Coalesced => {
                trace!(
                    plugin = %self.identity.name,
                    "Scheduled tick already pending, skipping"
                );
            }
            PushOutcome::DroppedOldest(old) => {
                warn!(
                    plugin = %self.identity.name,
                    queued = label,
                    dropped = old.kind_label(),
                    "Invocation queue full, dropped oldest entry"
                );
            }
        }
    }

    /// The runner task: consume the mailbox until shutdown.
    pub(crate) async fn run(self: Arc<Self>) {
        let mut cancel = self.shutdown.clone();
        debug!(plugin = %self.identity.name, "Plugin runner started");

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    match changed {
                        Ok(()) => {
                            if *cancel.borrow() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                invocation = self.mailbox.recv() => {
                    self.invoke(invocation).await;
                    self.mailbox.finish();
                }
            }
        }

        debug!(plugin = %self.identity.name, "Plugin runner stopped");
    }

    /// Perform one invocation and record its outcome.
    async fn invoke(&self, invocation: Invocation) {
        if self.state().await == HandleState::Disabled {
            debug!(
                plugin = %self.identity.name,
                kind = invocation.kind_label(),
                "Plugin is disabled, dropping invocation"
            );
            return;
        }

        // Faulted is not sticky; every invocation starts from Running.
        *self.state.write().await = HandleState::Running;
        let seq = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        let label = invocation.kind_label();
        let scheduled = matches!(invocation, Invocation::Scheduled);
        let started_at = Utc::now();
        let started = Instant::now();

        trace!(
            plugin = %self.identity.name,
            kind = label,
            seq,
            "Invocation starting"
        );

        let span = info_span!(
            "invocation",
            plugin = %self.identity.name,
            plugin_id = %self.identity.id,
            kind = label,
            seq
        );
        let outcome = self.drive(invocation).instrument(span).await;
        let duration = started.elapsed();

        let next_state = match &outcome {
            RunOutcome::Completed => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                debug!(
                    plugin = %self.identity.name,
                    kind = label,
                    seq,
                    duration_ms = duration.as_millis() as u64,
                    "Invocation completed"
                );
                HandleState::Idle
            }
            RunOutcome::Failed(message) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    plugin = %self.identity.name,
                    kind = label,
                    seq,
                    consecutive_failures = failures,
                    error = %message,
                    "Invocation failed"
                );
                if self.disable_after.is_some_and(|limit| failures >= limit) {
                    warn!(
                        plugin = %self.identity.name,
                        failures,
                        "Failure threshold reached, disabling plugin"
                    );
                    HandleState::Disabled
                } else {
                    HandleState::Faulted
                }
            }
            RunOutcome::Cancelled => {
                warn!(
                    plugin = %self.identity.name,
                    kind = label,
                    seq,
                    "Invocation did not stop within the shutdown grace period, terminated"
                );
                HandleState::Idle
            }
        };

        let record = LastRun {
            at: started_at,
            outcome,
            duration_ms: duration.as_millis() as u64,
        };
        if scheduled {
            *self.last_scheduled.write().await = Some(record.clone());
        }
        *self.last_run.write().await = Some(record);
        *self.state.write().await = next_state;
    }

    /// Drive the plugin entry point, capturing errors and panics, bounded
    /// by the shutdown grace period.
    async fn drive(&self, invocation: Invocation) -> RunOutcome {
        let entry = async {
            match &invocation {
                Invocation::Scheduled => self.plugin.run(&self.context).await,
                Invocation::Event(event) => self.plugin.run_event(&self.context, event).await,
            }
        };
        let entry = AssertUnwindSafe(entry).catch_unwind();
        tokio::pin!(entry);

        let result = tokio::select! {
            result = &mut entry => Some(result),
            () = self.cancel_deadline() => None,
        };

        match result {
            None => RunOutcome::Cancelled,
            Some(Ok(Ok(()))) => RunOutcome::Completed,
            Some(Ok(Err(error))) => RunOutcome::Failed(format!("{error:#}")),
            Some(Err(panic)) => RunOutcome::Failed(panic_message(panic)),
        }
    }

    /// Resolves once shutdown has been signalled and the grace period has
    /// elapsed. Pending forever during normal operation.
    async fn cancel_deadline(&self) {
        let mut rx = self.shutdown.clone();
        let _ = rx.wait_for(|stop| *stop).await;
        tokio::time::sleep(self.grace).await;
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("identity", &self.identity)
            .field("invocations", &self.invocation_count())
            .finish()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}
