//! Shared test helpers for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axle_core::config::AppConfig;
use axle_core::config::document::ConfigDocument;
use axle_core::config::resolver::ConfigResolver;
use axle_plugin_sdk::prelude::*;

/// What a test plugin does on its scheduled entry.
#[derive(Debug, Clone)]
pub enum OnRun {
    /// Return successfully.
    Nothing,
    /// Return an error.
    Fail,
    /// Publish one event with a single-entry payload, then return.
    Publish {
        kind: EventKind,
        key: &'static str,
        value: &'static str,
    },
}

/// One observed invocation of a test plugin.
#[derive(Debug, Clone)]
pub enum Observed {
    Tick,
    Event(Event),
}

/// A plugin that records everything the host does to it.
#[derive(Debug)]
pub struct TestPlugin {
    identity: PluginIdentity,
    on_run: OnRun,
    runs: AtomicU64,
    observed: Mutex<Vec<Observed>>,
}

impl TestPlugin {
    pub fn new(name: &str, on_run: OnRun) -> Arc<Self> {
        Arc::new(Self {
            identity: PluginIdentity::new(PluginId::new(), name),
            on_run,
            runs: AtomicU64::new(0),
            observed: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> PluginId {
        self.identity.id
    }

    /// Scheduled invocations performed so far.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Everything observed so far, in invocation order.
    pub fn log(&self) -> Vec<Observed> {
        self.observed.lock().expect("observed lock").clone()
    }

    /// All received events of `kind`, in delivery order.
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Observed::Event(event) if event.kind == kind => Some(event),
                _ => None,
            })
            .collect()
    }

    fn record(&self, entry: Observed) {
        self.observed.lock().expect("observed lock").push(entry);
    }
}

#[async_trait]
impl Plugin for TestPlugin {
    fn identity(&self) -> PluginIdentity {
        self.identity.clone()
    }

    async fn run(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        self.record(Observed::Tick);
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.on_run {
            OnRun::Nothing => Ok(()),
            OnRun::Fail => anyhow::bail!("test plugin failure"),
            OnRun::Publish { kind, key, value } => {
                ctx.events
                    .publish(*kind, EventPayload::new().with_string(key, value))
                    .await?;
                Ok(())
            }
        }
    }

    async fn run_event(&self, _ctx: &PluginContext, event: &Event) -> anyhow::Result<()> {
        self.record(Observed::Event(event.clone()));
        Ok(())
    }
}

/// Host configuration with fast cycles for tests.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.host.tick_interval_seconds = 1;
    config.host.shutdown_grace_seconds = 1;
    config
}

/// A resolver over an empty section document.
pub fn empty_resolver() -> ConfigResolver {
    ConfigResolver::from_document(ConfigDocument::default())
}

/// Poll `cond` every 10ms until it holds, panicking after 10 seconds.
pub async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
