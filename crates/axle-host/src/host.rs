//! The plugin host facade.
//!
//! [`PluginHost`] assembles the configuration resolver output, the event
//! bus, the handle registry, and the scheduler into one unit the binary
//! and the tests drive. Hosts are built through [`PluginHostBuilder`],
//! which resolves each plugin's configuration snapshot and subscribes its
//! mailbox before anything runs; a malformed section document therefore
//! fails the build before any plugin is invoked.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use axle_core::config::AppConfig;
use axle_core::config::resolver::ConfigResolver;
use axle_core::error::HostError;
use axle_core::event::{EventKind, EventPayload};
use axle_core::id::PluginId;
use axle_core::result::HostResult;
use axle_core::traits::{DirectoryLookup, MailSender, SqlRunner};

use crate::bus::EventBus;
use crate::collab::{LoggingMail, StaticDirectory, UnconfiguredSql};
use crate::context::{EventPublisher, PluginContext};
use crate::handle::{HandleState, PluginHandle, RunOutcome};
use crate::mailbox::Invocation;
use crate::plugin::Plugin;
use crate::registry::HandleRegistry;
use crate::scheduler::Scheduler;

/// Per-plugin result of a one-shot run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The plugin's stable id.
    pub id: PluginId,
    /// The plugin's display name.
    pub name: String,
    /// The outcome of the invocation, when one was recorded.
    pub outcome: Option<RunOutcome>,
}

impl RunReport {
    /// Whether this plugin's one-shot invocation failed.
    pub fn is_failure(&self) -> bool {
        self.outcome.as_ref().is_some_and(RunOutcome::is_failure)
    }
}

/// Builder assembling a [`PluginHost`].
pub struct PluginHostBuilder {
    config: AppConfig,
    args: Vec<String>,
    plugins: Vec<Arc<dyn Plugin>>,
    resolver: Option<ConfigResolver>,
    mail: Option<Arc<dyn MailSender>>,
    sql: Option<Arc<dyn SqlRunner>>,
    directory: Option<Arc<dyn DirectoryLookup>>,
}

impl PluginHostBuilder {
    /// Register a plugin with the host.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Command-line arguments made visible to plugins through their
    /// context.
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Use an already-loaded section resolver instead of reading the
    /// document from `[host] plugin_config`.
    pub fn resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Inject a mail collaborator, replacing the logging stand-in.
    pub fn mail(mut self, mail: Arc<dyn MailSender>) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Inject a SQL collaborator, replacing the unconfigured stand-in.
    pub fn sql(mut self, sql: Arc<dyn SqlRunner>) -> Self {
        self.sql = Some(sql);
        self
    }

    /// Inject a directory collaborator, replacing the static stand-in.
    pub fn directory(mut self, directory: Arc<dyn DirectoryLookup>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Resolve configuration, build handles, and subscribe them to the
    /// bus. Nothing is invoked yet.
    ///
    /// Fails with a `ConfigLoad` error when the section document is
    /// malformed, and with a `Registry` error on a duplicate plugin id.
    pub async fn build(self) -> HostResult<PluginHost> {
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => ConfigResolver::load(&self.config.host.plugin_config)?,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let bus = Arc::new(EventBus::new(&self.config.events));
        let registry = Arc::new(HandleRegistry::new());

        let mail: Arc<dyn MailSender> = self
            .mail
            .unwrap_or_else(|| Arc::new(LoggingMail::new(&self.config.smtp)));
        let sql: Arc<dyn SqlRunner> = self
            .sql
            .unwrap_or_else(|| Arc::new(UnconfiguredSql::new(&self.config.sql)));
        let directory: Arc<dyn DirectoryLookup> = self
            .directory
            .unwrap_or_else(|| Arc::new(StaticDirectory::new(&self.config.directory)));

        let args = Arc::new(self.args);
        let grace = Duration::from_secs(self.config.host.shutdown_grace_seconds);

        for plugin in self.plugins {
            let identity = plugin.identity();
            let context = PluginContext {
                identity: identity.clone(),
                config: Arc::new(resolver.resolve(identity.id)),
                args: Arc::clone(&args),
                events: EventPublisher::new(Arc::clone(&bus), identity.id),
                mail: Arc::clone(&mail),
                sql: Arc::clone(&sql),
                directory: Arc::clone(&directory),
                shutdown: shutdown_rx.clone(),
            };
            let handle = Arc::new(PluginHandle::new(
                plugin,
                context,
                self.config.events.queue_capacity,
                grace,
                self.config.host.disable_after_failures,
            ));
            registry.register(Arc::clone(&handle)).await?;
            bus.subscribe(identity.id, &identity.name, handle.mailbox_sender())
                .await;
        }

        info!(plugins = registry.count().await, "Plugin host assembled");

        Ok(PluginHost {
            config: self.config,
            registry,
            bus,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }
}

/// The assembled host: registry, bus, scheduler, and shutdown signal.
pub struct PluginHost {
    config: AppConfig,
    registry: Arc<HandleRegistry>,
    bus: Arc<EventBus>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl PluginHost {
    /// Start building a host for `config`.
    pub fn builder(config: AppConfig) -> PluginHostBuilder {
        PluginHostBuilder {
            config,
            args: Vec::new(),
            plugins: Vec::new(),
            resolver: None,
            mail: None,
            sql: None,
            directory: None,
        }
    }

    /// The host configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The handle registry.
    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    /// The event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The handle for a plugin id, when registered.
    pub async fn handle(&self, id: PluginId) -> Option<Arc<PluginHandle>> {
        self.registry.get(id).await
    }

    /// Resolve a command-line selector to a handle: a full UUID, or a
    /// display name matching exactly one registered plugin.
    pub async fn select(&self, selector: &str) -> HostResult<Arc<PluginHandle>> {
        if let Ok(id) = selector.parse::<PluginId>() {
            return self
                .registry
                .get(id)
                .await
                .ok_or_else(|| HostError::registry(format!("Unknown plugin id {id}")));
        }

        let matches = self.registry.by_name(selector).await;
        match matches.len() {
            0 => Err(HostError::registry(format!(
                "No plugin named '{selector}'"
            ))),
            1 => Ok(matches.into_iter().next().expect("one match")),
            n => Err(HostError::registry(format!(
                "Plugin name '{selector}' is ambiguous ({n} matches); use the id"
            ))),
        }
    }

    /// Enter service mode: spawn one runner task per handle, broadcast
    /// the start event, and start the scheduler cycle.
    pub async fn start(&self) -> HostResult<()> {
        self.spawn_runners().await?;

        // Lifecycle broadcast before the first cycle, so listeners see it
        // ahead of their first tick.
        self.bus
            .publish(PluginId::GLOBAL, EventKind::HOST_STARTED, EventPayload::new())
            .await?;

        let scheduler = Scheduler::new(
            Arc::clone(&self.registry),
            Duration::from_secs(self.config.host.tick_interval_seconds),
        );
        let cancel = self.shutdown_rx.clone();
        let task = tokio::spawn(async move { scheduler.run(cancel).await });
        self.tasks.lock().await.push(task);
        Ok(())
    }

    /// One-shot mode: run each selected plugin's scheduled entry once
    /// (every registered plugin when `selected` is empty), wait up to
    /// `wait` for all queued work to drain, shut down, and report the
    /// per-plugin outcomes.
    pub async fn run_once(
        &self,
        selected: &[PluginId],
        wait: Duration,
    ) -> HostResult<Vec<RunReport>> {
        let mut targets = Vec::with_capacity(selected.len());
        for id in selected {
            let handle = self
                .registry
                .get(*id)
                .await
                .ok_or_else(|| HostError::registry(format!("Unknown plugin id {id}")))?;
            targets.push(handle);
        }
        if targets.is_empty() {
            targets = self.registry.list().await;
        }

        self.spawn_runners().await?;
        for handle in &targets {
            handle.enqueue(Invocation::Scheduled).await;
        }

        let quiesced = self.quiesce(wait).await;
        let mut reports = Vec::with_capacity(targets.len());
        for handle in &targets {
            reports.push(RunReport {
                id: handle.id(),
                name: handle.name().to_string(),
                outcome: handle.last_scheduled_run().await.map(|run| run.outcome),
            });
        }
        self.shutdown().await;
        quiesced?;
        Ok(reports)
    }

    /// Wait until every mailbox is empty and no handle is running.
    ///
    /// The in-flight check closes the handoff window between a runner
    /// popping its mailbox and recording the invocation: a handle whose
    /// queue just drained still counts as busy until the popped
    /// invocation has finished.
    pub async fn quiesce(&self, timeout: Duration) -> HostResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let mut busy = false;
            for handle in self.registry.list().await {
                if handle.pending().await > 0
                    || handle.in_flight()
                    || handle.state().await == HandleState::Running
                {
                    busy = true;
                    break;
                }
            }
            if !busy {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HostError::internal(format!(
                    "Host did not quiesce within {}s",
                    timeout.as_secs_f64()
                )));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Signal shutdown, wait out the grace period, and abort stragglers.
    ///
    /// Safe to call more than once; later calls only re-await remaining
    /// tasks.
    pub async fn shutdown(&self) {
        info!("Shutting down plugin host");

        // Best-effort lifecycle broadcast; idle plugins may still observe
        // it before their runner stops.
        if let Err(error) = self
            .bus
            .publish(PluginId::GLOBAL, EventKind::HOST_STOPPING, EventPayload::new())
            .await
        {
            debug!(error = %error, "Stop broadcast not delivered");
        }

        let _ = self.shutdown_tx.send(true);

        let grace = Duration::from_secs(self.config.host.shutdown_grace_seconds);
        let deadline = grace + Duration::from_secs(1);
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for mut task in tasks {
            if tokio::time::timeout(deadline, &mut task).await.is_err() {
                warn!("Task did not stop within the grace period, aborting");
                task.abort();
            }
        }

        info!("Plugin host stopped");
    }

    /// Spawn the runner task for every registered handle. Runs once per
    /// host lifetime; `start` and `run_once` must not both drive the same
    /// host.
    async fn spawn_runners(&self) -> HostResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(HostError::internal("Plugin host is already running"));
        }
        let mut tasks = self.tasks.lock().await;
        for handle in self.registry.list().await {
            tasks.push(tokio::spawn(handle.run()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use async_trait::async_trait;

    use axle_core::config::document::ConfigDocument;
    use axle_core::error::ErrorKind;

    use super::*;
    use crate::plugin::PluginIdentity;

    #[derive(Debug)]
    struct CountingPlugin {
        identity: PluginIdentity,
        fail: bool,
        runs: AtomicU64,
    }

    impl CountingPlugin {
        fn new(name: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                identity: PluginIdentity::new(PluginId::new(), name),
                fail,
                runs: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl Plugin for CountingPlugin {
        fn identity(&self) -> PluginIdentity {
            self.identity.clone()
        }

        async fn run(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("one-shot failure");
            }
            Ok(())
        }
    }

    fn empty_resolver() -> ConfigResolver {
        ConfigResolver::from_document(ConfigDocument::default())
    }

    fn short_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.host.tick_interval_seconds = 1;
        config.host.shutdown_grace_seconds = 1;
        config
    }

    #[tokio::test]
    async fn test_duplicate_plugin_id_fails_build() {
        let id = PluginId::new();
        let first = Arc::new(CountingPlugin {
            identity: PluginIdentity::new(id, "first"),
            fail: false,
            runs: AtomicU64::new(0),
        });
        let second = Arc::new(CountingPlugin {
            identity: PluginIdentity::new(id, "second"),
            fail: false,
            runs: AtomicU64::new(0),
        });

        let err = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(first)
            .plugin(second)
            .build()
            .await
            .expect_err("duplicate id");
        assert_eq!(err.kind, ErrorKind::Registry);
    }

    #[tokio::test]
    async fn test_missing_section_document_fails_build() {
        let mut config = short_config();
        config.host.plugin_config = "does/not/exist.toml".to_string();

        let err = PluginHost::builder(config)
            .plugin(CountingPlugin::new("demo", false))
            .build()
            .await
            .expect_err("missing document");
        assert_eq!(err.kind, ErrorKind::ConfigLoad);
    }

    #[tokio::test]
    async fn test_run_once_reports_outcomes() {
        let healthy = CountingPlugin::new("healthy", false);
        let failing = CountingPlugin::new("failing", true);
        let host = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(Arc::clone(&healthy) as Arc<dyn Plugin>)
            .plugin(Arc::clone(&failing) as Arc<dyn Plugin>)
            .build()
            .await
            .expect("build");

        let reports = host
            .run_once(&[], Duration::from_secs(5))
            .await
            .expect("run once");
        assert_eq!(reports.len(), 2);
        assert_eq!(healthy.runs.load(Ordering::SeqCst), 1);
        assert_eq!(failing.runs.load(Ordering::SeqCst), 1);

        for report in &reports {
            match report.name.as_str() {
                "healthy" => {
                    assert!(!report.is_failure());
                    assert_eq!(report.outcome, Some(RunOutcome::Completed));
                }
                "failing" => assert!(report.is_failure()),
                other => panic!("unexpected report for {other}"),
            }
        }
    }

    #[derive(Debug)]
    struct YieldingPlugin {
        identity: PluginIdentity,
    }

    #[async_trait]
    impl Plugin for YieldingPlugin {
        fn identity(&self) -> PluginIdentity {
            self.identity.clone()
        }

        async fn run(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
            // Hand the executor back immediately so the drain check races
            // the invocation handoff as closely as possible.
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_once_never_misses_an_invocation_in_handoff() {
        for _ in 0..20 {
            let plugin = Arc::new(YieldingPlugin {
                identity: PluginIdentity::new(PluginId::new(), "yielder"),
            });
            let host = PluginHost::builder(short_config())
                .resolver(empty_resolver())
                .plugin(Arc::clone(&plugin) as Arc<dyn Plugin>)
                .build()
                .await
                .expect("build");

            let reports = host
                .run_once(&[], Duration::from_secs(5))
                .await
                .expect("run once");
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].outcome, Some(RunOutcome::Completed));
        }
    }

    #[tokio::test]
    async fn test_run_once_selects_only_named_plugins() {
        let wanted = CountingPlugin::new("wanted", false);
        let other = CountingPlugin::new("other", false);
        let host = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(Arc::clone(&wanted) as Arc<dyn Plugin>)
            .plugin(Arc::clone(&other) as Arc<dyn Plugin>)
            .build()
            .await
            .expect("build");

        let reports = host
            .run_once(&[wanted.identity.id], Duration::from_secs(5))
            .await
            .expect("run once");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, wanted.identity.id);
        assert_eq!(wanted.runs.load(Ordering::SeqCst), 1);
        assert_eq!(other.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_once_unknown_id_fails() {
        let host = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(CountingPlugin::new("demo", false))
            .build()
            .await
            .expect("build");

        let err = host
            .run_once(&[PluginId::new()], Duration::from_secs(1))
            .await
            .expect_err("unknown id");
        assert_eq!(err.kind, ErrorKind::Registry);
    }

    #[tokio::test]
    async fn test_service_mode_ticks_and_shuts_down() {
        let plugin = CountingPlugin::new("cycling", false);
        let host = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(Arc::clone(&plugin) as Arc<dyn Plugin>)
            .build()
            .await
            .expect("build");

        host.start().await.expect("start");
        for _ in 0..200 {
            if plugin.runs.load(Ordering::SeqCst) >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(plugin.runs.load(Ordering::SeqCst) >= 1, "no tick observed");

        host.shutdown().await;
        let after = plugin.runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(plugin.runs.load(Ordering::SeqCst), after, "still ticking");
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let host = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(CountingPlugin::new("demo", false))
            .build()
            .await
            .expect("build");

        host.start().await.expect("start");
        let err = host.start().await.expect_err("second start");
        assert_eq!(err.kind, ErrorKind::Internal);
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_select_by_id_and_name() {
        let plugin = CountingPlugin::new("selectable", false);
        let host = PluginHost::builder(short_config())
            .resolver(empty_resolver())
            .plugin(Arc::clone(&plugin) as Arc<dyn Plugin>)
            .build()
            .await
            .expect("build");

        let by_id = host
            .select(&plugin.identity.id.to_string())
            .await
            .expect("by id");
        assert_eq!(by_id.id(), plugin.identity.id);

        let by_name = host.select("SELECTABLE").await.expect("by name");
        assert_eq!(by_name.id(), plugin.identity.id);

        let err = host.select("nope").await.expect_err("unknown name");
        assert_eq!(err.kind, ErrorKind::Registry);
    }
}
