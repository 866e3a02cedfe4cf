//! Fault isolation and one-shot runs with the built-in plugins.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axle_host::{Plugin, PluginHost, RunOutcome};
use axle_plugin_sdk::prelude::*;

use plugin_demo::{DEMO_EVENT, DemoPlugin};
use plugin_echo::EchoPlugin;

use crate::helpers::{OnRun, TestPlugin, empty_resolver, test_config, wait_for};

/// A failing plugin records `Failed` and keeps getting scheduled, while a
/// healthy plugin next to it is unaffected.
#[tokio::test]
async fn test_failure_is_isolated_and_not_sticky() {
    let failing = TestPlugin::new("failing", OnRun::Fail);
    let healthy = TestPlugin::new("healthy", OnRun::Nothing);

    let host = PluginHost::builder(test_config())
        .resolver(empty_resolver())
        .plugin(Arc::clone(&failing) as Arc<dyn Plugin>)
        .plugin(Arc::clone(&healthy) as Arc<dyn Plugin>)
        .build()
        .await
        .expect("build");
    host.start().await.expect("start");

    // Two cycles prove the fault was not sticky.
    wait_for("two failing runs", || failing.runs() >= 2).await;
    wait_for("two healthy runs", || healthy.runs() >= 2).await;

    let handle = host.handle(failing.id()).await.expect("handle");
    let last = handle.last_run().await.expect("last run");
    assert!(matches!(last.outcome, RunOutcome::Failed(ref m) if m.contains("test plugin")));

    host.shutdown().await;
}

/// One-shot run of the built-in demo and echo plugins: the demo's
/// deliberate failure shows up in its report, the echo plugin completes,
/// and the demo's published event reached the echo plugin first.
#[tokio::test]
async fn test_run_once_with_builtin_plugins() {
    let mut document = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tempfile");
    document
        .write_all(
            br#"
[[section]]
id = "00000000-0000-0000-0000-000000000000"

[[section.property]]
key = "Environment"
values = ["test"]

[[section]]
id = "84fc7623-0b20-40e1-96bf-8b7f0a5bbd94"

[[section.property]]
key = "SimulateFailure"
values = ["true"]
"#,
        )
        .expect("write document");

    let mut config = test_config();
    config.host.plugin_config = document.path().to_str().expect("utf8 path").to_string();

    let demo = Arc::new(DemoPlugin::new());
    let echo = Arc::new(EchoPlugin::new());
    let host = PluginHost::builder(config)
        .plugin(Arc::clone(&demo) as Arc<dyn Plugin>)
        .plugin(Arc::clone(&echo) as Arc<dyn Plugin>)
        .args(vec!["--from-test".to_string()])
        .build()
        .await
        .expect("build");

    let reports = host
        .run_once(&[], Duration::from_secs(30))
        .await
        .expect("run once");
    assert_eq!(reports.len(), 2);

    for report in &reports {
        match report.name.as_str() {
            "Axle Demo Plugin" => {
                assert!(report.is_failure(), "SimulateFailure was configured");
            }
            "Axle Echo Plugin" => {
                assert_eq!(report.outcome, Some(RunOutcome::Completed));
            }
            other => panic!("unexpected report for {other}"),
        }
    }

    // The demo event (and the demo's own echo of it) arrived during the
    // one-shot window.
    assert!(echo.received_count() >= 1, "echo saw no events");
    assert!(DEMO_EVENT.is_plugin_defined());
}

/// Events queued behind a scheduled tick drain before `run_once` returns,
/// and a selected subset leaves the other plugins untouched.
#[tokio::test]
async fn test_run_once_selected_subset() {
    let wanted = TestPlugin::new(
        "wanted",
        OnRun::Publish {
            kind: EventKind(1100),
            key: "from",
            value: "wanted",
        },
    );
    let bystander = TestPlugin::new("bystander", OnRun::Nothing);

    let host = PluginHost::builder(test_config())
        .resolver(empty_resolver())
        .plugin(Arc::clone(&wanted) as Arc<dyn Plugin>)
        .plugin(Arc::clone(&bystander) as Arc<dyn Plugin>)
        .build()
        .await
        .expect("build");

    let reports = host
        .run_once(&[wanted.id()], Duration::from_secs(30))
        .await
        .expect("run once");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, Some(RunOutcome::Completed));

    // The bystander was never ticked, but still received the event.
    assert_eq!(bystander.runs(), 0);
    let events = bystander.events_of_kind(EventKind(1100));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload.get_string("from"), Some("wanted"));
}
