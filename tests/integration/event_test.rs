//! Cross-plugin event delivery through a running host.

use std::sync::Arc;

use axle_host::{Plugin, PluginHost};
use axle_plugin_sdk::prelude::*;

use crate::helpers::{Observed, OnRun, TestPlugin, empty_resolver, test_config, wait_for};

/// Plugin A publishes kind 42 with `{"k":"v"}`; plugin B receives it with
/// the right sender, kind, and payload, and before its own next tick.
/// Kind 42 sits in the host-reserved range, so this also exercises the
/// default warn-and-deliver policy.
#[tokio::test]
async fn test_publish_reaches_other_plugin_before_next_tick() {
    let publisher = TestPlugin::new(
        "publisher",
        OnRun::Publish {
            kind: EventKind(42),
            key: "k",
            value: "v",
        },
    );
    let listener = TestPlugin::new("listener", OnRun::Nothing);

    let host = PluginHost::builder(test_config())
        .resolver(empty_resolver())
        .plugin(Arc::clone(&publisher) as Arc<dyn Plugin>)
        .plugin(Arc::clone(&listener) as Arc<dyn Plugin>)
        .build()
        .await
        .expect("build");
    host.start().await.expect("start");

    wait_for("listener to receive the event", || {
        !listener.events_of_kind(EventKind(42)).is_empty()
    })
    .await;
    host.shutdown().await;

    let events = listener.events_of_kind(EventKind(42));
    let event = &events[0];
    assert_eq!(event.sender, publisher.id());
    assert_eq!(event.kind, EventKind(42));
    assert_eq!(event.payload.get_string("k"), Some("v"));
    assert_eq!(event.payload.len(), 1);

    // The event was delivered before the listener's second tick.
    let log = listener.log();
    let event_pos = log
        .iter()
        .position(|entry| matches!(entry, Observed::Event(e) if e.kind == EventKind(42)))
        .expect("event observed");
    let ticks_before = log[..event_pos]
        .iter()
        .filter(|entry| matches!(entry, Observed::Tick))
        .count();
    assert!(
        ticks_before <= 1,
        "event arrived only after tick {ticks_before}"
    );
}

/// The default delivery policy includes the sender in the fanout.
#[tokio::test]
async fn test_sender_receives_its_own_event_by_default() {
    let publisher = TestPlugin::new(
        "publisher",
        OnRun::Publish {
            kind: EventKind(1042),
            key: "source",
            value: "self",
        },
    );

    let host = PluginHost::builder(test_config())
        .resolver(empty_resolver())
        .plugin(Arc::clone(&publisher) as Arc<dyn Plugin>)
        .build()
        .await
        .expect("build");
    host.start().await.expect("start");

    wait_for("publisher to hear itself", || {
        !publisher.events_of_kind(EventKind(1042)).is_empty()
    })
    .await;
    host.shutdown().await;

    let event = &publisher.events_of_kind(EventKind(1042))[0];
    assert_eq!(event.sender, publisher.id());
    assert_eq!(event.payload.get_string("source"), Some("self"));
}

/// Every plugin sees the host lifecycle broadcast ahead of its first tick.
#[tokio::test]
async fn test_host_started_broadcast_precedes_first_tick() {
    let listener = TestPlugin::new("listener", OnRun::Nothing);

    let host = PluginHost::builder(test_config())
        .resolver(empty_resolver())
        .plugin(Arc::clone(&listener) as Arc<dyn Plugin>)
        .build()
        .await
        .expect("build");
    host.start().await.expect("start");

    wait_for("first tick", || listener.runs() >= 1).await;
    host.shutdown().await;

    let log = listener.log();
    let started_pos = log
        .iter()
        .position(|entry| {
            matches!(entry, Observed::Event(e) if e.kind == EventKind::HOST_STARTED)
        })
        .expect("start broadcast observed");
    let first_tick = log
        .iter()
        .position(|entry| matches!(entry, Observed::Tick))
        .expect("tick observed");
    assert!(started_pos < first_tick);

    let Observed::Event(event) = &log[started_pos] else {
        unreachable!()
    };
    assert!(event.is_host_event());
}
