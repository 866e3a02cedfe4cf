//! Configuration loading through the host facade.

use std::io::Write;
use std::sync::Arc;

use axle_core::error::ErrorKind;
use axle_host::{Plugin, PluginHost};

use crate::helpers::{OnRun, TestPlugin, test_config};

fn write_document(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tempfile");
    file.write_all(content.as_bytes()).expect("write document");
    file
}

/// A malformed section document fails host construction with a
/// `ConfigLoad` error before any plugin is invoked.
#[tokio::test]
async fn test_malformed_document_fails_startup_without_invoking_plugins() {
    let document = write_document(
        r#"
[[section]]
id = "00000000-0000-0000-0000-000000000000"

[[section.property
key = "unterminated"
"#,
    );

    let plugin = TestPlugin::new("never-run", OnRun::Nothing);
    let mut config = test_config();
    config.host.plugin_config = document.path().to_str().expect("utf8 path").to_string();

    let err = PluginHost::builder(config)
        .plugin(Arc::clone(&plugin) as Arc<dyn Plugin>)
        .build()
        .await
        .expect_err("malformed document");
    assert_eq!(err.kind, ErrorKind::ConfigLoad);
    assert_eq!(plugin.runs(), 0);
}

/// A handle's configuration snapshot is the merged global + own view,
/// with plugin values replacing global values per key.
#[tokio::test]
async fn test_handle_sees_merged_section() {
    let plugin = TestPlugin::new("configured", OnRun::Nothing);
    let document = write_document(&format!(
        r#"
[[section]]
id = "00000000-0000-0000-0000-000000000000"

[[section.property]]
key = "Environment"
values = ["production"]

[[section.property]]
key = "Retries"
values = ["3"]

[[section]]
id = "{}"

[[section.property]]
key = "retries"
values = ["7"]
"#,
        plugin.id()
    ));

    let mut config = test_config();
    config.host.plugin_config = document.path().to_str().expect("utf8 path").to_string();

    let host = PluginHost::builder(config)
        .plugin(Arc::clone(&plugin) as Arc<dyn Plugin>)
        .build()
        .await
        .expect("build");

    let handle = host.handle(plugin.id()).await.expect("handle");
    let section = handle.config();
    assert_eq!(section.value("Environment"), Some("production"));
    assert_eq!(section.values("Retries"), ["7"]);
    assert!(section.values("Absent").is_empty());
}
