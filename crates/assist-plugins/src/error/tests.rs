//! Unit tests for plugin error types.

use std::error::Error as _;
use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn executable_missing_without_path_mentions_manifest_entry() {
    let error = StartError::ExecutableMissing {
        name: "weather".into(),
        path: None,
    };
    let message = error.to_string();
    assert!(message.contains("weather"), "missing name: {message}");
    assert!(
        message.contains("no 'executable' entry"),
        "missing detail: {message}"
    );
}

#[test]
fn executable_missing_with_path_shows_resolved_location() {
    let error = StartError::ExecutableMissing {
        name: "weather".into(),
        path: Some(PathBuf::from("/plugins/weather/bin/run")),
    };
    assert!(error.to_string().contains("/plugins/weather/bin/run"));
}

#[test]
fn not_running_exposes_start_failure_as_source() {
    let error = ChannelError::NotRunning {
        name: "weather".into(),
        source: Some(Box::new(StartError::Spawn {
            name: "weather".into(),
            source: Arc::new(std::io::Error::other("permission denied")),
        })),
    };
    let source = error.source().expect("start failure should be the source");
    assert!(source.to_string().contains("permission denied"));
}

#[rstest]
#[case::unknown_function(
    PluginError::from(ChannelError::UnknownFunction {
        name: "weather".into(),
        function: "forecast".into(),
    }),
    "forecast"
)]
#[case::no_reply(
    PluginError::from(ChannelError::NoReply { name: "weather".into() }),
    "sent no reply"
)]
#[case::kill_unconfirmed(
    PluginError::from(StopError::KillUnconfirmed { name: "weather".into(), waited_ms: 5000 }),
    "5000ms"
)]
fn plugin_error_messages_include_detail(#[case] error: PluginError, #[case] needle: &str) {
    let message = error.to_string();
    assert!(message.contains(needle), "expected '{needle}' in: {message}");
}

#[test]
fn plugin_error_is_transparent_over_manifest_errors() {
    let error = PluginError::from(ManifestError::InvalidName {
        name: "../etc".into(),
    });
    assert_eq!(
        error.to_string(),
        "invalid plugin name '../etc': must be a single directory name"
    );
}
