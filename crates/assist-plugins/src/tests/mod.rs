//! Crate-level integration and BDD tests.

pub(crate) mod support;


#[cfg(unix)]
mod lifecycle {
    use std::time::Duration;

    use serde_json::json;

    use super::support::{self, PluginRoot};
    use crate::{ManifestStore, PluginRegistry, ProcessState, Supervisor, SupervisorConfig};

    #[test]
    fn manifest_to_reply_to_shutdown() {
        let root = PluginRoot::new();
        root.add_script("echo", support::ECHO, json!({"persistent": true}));
        root.add_script("stream", support::STREAMING, json!({}));
        let registry = PluginRegistry::new(
            ManifestStore::new(root.path()),
            Supervisor::new(SupervisorConfig::new(
                Duration::from_millis(300),
                Duration::from_secs(2),
            )),
        );

        let autostart = registry.start_persistent();
        assert_eq!(autostart.started, vec!["echo"]);
        assert_eq!(
            registry.supervisor().state("echo"),
            Some(ProcessState::Running)
        );

        let echoed = registry
            .invoke("echo", "echo", json!({"word": "ping"}))
            .expect("echo reply");
        assert_eq!(echoed, json!({"success": true, "echo": {"word": "ping"}}));

        let streamed = registry
            .invoke_streaming("stream", "stream", json!({}))
            .expect("streamed reply");
        assert_eq!(streamed.len(), 3);
        assert_eq!(registry.running(), vec!["echo", "stream"]);

        let report = registry.shutdown_all();
        assert!(report.is_clean());
        assert!(registry.running().is_empty());
    }
}
