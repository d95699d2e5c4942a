//! Shell-script plugins written into a temporary plugin root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;

/// Replies to every request with `{"success":true,"echo":<properties>}`.
pub(crate) const ECHO: &str = r##"while IFS= read -r line; do
  props=$(printf '%s\n' "$line" | sed -n 's/^{"tool_calls":\[{"func":"[^"]*","properties":\(.*\)}\]}$/\1/p')
  printf '{"success":true,"echo":%s}\n' "$props"
done"##;

/// Replies with two progress frames and a terminal frame.
pub(crate) const STREAMING: &str = r#"while IFS= read -r line; do
  printf '{"message":"a"}\n{"message":"b"}\n{"success":true}<<END>>'
done"#;

/// Replies with text that is not JSON.
pub(crate) const MALFORMED: &str = r"while IFS= read -r line; do
  echo 'this is not json'
done";

/// Reads one request and exits without replying.
pub(crate) const SILENT: &str = "read -r line\nexit 0";

/// Answers every request with an empty line.
pub(crate) const BLANK: &str = r"while IFS= read -r line; do
  printf '\n'
done";

/// Ignores SIGTERM and never reads stdin.
pub(crate) const STUBBORN: &str = "trap '' TERM\nwhile :; do sleep 1; done";

/// Exits immediately with status 3.
pub(crate) const EXITS: &str = "exit 3";

/// Takes a second to answer each request.
pub(crate) const SLOW: &str = r#"while IFS= read -r line; do
  sleep 1
  printf '{"success":true}\n'
done"#;

/// Replies with its working directory.
pub(crate) const PWD: &str = r#"while IFS= read -r line; do
  printf '{"cwd":"%s"}\n' "$(pwd)"
done"#;

/// Executable name used for script plugins.
pub(crate) const SCRIPT: &str = "run.sh";

/// Temporary plugin root.
pub(crate) struct PluginRoot {
    dir: TempDir,
}

impl PluginRoot {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temporary plugin root"),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn plugin_dir(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Writes `manifest` verbatim for `name`.
    pub(crate) fn add_manifest(&self, name: &str, manifest: &Value) -> PathBuf {
        let dir = self.plugin_dir(name);
        fs::create_dir_all(&dir).expect("create plugin dir");
        let text = serde_json::to_string_pretty(manifest).expect("encode manifest");
        fs::write(dir.join("manifest.json"), text).expect("write manifest");
        dir
    }

    /// Writes an executable `/bin/sh` plugin and a manifest pointing at it.
    ///
    /// `extra` keys are merged into the manifest.
    pub(crate) fn add_script(&self, name: &str, body: &str, extra: Value) -> PathBuf {
        let mut manifest = json!({
            "executable": SCRIPT,
            "description": format!("{name} test plugin"),
            "functions": [{"name": "echo"}, {"name": "stream"}, {"name": "ping"}],
        });
        if let (Some(target), Value::Object(overrides)) = (manifest.as_object_mut(), extra) {
            target.extend(overrides);
        }
        let dir = self.add_manifest(name, &manifest);
        write_executable(&dir.join(SCRIPT), &format!("#!/bin/sh\n{body}\n"));
        dir
    }
}

#[cfg(unix)]
pub(crate) fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, contents).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

#[cfg(not(unix))]
pub(crate) fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write script");
}

/// Polls `condition` until it holds or `timeout` elapses.
pub(crate) fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}
