//! Unit tests for command parsing and dispatch.

use std::collections::BTreeMap;
use std::time::Duration;

use assist_plugins::{
    ChannelError, ManifestStore, PluginRegistry, StartError, Supervisor, SupervisorConfig,
};
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::gpu::{MockGpuInfoProvider, StaticGpuInfo};
use crate::tests::support::{ECHO, PluginRoot};

struct Fixture {
    registry: PluginRegistry,
    gpu: StaticGpuInfo,
    root: PluginRoot,
}

impl Fixture {
    fn handler(&self) -> CommandHandler<'_> {
        CommandHandler::new(&self.registry, &self.gpu)
    }

    fn run(&self, line: &str) -> (CommandOutcome, Flow) {
        self.handler().handle_line(line)
    }
}

#[fixture]
fn fixture() -> Fixture {
    let root = PluginRoot::new();
    let registry = PluginRegistry::new(
        ManifestStore::new(root.path()),
        Supervisor::new(SupervisorConfig::new(
            Duration::from_secs(1),
            Duration::from_secs(2),
        )),
    );
    Fixture {
        registry,
        gpu: StaticGpuInfo::default(),
        root,
    }
}

#[rstest]
#[case::list(r#"{"command":"list_plugins"}"#, RegistryCommand::ListPlugins)]
#[case::gpu(r#"{"command":"get_gpu_info"}"#, RegistryCommand::GetGpuInfo)]
#[case::stop(
    r#"{"command":"stop_plugin","plugin_name":"echo"}"#,
    RegistryCommand::StopPlugin { plugin_name: String::from("echo") }
)]
#[case::invoke_without_params(
    r#"{"command":"invoke_plugin","plugin_name":"echo","function_name":"echo"}"#,
    RegistryCommand::InvokePlugin {
        plugin_name: String::from("echo"),
        function_name: String::from("echo"),
        params: json!({}),
    }
)]
fn commands_parse_from_tagged_json(#[case] line: &str, #[case] expected: RegistryCommand) {
    let parsed: RegistryCommand = serde_json::from_str(line).expect("command parses");
    assert_eq!(parsed, expected);
}

#[rstest]
#[case::unknown(r#"{"command":"reboot"}"#, "unknown command: reboot")]
#[case::missing_field(r#"{"command":"start_plugin"}"#, "missing field `plugin_name`")]
#[case::not_json("list plugins please", "invalid command")]
#[case::untagged(r#"{"plugin_name":"echo"}"#, "invalid command")]
fn bad_lines_yield_failures(fixture: Fixture, #[case] line: &str, #[case] needle: &str) {
    let (outcome, flow) = fixture.run(line);
    assert!(!outcome.success);
    assert_eq!(flow, Flow::Continue);
    let message = outcome.error.expect("failure carries an error");
    assert!(message.contains(needle), "expected '{needle}' in '{message}'");
}

#[rstest]
fn shutdown_ends_the_session(fixture: Fixture) {
    let (outcome, flow) = fixture.run(r#"{"command":"shutdown"}"#);
    assert!(outcome.success);
    assert_eq!(flow, Flow::Stop);
}

#[rstest]
fn list_on_an_empty_root_is_empty(fixture: Fixture) {
    let (outcome, _) = fixture.run(r#"{"command":"list_plugins"}"#);
    assert_eq!(outcome, CommandOutcome::success(json!({"plugins": []})));
}

#[rstest]
fn unknown_plugin_info_is_a_failure(fixture: Fixture) {
    let (outcome, _) = fixture.run(r#"{"command":"get_plugin_info","plugin_name":"ghost"}"#);
    assert!(!outcome.success);
    assert!(outcome.error.is_some_and(|message| message.contains("not found")));
}

#[rstest]
fn gpu_info_comes_from_the_provider(fixture: Fixture) {
    let mut gpu = MockGpuInfoProvider::new();
    gpu.expect_gpu_info()
        .once()
        .returning(|| BTreeMap::from([(String::from("vendor"), json!("Acme"))]));
    let handler = CommandHandler::new(&fixture.registry, &gpu);

    let (outcome, _) = handler.handle(RegistryCommand::GetGpuInfo);
    assert_eq!(outcome, CommandOutcome::success(json!({"vendor": "Acme"})));
}

#[rstest]
fn outcomes_omit_absent_fields() {
    let encoded = serde_json::to_value(CommandOutcome::failure("nope")).expect("encode");
    assert_eq!(encoded, json!({"success": false, "error": "nope"}));
}

#[test]
fn error_chain_appends_hidden_causes() {
    let error = ChannelError::NotRunning {
        name: String::from("echo"),
        source: Some(Box::new(StartError::ExecutableMissing {
            name: String::from("echo"),
            path: None,
        })),
    };
    assert_eq!(
        error_chain(&error),
        "plugin 'echo' is not running: plugin 'echo' executable missing: \
         manifest has no 'executable' entry"
    );
}

#[cfg(unix)]
#[rstest]
fn plugin_lifecycle_through_commands(fixture: Fixture) {
    fixture.root.add_script("echo", ECHO, json!({}));

    let (started, _) = fixture.run(r#"{"command":"start_plugin","plugin_name":"echo"}"#);
    assert!(started.success, "{started:?}");
    let (again, _) = fixture.run(r#"{"command":"start_plugin","plugin_name":"echo"}"#);
    let again_result = again.result.expect("start result");
    assert_eq!(again_result.get("already_running"), Some(&json!(true)));

    let (invoked, _) = fixture.run(
        r#"{"command":"invoke_plugin","plugin_name":"echo","function_name":"echo","params":{"n":7}}"#,
    );
    assert_eq!(
        invoked,
        CommandOutcome::success(json!({"success": true, "echo": {"n": 7}}))
    );

    let (info, _) = fixture.run(r#"{"command":"get_plugin_info","plugin_name":"echo"}"#);
    let info_result = info.result.expect("info result");
    assert_eq!(info_result.get("running"), Some(&json!(true)));

    let (stopped, _) = fixture.run(r#"{"command":"stop_plugin","plugin_name":"echo"}"#);
    let stopped_result = stopped.result.expect("stop result");
    assert_eq!(stopped_result.get("was_running"), Some(&json!(true)));

    let (idle, _) = fixture.run(r#"{"command":"stop_plugin","plugin_name":"echo"}"#);
    let idle_result = idle.result.expect("stop result");
    assert_eq!(idle_result.get("was_running"), Some(&json!(false)));
}

#[cfg(unix)]
#[rstest]
fn undeclared_functions_are_refused(fixture: Fixture) {
    fixture.root.add_script("echo", ECHO, json!({}));

    let (outcome, _) = fixture.run(
        r#"{"command":"invoke_plugin","plugin_name":"echo","function_name":"format_disk"}"#,
    );
    assert!(!outcome.success);
    assert!(
        outcome
            .error
            .is_some_and(|message| message.contains("has no function 'format_disk'"))
    );
}
