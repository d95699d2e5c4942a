//! Unit and behavioural tests for the echo plugin.


use std::io::Cursor;

use assist_plugins::protocol::{CommandEnvelope, FrameReader};
use rstest::rstest;
use serde_json::{Value, json};

use crate::{Command, Reply, handle_line, run};

fn request(func: &str, properties: Value) -> String {
    CommandEnvelope::single(func, properties)
        .to_line()
        .expect("serialise request")
}

fn serve(lines: &[String]) -> Vec<(Value, bool)> {
    let input = lines.iter().map(|line| format!("{line}\n")).collect::<String>();
    let mut stdin = Cursor::new(input.into_bytes());
    let mut stdout = Vec::new();
    run(&mut stdin, &mut stdout).expect("serve loop succeeds");

    FrameReader::new(stdout.as_slice())
        .map(|item| {
            let frame = item.expect("in-memory read");
            let value = serde_json::from_str(&frame.payload).expect("reply is JSON");
            (value, frame.terminal)
        })
        .collect()
}

#[test]
fn echo_returns_properties() {
    let response = handle_line(&request("echo", json!({"a": 1})));
    assert!(response.progress.is_empty());
    assert!(!response.stop);
    assert_eq!(response.last.echo, Some(json!({"a": 1})));
    assert!(response.last.success);
}

#[rstest]
#[case::default_count(json!({}), 3, "tick 1")]
#[case::explicit(json!({"count": 2, "text": "step"}), 2, "step 1")]
#[case::none(json!({"count": 0}), 0, "")]
fn stream_emits_progress_frames(
    #[case] properties: Value,
    #[case] expected: usize,
    #[case] first: &str,
) {
    let response = handle_line(&request("stream", properties));
    assert_eq!(response.progress.len(), expected);
    if let Some(frame) = response.progress.first() {
        assert_eq!(frame.message, first);
    }
    assert!(response.last.success);
}

#[rstest]
#[case::negative(json!({"count": -1}))]
#[case::text(json!({"count": "many"}))]
#[case::too_many(json!({"count": 1000}))]
fn stream_rejects_bad_counts(#[case] properties: Value) {
    let response = handle_line(&request("stream", properties));
    assert!(!response.last.success);
    assert!(response.last.message.contains("count"));
}

#[rstest]
#[case::not_json("hello there", "invalid request")]
#[case::no_calls(r#"{"tool_calls":[]}"#, "no tool calls")]
#[case::unknown(r#"{"tool_calls":[{"func":"fly","properties":{}}]}"#, "unknown function 'fly'")]
fn bad_requests_get_failure_replies(#[case] line: &str, #[case] needle: &str) {
    let response = handle_line(line);
    assert!(!response.last.success);
    assert!(
        response.last.message.contains(needle),
        "expected '{needle}' in '{}'",
        response.last.message
    );
}

#[test]
fn shutdown_stops_serving() {
    let replies = serve(&[
        request("shutdown", json!({})),
        request("echo", json!({"never": "answered"})),
    ]);
    assert_eq!(replies.len(), 1);
    let (reply, terminal) = replies.first().expect("one reply");
    assert!(terminal);
    assert_eq!(reply.get("message"), Some(&json!("shutting down")));
}

#[test]
fn every_reply_ends_with_a_terminal_frame() {
    let replies = serve(&[
        request("echo", json!({"n": 1})),
        request("stream", json!({"count": 2})),
    ]);
    let terminal: Vec<bool> = replies.iter().map(|(_, terminal)| *terminal).collect();
    assert_eq!(terminal, vec![true, false, false, true]);
}

#[test]
fn quoted_end_marker_stays_inside_its_reply() {
    let replies = serve(&[
        request("echo", json!({"text": "see <<END>> here"})),
        request("echo", json!({"text": "next"})),
    ]);
    let echoed: Vec<Option<&Value>> = replies.iter().map(|(reply, _)| reply.get("echo")).collect();
    assert_eq!(
        echoed,
        vec![
            Some(&json!({"text": "see <<END>> here"})),
            Some(&json!({"text": "next"})),
        ]
    );
}

#[test]
fn blank_lines_are_ignored_and_eof_ends_cleanly() {
    let replies = serve(&[String::new(), request("echo", json!({}))]);
    assert_eq!(replies.len(), 1);
}

#[test]
fn commands_parse_from_calls() {
    let envelope: CommandEnvelope =
        serde_json::from_str(r#"{"tool_calls":[{"func":"shutdown","properties":{}}]}"#)
            .expect("parse");
    let call = envelope.first_call().expect("one call");
    assert_eq!(Command::from_call(call), Ok(Command::Shutdown));
}

#[test]
fn reply_omits_echo_when_absent() {
    let encoded = serde_json::to_value(Reply {
        success: true,
        message: String::from("ok"),
        echo: None,
    })
    .expect("encode");
    assert_eq!(encoded, json!({"success": true, "message": "ok"}));
}
