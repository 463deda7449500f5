//! Unit tests for the simulated agent binary.

use super::{AgentManifest, manifest_path, run_session};
use agentgate::connection::domain::OsFamily;
use camino::Utf8PathBuf;
use rstest::rstest;
use std::io::Cursor;

fn session_output(manifest: &AgentManifest, input: &str) -> Vec<String> {
    let mut output = Vec::new();
    run_session(manifest, Cursor::new(input.as_bytes()), &mut output).expect("session runs");
    String::from_utf8(output)
        .expect("utf-8 output")
        .lines()
        .map(str::to_owned)
        .collect()
}

#[rstest]
#[case(&["-Xdebug", "-jar", "agent.json"], Some("agent.json"))]
#[case(&["-Xdebug", "-jar"], None)]
#[case(&[], None)]
fn manifest_path_is_last_positional_argument(
    #[case] args: &[&str],
    #[case] expected: Option<&str>,
) {
    let args: Vec<Utf8PathBuf> = args.iter().map(Utf8PathBuf::from).collect();
    assert_eq!(manifest_path(&args).map(|path| path.as_str()), expected);
}

#[test]
fn accepted_session_sends_capabilities_and_answers_probes() {
    let manifest = AgentManifest {
        os_family: OsFamily::Windows,
        ..AgentManifest::new("3.14.5")
    };

    let lines = session_output(&manifest, "ACCEPT\n1 PING\n2 DISK root\n");

    assert_eq!(
        lines,
        vec![
            "3.14.5".to_owned(),
            "windows".to_owned(),
            "1 OK PONG".to_owned(),
            format!("2 OK {}", manifest.root_free_bytes),
        ]
    );
}

#[test]
fn rejected_session_stops_after_version() {
    let lines = session_output(
        &AgentManifest::new("3.10.0"),
        "REJECT agent version 3.10.0 is not supported\n1 PING\n",
    );

    assert_eq!(lines, vec!["3.10.0".to_owned()]);
}
