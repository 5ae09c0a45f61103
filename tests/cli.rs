use assert_cmd::Command;
use predicates::prelude::*;

fn ashley() -> Command {
    let mut cmd = Command::cargo_bin("ashley").unwrap();
    // Keep the developer's environment out of the tests.
    cmd.env_remove("HF_API_KEY")
        .env_remove("ASHLEY_PERSONA_FILE")
        .env_remove("ASHLEY_MAX_TOKENS")
        .env("ASHLEY_INFERENCE_URL", "http://127.0.0.1:9/models");
    cmd
}

#[test]
fn test_cli_help() {
    ashley()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: ashley <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("chat"));
}

#[test]
fn test_cli_start_help() {
    ashley()
        .arg("start")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: ashley start [OPTIONS]"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("[default: 9900]"));
}

#[test]
fn test_cli_chat_help() {
    ashley()
        .arg("chat")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: ashley chat"));
}

#[test]
fn test_cli_no_command() {
    ashley()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: ashley <COMMAND>"));
}

#[test]
fn test_missing_api_key_fails_fast() {
    ashley()
        .arg("chat")
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("HF_API_KEY"))
        // Never got as far as greeting the user.
        .stdout(predicate::str::contains("Ashley is here").not());
}

#[test]
fn test_chat_quits_cleanly() {
    ashley()
        .env("HF_API_KEY", "hf_test")
        .arg("chat")
        .write_stdin("/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ashley is here"));
}

#[test]
fn test_chat_attachment_gets_static_reply() {
    ashley()
        .env("HF_API_KEY", "hf_test")
        .arg("chat")
        .write_stdin("/file /tmp/holiday.jpg\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("I'm still in a developing phase"));
}

#[test]
fn test_chat_reports_unreachable_service() {
    ashley()
        .env("HF_API_KEY", "hf_test")
        .arg("chat")
        .write_stdin("I feel great today!\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sorry, I couldn't finish that reply"));
}
