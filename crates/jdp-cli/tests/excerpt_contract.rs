use std::io::Write;
use std::process::{Command, Stdio};

fn run_excerpt(args: &[&str], stdin: &str) -> serde_json::Value {
    let bin = assert_cmd::cargo::cargo_bin!("jdp");
    let mut child = Command::new(bin)
        .arg("excerpt")
        .args(args)
        .env_remove("JDP_ENV_FILE")
        .env_remove("JDP_MAX_CHARS")
        .env_remove("JDP_EXTENDED_CHARS")
        .env_remove("JDP_MAX_EXTENDED_CHARS")
        .env_remove("JDP_MIN_WORD_COUNT")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn jdp excerpt");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait jdp excerpt");
    assert!(out.status.success(), "jdp excerpt failed");
    serde_json::from_slice(&out.stdout).expect("parse excerpt json")
}

#[test]
fn excerpt_from_stdin_skips_heading_and_foreign_lines() {
    let raw = "Reviewed by: Editorial team\nजमानत क्या है\nWhat is Bail?\nBail is the conditional release of an accused person pending trial, usually against a bond or surety. It may be granted by a police officer or a court.";
    let v = run_excerpt(&["--term", "Bail", "--stages"], raw);
    assert_eq!(v["kind"].as_str(), Some("excerpt"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(
        v["excerpt"].as_str(),
        Some("Bail is the conditional release of an accused person pending trial, usually against a bond or surety.")
    );
    let sanitized = v["stages"]["sanitized"].as_str().unwrap_or("");
    assert!(!sanitized.contains("जमानत"));
    assert!(v["stages"]["line"]
        .as_str()
        .unwrap_or("")
        .starts_with("Bail is the conditional release"));
}

#[test]
fn excerpt_limits_can_be_overridden_per_call() {
    let raw = "word ".repeat(40);
    let v = run_excerpt(&["--max-chars", "20"], &raw);
    assert_eq!(v["limits"]["max"].as_u64(), Some(20));
    // Windows below `max` are raised to it.
    assert_eq!(v["limits"]["extended"].as_u64(), Some(200));
    let excerpt = v["excerpt"].as_str().unwrap_or("");
    assert_eq!(excerpt, format!("{}…", &raw[..20]));
}

#[test]
fn empty_input_yields_fallback_message() {
    let v = run_excerpt(&[], "   \n");
    assert_eq!(
        v["excerpt"].as_str(),
        Some("Definition content not available.")
    );
}

#[test]
fn missing_file_is_an_envelope_error() {
    let bin = assert_cmd::cargo::cargo_bin!("jdp");
    let out = Command::new(bin)
        .args(["excerpt", "--file", "/definitely/not/here.txt"])
        .env_remove("JDP_ENV_FILE")
        .output()
        .expect("run jdp excerpt --file");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["code"].as_str(), Some("invalid_params"));
}
