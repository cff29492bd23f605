use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn jdp_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("jdp");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .env_remove("JDP_ENV_FILE")
        .output()
        .expect("run jdp version");

    assert!(out.status.success(), "jdp version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["name"].as_str(), Some("jdp"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn jdp_version_text_output_contract() {
    Command::new(assert_cmd::cargo::cargo_bin!("jdp"))
        .args(["version", "--output", "text"])
        .env_remove("JDP_ENV_FILE")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("jdp "));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    Command::new(assert_cmd::cargo::cargo_bin!("jdp"))
        .args(["definitely-not-a-command"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}
