use axum::{routing::post, Json, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;

fn jdp(data_dir: &Path, webhook: Option<&str>, args: &[&str]) -> serde_json::Value {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jdp"));
    cmd.args(args)
        .env_remove("JDP_ENV_FILE")
        .env_remove("JDP_WEBHOOK_ENABLED")
        .env_remove("JDP_WEBHOOK_ACCESS_KEY")
        .env("JDP_DATA_DIR", data_dir);
    match webhook {
        Some(url) => cmd.env("JDP_WEBHOOK_URL", url),
        None => cmd.env_remove("JDP_WEBHOOK_URL"),
    };
    let out = cmd.output().expect("run jdp");
    assert!(out.status.success(), "jdp failed: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("parse json")
}

fn start_sheet(rt: &tokio::runtime::Runtime) -> SocketAddr {
    rt.block_on(async {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/exec",
            post(|Json(v): Json<serde_json::Value>| async move {
                if v["term"].as_str().unwrap_or("").is_empty() {
                    return Json(serde_json::json!({"success": false, "error": "Missing required field: term"}));
                }
                Json(serde_json::json!({"success": true, "message": "Request stored successfully", "row": 3}))
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        addr
    })
}

#[test]
fn unconfigured_webhook_queues_the_request() {
    let tmp = tempfile::tempdir().expect("tmp");

    let v = jdp(
        tmp.path(),
        None,
        &["request", "Res judicata", "--page-url", "https://example.com/judgment"],
    );
    assert_eq!(v["kind"].as_str(), Some("request"));
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["code"].as_str(), Some("not_configured"));
    assert_eq!(v["queued"].as_bool(), Some(true));
    assert!(!v["pending_id"].as_str().unwrap_or("").is_empty());

    let v = jdp(tmp.path(), None, &["pending", "list"]);
    assert_eq!(v["kind"].as_str(), Some("pending_list"));
    assert_eq!(v["count"].as_u64(), Some(1));
    assert_eq!(
        v["requests"][0]["request"]["term"].as_str(),
        Some("Res judicata")
    );

    // Flushing without an endpoint cannot deliver anything.
    let v = jdp(tmp.path(), None, &["pending", "flush"]);
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["code"].as_str(), Some("not_configured"));

    let v = jdp(tmp.path(), None, &["pending", "clear"]);
    assert_eq!(v["removed"].as_u64(), Some(1));
    let v = jdp(tmp.path(), None, &["pending", "list"]);
    assert_eq!(v["count"].as_u64(), Some(0));
}

#[test]
fn no_queue_flag_skips_the_local_store() {
    let tmp = tempfile::tempdir().expect("tmp");
    let v = jdp(tmp.path(), None, &["request", "Writ", "--no-queue"]);
    assert_eq!(v["queued"].as_bool(), Some(false));
    let v = jdp(tmp.path(), None, &["pending", "list"]);
    assert_eq!(v["count"].as_u64(), Some(0));
}

#[test]
fn request_is_delivered_and_queue_flushes() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let addr = start_sheet(&rt);
    let url = format!("http://{addr}/exec");
    let tmp = tempfile::tempdir().expect("tmp");

    let v = jdp(tmp.path(), Some(&url), &["request", "Summons"]);
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["queued"].as_bool(), Some(false));
    assert_eq!(v["receipt"]["row"].as_u64(), Some(3));
    assert_eq!(v["request"]["source"].as_str(), Some("jdp_cli"));

    // Queue one while offline, then deliver it.
    let v = jdp(tmp.path(), None, &["request", "Affidavit"]);
    assert_eq!(v["queued"].as_bool(), Some(true));
    let v = jdp(tmp.path(), Some(&url), &["pending", "flush"]);
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["report"]["submitted"].as_u64(), Some(1));
    assert_eq!(v["report"]["remaining"].as_u64(), Some(0));
    let v = jdp(tmp.path(), Some(&url), &["pending", "list"]);
    assert_eq!(v["count"].as_u64(), Some(0));
}

#[test]
fn empty_term_is_rejected() {
    let tmp = tempfile::tempdir().expect("tmp");
    let v = jdp(tmp.path(), None, &["request", "   "]);
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["code"].as_str(), Some("invalid_params"));
}
