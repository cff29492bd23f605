use anyhow::Result;
use clap::{Parser, Subcommand};
use jdp_core::outline::{outline, render_text, DefinitionBlock};
use jdp_core::{excerpt_for, sanitize, select_content_line, to_excerpt, ExcerptLimits};
use jdp_local::lookup::LookupOutcome;
use jdp_local::pending::PendingStore;
use jdp_local::webhook::{new_request, WebhookSink, DEFAULT_SOURCE};
use jdp_local::{Definer, MediaWikiClient, Settings, TermCache};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

mod envelope;

use envelope::{add_elapsed, envelope, error_obj, failure, ErrorCode};

#[derive(Parser, Debug)]
#[command(name = "jdp")]
#[command(about = "Justice Definitions Project lookup (wiki search, excerpts, definition requests)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up the best definition for a term (json).
    Define(DefineCmd),
    /// List matching wiki pages with short excerpts (json).
    Search(SearchCmd),
    /// Run the excerpt pipeline over local text (stdin or --file); no network.
    Excerpt(ExcerptCmd),
    /// Ask the editors to add a definition (webhook); queued locally on failure.
    Request(RequestCmd),
    /// Inspect or resubmit queued definition requests.
    #[command(subcommand)]
    Pending(PendingCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct DefineCmd {
    /// Term to define (non-letters are ignored for the search).
    term: String,
    /// Also fetch the full page and include it as an outline.
    #[arg(long)]
    full: bool,
    /// Per-request API timeout (ms); defaults to JDP_API_TIMEOUT_MS.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    query: String,
    #[arg(long, default_value_t = jdp_local::wiki::DEFAULT_MAX_RESULTS)]
    max_results: usize,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ExcerptCmd {
    /// Read raw text from this file instead of stdin.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Query term (informational; selection is positional).
    #[arg(long, default_value = "")]
    term: String,
    #[arg(long)]
    max_chars: Option<usize>,
    #[arg(long)]
    extended_chars: Option<usize>,
    #[arg(long)]
    max_extended_chars: Option<usize>,
    #[arg(long)]
    min_words: Option<usize>,
    /// Include the sanitized text and the selected line in the output.
    #[arg(long)]
    stages: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct RequestCmd {
    term: String,
    /// Page the term was seen on.
    #[arg(long, default_value = "")]
    page_url: String,
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: String,
    /// Do not queue the request locally when delivery fails.
    #[arg(long)]
    no_queue: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(Subcommand, Debug)]
enum PendingCmd {
    /// Show queued requests, newest first.
    List(OutputArgs),
    /// Resubmit queued requests; delivered ones are removed.
    Flush(OutputArgs),
    /// Drop all queued requests.
    Clear(OutputArgs),
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn is_text(output: &str) -> bool {
    output.eq_ignore_ascii_case("text")
}

fn print_payload(output: &str, payload: &serde_json::Value, text: impl FnOnce() -> String) {
    if is_text(output) {
        println!("{}", text());
    } else {
        println!("{payload}");
    }
}

fn error_text(payload: &serde_json::Value) -> String {
    format!(
        "error: {}",
        payload["error"]["message"].as_str().unwrap_or("unknown error")
    )
}

/// `JDP_DATA_DIR`, else the platform data dir, else a temp dir.
fn data_dir(settings: &Settings) -> PathBuf {
    settings
        .data_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|d| d.join("jdp")))
        .unwrap_or_else(|| std::env::temp_dir().join("jdp"))
}

fn build_definer(settings: &Settings, timeout_ms: Option<u64>) -> jdp_core::Result<Definer> {
    let http = jdp_local::http_client(settings.api_timeout())?;
    let wiki = MediaWikiClient::from_settings(http, settings)?;
    let cache = Arc::new(TermCache::new(settings.cache_ttl(), settings.cache_capacity));
    let definer = Definer::new(
        Arc::new(wiki),
        cache,
        settings.limits,
        settings.wiki_base_url.clone(),
    );
    Ok(match timeout_ms {
        Some(ms) => definer.with_timeout_ms(ms),
        None => definer,
    })
}

fn build_sink(settings: &Settings) -> jdp_core::Result<WebhookSink> {
    let http = jdp_local::http_client(std::time::Duration::from_millis(
        settings.webhook_timeout_ms,
    ))?;
    WebhookSink::from_settings(http, settings)
}

async fn run_define(settings: &Settings, args: &DefineCmd) -> serde_json::Value {
    let definer = match build_definer(settings, args.timeout_ms) {
        Ok(d) => d,
        Err(e) => return failure("define", &e),
    };
    let outcome = match definer.define(&args.term).await {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(term = %args.term, error = %e, "define failed");
            let mut v = failure("define", &e);
            v["query"] = serde_json::json!(jdp_local::wiki::clean_query(&args.term));
            v["found"] = serde_json::json!(false);
            return v;
        }
    };

    let mut v = envelope("define", true);
    match outcome {
        LookupOutcome::NotFound { query } => {
            v["query"] = serde_json::json!(query);
            v["found"] = serde_json::json!(false);
        }
        LookupOutcome::Found(def) => {
            v["query"] = serde_json::json!(def.query);
            v["found"] = serde_json::json!(true);
            if args.full {
                match definer.full_text(&def.title).await {
                    Ok(text) => v["outline"] = serde_json::json!(outline(&sanitize(&text))),
                    Err(e) => {
                        tracing::warn!(title = %def.title, error = %e, "full text unavailable");
                        v["outline"] = serde_json::Value::Null;
                        v["outline_error"] = error_obj(ErrorCode::from(&e), &e);
                    }
                }
            }
            v["definition"] = serde_json::json!(def);
        }
    }
    v
}

fn define_text(v: &serde_json::Value) -> String {
    if v["ok"].as_bool() != Some(true) {
        return error_text(v);
    }
    if v["found"].as_bool() != Some(true) {
        return format!(
            "No definition found for \"{}\".",
            v["query"].as_str().unwrap_or("")
        );
    }
    let d = &v["definition"];
    let mut out = format!(
        "{}\n{}\n{}",
        d["title"].as_str().unwrap_or(""),
        d["excerpt"].as_str().unwrap_or(""),
        d["url"].as_str().unwrap_or("")
    );
    if let Ok(blocks) = serde_json::from_value::<Vec<DefinitionBlock>>(v["outline"].clone()) {
        if !blocks.is_empty() {
            out.push_str("\n\n");
            out.push_str(&render_text(&blocks));
        }
    }
    out
}

async fn run_search(settings: &Settings, args: &SearchCmd) -> serde_json::Value {
    let definer = match build_definer(settings, args.timeout_ms) {
        Ok(d) => d,
        Err(e) => return failure("search", &e),
    };
    let max = args.max_results.min(jdp_local::wiki::MAX_RESULTS_CAP);
    match definer.search(&args.query, max).await {
        Ok(results) => {
            let mut v = envelope("search", true);
            v["query"] = serde_json::json!(jdp_local::wiki::clean_query(&args.query));
            v["count"] = serde_json::json!(results.len());
            v["results"] = serde_json::json!(results);
            v
        }
        Err(e) => failure("search", &e),
    }
}

fn search_text(v: &serde_json::Value) -> String {
    if v["ok"].as_bool() != Some(true) {
        return error_text(v);
    }
    let results = v["results"].as_array().cloned().unwrap_or_default();
    if results.is_empty() {
        return format!("No results for \"{}\".", v["query"].as_str().unwrap_or(""));
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\n   {}\n   {}",
                i + 1,
                r["title"].as_str().unwrap_or(""),
                r["excerpt"].as_str().unwrap_or(""),
                r["url"].as_str().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn run_excerpt(settings: &Settings, args: &ExcerptCmd) -> serde_json::Value {
    let raw = match &args.file {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(s) => s,
            Err(e) => {
                let mut v = envelope("excerpt", false);
                v["error"] = error_obj(
                    ErrorCode::InvalidParams,
                    format!("cannot read {}: {e}", p.display()),
                );
                return v;
            }
        },
        None => {
            let mut s = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut s) {
                let mut v = envelope("excerpt", false);
                v["error"] = error_obj(ErrorCode::UnexpectedError, format!("stdin: {e}"));
                return v;
            }
            s
        }
    };

    let limits = ExcerptLimits {
        max: args.max_chars.unwrap_or(settings.limits.max),
        extended: args.extended_chars.unwrap_or(settings.limits.extended),
        max_extended: args
            .max_extended_chars
            .unwrap_or(settings.limits.max_extended),
        min_words: args.min_words.unwrap_or(settings.limits.min_words),
    }
    .normalized();

    let mut v = envelope("excerpt", true);
    if args.stages {
        let sanitized = sanitize(&raw);
        let line = select_content_line(&sanitized, &args.term);
        v["excerpt"] = serde_json::json!(to_excerpt(&line, &limits));
        v["stages"] = serde_json::json!({
            "sanitized": sanitized,
            "line": line,
        });
    } else {
        v["excerpt"] = serde_json::json!(excerpt_for(&raw, &args.term, &limits));
    }
    v["limits"] = serde_json::json!(limits);
    v
}

async fn run_request(settings: &Settings, args: &RequestCmd) -> serde_json::Value {
    let req = new_request(args.term.trim(), args.page_url.trim(), args.source.trim());
    if req.term.is_empty() {
        let mut v = envelope("request", false);
        v["error"] = error_obj(ErrorCode::InvalidParams, "term is empty");
        return v;
    }

    let delivered = match build_sink(settings) {
        Ok(sink) => {
            use jdp_core::RequestSink;
            sink.submit(&req).await
        }
        Err(e) => Err(e),
    };

    match delivered {
        Ok(receipt) => {
            tracing::info!(term = %req.term, row = ?receipt.row, "definition request delivered");
            let mut v = envelope("request", true);
            v["request"] = serde_json::json!(req);
            v["receipt"] = serde_json::json!(receipt);
            v["queued"] = serde_json::json!(false);
            v
        }
        Err(e) => {
            tracing::warn!(term = %req.term, error = %e, "definition request not delivered");
            let mut v = failure("request", &e);
            v["request"] = serde_json::json!(req);
            v["queued"] = serde_json::json!(false);
            if !args.no_queue {
                let store = PendingStore::new(data_dir(settings));
                match store.push(req, Some(e.to_string())) {
                    Ok(entry) => {
                        v["queued"] = serde_json::json!(true);
                        v["pending_id"] = serde_json::json!(entry.id);
                    }
                    Err(se) => {
                        tracing::warn!(error = %se, "could not queue definition request");
                        v["queue_error"] = error_obj(ErrorCode::from(&se), &se);
                    }
                }
            }
            v
        }
    }
}

fn request_text(v: &serde_json::Value) -> String {
    let term = v["request"]["term"].as_str().unwrap_or("");
    if v["ok"].as_bool() == Some(true) {
        let row = v["receipt"]["row"]
            .as_u64()
            .map(|r| format!(" (row {r})"))
            .unwrap_or_default();
        return format!("Requested a definition for \"{term}\"{row}.");
    }
    let mut s = error_text(v);
    if v["queued"].as_bool() == Some(true) {
        s.push_str("\nqueued locally; retry with `jdp pending flush`");
    }
    s
}

async fn run_pending(settings: &Settings, cmd: &PendingCmd) -> serde_json::Value {
    let store = PendingStore::new(data_dir(settings));
    match cmd {
        PendingCmd::List(_) => match store.list() {
            Ok(items) => {
                let mut v = envelope("pending_list", true);
                v["path"] = serde_json::json!(store.path());
                v["count"] = serde_json::json!(items.len());
                v["requests"] = serde_json::json!(items);
                v
            }
            Err(e) => failure("pending_list", &e),
        },
        PendingCmd::Flush(_) => {
            let sink = match build_sink(settings) {
                Ok(s) => s,
                Err(e) => return failure("pending_flush", &e),
            };
            match store.flush(&sink).await {
                Ok(report) => {
                    let mut v = envelope("pending_flush", true);
                    v["report"] = serde_json::json!(report);
                    v
                }
                Err(e) => failure("pending_flush", &e),
            }
        }
        PendingCmd::Clear(_) => match store.clear() {
            Ok(n) => {
                let mut v = envelope("pending_clear", true);
                v["removed"] = serde_json::json!(n);
                v
            }
            Err(e) => failure("pending_clear", &e),
        },
    }
}

fn pending_text(v: &serde_json::Value) -> String {
    if v["ok"].as_bool() != Some(true) {
        return error_text(v);
    }
    match v["kind"].as_str().unwrap_or("") {
        "pending_list" => {
            let items = v["requests"].as_array().cloned().unwrap_or_default();
            let mut lines = vec![format!("{} pending request(s)", items.len())];
            for r in &items {
                lines.push(format!(
                    "- {} {} {}",
                    r["id"].as_str().unwrap_or(""),
                    r["request"]["term"].as_str().unwrap_or(""),
                    r["last_error"].as_str().unwrap_or("")
                ));
            }
            lines.join("\n")
        }
        "pending_flush" => format!(
            "submitted={} failed={} remaining={}",
            v["report"]["submitted"], v["report"]["failed"], v["report"]["remaining"]
        ),
        _ => format!("removed={}", v["removed"]),
    }
}

fn run_doctor(settings: &Settings) -> serde_json::Value {
    let t0 = std::time::Instant::now();
    let dir = data_dir(settings);
    let mut checks: Vec<serde_json::Value> = Vec::new();

    let api_ok = jdp_local::wiki::validate_api_url(&settings.api_url).is_ok();
    checks.push(serde_json::json!({
        "name": "api_url_valid",
        "ok": api_ok,
        "message": if api_ok { "api url parses as http(s)" } else { "api url is not a valid http(s) url" },
        "hint": if api_ok { "" } else { ErrorCode::InvalidUrl.hint() },
    }));

    // Check: data dir is creatable + writable.
    let data_ok = (|| -> anyhow::Result<()> {
        std::fs::create_dir_all(&dir)?;
        let probe = dir.join(format!(
            "jdp-doctor-{}.probe",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
        ));
        std::fs::write(&probe, b"ok")?;
        let _ = std::fs::remove_file(&probe);
        Ok(())
    })()
    .is_ok();
    checks.push(serde_json::json!({
        "name": "data_dir_writable",
        "ok": data_ok,
        "message": if data_ok { "data dir is writable" } else { "data dir is not writable" },
        "hint": if data_ok { "" } else { ErrorCode::StoreFailed.hint() },
    }));

    let ok = checks.iter().all(|c| c["ok"].as_bool().unwrap_or(false));
    let mut v = envelope("doctor", ok);
    v["name"] = serde_json::json!("jdp");
    v["version"] = serde_json::json!(env!("CARGO_PKG_VERSION"));
    v["platform"] = serde_json::json!({
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    });
    v["configured"] = serde_json::json!({
        "api_url": settings.api_url,
        "wiki_base_url": settings.wiki_base_url,
        "api_timeout_ms": settings.api_timeout_ms,
        "webhook": {
            "url": settings.webhook_url.is_some(),
            "enabled": settings.webhook_enabled,
            "access_key": settings.webhook_access_key.is_some(),
            "timeout_ms": settings.webhook_timeout_ms,
        },
        "limits": settings.limits,
        "cache": {
            "ttl_s": settings.cache_ttl_s,
            "capacity": settings.cache_capacity,
        },
        "data_dir": dir.to_string_lossy(),
    });
    v["checks"] = serde_json::json!(checks);
    add_elapsed(&mut v, t0.elapsed().as_millis());
    v
}

fn doctor_text(v: &serde_json::Value) -> String {
    let mut lines = vec![
        format!(
            "jdp {} (ok={})",
            env!("CARGO_PKG_VERSION"),
            v["ok"].as_bool().unwrap_or(false)
        ),
        format!(
            "api_url: {}",
            v["configured"]["api_url"].as_str().unwrap_or("")
        ),
        format!(
            "data_dir: {}",
            v["configured"]["data_dir"].as_str().unwrap_or("")
        ),
        format!(
            "webhook: url={} enabled={} access_key={}",
            v["configured"]["webhook"]["url"].as_bool().unwrap_or(false),
            v["configured"]["webhook"]["enabled"]
                .as_bool()
                .unwrap_or(false),
            v["configured"]["webhook"]["access_key"]
                .as_bool()
                .unwrap_or(false),
        ),
        "checks:".to_string(),
    ];
    if let Some(arr) = v["checks"].as_array() {
        for c in arr {
            let name = c["name"].as_str().unwrap_or("?");
            let ok = c["ok"].as_bool().unwrap_or(false);
            lines.push(format!("- {}: {}", name, if ok { "ok" } else { "fail" }));
        }
    }
    lines.join("\n")
}

/// Opt-in `KEY=VALUE` loader; never overrides the process environment.
fn load_env_file() {
    let Ok(p) = std::env::var("JDP_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("JDP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Define(args) => {
            let v = run_define(&settings, &args).await;
            print_payload(&args.output, &v, || define_text(&v));
        }
        Commands::Search(args) => {
            let v = run_search(&settings, &args).await;
            print_payload(&args.output, &v, || search_text(&v));
        }
        Commands::Excerpt(args) => {
            let v = run_excerpt(&settings, &args);
            print_payload(&args.output, &v, || {
                if v["ok"].as_bool() == Some(true) {
                    v["excerpt"].as_str().unwrap_or("").to_string()
                } else {
                    error_text(&v)
                }
            });
        }
        Commands::Request(args) => {
            let v = run_request(&settings, &args).await;
            print_payload(&args.output, &v, || request_text(&v));
        }
        Commands::Pending(cmd) => {
            let v = run_pending(&settings, &cmd).await;
            let output = match &cmd {
                PendingCmd::List(o) | PendingCmd::Flush(o) | PendingCmd::Clear(o) => &o.output,
            };
            print_payload(output, &v, || pending_text(&v));
        }
        Commands::Doctor(args) => {
            let v = run_doctor(&settings);
            print_payload(&args.output, &v, || doctor_text(&v));
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": envelope::SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "jdp",
                "version": env!("CARGO_PKG_VERSION"),
            });
            print_payload(&args.output, &v, || {
                format!("jdp {}", env!("CARGO_PKG_VERSION"))
            });
        }
    }
    Ok(())
}
