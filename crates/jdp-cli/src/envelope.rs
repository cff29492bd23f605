use serde::Serialize;

pub(crate) const SCHEMA_VERSION: u64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    InvalidUrl,
    NotConfigured,
    SearchFailed,
    ExtractFailed,
    WebhookFailed,
    StoreFailed,
    UnexpectedError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidUrl => "invalid_url",
            Self::NotConfigured => "not_configured",
            Self::SearchFailed => "search_failed",
            Self::ExtractFailed => "extract_failed",
            Self::WebhookFailed => "webhook_failed",
            Self::StoreFailed => "store_failed",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::SearchFailed | Self::ExtractFailed | Self::WebhookFailed => true,
            // Configuration + invalid input are not retryable without changing something.
            Self::InvalidParams
            | Self::InvalidUrl
            | Self::NotConfigured
            | Self::StoreFailed
            | Self::UnexpectedError => false,
        }
    }

    pub(crate) fn hint(self) -> &'static str {
        match self {
            Self::InvalidParams => "Check the command arguments.",
            Self::InvalidUrl => "Check JDP_API_URL / JDP_WIKI_BASE_URL / JDP_WEBHOOK_URL.",
            Self::NotConfigured => {
                "Set JDP_WEBHOOK_URL (and JDP_WEBHOOK_ENABLED=true) to submit definition requests."
            }
            Self::SearchFailed | Self::ExtractFailed => {
                "The wiki API could not be reached or returned an error. Retry, or raise JDP_API_TIMEOUT_MS."
            }
            Self::WebhookFailed => {
                "The request was not delivered. It is kept locally; retry with `jdp pending flush`."
            }
            Self::StoreFailed => "Check that JDP_DATA_DIR is writable.",
            Self::UnexpectedError => "",
        }
    }
}

impl From<&jdp_core::Error> for ErrorCode {
    fn from(e: &jdp_core::Error) -> Self {
        use jdp_core::Error as E;
        match e {
            E::InvalidUrl(_) => Self::InvalidUrl,
            E::Search(_) => Self::SearchFailed,
            E::Extract(_) => Self::ExtractFailed,
            E::Webhook(_) => Self::WebhookFailed,
            E::Store(_) => Self::StoreFailed,
            E::NotConfigured(_) => Self::NotConfigured,
        }
    }
}

/// Start a payload with the stable envelope keys.
pub(crate) fn envelope(kind: &str, ok: bool) -> serde_json::Value {
    serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "kind": kind,
        "ok": ok,
    })
}

pub(crate) fn add_elapsed(payload: &mut serde_json::Value, elapsed_ms: u128) {
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
}

pub(crate) fn error_obj(code: ErrorCode, message: impl ToString) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: &'static str,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: code.hint(),
        retryable: code.retryable(),
    };
    match serde_json::to_value(e) {
        Ok(v) => v,
        Err(_) => serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": code.hint(),
            "retryable": code.retryable()
        }),
    }
}

/// `ok: false` envelope carrying `err`.
pub(crate) fn failure(kind: &str, err: &jdp_core::Error) -> serde_json::Value {
    let mut v = envelope(kind, false);
    v["error"] = error_obj(ErrorCode::from(err), err);
    v
}
