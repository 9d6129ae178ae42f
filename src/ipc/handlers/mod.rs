pub mod archive;
pub mod attendance;
pub mod core;
pub mod reports;
pub mod services;
pub mod students;

use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::store::Store;

pub(crate) struct HandlerErr {
    code: &'static str,
    message: String,
}

impl HandlerErr {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, None)
    }
}

pub(crate) fn store_read_err(e: anyhow::Error) -> HandlerErr {
    HandlerErr::new("store_read_failed", e.to_string())
}

pub(crate) fn store_write_err(e: anyhow::Error) -> HandlerErr {
    HandlerErr::new("store_write_failed", e.to_string())
}

/// A csv open/read failure is either the file being unreadable or the file
/// being malformed; the two surface as different error codes.
pub(crate) fn csv_open_err(e: csv::Error) -> HandlerErr {
    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
        HandlerErr::new("io_failed", e.to_string())
    } else {
        HandlerErr::new("parse_failed", e.to_string())
    }
}

pub(crate) fn store_mut(state: &mut AppState) -> Result<&mut Store, HandlerErr> {
    state
        .store
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Required string param: present, and non-empty after trimming. Form-level
/// required-field validation lives here; there is no other schema check.
pub(crate) fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {key}")))
}

/// Optional string param; blank counts as absent.
pub(crate) fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Dates travel as ISO strings; reject anything chrono cannot parse so
/// string-ordered range filters stay meaningful.
pub(crate) fn required_date(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let raw = required_str(params, key)?;
    chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| HandlerErr::new("bad_params", format!("{key} must be YYYY-MM-DD")))?;
    Ok(raw)
}
