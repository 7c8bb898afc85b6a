//! Backend response interpretation, independent of the HTTP transport.
//!
//! The transport hands back a [`BackendReply`] (status, content type, raw
//! body). Everything the workflow needs to know about it is decided here:
//!
//! * [`resolve_error_message`] — the user-facing message for a failed reply.
//! * [`parse_success`] — whether a successful reply carries Markdown text or
//!   a ready-made spreadsheet.

use crate::error::{WorkflowError, MSG_BACKEND_FALLBACK};
use serde::Deserialize;
use std::borrow::Cow;

/// A backend response as received off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl BackendReply {
    /// Convenience constructor for a JSON reply.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.into().into_bytes(),
        }
    }

    /// Convenience constructor for a plain-text reply.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: body.into().into_bytes(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type_contains("application/json")
    }

    /// `true` when the body is an XLSX attachment.
    pub fn is_spreadsheet(&self) -> bool {
        self.content_type_contains("spreadsheetml")
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn content_type_contains(&self, needle: &str) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

// ── Error message resolution ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Resolve the message for a failed reply.
///
/// Tried in order, first non-empty wins:
/// 1. JSON bodies: the `error` field, then the `detail` field.
/// 2. Non-JSON bodies: the raw body text.
/// 3. [`MSG_BACKEND_FALLBACK`].
///
/// A JSON body without either field falls straight through to step 3; its
/// raw text is never shown.
pub fn resolve_error_message(reply: &BackendReply) -> String {
    let resolved = if reply.is_json() {
        structured_message(&reply.body)
    } else {
        raw_message(reply)
    };
    resolved.unwrap_or_else(|| MSG_BACKEND_FALLBACK.to_string())
}

fn structured_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .error
        .and_then(field_text)
        .or_else(|| parsed.detail.and_then(field_text))
}

/// Text of an `error` or `detail` field. FastAPI puts a string in `detail`
/// for most errors and a list of objects for request-validation failures;
/// non-string values are shown as compact JSON.
fn field_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => non_empty(Some(s)),
        other => Some(other.to_string()),
    }
}

fn raw_message(reply: &BackendReply) -> Option<String> {
    non_empty(Some(reply.body_text().into_owned()))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

// ── Success parsing ──────────────────────────────────────────────────────────

/// What a successful reply carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessBody {
    /// `{ "markdown": "..." }`
    Markdown(String),
    /// A finished XLSX workbook.
    Spreadsheet(Vec<u8>),
}

#[derive(Debug, Deserialize)]
struct MarkdownBody {
    markdown: Option<String>,
}

/// Interpret a 2xx reply.
///
/// Spreadsheet content types are taken as-is. Anything else must be a JSON
/// object with a string `markdown` field.
pub fn parse_success(reply: &BackendReply) -> Result<SuccessBody, WorkflowError> {
    if reply.is_spreadsheet() {
        return Ok(SuccessBody::Spreadsheet(reply.body.clone()));
    }

    let parsed: MarkdownBody = serde_json::from_slice(&reply.body)
        .map_err(|e| WorkflowError::MalformedResponse(format!("invalid JSON body: {e}")))?;

    parsed
        .markdown
        .map(SuccessBody::Markdown)
        .ok_or_else(|| WorkflowError::MalformedResponse("response has no `markdown` field".into()))
}
