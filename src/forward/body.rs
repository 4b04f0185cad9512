//! Outbound request body preparation.
//!
//! A JSON body of the form `{"_file_body": {"file": "<path>", "type": "<mime>"}}`
//! is replaced by the raw bytes of that file. Every other body goes out as-is
//! with a JSON media type.

use std::path::Path;

use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;

use crate::forward::error::ForwardError;

/// Key of the file directive inside a JSON body.
pub const FILE_BODY_KEY: &str = "_file_body";

const JSON_MEDIA_TYPE: &str = "application/json";

/// Body bytes plus the media type they are sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundBody {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Decide whether `method` sends a body and prepare it.
///
/// GET and HEAD never carry one. POST, PUT and PATCH always do (possibly empty).
/// DELETE carries one only when it was supplied.
pub async fn prepare_body(method: &Method, body: Option<Bytes>) -> Result<Option<OutboundBody>, ForwardError> {
    let body = match *method {
        Method::GET | Method::HEAD => return Ok(None),
        Method::POST | Method::PUT | Method::PATCH => body.unwrap_or_default(),
        Method::DELETE => match body {
            Some(body) if !body.is_empty() => body,
            _ => return Ok(None),
        },
        _ => return Err(ForwardError::UnsupportedMethod(method.to_string())),
    };

    match file_directive(&body) {
        Some(directive) => {
            let bytes = tokio::fs::read(&directive.file)
                .await
                .map_err(|source| ForwardError::FileBody {
                    path: directive.file.clone(),
                    source,
                })?;
            tracing::debug!(file = %directive.file, content_type = %directive.content_type, "Sending file body");
            Ok(Some(OutboundBody {
                bytes: Bytes::from(bytes),
                content_type: directive.content_type,
            }))
        }
        None => Ok(Some(OutboundBody {
            bytes: body,
            content_type: JSON_MEDIA_TYPE.to_string(),
        })),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct FileDirective {
    file: String,
    content_type: String,
}

fn file_directive(body: &[u8]) -> Option<FileDirective> {
    // cheap pre-check, most bodies are plain payloads
    if !body.windows(FILE_BODY_KEY.len()).any(|w| w == FILE_BODY_KEY.as_bytes()) {
        return None;
    }
    let value: Value = serde_json::from_slice(body).ok()?;
    let directive = value.as_object()?.get(FILE_BODY_KEY)?.as_object()?;
    let file = directive.get("file")?.as_str()?.to_string();
    let content_type = match directive.get("type").and_then(Value::as_str) {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => guess_mime(Path::new(&file)).to_string(),
    };
    Some(FileDirective { file, content_type })
}

/// Media type for a file name, `application/octet-stream` when unknown.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("ndjson") | Some("jsonl") => "application/x-ndjson",
        Some("xml") => "application/xml",
        Some("txt") | Some("log") => "text/plain",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("yaml") | Some("yml") => "application/yaml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
