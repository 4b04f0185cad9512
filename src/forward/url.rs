//! Inline timeout override handling.
//!
//! A call can carry `c_timeout=<millis>` in its query string. The parameter is
//! removed together with one adjoining separator before the URL goes upstream.
//! The path and the fragment are never searched.

use std::sync::LazyLock;

use regex::Regex;

use crate::forward::error::ForwardError;

/// Name of the reserved query parameter.
pub const TIMEOUT_PARAM: &str = "c_timeout";

static TIMEOUT_OVERRIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]c_timeout=([0-9]+)(&|$)").expect("static pattern"));

/// Strip the first `c_timeout` parameter from `url`.
///
/// Returns the rewritten URL and the override in milliseconds, if any.
pub fn extract_timeout_override(url: &str) -> Result<(String, Option<u64>), ForwardError> {
    let fragment = url.find('#').unwrap_or(url.len());
    let Some(query) = url[..fragment].find('?') else {
        return Ok((url.to_string(), None));
    };
    let Some(caps) = TIMEOUT_OVERRIDE.captures_at(&url[..fragment], query) else {
        return Ok((url.to_string(), None));
    };
    let (Some(whole), Some(value), Some(tail)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return Ok((url.to_string(), None));
    };

    let millis = value
        .as_str()
        .parse::<u64>()
        .map_err(|e| ForwardError::InvalidParameter {
            name: TIMEOUT_PARAM.to_string(),
            reason: format!("[{}] {}", value.as_str(), e),
        })?;

    // keep the leading separator when a trailing `&` goes, otherwise drop the leading one
    let (cut_start, cut_end) = if tail.as_str() == "&" {
        (whole.start() + 1, whole.end())
    } else {
        (whole.start(), tail.start())
    };

    let mut stripped = String::with_capacity(url.len());
    stripped.push_str(&url[..cut_start]);
    stripped.push_str(&url[cut_end..]);
    Ok((stripped, Some(millis)))
}
