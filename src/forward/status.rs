//! Upstream status message normalization.

use hyper::ext::ReasonPhrase;
use reqwest::StatusCode;

/// Status message for a response: the upstream's own phrase when it sent a
/// non-standard one, else the canonical phrase, else an empty string.
pub fn status_message(status: StatusCode, upstream: Option<&ReasonPhrase>) -> String {
    match upstream {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => status.canonical_reason().unwrap_or_default().to_string(),
    }
}

/// Reason phrase to put on the gateway's own response, when it differs from
/// the canonical one.
pub fn passthrough_phrase(status: StatusCode, message: &str) -> Option<ReasonPhrase> {
    if message.is_empty() || status.canonical_reason() == Some(message) {
        return None;
    }
    ReasonPhrase::try_from(message.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_fallback() {
        assert_eq!(status_message(StatusCode::NOT_FOUND, None), "Not Found");
        assert_eq!(status_message(StatusCode::from_u16(599).unwrap(), None), "");
    }

    #[test]
    fn test_upstream_phrase_wins() {
        let phrase = ReasonPhrase::from_static(b"Index Missing");
        assert_eq!(status_message(StatusCode::NOT_FOUND, Some(&phrase)), "Index Missing");
    }

    #[test]
    fn test_passthrough_only_when_custom() {
        assert!(passthrough_phrase(StatusCode::OK, "OK").is_none());
        assert!(passthrough_phrase(StatusCode::OK, "").is_none());
        let phrase = passthrough_phrase(StatusCode::OK, "Fine").unwrap();
        assert_eq!(phrase.as_bytes(), b"Fine");
        assert!(passthrough_phrase(StatusCode::OK, "bad\nphrase").is_none());
    }
}
