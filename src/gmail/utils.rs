//! Gmail utility functions
//!
//! Header lookup, body extraction, and date normalization helpers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::types::MessagePart;

/// Cap on extracted body text, matching what summaries can carry
const BODY_EXTRACT_LIMIT: usize = 5000;

/// Decode base64url data from the Gmail API.
/// Handles both padded and non-padded base64url encoding.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    // Gmail typically returns unpadded base64url
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| {
            GmailMcpError::Gmail(GmailApiError::UnexpectedShape {
                message: format!("invalid base64 body data: {}", e),
            })
        })
}

/// Decode base64url data to a string, replacing invalid UTF-8
pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Find a header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Extract body text from a message payload.
///
/// Walks the MIME tree preferring `text/plain`; falls back to `text/html`
/// when no plain part exists. Output is capped at a fixed length.
pub fn extract_body_text(payload: &MessagePart) -> String {
    let mut body = String::new();

    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        if let Ok(decoded) = decode_base64url_string(data) {
            body = decoded;
        }
    } else {
        walk_parts(payload, &mut body);
    }

    truncate_chars(&body, BODY_EXTRACT_LIMIT)
}

fn walk_parts(payload: &MessagePart, body: &mut String) {
    for part in &payload.parts {
        let mime_type = part.mime_type.as_deref().unwrap_or("");
        let data = part.body.as_ref().and_then(|b| b.data.as_deref());

        match (mime_type, data) {
            ("text/plain", Some(data)) => {
                if let Ok(decoded) = decode_base64url_string(data) {
                    *body = decoded;
                    return;
                }
            }
            ("text/html", Some(data)) if body.is_empty() => {
                if let Ok(decoded) = decode_base64url_string(data) {
                    *body = decoded;
                }
            }
            _ => {
                if !part.parts.is_empty() {
                    walk_parts(part, body);
                    if !body.is_empty() {
                        return;
                    }
                }
            }
        }
    }
}

/// Normalize an RFC 2822 date header to `YYYY-MM-DD HH:MM`.
/// Unparseable values are passed through unchanged.
pub fn format_date(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(parsed) => parsed.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Truncate a string to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePartBody};

    fn text_part(mime_type: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime_type.to_string()),
            body: Some(MessagePartBody {
                size: text.len() as i64,
                data: Some(URL_SAFE_NO_PAD.encode(text.as_bytes())),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_base64url_variants() {
        // Unpadded (Gmail's usual form)
        assert_eq!(decode_base64url("aGVsbG8").unwrap(), b"hello");
        // Padded
        assert_eq!(decode_base64url("aGVsbG8=").unwrap(), b"hello");
        // Garbage
        assert!(decode_base64url("not valid!!").is_err());
    }

    #[test]
    fn test_find_header_case_insensitive() {
        let part = MessagePart {
            headers: vec![Header {
                name: "Subject".to_string(),
                value: "Invoice".to_string(),
            }],
            ..Default::default()
        };

        assert_eq!(find_header(&part, "subject"), Some("Invoice"));
        assert_eq!(find_header(&part, "SUBJECT"), Some("Invoice"));
        assert_eq!(find_header(&part, "From"), None);
    }

    #[test]
    fn test_extract_body_from_top_level() {
        let payload = text_part("text/plain", "plain body");
        assert_eq!(extract_body_text(&payload), "plain body");
    }

    #[test]
    fn test_extract_body_prefers_plain_over_html() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![
                text_part("text/html", "<p>html body</p>"),
                text_part("text/plain", "plain body"),
            ],
            ..Default::default()
        };

        assert_eq!(extract_body_text(&payload), "plain body");
    }

    #[test]
    fn test_extract_body_falls_back_to_html() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![text_part("text/html", "<p>html only</p>")],
            ..Default::default()
        };

        assert_eq!(extract_body_text(&payload), "<p>html only</p>");
    }

    #[test]
    fn test_extract_body_recurses_nested_multipart() {
        let inner = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![text_part("text/plain", "nested body")],
            ..Default::default()
        };
        let payload = MessagePart {
            mime_type: Some("multipart/mixed".to_string()),
            parts: vec![inner],
            ..Default::default()
        };

        assert_eq!(extract_body_text(&payload), "nested body");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(
            format_date("Mon, 2 Jun 2025 09:30:00 +0000"),
            "2025-06-02 09:30"
        );
        // Unparseable dates pass through
        assert_eq!(format_date("yesterday-ish"), "yesterday-ish");
    }

    #[test]
    fn test_truncate_chars_boundary() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte chars are not split
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
