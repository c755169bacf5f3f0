//! Inbound request parsing.
//!
//! Device mails arrive as free text, single- or multi-line, with
//! case-insensitive keywords:
//!
//! ```text
//! GRIB <query-command>
//!
//! Reply to Garmin: <url>
//! ```
//!
//! Parsing is a pure function: the same text always yields the same
//! request or the same failure.

use thiserror::Error;

/// Marker separating the request body from the reply destination.
const REPLY_MARKER: &str = "reply to garmin:";

/// Recognized kind prefixes (matched against the leading token).
const WEATHER_PREFIX: &str = "grib";
const CHAT_PREFIX: &str = "chat";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no 'Reply to Garmin:' destination in request")]
    MissingDestination,

    #[error("unknown request kind: '{leading}'")]
    UnknownKind { leading: String },

    #[error("request has no payload after its kind prefix")]
    EmptyPayload,
}

/// What the device is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A weather/data query to forward downstream.
    Weather,
    /// A prompt for the chat collaborator.
    Chat,
}

/// One parsed inbound request. Immutable; consumed once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub kind: RequestKind,
    pub payload_text: String,
    pub reply_url: String,
}

/// Parse one raw inbound mail body into an [`InboundRequest`].
pub fn parse(raw: &str) -> Result<InboundRequest, ParseError> {
    // Collapse whitespace runs so multi-line and single-line forms parse
    // identically; keep the normalized text for field extraction.
    let text = normalize(raw);
    let lowered = text.to_ascii_lowercase();

    let marker_at = lowered
        .find(REPLY_MARKER)
        .ok_or(ParseError::MissingDestination)?;

    let reply_url = text[marker_at + REPLY_MARKER.len()..].trim();
    if reply_url.is_empty() {
        return Err(ParseError::MissingDestination);
    }

    let body = text[..marker_at].trim();
    let (leading, remainder) = match body.split_once(' ') {
        Some((first, rest)) => (first, rest),
        None => (body, ""),
    };

    let kind = if leading.eq_ignore_ascii_case(WEATHER_PREFIX) {
        RequestKind::Weather
    } else if leading.eq_ignore_ascii_case(CHAT_PREFIX) {
        RequestKind::Chat
    } else {
        return Err(ParseError::UnknownKind {
            leading: leading.to_string(),
        });
    };

    let payload_text = remainder.trim_start();
    if payload_text.is_empty() {
        return Err(ParseError::EmptyPayload);
    }

    Ok(InboundRequest {
        kind,
        payload_text: payload_text.to_string(),
        reply_url: reply_url.to_string(),
    })
}

/// Try to pull a reply destination out of text that failed to parse, so a
/// diagnostic can still reach the device.
#[must_use]
pub fn recover_destination(raw: &str) -> Option<String> {
    let text = normalize(raw);
    let lowered = text.to_ascii_lowercase();
    let marker_at = lowered.find(REPLY_MARKER)?;
    let url = text[marker_at + REPLY_MARKER.len()..].trim();
    (!url.is_empty()).then(|| url.to_string())
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_weather_request() {
        let req = parse("GRIB 45N,45W,5,5 reply to garmin: http://x?extId=ABC").unwrap();
        assert_eq!(req.kind, RequestKind::Weather);
        assert_eq!(req.payload_text, "45N,45W,5,5");
        assert_eq!(req.reply_url, "http://x?extId=ABC");
    }

    #[test]
    fn test_multi_line_request_normalizes_whitespace() {
        let raw = "grib  gfs:45N,44N\n\n  Reply To Garmin:   https://g/reply?extId=Z  ";
        let req = parse(raw).unwrap();
        assert_eq!(req.kind, RequestKind::Weather);
        assert_eq!(req.payload_text, "gfs:45N,44N");
        assert_eq!(req.reply_url, "https://g/reply?extId=Z");
    }

    #[test]
    fn test_chat_request() {
        let req = parse("CHAT what is the forecast? reply to garmin: http://g?extId=C").unwrap();
        assert_eq!(req.kind, RequestKind::Chat);
        assert_eq!(req.payload_text, "what is the forecast?");
    }

    #[test]
    fn test_missing_destination() {
        assert_eq!(parse("GRIB gfs:45N"), Err(ParseError::MissingDestination));
        assert_eq!(
            parse("GRIB gfs:45N reply to garmin:   "),
            Err(ParseError::MissingDestination)
        );
    }

    #[test]
    fn test_unknown_kind() {
        let err = parse("WIND 45N reply to garmin: http://x").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownKind {
                leading: "WIND".into()
            }
        );
    }

    #[test]
    fn test_no_kind_or_payload_fails() {
        assert!(matches!(
            parse("reply to garmin: http://x"),
            Err(ParseError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(
            parse("GRIB reply to garmin: http://x"),
            Err(ParseError::EmptyPayload)
        );
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let raw = "grib gfs:10S reply to garmin: http://g?extId=1";
        assert_eq!(parse(raw), parse(raw));
    }

    #[test]
    fn test_recover_destination_from_malformed_request() {
        assert_eq!(
            recover_destination("WIND 45N reply to garmin: http://x?extId=1"),
            Some("http://x?extId=1".to_string())
        );
        assert_eq!(recover_destination("WIND 45N"), None);
    }
}
