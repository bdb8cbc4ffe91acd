//! Opaque cursor tokens
//!
//! A cursor is base64(JSON) over a small anchor record. Tokens are opaque to
//! clients; a token that fails to decode is the client's fault and surfaces
//! as 406 at the API layer.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid cursor token")]
    Invalid,
}

/// Decoded cursor anchor
///
/// `id` is the anchor row; `None` means a positionless jump (first or last
/// page). `dir` is 1 for forward, -1 for backward. `last` marks the
/// jump-to-last-page token, which sizes its window from the total count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub dir: i8,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub last: bool,
}

impl DecodedCursor {
    pub fn forward(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            dir: 1,
            last: false,
        }
    }

    pub fn backward(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            dir: -1,
            last: false,
        }
    }

    pub fn first_page() -> Self {
        Self {
            id: None,
            dir: 1,
            last: false,
        }
    }

    pub fn last_page() -> Self {
        Self {
            id: None,
            dir: -1,
            last: true,
        }
    }
}

pub fn encode_cursor(cursor: &DecodedCursor) -> String {
    // Serializing this struct cannot fail
    let json = serde_json::to_string(cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_cursor(token: &str) -> Result<DecodedCursor, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| CursorError::Invalid)?;
    let cursor: DecodedCursor =
        serde_json::from_slice(&bytes).map_err(|_| CursorError::Invalid)?;
    if cursor.dir != 1 && cursor.dir != -1 {
        return Err(CursorError::Invalid);
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_ascii_id() {
        let cursor = DecodedCursor::forward("cl9y2x");
        assert_eq!(decode_cursor(&encode_cursor(&cursor)), Ok(cursor));
    }

    #[test]
    fn round_trip_unicode_id() {
        let cursor = DecodedCursor::backward("héllo-世界");
        assert_eq!(decode_cursor(&encode_cursor(&cursor)), Ok(cursor));
    }

    #[test]
    fn round_trip_positionless_tokens() {
        for cursor in [DecodedCursor::first_page(), DecodedCursor::last_page()] {
            assert_eq!(decode_cursor(&encode_cursor(&cursor)), Ok(cursor));
        }
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert_eq!(decode_cursor("not base64!!"), Err(CursorError::Invalid));
        // Valid base64 but not JSON
        let token = URL_SAFE_NO_PAD.encode("hello");
        assert_eq!(decode_cursor(&token), Err(CursorError::Invalid));
        // Valid JSON but a bad direction
        let token = URL_SAFE_NO_PAD.encode(r#"{"id":"a","dir":5}"#);
        assert_eq!(decode_cursor(&token), Err(CursorError::Invalid));
    }
}
