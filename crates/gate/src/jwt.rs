// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access token expiry extraction.
//!
//! Only the `exp` claim is read; signatures are never verified here. The
//! token is treated as an opaque three-part dot-delimited structure whose
//! middle segment is a URL-safe base64 JSON payload.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Failure to extract an expiry from an access token.
///
/// Never fatal — callers log it and treat the expiry as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtError {
    /// Token is not a three-part dot-delimited structure.
    Malformed,
    /// Payload segment is not valid URL-safe base64.
    Encoding,
    /// Payload bytes are not UTF-8.
    Utf8,
    /// Payload text is not valid JSON.
    Json,
    /// Payload carries no numeric `exp` claim.
    MissingExp,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "token is not a three-part structure"),
            Self::Encoding => write!(f, "payload is not valid base64"),
            Self::Utf8 => write!(f, "payload is not UTF-8"),
            Self::Json => write!(f, "payload is not valid JSON"),
            Self::MissingExp => write!(f, "payload has no numeric exp claim"),
        }
    }
}

/// Decode the `exp` claim (seconds since epoch) of an access token and
/// return it as milliseconds since epoch.
pub fn decode_expiry_ms(token: &str) -> Result<u64, JwtError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(JwtError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| JwtError::Encoding)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| JwtError::Utf8)?;
    let claims: serde_json::Value = serde_json::from_str(text).map_err(|_| JwtError::Json)?;

    let exp = claims.get("exp").and_then(|v| v.as_u64()).ok_or(JwtError::MissingExp)?;
    Ok(exp.saturating_mul(1000))
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
