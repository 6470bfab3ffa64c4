// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Compact serialization for unsecured (`alg: none`) tokens
//!
//! `jsonwebtoken` refuses the `none` algorithm, so the three segments are
//! assembled here: `base64url(header).base64url(payload).` with an empty
//! signature segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::claims::JwtClaims;
use crate::error::{TokenError, VerificationFailure};

#[derive(Debug, Serialize, Deserialize)]
struct UnsecuredHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Serialize claims as an unsecured token
pub(crate) fn encode(claims: &JwtClaims) -> Result<String, TokenError> {
    let header = UnsecuredHeader {
        alg: "none".to_string(),
        typ: Some("JWT".to_string()),
    };
    let header = serde_json::to_vec(&header)
        .map_err(|e| TokenError::issuance(format!("cannot serialize header: {e}")))?;
    let payload = serde_json::to_vec(claims)
        .map_err(|e| TokenError::issuance(format!("cannot serialize claims: {e}")))?;

    Ok(format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    ))
}

/// Parse an unsecured token
///
/// Signed tokens are refused: without a key there is nothing to check their
/// signature against.
pub(crate) fn decode(token: &str) -> Result<JwtClaims, VerificationFailure> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(VerificationFailure::Structure(
            "expected three dot separated segments".into(),
        ));
    };

    let header: UnsecuredHeader = decode_segment(header, "header")?;
    if header.alg != "none" {
        return Err(VerificationFailure::UnsupportedAlgorithm(header.alg));
    }
    if !signature.is_empty() {
        return Err(VerificationFailure::Signature);
    }

    decode_segment(payload, "payload")
}

fn decode_segment<T: for<'de> Deserialize<'de>>(
    segment: &str,
    name: &str,
) -> Result<T, VerificationFailure> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| VerificationFailure::Structure(format!("{name} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VerificationFailure::Structure(format!("{name} is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_token_has_empty_signature() {
        let claims = JwtClaims {
            sub: Some("1".into()),
            ..JwtClaims::default()
        };
        let token = encode(&claims).unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert!(segments[2].is_empty());

        let header = URL_SAFE_NO_PAD.decode(segments[0]).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&header).unwrap();
        assert_eq!(header["alg"], "none");
        assert_eq!(header["typ"], "JWT");

        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.sub.as_deref(), Some("1"));
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        assert!(matches!(
            decode("only.two"),
            Err(VerificationFailure::Structure(_))
        ));
        assert!(matches!(
            decode("a.b.c.d"),
            Err(VerificationFailure::Structure(_))
        ));
    }

    #[test]
    fn test_rejects_signed_header() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"1"}"#);
        let token = format!("{header}.{payload}.c2lnbmF0dXJl");
        assert_eq!(
            decode(&token).unwrap_err(),
            VerificationFailure::UnsupportedAlgorithm("HS256".into())
        );
    }

    #[test]
    fn test_rejects_none_with_signature() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"1"}"#);
        let token = format!("{header}.{payload}.c2lnbmF0dXJl");
        assert_eq!(decode(&token).unwrap_err(), VerificationFailure::Signature);
    }

    #[test]
    fn test_rejects_garbage_payload() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let token = format!("{header}.%%%.");
        assert!(matches!(
            decode(&token),
            Err(VerificationFailure::Structure(_))
        ));
    }
}
