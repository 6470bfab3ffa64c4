// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for key construction, token issuance and token verification
//!
//! Three families of failures are kept apart on purpose so callers can match on them:
//!
//! * [`KeyError`] - raised while wiring an issuer or verifier (bad or missing key material).
//!   These are configuration bugs and are expected to abort startup.
//! * [`TokenError`] - raised per call by [`crate::jwt::TokenIssuer`] and
//!   [`crate::jwt::TokenVerifier`].
//! * [`VerificationFailure`] - the reason carried by [`TokenError::VerificationFailed`].

use std::fmt;
use thiserror::Error;

/// The role a piece of key material plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Shared HMAC secret
    Symmetric,
    /// RSA private key used for signing
    Private,
    /// RSA public key used for verification
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Symmetric => write!(f, "Symmetric"),
            KeyKind::Private => write!(f, "Private"),
            KeyKind::Public => write!(f, "Public"),
        }
    }
}

/// Construction-time failures for issuers and verifiers
#[derive(Error, Debug)]
pub enum KeyError {
    /// No key material was supplied to a keyed constructor
    #[error("{0} key must not be empty")]
    Missing(KeyKind),

    /// The key material could not be parsed
    #[error("Invalid {kind} key: {reason}")]
    Invalid { kind: KeyKind, reason: String },

    /// RSA key pair generation failed
    #[error("Failed to generate RSA key pair: {reason}")]
    Generation { reason: String },
}

/// Why a token was rejected during verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The token is not a well-formed compact token
    #[error("invalid token structure: {0}")]
    Structure(String),

    /// The header names an algorithm this verifier does not accept
    #[error("unexpected signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the verification key
    #[error("signature does not match")]
    Signature,

    /// The current time is at or after the `exp` claim
    #[error("token has expired")]
    Expired,

    /// The current time is before the `nbf` claim
    #[error("token is not yet valid")]
    NotYetValid,
}

/// Per-call failures of issuance and verification
#[derive(Error, Debug)]
pub enum TokenError {
    /// The token could not be built or signed
    #[error("Token issuance failed: {message}")]
    IssuanceFailed {
        /// Human readable reason
        message: String,
        /// Name of the offending input, when the failure is tied to one
        field: Option<&'static str>,
    },

    /// Signature, structure or a temporal claim did not check out
    #[error("Token verification failed: {0}")]
    VerificationFailed(#[from] VerificationFailure),

    /// The token is authentic but its subject does not follow the principal-ID convention
    #[error("Token is malformed: {0}")]
    Malformed(String),
}

impl TokenError {
    pub(crate) fn issuance(message: impl Into<String>) -> Self {
        TokenError::IssuanceFailed {
            message: message.into(),
            field: None,
        }
    }

    pub(crate) fn issuance_field(field: &'static str, message: impl Into<String>) -> Self {
        TokenError::IssuanceFailed {
            message: message.into(),
            field: Some(field),
        }
    }

    /// True for every rejection a verifier can produce
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::VerificationFailed(_) | TokenError::Malformed(_)
        )
    }
}
