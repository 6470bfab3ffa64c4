// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT verifier
//!
//! Verification runs in a fixed order and stops at the first failure:
//!
//! 1. parse the compact structure
//! 2. check the signature with the bound key (nothing to check in unsecured mode)
//! 3. check `nbf` and `exp` against the clock
//! 4. apply the [`SubjectPolicy`]
//!
//! Steps 1 to 3 fail with [`TokenError::VerificationFailed`], step 4 with
//! [`TokenError::Malformed`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};

use super::claims::{JwtClaims, VerifiedClaims};
use super::keys::{KeyMode, VerificationKey};
use super::unsecured;
use super::validation::{check_subject, check_time_window, SubjectPolicy};
use crate::error::{TokenError, VerificationFailure};

/// Validates tokens and reconstructs their claims
pub trait TokenVerifier: Send + Sync {
    /// Verify a token as of `now`
    fn verify_token_at(&self, token: &str, now: DateTime<Utc>)
        -> Result<VerifiedClaims, TokenError>;

    /// Verify a token as of the current wall-clock time
    fn verify_token(&self, token: &str) -> Result<VerifiedClaims, TokenError> {
        self.verify_token_at(token, Utc::now())
    }
}

/// Token verifier bound to one key mode
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    key: VerificationKey,
    leeway: u64,
    subject_policy: SubjectPolicy,
}

impl JwtVerifier {
    pub(crate) fn new(key: VerificationKey) -> Self {
        log::debug!("Created JWT verifier in {:?} mode", key.mode());
        Self {
            key,
            leeway: 0,
            subject_policy: SubjectPolicy::default(),
        }
    }

    /// Tolerate `seconds` of clock skew on `nbf` and `exp`
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Choose which subjects are accepted
    pub fn with_subject_policy(mut self, policy: SubjectPolicy) -> Self {
        self.subject_policy = policy;
        self
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key.mode()
    }

    pub fn leeway(&self) -> u64 {
        self.leeway
    }

    pub fn subject_policy(&self) -> SubjectPolicy {
        self.subject_policy
    }

    /// Structure and signature checks; temporal claims are left to the caller
    fn authenticate(&self, token: &str) -> Result<JwtClaims, VerificationFailure> {
        let Some((algorithm, key)) = self.key.decoding() else {
            return unsecured::decode(token);
        };

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        decode::<JwtClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => VerificationFailure::Signature,
                ErrorKind::InvalidAlgorithm => {
                    VerificationFailure::UnsupportedAlgorithm(header_algorithm(token))
                }
                _ => VerificationFailure::Structure(e.to_string()),
            })
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedClaims, TokenError> {
        let claims = self
            .authenticate(token)
            .and_then(|claims| check_time_window(&claims, now, self.leeway).map(|_| claims))
            .inspect_err(|failure| log::warn!("Rejected token: {}", failure))?;

        check_subject(&claims, self.subject_policy)
            .inspect_err(|e| log::warn!("Rejected token: {}", e))?;

        Ok(VerifiedClaims::from_wire(claims))
    }
}

/// Best effort read of the `alg` header, for error messages only
fn header_algorithm(token: &str) -> String {
    jsonwebtoken::decode_header(token)
        .map(|header| format!("{:?}", header.alg))
        .unwrap_or_else(|_| "unknown".to_string())
}
