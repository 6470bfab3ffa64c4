// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT issuer
//!
//! [`JwtIssuer`] stamps its issuer name, a fresh token id and the issue time
//! into every token and signs the result with the key it was built with.
//! It holds no mutable state and can be shared freely between threads.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use uuid::Uuid;

use super::claims::{JwtClaims, TokenRequest, REGISTERED_CLAIMS};
use super::keys::{KeyMode, SigningKey};
use super::unsecured;
use super::validation::check_ttl;
use crate::error::TokenError;

/// Builds signed tokens
pub trait TokenIssuer: Send + Sync {
    /// Issue a token as of `now`
    fn issue_token_at(&self, request: &TokenRequest, now: DateTime<Utc>)
        -> Result<String, TokenError>;

    /// Issue a token as of the current wall-clock time
    fn issue_token(&self, request: &TokenRequest) -> Result<String, TokenError> {
        self.issue_token_at(request, Utc::now())
    }
}

/// Token issuer bound to one key mode and one issuer name
#[derive(Debug)]
pub struct JwtIssuer {
    issuer: String,
    key: SigningKey,
}

impl JwtIssuer {
    pub(crate) fn new(issuer: impl Into<String>, key: SigningKey) -> Self {
        let issuer = issuer.into();
        log::debug!(
            "Created JWT issuer '{}' in {:?} mode",
            issuer,
            key.mode()
        );
        Self { issuer, key }
    }

    /// Issuer name stamped into the `iss` claim
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key.mode()
    }

    fn build_claims(
        &self,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, TokenError> {
        check_ttl(request.ttl)?;
        if let Some(rejected) = request.rejected_claims.first() {
            return Err(TokenError::issuance(format!(
                "cannot serialize custom {rejected}"
            )));
        }

        let mut custom = request.claims.clone();
        for name in REGISTERED_CLAIMS {
            if custom.remove(name).is_some() {
                log::debug!("Ignoring custom claim '{}' shadowing a registered claim", name);
            }
        }

        let exp = match request.ttl {
            Some(ttl) => Some(
                now.checked_add_signed(ttl)
                    .ok_or_else(|| {
                        TokenError::issuance_field("ttl", "expiration is out of range")
                    })?
                    .timestamp(),
            ),
            None => None,
        };

        Ok(JwtClaims {
            iss: Some(self.issuer.clone()),
            sub: request.subject.clone(),
            jti: Some(Uuid::new_v4().to_string()),
            iat: Some(now.timestamp()),
            nbf: request.not_before.map(ceil_timestamp),
            exp,
            custom,
            ..JwtClaims::default()
        }
        .with_audiences(&request.audiences))
    }
}

/// Whole seconds, rounded up so `nbf` never precedes the requested instant
fn ceil_timestamp(instant: DateTime<Utc>) -> i64 {
    let secs = instant.timestamp();
    if instant.timestamp_subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue_token_at(
        &self,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = self.build_claims(request, now)?;

        let token = match &self.key {
            SigningKey::Unsecured => unsecured::encode(&claims)?,
            SigningKey::Symmetric(key) => encode(&Header::new(Algorithm::HS256), &claims, key)
                .map_err(|e| TokenError::issuance(format!("HS256 signing failed: {e}")))?,
            SigningKey::Private(key) => encode(&Header::new(Algorithm::RS256), &claims, key)
                .map_err(|e| TokenError::issuance(format!("RS256 signing failed: {e}")))?,
        };

        log::debug!(
            "Issued {} token {} for subject {:?}",
            self.key.mode().algorithm_name(),
            claims.jti.as_deref().unwrap_or_default(),
            claims.sub
        );
        Ok(token)
    }
}
