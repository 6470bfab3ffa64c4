// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT claim structures
//!
//! [`TokenRequest`] gathers the caller supplied inputs of an issuance, and
//! [`VerifiedClaims`] is the read-only view a verifier hands back.
//! On the wire both use the registered claim names of RFC 7519 (`iss`, `sub`,
//! `aud`, `jti`, `iat`, `nbf`, `exp`) next to any custom keys.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Names the issuer and verifier own; custom claims never override them
pub const REGISTERED_CLAIMS: [&str; 7] = ["iss", "sub", "aud", "jti", "iat", "nbf", "exp"];

/// Inputs of a single issuance
///
/// Every field is optional. An empty request still produces a valid token that
/// carries the issuer name, a fresh token id and the issue time.
///
/// ```rust
/// use chrono::Duration;
/// use jwt_clients::jwt::TokenRequest;
///
/// let request = TokenRequest::new()
///     .subject("1024")
///     .audience("billing")
///     .claim("role", "admin")
///     .ttl(Duration::minutes(15));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub(crate) subject: Option<String>,
    pub(crate) audiences: Vec<String>,
    pub(crate) claims: Map<String, Value>,
    pub(crate) rejected_claims: Vec<String>,
    pub(crate) ttl: Option<Duration>,
    pub(crate) not_before: Option<DateTime<Utc>>,
}

impl TokenRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the principal the token is about
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Append an intended recipient
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audiences.push(audience.into());
        self
    }

    /// Append several intended recipients, keeping their order
    pub fn audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audiences.extend(audiences.into_iter().map(Into::into));
        self
    }

    /// Add a custom claim
    ///
    /// A value that cannot be represented as JSON is remembered and makes the
    /// issuance fail instead of being dropped silently.
    pub fn claim<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.claims.insert(key, value);
            }
            Err(e) => self.rejected_claims.push(format!("claim '{key}': {e}")),
        }
        self
    }

    /// Merge a map of custom claims
    pub fn claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims.extend(claims);
        self
    }

    /// Lifetime of the token, counted from the issue time
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Instant before which the token must not be accepted
    pub fn not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.not_before = Some(not_before);
        self
    }
}

/// `aud` is either a single string or an array on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Registered claims plus everything else, as they travel in the payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct JwtClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl JwtClaims {
    pub(crate) fn with_audiences(mut self, audiences: &[String]) -> Self {
        self.aud = if audiences.is_empty() {
            None
        } else {
            Some(Audience::Many(audiences.to_vec()))
        };
        self
    }

    pub(crate) fn audiences(&self) -> Vec<String> {
        match &self.aud {
            None => Vec::new(),
            Some(Audience::One(aud)) => vec![aud.clone()],
            Some(Audience::Many(aud)) => aud.clone(),
        }
    }
}

/// The claims of a token that passed verification
///
/// The record is immutable: accessors hand out borrowed or copied data only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    audiences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<DateTime<Utc>>,
    claims: Map<String, Value>,
}

impl VerifiedClaims {
    pub(crate) fn from_wire(claims: JwtClaims) -> Self {
        let audiences = claims.audiences();
        Self {
            issuer: claims.iss,
            subject: claims.sub,
            audiences,
            id: claims.jti,
            issued_at: claims.iat.and_then(timestamp),
            not_before: claims.nbf.and_then(timestamp),
            expiration: claims.exp.and_then(timestamp),
            claims: claims.custom,
        }
    }

    /// Issuer name stamped by the issuer
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Principal identifier
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Intended recipients, in issue order
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    /// Unique token identifier
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// `None` for tokens that never expire
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Look up a custom claim
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// Look up a custom claim and deserialize it
    ///
    /// Returns `Ok(None)` if the claim is absent.
    pub fn claim_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.claims
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// Iterate over every custom claim
    pub fn custom_claims(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.claims.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
