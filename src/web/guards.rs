// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guards of the token service
//!
//! A rejected guard stores its [`ProblemDetail`] in the request-local cache so
//! the default catcher can render it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

use super::problem::ProblemDetail;
use crate::jwt::{TokenVerifier, VerifiedClaims};

/// Problem stashed by a failing guard
pub(crate) struct StashedProblem(pub(crate) Option<ProblemDetail>);

fn reject<T>(request: &Request<'_>, problem: ProblemDetail) -> Outcome<T, ProblemDetail> {
    let status = problem.status();
    let stashed = problem.clone();
    request.local_cache(move || StashedProblem(Some(stashed)));
    Outcome::Error((status, problem))
}

/// Claims of the bearer token sent with the request
///
/// ```rust,ignore
/// use rocket::get;
/// use jwt_clients::web::AuthenticatedClaims;
///
/// #[get("/me")]
/// fn me(claims: AuthenticatedClaims) -> Option<String> {
///     claims.0.subject().map(str::to_string)
/// }
/// ```
#[derive(Debug)]
pub struct AuthenticatedClaims(pub VerifiedClaims);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedClaims {
    type Error = ProblemDetail;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let header = request
            .headers()
            .get_one("Authorization")
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let Some(header) = header else {
            return reject(
                request,
                ProblemDetail::new(Status::BadRequest, "Missing HTTP header: Authorization"),
            );
        };

        let Some(token) = header.strip_prefix("Bearer ") else {
            return reject(
                request,
                ProblemDetail::new(
                    Status::Unauthorized,
                    "Authorization header must use the Bearer scheme",
                ),
            );
        };

        let Some(verifier) = request.rocket().state::<Arc<dyn TokenVerifier>>() else {
            log::error!("No token verifier is managed by this Rocket instance");
            return reject(request, ProblemDetail::unhandled());
        };

        match verifier.verify_token(token.trim()) {
            Ok(claims) => Outcome::Success(AuthenticatedClaims(claims)),
            Err(e) => reject(request, ProblemDetail::from(&e)),
        }
    }
}

/// Scope demanded by a [`RequireScope`] guard
pub trait ScopeRequirement: Send + Sync + 'static {
    const SCOPE: &'static str;
}

/// Scopes granted by the `scope` claim, a space separated string or an array
pub fn granted_scopes(claims: &VerifiedClaims) -> Vec<String> {
    match claims.claim("scope") {
        Some(serde_json::Value::String(scopes)) => {
            scopes.split_whitespace().map(str::to_string).collect()
        }
        Some(serde_json::Value::Array(scopes)) => scopes
            .iter()
            .filter_map(|scope| scope.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Bearer token claims that also grant `S::SCOPE`
///
/// Fails with 403 when the token is valid but lacks the scope.
pub struct RequireScope<S: ScopeRequirement> {
    pub claims: VerifiedClaims,
    _scope: PhantomData<S>,
}

impl<S: ScopeRequirement> fmt::Debug for RequireScope<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequireScope")
            .field("scope", &S::SCOPE)
            .field("claims", &self.claims)
            .finish()
    }
}

#[rocket::async_trait]
impl<'r, S: ScopeRequirement> FromRequest<'r> for RequireScope<S> {
    type Error = ProblemDetail;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let claims = match AuthenticatedClaims::from_request(request).await {
            Outcome::Success(authenticated) => authenticated.0,
            Outcome::Error(failure) => return Outcome::Error(failure),
            Outcome::Forward(forward) => return Outcome::Forward(forward),
        };

        if granted_scopes(&claims).iter().any(|scope| scope == S::SCOPE) {
            Outcome::Success(RequireScope {
                claims,
                _scope: PhantomData,
            })
        } else {
            log::warn!(
                "Subject {:?} lacks required scope '{}'",
                claims.subject(),
                S::SCOPE
            );
            reject(
                request,
                ProblemDetail::new(
                    Status::Forbidden,
                    format!("Insufficient permission: missing scope '{}'", S::SCOPE),
                ),
            )
        }
    }
}

/// Static credential expected in the `X-Api-Key` header
#[derive(Clone)]
pub struct ApiKeyConfig {
    key: String,
}

impl ApiKeyConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn matches(&self, candidate: &str) -> bool {
        !self.key.is_empty() && self.key == candidate
    }
}

impl fmt::Debug for ApiKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyConfig").field("key", &"<redacted>").finish()
    }
}

/// Proof that the request carried the configured API key
#[derive(Debug)]
pub struct ApiKey;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApiKey {
    type Error = ProblemDetail;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = request.rocket().state::<ApiKeyConfig>() else {
            log::error!("No API key is managed by this Rocket instance");
            return reject(request, ProblemDetail::unhandled());
        };

        let provided = request
            .headers()
            .get_one("X-Api-Key")
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match provided {
            None => reject(
                request,
                ProblemDetail::new(Status::Unauthorized, "Missing API key"),
            ),
            Some(key) if config.matches(key) => Outcome::Success(ApiKey),
            Some(_) => {
                log::warn!("Rejected request with an invalid API key");
                reject(
                    request,
                    ProblemDetail::new(Status::Unauthorized, "Invalid API key"),
                )
            }
        }
    }
}
