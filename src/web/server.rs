// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token service
//!
//! | Route | Guard | Purpose |
//! |-------|-------|---------|
//! | `GET /health` | none | liveness probe |
//! | `GET /api/whoami` | bearer token | echo the verified claims |
//! | `POST /api/tokens` | `X-Api-Key` | issue a token |

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rocket::figment::Figment;
use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{catch, catchers, get, post, routes, Build, Request, Rocket, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::guards::{ApiKey, ApiKeyConfig, AuthenticatedClaims, StashedProblem};
use super::problem::{FieldValidationError, ProblemDetail};
use crate::error::TokenError;
use crate::jwt::{TokenIssuer, TokenRequest, TokenVerifier, VerifiedClaims};

/// Issuer shared by the issuance route
pub struct TokenService {
    issuer: Arc<dyn TokenIssuer>,
    default_ttl: Option<Duration>,
}

/// Body of `POST /api/tokens`
#[derive(Debug, Default, Deserialize)]
pub struct IssueTokenBody {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub audiences: Vec<String>,
    #[serde(default)]
    pub claims: Map<String, Value>,
    /// Lifetime in seconds; the configured default applies when absent
    #[serde(default)]
    pub ttl_secs: Option<i64>,
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
}

/// Response of `POST /api/tokens`
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

#[get("/health")]
fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: Utc::now(),
    })
}

#[get("/whoami")]
fn whoami(claims: AuthenticatedClaims) -> Json<VerifiedClaims> {
    Json(claims.0)
}

/// Type check every known field of a body that failed to deserialize
fn body_field_errors(body: &Map<String, Value>) -> Vec<FieldValidationError> {
    fn check<T: serde::de::DeserializeOwned>(
        errors: &mut Vec<FieldValidationError>,
        body: &Map<String, Value>,
        field: &str,
    ) {
        if let Some(value) = body.get(field) {
            if let Err(e) = serde_json::from_value::<T>(value.clone()) {
                errors.push(FieldValidationError {
                    field: field.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    let mut errors = Vec::new();
    check::<Option<String>>(&mut errors, body, "subject");
    check::<Vec<String>>(&mut errors, body, "audiences");
    check::<Map<String, Value>>(&mut errors, body, "claims");
    check::<Option<i64>>(&mut errors, body, "ttl_secs");
    check::<Option<DateTime<Utc>>>(&mut errors, body, "not_before");
    errors
}

/// Parse the issuance body, reporting shape errors per field
fn parse_issue_body(
    body: Result<Json<Map<String, Value>>, json::Error<'_>>,
) -> Result<IssueTokenBody, ProblemDetail> {
    let body = match body {
        Ok(body) => body.into_inner(),
        Err(json::Error::Parse(_, e)) => {
            return Err(ProblemDetail::new(
                Status::BadRequest,
                format!("Malformed JSON body: {}", e),
            ))
        }
        Err(e) => {
            return Err(ProblemDetail::new(
                Status::BadRequest,
                format!("Unreadable request body: {}", e),
            ))
        }
    };

    serde_json::from_value(Value::Object(body.clone())).map_err(|e| {
        let mut problem = ProblemDetail::new(Status::BadRequest, "Validation failed");
        problem.errors = body_field_errors(&body);
        if problem.errors.is_empty() {
            problem = problem.with_field_error("body", e.to_string());
        }
        problem
    })
}

#[post("/tokens", format = "json", data = "<body>")]
fn issue_token(
    _key: ApiKey,
    service: &State<TokenService>,
    body: Result<Json<Map<String, Value>>, json::Error<'_>>,
) -> Result<Json<IssuedToken>, ProblemDetail> {
    let body = parse_issue_body(body)?;

    let ttl = match body.ttl_secs {
        Some(secs) => Some(Duration::try_seconds(secs).ok_or_else(|| {
            ProblemDetail::new(Status::BadRequest, "ttl_secs is out of range")
                .with_field_error("ttl_secs", "ttl_secs is out of range")
        })?),
        None => service.default_ttl,
    };

    let mut request = TokenRequest::new()
        .audiences(body.audiences)
        .claims(body.claims);
    if let Some(subject) = body.subject {
        request = request.subject(subject);
    }
    if let Some(ttl) = ttl {
        request = request.ttl(ttl);
    }
    if let Some(not_before) = body.not_before {
        request = request.not_before(not_before);
    }

    let access_token = service
        .issuer
        .issue_token(&request)
        .map_err(|e| issuance_problem(&e))?;

    Ok(Json(IssuedToken {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: ttl.map(|ttl| ttl.num_seconds()),
    }))
}

/// Report a ttl failure against the request field name
fn issuance_problem(error: &TokenError) -> ProblemDetail {
    let mut problem = ProblemDetail::from(error);
    for entry in &mut problem.errors {
        if entry.field == "ttl" {
            entry.field = "ttl_secs".to_string();
        }
    }
    problem
}

#[catch(default)]
fn default_catcher(status: Status, request: &Request<'_>) -> ProblemDetail {
    if let StashedProblem(Some(problem)) = request.local_cache(|| StashedProblem(None)) {
        return problem.clone();
    }

    if status.code >= 500 {
        let problem = ProblemDetail::unhandled();
        log::error!(
            "Unhandled error {} on {} {} (trace {})",
            status,
            request.method(),
            request.uri(),
            problem.trace
        );
        return problem;
    }

    ProblemDetail::new(status, status.reason().unwrap_or("Request failed"))
}

/// Build the token service
///
/// ### Arguments
///
/// * `figment` - Rocket configuration (address, port, log level)
/// * `issuer` - issuer backing `POST /api/tokens`
/// * `verifier` - verifier backing the bearer guard
/// * `api_key` - credential expected on issuance requests
/// * `default_ttl` - lifetime used when the request gives none
pub fn build_rocket(
    figment: Figment,
    issuer: Arc<dyn TokenIssuer>,
    verifier: Arc<dyn TokenVerifier>,
    api_key: ApiKeyConfig,
    default_ttl: Option<Duration>,
) -> Rocket<Build> {
    rocket::custom(figment)
        .mount("/", routes![health])
        .mount("/api", routes![whoami, issue_token])
        .register("/", catchers![default_catcher])
        .manage(TokenService {
            issuer,
            default_ttl,
        })
        .manage(verifier)
        .manage(api_key)
}
