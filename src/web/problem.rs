// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Problem details responses (RFC 7807 flavoured)
//!
//! Every failure leaving the token service is rendered as an
//! `application/problem+json` document:
//!
//! ```json
//! {
//!   "status": 400,
//!   "title": "Bad Request",
//!   "detail": "Token issuance failed: ttl must be a positive duration, got 0s",
//!   "timestamp": "2025-05-01T10:00:00Z",
//!   "trace": "3f0c6a8e-52c1-4c61-9a44-0d1b1f7f2f6b",
//!   "errors": [{ "field": "ttl_secs", "message": "ttl must be a positive duration, got 0s" }]
//! }
//! ```

use std::io::Cursor;

use chrono::{DateTime, Utc};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// Body of the 500 response; internal details are only logged
pub const UNHANDLED_ERROR_DETAIL: &str = "An unhandled error occured at the server side";

/// One invalid input of a validation-style failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

/// Problem details payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetail {
    pub status: u16,
    pub title: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    /// Identifier of this occurrence, repeated in the server log for 5xx
    #[serde(default)]
    pub trace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldValidationError>,
}

impl ProblemDetail {
    /// Problem titled with the reason phrase of `status`
    pub fn new(status: Status, detail: impl Into<String>) -> Self {
        Self {
            status: status.code,
            title: status.reason().unwrap_or("Unknown Error").to_string(),
            detail: detail.into(),
            timestamp: Utc::now(),
            trace: Uuid::new_v4().to_string(),
            errors: Vec::new(),
        }
    }

    /// Attach a field error
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.push(FieldValidationError {
            field: field.into(),
            message: message.into(),
        });
        self
    }

    pub fn status(&self) -> Status {
        Status::new(self.status)
    }

    /// Generic 500 problem
    pub fn unhandled() -> Self {
        Self::new(Status::InternalServerError, UNHANDLED_ERROR_DETAIL)
    }
}

impl From<&TokenError> for ProblemDetail {
    fn from(error: &TokenError) -> Self {
        match error {
            TokenError::IssuanceFailed { message, field } => {
                let problem = ProblemDetail::new(Status::BadRequest, error.to_string());
                match field {
                    Some(field) => problem.with_field_error(*field, message.clone()),
                    None => problem,
                }
            }
            TokenError::VerificationFailed(_) | TokenError::Malformed(_) => {
                ProblemDetail::new(Status::Unauthorized, error.to_string())
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for ProblemDetail {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::to_string(&self).map_err(|e| {
            log::error!("Failed to serialize problem details: {}", e);
            Status::InternalServerError
        })?;

        Response::build()
            .status(self.status())
            .header(ContentType::new("application", "problem+json"))
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
