// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket integration
//!
//! Request guards that put a [`TokenVerifier`](crate::jwt::TokenVerifier) and a
//! static API key in front of routes, problem details rendering, and a small
//! token service built on both.

pub mod guards;
pub mod problem;
pub mod server;

pub use guards::{
    granted_scopes, ApiKey, ApiKeyConfig, AuthenticatedClaims, RequireScope, ScopeRequirement,
};
pub use problem::{FieldValidationError, ProblemDetail, UNHANDLED_ERROR_DETAIL};
pub use server::{build_rocket, IssueTokenBody, IssuedToken};
