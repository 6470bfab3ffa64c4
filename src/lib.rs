// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT clients library
//!
//! Issue and verify signed bearer tokens in unsecured, HS256 or RS256 mode,
//! with optional Rocket request guards for services that consume them.
//!
//! - [`jwt`]: issuers, verifiers and their constructors
//! - [`error`]: key and token error kinds
//! - [`config`]: YAML configuration of the command line tool and token service
//! - [`web`]: Rocket guards, problem details and the token service

pub mod config;
pub mod error;
pub mod jwt;
pub mod web;

pub use error::{KeyError, KeyKind, TokenError, VerificationFailure};
pub use jwt::{
    clients, JwtIssuer, JwtVerifier, KeyMode, SubjectPolicy, TokenIssuer, TokenRequest,
    TokenVerifier, VerifiedClaims,
};
