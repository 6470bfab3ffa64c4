// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT issuance and verification
//!
//! This module builds signed bearer tokens and checks them again, in one of three key modes:
//!
//! | Mode | Issuer key | Verifier key | `alg` |
//! |------|------------|--------------|-------|
//! | [`KeyMode::Unsecured`] | none | none | `none` |
//! | [`KeyMode::Symmetric`] | shared secret | shared secret | `HS256` |
//! | [`KeyMode::Asymmetric`] | RSA private key | RSA public key | `RS256` |
//!
//! Use the functions in [`clients`] to build a matched pair.

pub mod clients;

mod claims;
mod issuer;
mod keys;
mod unsecured;
mod validation;
mod verifier;

// Re-export public API
pub use claims::{TokenRequest, VerifiedClaims, REGISTERED_CLAIMS};
pub use issuer::{JwtIssuer, TokenIssuer};
pub use keys::{
    generate_rsa_key_pair, generate_symmetric_key, KeyMode, RsaPemPair, MIN_RSA_KEY_BITS,
    MIN_SYMMETRIC_KEY_LEN,
};
pub use validation::{is_principal_id, SubjectPolicy};
pub use verifier::{JwtVerifier, TokenVerifier};
