// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Constructors for matched issuers and verifiers
//!
//! One function per key mode and role. Tokens from an issuer built here are
//! meant for the verifier built from the matching key: the same secret in
//! symmetric mode, the public half of the same pair in asymmetric mode.
//!
//! ```rust
//! use jwt_clients::jwt::{clients, TokenIssuer, TokenRequest, TokenVerifier};
//!
//! let issuer = clients::new_issuer("hireben.dev");
//! let verifier = clients::new_verifier();
//!
//! let token = issuer.issue_token(&TokenRequest::new().subject("7")).unwrap();
//! let claims = verifier.verify_token(&token).unwrap();
//! assert_eq!(claims.subject(), Some("7"));
//! ```

use super::issuer::JwtIssuer;
use super::keys::{SigningKey, VerificationKey};
use super::verifier::JwtVerifier;
use crate::error::KeyError;

/// Issuer producing unsecured (`alg: none`) tokens
pub fn new_issuer(issuer: impl Into<String>) -> JwtIssuer {
    JwtIssuer::new(issuer, SigningKey::Unsecured)
}

/// Issuer signing with a shared HMAC secret (HS256)
///
/// # Errors
///
/// [`KeyError::Missing`] if `secret` is empty, [`KeyError::Invalid`] if it is
/// shorter than 256 bits.
pub fn new_issuer_with_symmetric_key(
    issuer: impl Into<String>,
    secret: &[u8],
) -> Result<JwtIssuer, KeyError> {
    Ok(JwtIssuer::new(issuer, SigningKey::symmetric(secret)?))
}

/// Issuer signing with an RSA private key (RS256), PKCS#1 or PKCS#8 PEM
///
/// # Errors
///
/// [`KeyError::Missing`] if `private_key_pem` is empty, [`KeyError::Invalid`] if
/// it is not an RSA private key of at least 2048 bits.
pub fn new_issuer_with_private_key(
    issuer: impl Into<String>,
    private_key_pem: &[u8],
) -> Result<JwtIssuer, KeyError> {
    Ok(JwtIssuer::new(issuer, SigningKey::private_pem(private_key_pem)?))
}

/// Verifier accepting unsecured (`alg: none`) tokens only
pub fn new_verifier() -> JwtVerifier {
    JwtVerifier::new(VerificationKey::Unsecured)
}

/// Verifier checking HS256 signatures against a shared secret
pub fn new_verifier_with_symmetric_key(secret: &[u8]) -> Result<JwtVerifier, KeyError> {
    Ok(JwtVerifier::new(VerificationKey::symmetric(secret)?))
}

/// Verifier checking RS256 signatures against an RSA public key, PKCS#1 or SPKI PEM
pub fn new_verifier_with_public_key(public_key_pem: &[u8]) -> Result<JwtVerifier, KeyError> {
    Ok(JwtVerifier::new(VerificationKey::public_pem(public_key_pem)?))
}
