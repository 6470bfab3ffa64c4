// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # JWT Key Management
//!
//! This module holds the key material an issuer signs with and a verifier checks with.
//! A key is bound to exactly one mode when it is built and cannot be changed afterwards.
//!
//! ## Features
//!
//! * Unsecured mode (`alg: none`), no key at all
//! * Symmetric HMAC secrets (HS256)
//! * Asymmetric RSA key pairs (RS256), PKCS#1 or PKCS#8 PEM
//! * RSA key pair and HMAC secret generation
//!
//! ## Examples
//!
//! ```rust
//! use jwt_clients::jwt::generate_symmetric_key;
//! use jwt_clients::jwt::clients;
//!
//! let secret = generate_symmetric_key();
//! let issuer = clients::new_issuer_with_symmetric_key("hireben.dev", &secret).unwrap();
//! let verifier = clients::new_verifier_with_symmetric_key(&secret).unwrap();
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::Rng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyKind};

/// Smallest accepted HMAC secret, in bytes (256 bits for HS256)
pub const MIN_SYMMETRIC_KEY_LEN: usize = 32;

/// Smallest accepted RSA modulus, in bits
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Key mode an issuer or verifier is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// No signature, `alg: none`. Only for local or otherwise trusted contexts.
    #[serde(rename = "none")]
    Unsecured,
    /// Shared HMAC secret (HS256)
    Symmetric,
    /// RSA private key for issuance, public key for verification (RS256)
    Asymmetric,
}

impl KeyMode {
    /// Name of the `alg` header value produced in this mode
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            KeyMode::Unsecured => "none",
            KeyMode::Symmetric => "HS256",
            KeyMode::Asymmetric => "RS256",
        }
    }
}

/// Key material used by an issuer
pub(crate) enum SigningKey {
    Unsecured,
    Symmetric(EncodingKey),
    Private(EncodingKey),
}

impl SigningKey {
    /// Build an HMAC signing key from a shared secret
    pub(crate) fn symmetric(secret: &[u8]) -> Result<Self, KeyError> {
        check_symmetric(secret)?;
        Ok(SigningKey::Symmetric(EncodingKey::from_secret(secret)))
    }

    /// Build an RSA signing key from a PEM encoded private key
    pub(crate) fn private_pem(pem: &[u8]) -> Result<Self, KeyError> {
        if pem.is_empty() {
            return Err(KeyError::Missing(KeyKind::Private));
        }
        let text = pem_text(pem, KeyKind::Private)?;
        let private_key = RsaPrivateKey::from_pkcs1_pem(text)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(text))
            .map_err(|e| invalid(KeyKind::Private, e))?;
        check_modulus(private_key.size(), KeyKind::Private)?;

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| invalid(KeyKind::Private, e))?;
        Ok(SigningKey::Private(EncodingKey::from_rsa_der(der.as_bytes())))
    }

    pub(crate) fn mode(&self) -> KeyMode {
        match self {
            SigningKey::Unsecured => KeyMode::Unsecured,
            SigningKey::Symmetric(_) => KeyMode::Symmetric,
            SigningKey::Private(_) => KeyMode::Asymmetric,
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("mode", &self.mode())
            .field("key", &"<EncodingKey>")
            .finish()
    }
}

/// Key material used by a verifier
#[derive(Clone)]
pub(crate) enum VerificationKey {
    Unsecured,
    Symmetric(DecodingKey),
    Public(DecodingKey),
}

impl VerificationKey {
    /// Build an HMAC verification key from a shared secret
    pub(crate) fn symmetric(secret: &[u8]) -> Result<Self, KeyError> {
        check_symmetric(secret)?;
        Ok(VerificationKey::Symmetric(DecodingKey::from_secret(secret)))
    }

    /// Build an RSA verification key from a PEM encoded public key
    pub(crate) fn public_pem(pem: &[u8]) -> Result<Self, KeyError> {
        if pem.is_empty() {
            return Err(KeyError::Missing(KeyKind::Public));
        }
        let text = pem_text(pem, KeyKind::Public)?;
        let public_key = RsaPublicKey::from_pkcs1_pem(text)
            .or_else(|_| RsaPublicKey::from_public_key_pem(text))
            .map_err(|e| invalid(KeyKind::Public, e))?;
        check_modulus(public_key.size(), KeyKind::Public)?;

        // Components are handed over the same way a JWK would carry them
        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding_key =
            DecodingKey::from_rsa_components(&n, &e).map_err(|e| invalid(KeyKind::Public, e))?;
        Ok(VerificationKey::Public(decoding_key))
    }

    pub(crate) fn mode(&self) -> KeyMode {
        match self {
            VerificationKey::Unsecured => KeyMode::Unsecured,
            VerificationKey::Symmetric(_) => KeyMode::Symmetric,
            VerificationKey::Public(_) => KeyMode::Asymmetric,
        }
    }

    /// The signing algorithm and decoding key, `None` in unsecured mode
    pub(crate) fn decoding(&self) -> Option<(Algorithm, &DecodingKey)> {
        match self {
            VerificationKey::Unsecured => None,
            VerificationKey::Symmetric(key) => Some((Algorithm::HS256, key)),
            VerificationKey::Public(key) => Some((Algorithm::RS256, key)),
        }
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("mode", &self.mode())
            .field("key", &"<DecodingKey>")
            .finish()
    }
}

/// A freshly generated RSA key pair, both halves PKCS#1 PEM encoded
pub struct RsaPemPair {
    /// Private half, for [`crate::jwt::clients::new_issuer_with_private_key`]
    pub private_pem: String,
    /// Public half, for [`crate::jwt::clients::new_verifier_with_public_key`]
    pub public_pem: String,
}

impl std::fmt::Debug for RsaPemPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPemPair")
            .field("private_pem", &"<redacted>")
            .field("public_pem", &self.public_pem)
            .finish()
    }
}

/// Generate an RSA key pair suitable for RS256
///
/// # Errors
///
/// Returns [`KeyError::Generation`] if `bits` is below [`MIN_RSA_KEY_BITS`] or the
/// underlying generator fails.
pub fn generate_rsa_key_pair(bits: usize) -> Result<RsaPemPair, KeyError> {
    if bits < MIN_RSA_KEY_BITS {
        return Err(KeyError::Generation {
            reason: format!("key length {bits} is below the {MIN_RSA_KEY_BITS} bit minimum"),
        });
    }

    let mut rng = rsa::rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, bits).map_err(|e| KeyError::Generation {
        reason: e.to_string(),
    })?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|e| KeyError::Generation {
            reason: e.to_string(),
        })?;
    let public_pem = public_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|e| KeyError::Generation {
            reason: e.to_string(),
        })?;

    log::debug!("Generated {} bit RSA key pair", bits);
    Ok(RsaPemPair {
        private_pem: private_pem.to_string(),
        public_pem,
    })
}

/// Generate a random 256 bit HMAC secret
pub fn generate_symmetric_key() -> Vec<u8> {
    let mut rng = rand::rng();
    let secret: [u8; MIN_SYMMETRIC_KEY_LEN] = rng.random();
    secret.to_vec()
}

fn check_symmetric(secret: &[u8]) -> Result<(), KeyError> {
    if secret.is_empty() {
        return Err(KeyError::Missing(KeyKind::Symmetric));
    }
    if secret.len() < MIN_SYMMETRIC_KEY_LEN {
        return Err(KeyError::Invalid {
            kind: KeyKind::Symmetric,
            reason: format!(
                "HS256 requires at least {} bits, got {}",
                MIN_SYMMETRIC_KEY_LEN * 8,
                secret.len() * 8
            ),
        });
    }
    Ok(())
}

fn check_modulus(size_bytes: usize, kind: KeyKind) -> Result<(), KeyError> {
    let bits = size_bytes * 8;
    if bits < MIN_RSA_KEY_BITS {
        return Err(KeyError::Invalid {
            kind,
            reason: format!("RS256 requires at least {MIN_RSA_KEY_BITS} bits, got {bits}"),
        });
    }
    Ok(())
}

fn pem_text(pem: &[u8], kind: KeyKind) -> Result<&str, KeyError> {
    std::str::from_utf8(pem).map_err(|e| invalid(kind, e))
}

fn invalid(kind: KeyKind, reason: impl std::fmt::Display) -> KeyError {
    KeyError::Invalid {
        kind,
        reason: reason.to_string(),
    }
}
