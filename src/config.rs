// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module loads, validates and saves the YAML configuration shared by the
//! command line tool and the token service. Files are checked against the JSON
//! schema bundled in `resources/config.schema.json` before they are
//! deserialized, then against rules the schema cannot express.
//!
//! ## Configuration Structure
//!
//! - `token`: issuer name, key mode and key material, lifetimes and subject policy
//! - `server`: bind address and port of the token service, and its API key
//!
//! RSA keys are stored as base64 encoded PEM documents, the HMAC secret as a plain string.
//!
//! ## Usage
//!
//! ```no_run
//! use jwt_clients::config::Config;
//!
//! let config = Config::from_file("config.yaml").unwrap();
//! let issuer = config.build_issuer().unwrap();
//! let verifier = config.build_verifier().unwrap();
//! ```

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    net::IpAddr,
    path::Path,
};

use crate::jwt::{clients, JwtIssuer, JwtVerifier, KeyMode, SubjectPolicy};

/// Token issuance and verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Issuer name stamped into the `iss` claim of every token
    pub issuer: String,

    /// Key mode shared by the issuer and the verifier
    pub key_mode: KeyMode,

    /// Shared secret for [`KeyMode::Symmetric`]
    #[serde(default)]
    pub hmac_secret: String,

    /// Base64 encoded PEM private key for [`KeyMode::Asymmetric`] issuance
    #[serde(default)]
    pub rs256_private_key: String,

    /// Base64 encoded PEM public key for [`KeyMode::Asymmetric`] verification
    #[serde(default)]
    pub rs256_public_key: String,

    /// Lifetime given to tokens whose request carries no ttl
    ///
    /// `None` issues tokens without an `exp` claim.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: Option<u64>,

    /// Clock skew tolerated on `nbf` and `exp`, in seconds
    #[serde(default)]
    pub leeway_secs: u64,

    /// Require subjects to be decimal principal ids
    #[serde(default = "default_numeric_subject")]
    pub numeric_subject: bool,
}

/// Token service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the token service binds to
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port of the token service
    #[serde(default = "default_port")]
    pub port: u16,

    /// Static credential expected in the `X-Api-Key` header of issuance requests
    ///
    /// Left empty, the token service refuses to start.
    #[serde(default)]
    pub api_key: String,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub token: TokenConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Longest accepted `default_ttl_secs`, ten thousand years
pub const MAX_DEFAULT_TTL_SECS: u64 = 315_576_000_000;

fn default_issuer() -> String {
    "jwt-clients".to_string()
}

fn default_ttl_secs() -> Option<u64> {
    Some(3600)
}

fn default_numeric_subject() -> bool {
    true
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Generate a random HMAC secret, base64 encoded so it stays printable in YAML
fn default_hmac_secret() -> String {
    base64::engine::general_purpose::STANDARD.encode(crate::jwt::generate_symmetric_key())
}

/// Generate a random API key
fn default_api_key() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let key: [u8; 24] = rng.random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key)
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            key_mode: KeyMode::Symmetric,
            hmac_secret: default_hmac_secret(),
            rs256_private_key: String::new(),
            rs256_public_key: String::new(),
            default_ttl_secs: default_ttl_secs(),
            leeway_secs: 0,
            numeric_subject: default_numeric_subject(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            api_key: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            server: ServerConfig {
                api_key: default_api_key(),
                ..ServerConfig::default()
            },
        }
    }
}

impl ServerConfig {
    /// API key of the token service, which must be configured
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            anyhow::bail!("server.api_key must be set to run the token service");
        }
        Ok(key)
    }
}

impl TokenConfig {
    /// Lifetime applied when a request has none
    ///
    /// A value past [`MAX_DEFAULT_TTL_SECS`] maps to [`chrono::Duration::MAX`],
    /// which issuance rejects as out of range.
    pub fn default_ttl(&self) -> Option<chrono::Duration> {
        self.default_ttl_secs
            .map(|secs| ttl_from_secs(secs).unwrap_or(chrono::Duration::MAX))
    }

    pub fn subject_policy(&self) -> SubjectPolicy {
        if self.numeric_subject {
            SubjectPolicy::Numeric
        } else {
            SubjectPolicy::Any
        }
    }

    fn decode_pem(value: &str, what: &str) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(value)
            .with_context(|| format!("{what} is not valid base64"))
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample_path = path.as_ref().with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for sample config at {:?}", parent)
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// validation is left untouched, and a `*.sample.yaml` with defaults is
    /// written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml_str(&contents).or_else(|err| {
            if let Err(e) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {}", e);
            }
            Err(err.context(format!("Invalid configuration in {}", path.display())))
        })
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(include_str!("../resources/config.schema.json"))
                .context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to build JSON schema validator")?;

        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_yml::from_str(contents).context("Failed to deserialize configuration")?;

        Self::validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line overrides for the token service
    pub fn apply_args(&mut self, port: Option<u16>, address: Option<String>) {
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(address) = address {
            self.server.address = address;
        }
    }

    /// Build the issuer described by the `token` section
    pub fn build_issuer(&self) -> Result<JwtIssuer> {
        let token = &self.token;
        let issuer = match token.key_mode {
            KeyMode::Unsecured => clients::new_issuer(&token.issuer),
            KeyMode::Symmetric => {
                clients::new_issuer_with_symmetric_key(&token.issuer, token.hmac_secret.as_bytes())?
            }
            KeyMode::Asymmetric => {
                let pem = TokenConfig::decode_pem(&token.rs256_private_key, "RS256 private key")?;
                clients::new_issuer_with_private_key(&token.issuer, &pem)?
            }
        };
        Ok(issuer)
    }

    /// Build the verifier described by the `token` section
    pub fn build_verifier(&self) -> Result<JwtVerifier> {
        let token = &self.token;
        let verifier = match token.key_mode {
            KeyMode::Unsecured => clients::new_verifier(),
            KeyMode::Symmetric => {
                clients::new_verifier_with_symmetric_key(token.hmac_secret.as_bytes())?
            }
            KeyMode::Asymmetric => {
                let pem = TokenConfig::decode_pem(&token.rs256_public_key, "RS256 public key")?;
                clients::new_verifier_with_public_key(&pem)?
            }
        };
        Ok(verifier
            .with_leeway(token.leeway_secs)
            .with_subject_policy(token.subject_policy()))
    }

    /// Rules the JSON schema cannot express
    ///
    /// - the symmetric mode needs an HMAC secret of at least 32 bytes
    /// - the asymmetric mode needs at least one RSA key, and every key given must be valid base64
    /// - `default_ttl_secs` must fit a finite expiration
    /// - the server address must be an IP address or `localhost`
    fn validate_specific_rules(config: &Config) -> Result<()> {
        let token = &config.token;
        match token.key_mode {
            KeyMode::Unsecured => {
                log::warn!("Token key mode is 'none': tokens are not signed");
            }
            KeyMode::Symmetric => {
                if token.hmac_secret.len() < crate::jwt::MIN_SYMMETRIC_KEY_LEN {
                    anyhow::bail!(
                        "hmac_secret must be at least {} bytes long for the symmetric mode",
                        crate::jwt::MIN_SYMMETRIC_KEY_LEN
                    );
                }
            }
            KeyMode::Asymmetric => {
                if token.rs256_private_key.is_empty() && token.rs256_public_key.is_empty() {
                    anyhow::bail!("The asymmetric mode needs rs256_private_key or rs256_public_key");
                }
            }
        }

        if let Some(secs) = token.default_ttl_secs {
            if ttl_from_secs(secs).is_none() {
                anyhow::bail!(
                    "default_ttl_secs must not exceed {} seconds, got {}",
                    MAX_DEFAULT_TTL_SECS,
                    secs
                );
            }
        }

        if config.server.api_key.trim().is_empty() {
            log::warn!("server.api_key is not set: the token service will refuse to start");
        }

        if !token.rs256_private_key.is_empty() {
            TokenConfig::decode_pem(&token.rs256_private_key, "RS256 private key")?;
        }
        if !token.rs256_public_key.is_empty() {
            TokenConfig::decode_pem(&token.rs256_public_key, "RS256 public key")?;
        }

        if !is_valid_address(&config.server.address) {
            anyhow::bail!("Invalid server address: {}", config.server.address);
        }

        Ok(())
    }
}

fn ttl_from_secs(secs: u64) -> Option<chrono::Duration> {
    if secs > MAX_DEFAULT_TTL_SECS {
        return None;
    }
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

fn is_valid_address(addr: &str) -> bool {
    addr == "localhost" || addr.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(Config::validate_specific_rules(&config).is_ok());
        assert_eq!(config.token.key_mode, KeyMode::Symmetric);
        assert!(config.token.hmac_secret.len() >= 32);
        assert_eq!(config.token.default_ttl(), Some(chrono::Duration::hours(1)));
    }

    #[test]
    fn test_minimal_yaml_gets_defaults() {
        let config = Config::from_yaml_str(
            "token:\n  issuer: hireben.dev\n  key_mode: none\n",
        )
        .unwrap();
        assert_eq!(config.token.issuer, "hireben.dev");
        assert_eq!(config.token.key_mode, KeyMode::Unsecured);
        assert_eq!(config.token.default_ttl_secs, Some(3600));
        assert!(config.token.numeric_subject);
        assert_eq!(config.server.port, 8080);
        assert!(config.server.api_key.is_empty());
        assert!(config.server.require_api_key().is_err());
    }

    #[test]
    fn test_default_config_carries_api_key() {
        let config = Config::default();
        assert!(config.server.require_api_key().is_ok());
    }

    #[test]
    fn test_ttl_bounds() {
        assert_eq!(ttl_from_secs(1), Some(chrono::Duration::seconds(1)));
        assert!(ttl_from_secs(MAX_DEFAULT_TTL_SECS).is_some());
        assert_eq!(ttl_from_secs(MAX_DEFAULT_TTL_SECS + 1), None);
        assert_eq!(ttl_from_secs(u64::MAX), None);

        let token = TokenConfig {
            default_ttl_secs: Some(u64::MAX),
            ..TokenConfig::default()
        };
        assert_eq!(token.default_ttl(), Some(chrono::Duration::MAX));
    }

    #[test]
    fn test_schema_rejects_unknown_key_mode() {
        let err = Config::from_yaml_str("token:\n  issuer: x\n  key_mode: ecdsa\n").unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn test_short_hmac_secret_is_rejected() {
        let err = Config::from_yaml_str(
            "token:\n  issuer: x\n  key_mode: symmetric\n  hmac_secret: short\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("hmac_secret"));
    }

    #[test]
    fn test_asymmetric_without_keys_is_rejected() {
        assert!(
            Config::from_yaml_str("token:\n  issuer: x\n  key_mode: asymmetric\n").is_err()
        );
    }

    #[test]
    fn test_apply_args_overrides_server() {
        let mut config = Config::default();
        config.apply_args(Some(9000), Some("0.0.0.0".to_string()));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.address, "0.0.0.0");

        config.apply_args(None, None);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_subject_policy_follows_flag() {
        let mut token = TokenConfig::default();
        assert_eq!(token.subject_policy(), SubjectPolicy::Numeric);
        token.numeric_subject = false;
        assert_eq!(token.subject_policy(), SubjectPolicy::Any);
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("127.0.0.1"));
        assert!(is_valid_address("::1"));
        assert!(is_valid_address("localhost"));
        assert!(!is_valid_address("not an address"));
    }
}
