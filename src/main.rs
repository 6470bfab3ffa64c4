// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Command line entry point: issue and verify tokens, or run the token service

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use rocket::{
    config::LogLevel,
    data::{Limits, ToByteUnit},
};
use serde_json::Value;

use jwt_clients::config::Config;
use jwt_clients::web::{build_rocket, ApiKeyConfig};
use jwt_clients::{TokenIssuer, TokenRequest, TokenVerifier};

/// Issue and verify JSON Web Tokens
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (created with defaults when missing)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue a token and print it
    Issue {
        /// Principal identifier
        #[arg(short, long)]
        subject: Option<String>,

        /// Intended recipient, may be repeated
        #[arg(short, long = "audience")]
        audiences: Vec<String>,

        /// Custom claim as key=value, the value is parsed as JSON when possible
        #[arg(long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, Value)>,

        /// Lifetime in seconds (defaults to token.default_ttl_secs)
        #[arg(long, allow_hyphen_values = true)]
        ttl: Option<i64>,

        /// Start of validity, RFC 3339
        #[arg(long, value_parser = parse_rfc3339)]
        not_before: Option<DateTime<Utc>>,

        /// Print the token only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Verify a token and print its claims as JSON
    Verify {
        /// Compact serialized token
        token: String,
    },

    /// Run the token service
    Serve {
        /// Port override
        #[arg(short, long)]
        port: Option<u16>,

        /// Address override
        #[arg(long)]
        address: Option<String>,
    },
}

fn parse_claim(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err("claim name must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 date '{}': {}", raw, e))
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;

    match args.command {
        Command::Issue {
            subject,
            audiences,
            claims,
            ttl,
            not_before,
            quiet,
        } => {
            let issuer = config.build_issuer()?;

            let mut request = TokenRequest::new().audiences(audiences);
            if let Some(subject) = subject {
                request = request.subject(subject);
            }
            for (key, value) in claims {
                request = request.claim(key, value);
            }
            let ttl = match ttl {
                Some(secs) => Some(Duration::try_seconds(secs).context("ttl is out of range")?),
                None => config.token.default_ttl(),
            };
            if let Some(ttl) = ttl {
                request = request.ttl(ttl);
            }
            if let Some(not_before) = not_before {
                request = request.not_before(not_before);
            }

            let token = issuer.issue_token(&request)?;
            if !quiet {
                eprintln!(
                    "Issued {} token for issuer '{}'",
                    issuer.key_mode().algorithm_name(),
                    issuer.issuer()
                );
            }
            println!("{}", token);
        }
        Command::Verify { token } => {
            let verifier = config.build_verifier()?;
            let claims = verifier.verify_token(token.trim())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&claims).context("Failed to render claims")?
            );
        }
        Command::Serve { port, address } => {
            config.apply_args(port, address);
            let api_key = ApiKeyConfig::new(config.server.require_api_key()?);
            let issuer: Arc<dyn TokenIssuer> = Arc::new(config.build_issuer()?);
            let verifier: Arc<dyn TokenVerifier> = Arc::new(config.build_verifier()?);

            println!(
                "Token service listening on {}:{}",
                config.server.address, config.server.port
            );
            let figment = rocket::Config::figment()
                .merge((
                    "ident",
                    format!("JwtClients/{}", env!("CARGO_PKG_VERSION")),
                ))
                .merge(("limits", Limits::new().limit("json", 64.kibibytes())))
                .merge(("address", config.server.address.clone()))
                .merge(("port", config.server.port))
                .merge(("log_level", LogLevel::Normal));

            let rocket = build_rocket(
                figment,
                issuer,
                verifier,
                api_key,
                config.token.default_ttl(),
            );
            let _rocket = rocket.launch().await?;
        }
    }

    Ok(())
}
