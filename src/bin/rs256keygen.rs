// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine;
use clap::Parser;
use jwt_clients::jwt::{generate_rsa_key_pair, MIN_RSA_KEY_BITS};

/// Generate an RSA key pair for RS256 tokens
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Output path for the public key PEM file
    #[clap(long, default_value = "./pub.key")]
    out_pub_key: PathBuf,

    /// Output path for the private key PEM file
    #[clap(long, default_value = "./private.key")]
    out_private_key: PathBuf,

    /// RSA key length in bits
    #[clap(long, default_value = "4096")]
    length: usize,

    /// Also print the base64 values expected by config.yaml
    #[clap(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.length < MIN_RSA_KEY_BITS {
        anyhow::bail!(
            "RSA key length must be at least {} bits, got {}",
            MIN_RSA_KEY_BITS,
            args.length
        );
    }

    println!("Generating RSA key pair with {} bits...", args.length);
    let pair = generate_rsa_key_pair(args.length).context("Failed to generate RSA key pair")?;

    fs::write(&args.out_private_key, pair.private_pem.as_bytes()).with_context(|| {
        format!(
            "Failed to write private key to {:?}",
            args.out_private_key
        )
    })?;
    fs::write(&args.out_pub_key, pair.public_pem.as_bytes())
        .with_context(|| format!("Failed to write public key to {:?}", args.out_pub_key))?;

    println!("Private key written to: {:?}", args.out_private_key);
    println!("Public key written to: {:?}", args.out_pub_key);

    if args.print_config {
        let engine = base64::engine::general_purpose::STANDARD;
        println!();
        println!("token:");
        println!("  key_mode: asymmetric");
        println!("  rs256_private_key: \"{}\"", engine.encode(&pair.private_pem));
        println!("  rs256_public_key: \"{}\"", engine.encode(&pair.public_pem));
    } else {
        println!();
        println!("To use them in the config.yaml, Base64 encode them with:");
        println!("cat {} | base64 -w0", args.out_private_key.display());
        println!("cat {} | base64 -w0", args.out_pub_key.display());
    }

    Ok(())
}
