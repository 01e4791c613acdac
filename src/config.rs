// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : fix_quote_bot — FIX quote-request responder in Rust
Module  : config.rs
Version : 0.1.0
Author  : fix_quote_bot contributors
License : MIT

Summary : Command-line flags plus env-driven session, pricing, metrics and
          recorder settings. Malformed values are reported, never defaulted.
=============================================================================
*/
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fix_quote_bot", about = "FIX QuoteRequest responder")]
pub struct Cli {
    /// Load variables from this file instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// tracing filter, e.g. "info" or "fix_quote_bot=debug" (default: RUST_LOG or info)
    #[arg(long)]
    pub log_filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read env file {path}: {source}")]
    EnvFile { path: PathBuf, source: dotenvy::Error },
    #[error("{key}={value:?} is not a valid {expected}")]
    Invalid { key: &'static str, value: String, expected: &'static str },
}

#[derive(Clone, Debug)]
pub struct Args {
    // session identity
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_ids: Vec<String>, // satu mock session per target

    // files/metrics
    pub record_file: Option<String>,
    pub metrics_port: u16,

    // mock counterparty pacing
    pub mock_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Pricing {
    pub min_size: Decimal,
    pub bid_px: Decimal,
    pub offer_px: Decimal,
}

fn parse_or<T: FromStr>(key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            value: v,
            expected,
        }),
        _ => Ok(default),
    }
}

pub fn load(cli: &Cli) -> Result<(Args, Pricing), ConfigError> {
    // Pastikan .env dibaca; file eksplisit wajib ada, ./.env opsional
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|source| ConfigError::EnvFile { path: path.clone(), source })?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    // ===== Session =====
    let begin_string = env::var("BEGIN_STRING").unwrap_or_else(|_| "FIX.4.4".to_string());
    let sender_comp_id = env::var("SENDER_COMP_ID").unwrap_or_else(|_| "QUOTER".to_string());

    // TARGET_COMP_IDS=CLIENT1,CLIENT2
    let target_comp_ids: Vec<String> = env::var("TARGET_COMP_IDS")
        .ok()
        .map(|s| {
            s.split(',')
                .map(|x| x.trim())
                .filter(|x| !x.is_empty())
                .map(|x| x.to_string())
                .collect()
        })
        .filter(|v: &Vec<String>| !v.is_empty())
        .unwrap_or_else(|| vec!["CLIENT1".to_string()]);

    let record_file = env::var("RECORD_FILE").ok().filter(|s| !s.trim().is_empty());
    let metrics_port = parse_or("METRICS_PORT", 9898u16, "port")?;
    let mock_interval_ms = parse_or("MOCK_INTERVAL_MS", 500u64, "interval in ms")?;

    let args = Args {
        begin_string,
        sender_comp_id,
        target_comp_ids,
        record_file,
        metrics_port,
        mock_interval_ms,
    };

    // ===== Pricing =====
    let min_size = parse_or("QUOTE_MIN_SIZE", Decimal::new(1000, 0), "decimal")?;
    let bid_px = parse_or("QUOTE_BID_PX", Decimal::new(10025, 2), "decimal")?;
    let offer_px = parse_or("QUOTE_OFFER_PX", Decimal::ZERO, "decimal")?;

    Ok((args, Pricing { min_size, bid_px, offer_px }))
}
