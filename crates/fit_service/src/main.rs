//! FitCheck prediction CLI
//!
//! Reads one JSON request per line on stdin and writes one JSON response
//! per line on stdout. `:reload` reloads the model, `:status` prints
//! readiness. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use fitcheck_service::{FitService, ServiceConfig, ServiceError};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fit-predict")]
#[command(author = "FitCheck Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict garment fit from body measurements", long_about = None)]
struct Args {
    /// Service config TOML (falls back to FITCHECK_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model artifact path, overriding the config
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Predict a single JSON request and exit
    #[arg(short, long)]
    request: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    info!("Starting FitCheck prediction service v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(model) = args.model {
        config.model_path = model;
    }
    info!("Model path: {}", config.model_path.display());

    let service = FitService::new(config);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(body) = args.request {
        let ok = handle_line(&service, &body, &mut out)?;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        handle_line(&service, &line, &mut out)?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

/// Handle one command or request line; returns whether it succeeded
fn handle_line(service: &FitService, line: &str, out: &mut impl Write) -> Result<bool> {
    let (body, ok) = match line.trim() {
        ":status" => (serde_json::to_value(service.status())?, true),
        ":reload" => match service.reload() {
            Ok(()) => (serde_json::to_value(service.status())?, true),
            Err(err) => (error_value(&err), false),
        },
        request => match service.predict_json(request) {
            Ok(response) => (serde_json::to_value(response)?, true),
            Err(err) => {
                error!("Prediction error: {}", err);
                (error_value(&err), false)
            }
        },
    };

    writeln!(out, "{body}").context("Failed to write response")?;
    out.flush().context("Failed to flush stdout")?;
    Ok(ok)
}

fn error_value(err: &ServiceError) -> serde_json::Value {
    json!({
        "msg": err.to_body().msg,
        "status": err.status_code(),
    })
}

fn init_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
