//! iotrec: run one reconciliation request against an offline control plane.
//!
//! Reads a request document, dispatches it to the handler for its resource
//! type and prints the outcome on stdout. The control plane is kept in a JSON
//! state file so consecutive runs observe each other's effects.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iotrec::clients::memory::ControlPlaneSnapshot;
use iotrec::clients::InMemoryIot;
use iotrec::config::DEFAULT_MAX_LOOKUP_PAGES;
use iotrec::{Dispatcher, HandlerInvocation, LookupConfig};

/// IoT logging and topic rule destination reconciler
#[derive(Parser, Debug)]
#[command(name = "iotrec", version, about)]
struct Args {
    /// Request document, or "-" for stdin
    #[arg(long, default_value = "-")]
    request: String,

    /// Control plane state file (created if missing)
    #[arg(long, default_value = "iotrec-state.json")]
    state: PathBuf,

    /// Region used in generated ARNs
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Account used in generated ARNs
    #[arg(long, default_value = "123456789012")]
    account_id: String,

    /// maxResults for level listings
    #[arg(long, default_value = "250", value_parser = clap::value_parser!(u32).range(1..=250))]
    page_size: u32,

    /// Pages a level lookup may scan before failing
    #[arg(long, default_value_t = DEFAULT_MAX_LOOKUP_PAGES)]
    max_lookup_pages: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the outcome
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iotrec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let raw = read_request(&args.request).await?;
    let invocation: HandlerInvocation =
        serde_json::from_str(&raw).context("Failed to parse request document")?;

    let snapshot = ControlPlaneSnapshot::load(&args.state)
        .await
        .with_context(|| format!("Failed to load state from {}", args.state.display()))?;
    let iot = Arc::new(InMemoryIot::from_snapshot(
        &args.region,
        &args.account_id,
        snapshot,
    ));

    let dispatcher = Dispatcher::new(
        iot.clone(),
        iot.clone(),
        LookupConfig::new(args.page_size, args.max_lookup_pages),
    );
    let outcome = dispatcher
        .dispatch(invocation)
        .await
        .context("Failed to encode outcome")?;

    let mut out = serde_json::to_vec_pretty(&outcome)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;

    iot.snapshot()
        .await
        .save(&args.state)
        .await
        .with_context(|| format!("Failed to save state to {}", args.state.display()))?;
    info!("Recorded {} control plane calls", iot.calls().await.len());

    Ok(())
}

async fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read request from stdin")?;
        return Ok(raw);
    }
    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read request from {source}"))
}
