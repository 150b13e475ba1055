//! Reads a stream of YAML manifests on stdin and writes it to stdout,
//! dropping every manifest whose apiVersion, kind, name and namespace were
//! already written.

use anyhow::Context;
use manifest_dedup::{filter_stream, FilterConfig};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr, stdout carries the documents.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    filter_stream(stdin.lock(), stdout.lock(), &FilterConfig::default())
        .context("failed to filter manifest stream")?;
    Ok(())
}
