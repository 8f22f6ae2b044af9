//! Identity recon batch runner
//!
//! Reads seed signals from stdin, one per line (`email:`, `phone:` or `name:`
//! prefixed, or bare values whose kind is detected), and writes one JSON
//! report per line to stdout in input order. Logs go to stderr.

use anyhow::Context;
use futures::StreamExt;
use identity_core::{ReportAggregator, SeedSignal};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_config().context("Failed to load configuration")?;

    // Initialize tracing/logging
    init_tracing(&config);

    info!("Starting identity-recon v{}", env!("CARGO_PKG_VERSION"));

    let aggregator = ReportAggregator::from_config(config.recon)
        .context("Failed to initialize report aggregator")?;

    let seeds = read_seeds(BufReader::new(tokio::io::stdin())).await?;
    info!("Read {} seed signal(s)", seeds.len());

    let written = write_reports(&aggregator, &seeds, tokio::io::stdout()).await?;

    info!("Wrote {} report(s)", written);
    Ok(())
}

/// Initialize tracing and logging on stderr
fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_directive().into());

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Parse one seed per line; blank lines and `#` comments are skipped
async fn read_seeds<R: AsyncBufRead + Unpin>(input: R) -> anyhow::Result<Vec<SeedSignal>> {
    let mut lines = input.lines();
    let mut seeds = Vec::new();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed.parse::<SeedSignal>() {
            Ok(seed) => seeds.push(seed),
            Err(e) => warn!("Skipping line {}: {}", line_no, e),
        }
    }

    Ok(seeds)
}

/// Serialize reports through a single writer as pipelines complete
async fn write_reports<W: AsyncWrite + Unpin>(
    aggregator: &ReportAggregator,
    seeds: &[SeedSignal],
    output: W,
) -> anyhow::Result<usize> {
    let mut out = BufWriter::new(output);
    let reports = aggregator.report_stream(seeds);
    tokio::pin!(reports);
    let mut written = 0usize;

    while let Some(report) = reports.next().await {
        let mut line = serde_json::to_vec(&report).context("Failed to serialize report")?;
        line.push(b'\n');
        out.write_all(&line).await.context("Failed to write report")?;
        written += 1;
    }

    out.flush().await.context("Failed to flush stdout")?;
    Ok(written)
}
