use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wrap::config::WrapConfig;
use wrap::kernel::integrity::{compute_digest, resolve_program, IntegrityGate};
use wrap::kernel::lifecycle::Lifecycle;
use wrap::kernel::signals::host_signals;
use wrap::kernel::supervisor::{child_command, supervise};
use wrap::kernel::telemetry::MetricsSampler;
use wrap::services::broker::KafkaBroker;
use wrap::{Pipeline, RunContext};

#[derive(Parser, Debug)]
#[command(
    name = "wrap",
    version,
    about = "Supervise a command and relay its instrumentation data to the broker"
)]
struct Cli {
    /// Command to run, followed by its arguments
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stdout, which is also where the child's log channel lands.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let mut lifecycle = Lifecycle::new();

    let config = WrapConfig::load().context("incomplete configuration")?;
    let (program, args) = cli
        .command
        .split_first()
        .context("usage: wrap command [args ...]")?;

    // 1. Digest check (advisory)
    lifecycle.advance();
    let path = resolve_program(program)?;
    let checksum = compute_digest(&path).await?;
    let gate = IntegrityGate::new(&config.base_url)?;
    if !gate.is_recognized(&checksum).await? {
        warn!(%checksum, "invalid checksum");
    }
    let ctx = Arc::new(RunContext::from_config(checksum, &config));

    // 2. Pipeline up: relay, data channel, log channel
    lifecycle.advance();
    let broker = KafkaBroker::connect(&config)
        .await
        .context("broker connection failed")?;
    let (pipeline, objects) = Pipeline::start(ctx.clone(), broker, tokio::io::stdout(), config.queue_capacity)
        .context("opening local sockets failed")?;

    // 3. Supervise until the child is gone
    lifecycle.advance();
    let signals = host_signals();
    let command = child_command(&ctx, &path, args);
    let event = supervise(command, &objects, signals, MetricsSampler::new()).await?;
    info!(exit_status = event.exit_status, signal = ?event.signal, "child finished");

    // 4. No more producers after this point
    lifecycle.advance();
    objects.close();

    // 5. Reverse-order shutdown
    lifecycle.advance();
    let report = pipeline.shutdown().await;
    if !report.is_clean() {
        warn!("shutdown finished with errors");
    }

    Ok(())
}
