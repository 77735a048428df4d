//! Headless run command: fire for a fixed duration, then print a summary

use crate::cli::output::{format_summary_json, format_summary_table, RunSummary};
use crate::cli::serve::{init_tracing, load_config, shutdown_signal};
use crate::cli::RunArgs;
use crate::config::LoadgenConfig;
use crate::generator::{HttpSampleEndpoint, LoadGenerator};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &RunArgs,
) -> Result<LoadgenConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    args.generator.apply(&mut config);

    Ok(config)
}

/// Drive `generator` for `duration` (or until interrupted) and return the final summary.
pub async fn run_for(
    generator: &LoadGenerator,
    config: &LoadgenConfig,
    duration: Duration,
    drain_timeout: Duration,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let until = async {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = shutdown_signal() => {
                tracing::info!("Run interrupted");
            }
        }
    };
    run_until(generator, config, until, drain_timeout).await
}

/// Drive `generator` until `until` resolves. The summary reports the time
/// actually spent firing, which is shorter than requested after an interrupt.
pub async fn run_until(
    generator: &LoadGenerator,
    config: &LoadgenConfig,
    until: impl Future<Output = ()>,
    drain_timeout: Duration,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let started = Instant::now();
    generator.start().await;
    until.await;
    generator.stop().await;
    let elapsed = started.elapsed();

    let unsettled = generator.drain(drain_timeout).await?;
    if unsettled > 0 {
        tracing::warn!(unsettled, "Drain timed out with requests still in flight");
    }

    let snapshot = generator.snapshot().await?;
    Ok(RunSummary::new(config, elapsed.as_secs(), &snapshot))
}

/// Main run command handler
pub async fn run_headless(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging)?;

    let endpoint = HttpSampleEndpoint::new(&config.target)?;
    let generator = LoadGenerator::spawn(Arc::new(endpoint), &config.generator);

    tracing::info!(
        url = %config.target.url(),
        method = %config.target.method,
        interval_ms = config.generator.interval_ms,
        duration_secs = args.duration_secs,
        "Starting headless run"
    );

    let summary = run_for(
        &generator,
        &config,
        Duration::from_secs(args.duration_secs),
        Duration::from_secs(args.drain_secs),
    )
    .await?;

    if args.json {
        println!("{}", format_summary_json(&summary)?);
    } else {
        println!("{}", format_summary_table(&summary));
    }

    Ok(())
}
