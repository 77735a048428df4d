//! Target command: run the in-memory sample target

use crate::cli::serve::{init_tracing, shutdown_signal};
use crate::cli::TargetArgs;
use crate::config::LoggingConfig;
use crate::target::{create_target_router, SampleStore};
use std::sync::Arc;

/// Main target command handler
pub async fn run_target(args: TargetArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&LoggingConfig {
        level: format!("{},tower_http=debug", args.log_level),
        ..LoggingConfig::default()
    })?;

    let store = Arc::new(SampleStore::new());
    let app = create_target_router(Arc::clone(&store));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Sample target listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(samples = store.len(), "Sample target stopped");
    Ok(())
}
