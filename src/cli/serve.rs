//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{LogFormat, LoadgenConfig, LoggingConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long shutdown waits for in-flight requests to settle
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Load config file (or defaults if it doesn't exist) plus `LOADGEN_*` overrides
pub fn load_config(path: &Path) -> Result<LoadgenConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        LoadgenConfig::load(Some(path))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        LoadgenConfig::default()
    };

    Ok(config.with_env_overrides())
}

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<LoadgenConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    // CLI overrides (highest priority)
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    args.generator.apply(&mut config);
    if args.autostart {
        config.generator.autostart = true;
    }

    Ok(config)
}

/// Initialize tracing based on configuration
///
/// Logs go to stderr so `run --json` output stays machine readable.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and merge configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting load generator dashboard");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Build state (spawns the stats store) and router
    let config = Arc::new(config);
    let app_state = Arc::new(AppState::from_config(Arc::clone(&config))?);
    let app = create_router(Arc::clone(&app_state));

    // 4. Optionally start firing right away
    if config.generator.autostart {
        app_state.generator.start().await;
    }

    // 5. Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(
        addr = %addr,
        url = %config.target.url(),
        method = %config.target.method,
        "Dashboard listening"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Cleanup: no new requests, let in-flight ones settle
    app_state.generator.stop().await;
    let unsettled = app_state.generator.drain(SHUTDOWN_DRAIN_TIMEOUT).await?;
    if unsettled > 0 {
        tracing::warn!(unsettled, "Shutting down with requests still in flight");
    }

    tracing::info!("Load generator dashboard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::GeneratorArgs;
    use crate::config::TargetMethod;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn args(config: PathBuf) -> ServeArgs {
        ServeArgs {
            config,
            port: None,
            host: None,
            log_level: None,
            generator: GeneratorArgs::default(),
            autostart: false,
        }
    }

    #[test]
    fn test_serve_config_loading() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8081\n[generator]\ninterval_ms = 500").unwrap();

        let config = load_config_with_overrides(&args(temp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.generator.interval_ms, 500);
    }

    #[test]
    fn test_serve_cli_overrides_config() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            "[server]\nport = 8081\n[target]\nmethod = \"get\"\n[generator]\ninterval_ms = 500",
        )
        .unwrap();

        let mut serve_args = args(temp.path().to_path_buf());
        serve_args.port = Some(9000);
        serve_args.generator.interval_ms = Some(100);
        serve_args.generator.method = Some(TargetMethod::Post);
        serve_args.autostart = true;

        let config = load_config_with_overrides(&serve_args).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.generator.interval_ms, 100);
        assert_eq!(config.target.method, TargetMethod::Post);
        assert!(config.generator.autostart);
    }

    #[test]
    fn test_serve_works_without_config_file() {
        let config =
            load_config_with_overrides(&args(PathBuf::from("nonexistent-loadgen.toml"))).unwrap();
        assert_eq!(config.generator.log_capacity, 200);
        assert_eq!(config.target.path, "/sample");
    }

    #[test]
    fn test_serve_rejects_malformed_config() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server\nport = ").unwrap();

        assert!(load_config_with_overrides(&args(temp.path().to_path_buf())).is_err());
    }
}
