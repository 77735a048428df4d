//! CLI module for the load generator
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `serve` - Start the dashboard service
//! - `run` - Fire requests for a fixed duration and print a summary
//! - `target` - Run the in-memory sample target
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Dashboard against a local target, firing every 250ms
//! loadgen serve --target http://localhost:8080 --interval-ms 250
//!
//! # Thirty second headless POST run, JSON summary
//! loadgen run --method post --duration-secs 30 --json
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod run;
pub mod serve;
pub mod target;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::{LoadgenConfig, TargetMethod};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Load generator with a real-time dashboard
#[derive(Parser, Debug)]
#[command(
    name = "loadgen",
    version,
    about = "Periodic load generator with a real-time dashboard"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard service
    Serve(ServeArgs),
    /// Run headless for a fixed duration and print a summary
    Run(RunArgs),
    /// Run the in-memory sample target
    Target(TargetArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Request loop overrides shared by `serve` and `run`
#[derive(Args, Debug, Default)]
pub struct GeneratorArgs {
    /// Override target base URL
    #[arg(long = "target", value_name = "URL")]
    pub target_url: Option<String>,

    /// Override milliseconds between requests
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Override HTTP method (get, post)
    #[arg(short, long)]
    pub method: Option<TargetMethod>,
}

impl GeneratorArgs {
    /// Apply these overrides on top of `config`
    pub fn apply(&self, config: &mut LoadgenConfig) {
        if let Some(ref url) = self.target_url {
            config.target.base_url = url.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.generator.interval_ms = interval_ms;
        }
        if let Some(method) = self.method {
            config.target.method = method;
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "loadgen.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "LOADGEN_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "LOADGEN_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LOADGEN_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// Start the request loop immediately
    #[arg(long)]
    pub autostart: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "loadgen.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// How long to fire requests
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub duration_secs: u64,

    /// How long to wait for in-flight requests after stopping
    #[arg(long, default_value_t = 5)]
    pub drain_secs: u64,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LOADGEN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Listen port
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Listen host
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "loadgen.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["loadgen", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("loadgen.toml"));
                assert!(args.generator.target_url.is_none());
                assert!(!args.autostart);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_generator_overrides() {
        let cli = Cli::try_parse_from([
            "loadgen",
            "serve",
            "--target",
            "http://example.test:9000",
            "--interval-ms",
            "250",
            "--method",
            "post",
            "--autostart",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(
                    args.generator.target_url.as_deref(),
                    Some("http://example.test:9000")
                );
                assert_eq!(args.generator.interval_ms, Some(250));
                assert_eq!(args.generator.method, Some(TargetMethod::Post));
                assert!(args.autostart);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_method() {
        assert!(Cli::try_parse_from(["loadgen", "run", "--method", "delete"]).is_err());
    }

    #[test]
    fn test_cli_parse_run() {
        let cli =
            Cli::try_parse_from(["loadgen", "run", "--duration-secs", "30", "--json"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.duration_secs, 30);
                assert_eq!(args.drain_secs, 5);
                assert!(args.json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_run_rejects_zero_duration() {
        assert!(Cli::try_parse_from(["loadgen", "run", "--duration-secs", "0"]).is_err());
    }

    #[test]
    fn test_cli_parse_target_defaults() {
        let cli = Cli::try_parse_from(["loadgen", "target"]).unwrap();
        match cli.command {
            Commands::Target(args) => {
                assert_eq!(args.port, 8080);
                assert_eq!(args.host, "0.0.0.0");
            }
            _ => panic!("Expected Target command"),
        }
    }

    #[test]
    fn test_generator_args_apply() {
        let mut config = LoadgenConfig::default();
        let args = GeneratorArgs {
            target_url: Some("http://10.0.0.5:8080".to_string()),
            interval_ms: Some(50),
            method: None,
        };
        args.apply(&mut config);
        assert_eq!(config.target.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.generator.interval_ms, 50);
        assert_eq!(config.target.method, TargetMethod::Get);
    }
}
