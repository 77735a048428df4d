//! Tracing filter construction
//!
//! Turns the `[logging]` config section into an `EnvFilter` directive string.
//! `RUST_LOG`, when set, takes precedence over the result (see `cli::serve::init_tracing`).

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels, sorted by component name.
///
/// # Examples
///
/// ```
/// use loadgen::config::{LogFormat, LoggingConfig};
/// use loadgen::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("generator".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,loadgen::generator=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",loadgen::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::collections::HashMap;

    #[test]
    fn test_base_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_component_levels_sorted() {
        let mut levels = HashMap::new();
        levels.insert("generator".to_string(), "debug".to_string());
        levels.insert("api".to_string(), "trace".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..LoggingConfig::default()
        };
        assert_eq!(
            build_filter_directives(&config),
            "info,loadgen::api=trace,loadgen::generator=debug"
        );
    }
}
