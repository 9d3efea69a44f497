use std::sync::Once;

/// Filter applied when neither the config nor `RUST_LOG` provides one.
///
/// wgpu's internal crates are noisy at `info`; keep them at `warn`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "debug",
/// "drape_engine::clamping=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Include the module path of each record.
    pub module_path: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            module_path: true,
        }
    }
}

impl LoggingConfig {
    /// Resolves the filter string: explicit config, then `RUST_LOG`, then
    /// [`DEFAULT_FILTER`].
    pub fn resolved_filter(&self) -> String {
        let env = std::env::var("RUST_LOG").ok();
        resolve_filter(self.env_filter.as_deref(), env.as_deref())
    }
}

/// First non-blank of `explicit` and `env`, else [`DEFAULT_FILTER`].
fn resolve_filter(explicit: Option<&str>, env: Option<&str>) -> String {
    explicit
        .filter(|f| !f.trim().is_empty())
        .or_else(|| env.filter(|f| !f.trim().is_empty()))
        .unwrap_or(DEFAULT_FILTER)
        .to_owned()
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored. A logger installed by someone else (e.g. a
/// test harness) is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolved_filter();

        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&filter)
            .write_style(config.write_style)
            .format_module_path(config.module_path);

        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized (filter = {filter})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let config = LoggingConfig {
            env_filter: Some("drape_engine=trace".into()),
            ..Default::default()
        };
        assert_eq!(config.resolved_filter(), "drape_engine=trace");
    }

    #[test]
    fn blank_filter_is_ignored() {
        let config = LoggingConfig {
            env_filter: Some("   ".into()),
            ..Default::default()
        };
        let resolved = config.resolved_filter();
        assert!(!resolved.trim().is_empty());
    }

    #[test]
    fn blank_filter_defers_to_environment() {
        assert_eq!(resolve_filter(Some("  "), Some("warn")), "warn");
        assert_eq!(resolve_filter(None, Some("debug")), "debug");
        assert_eq!(resolve_filter(Some("trace"), Some("warn")), "trace");
    }

    #[test]
    fn blank_everywhere_uses_default() {
        assert_eq!(resolve_filter(Some(""), Some(" ")), DEFAULT_FILTER);
        assert_eq!(resolve_filter(None, None), DEFAULT_FILTER);
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::default());
    }
}
