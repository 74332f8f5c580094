use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// Dependencies whose logs are hidden unless running at Trace.
const FILTERED_MODULES: &[&str] = &["hyper", "h2", "reqwest", "rustls", "tower", "axum", "mockito"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at the configured level.
    ///
    /// Fails if a global logger was already installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        simplelog::TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(config.log_level_filter),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    fn filters_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if Self::filters_dependencies(level) {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_cover_http_stack_only() {
        for module in ["hyper", "reqwest", "tower", "axum"] {
            assert!(FILTERED_MODULES.contains(&module), "{module} should be filtered");
        }
        for module in ["verifyme", "domain", "web", "verify_auth", "service"] {
            assert!(!FILTERED_MODULES.contains(&module), "{module} must never be filtered");
        }
    }

    #[test]
    fn test_only_trace_shows_dependency_logs() {
        assert!(!Logger::filters_dependencies(LevelFilter::Trace));
        for level in [LevelFilter::Off, LevelFilter::Error, LevelFilter::Info, LevelFilter::Debug] {
            assert!(Logger::filters_dependencies(level), "{level} should filter");
        }
    }

    #[test]
    fn test_init_logger_twice_fails() {
        let config = Config::from_args(["verifyme", "--log-level-filter", "WARN"]).unwrap();

        // Another test may already have installed a logger; either way the
        // second call in this process must be rejected.
        let _ = Logger::init_logger(&config);
        assert!(Logger::init_logger(&config).is_err());
    }
}
