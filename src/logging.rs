use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const FALLBACK_FILTER: &str = "warn";

/// Build the filter from the configured directive, falling back to `warn`
/// when the directive does not parse.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!("issue-booster: invalid log filter {:?} ({e}), using {FALLBACK_FILTER}", config.filter);
        EnvFilter::new(FALLBACK_FILTER)
    })
}

/// Install a stderr subscriber. Returns false if a global subscriber was
/// already set (by the host or an earlier call).
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(filter(config))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_filter_is_used() {
        let config = LoggingConfig { filter: "issue_booster=debug".into() };
        assert_eq!(filter(&config).to_string(), "issue_booster=debug");
    }

    #[test]
    fn invalid_filter_falls_back_to_warn() {
        let config = LoggingConfig { filter: "issue_booster=loud".into() };
        assert_eq!(filter(&config).to_string(), "warn");
    }

    #[test]
    fn second_init_is_harmless() {
        let config = LoggingConfig::default();
        init(&config);
        assert!(!init(&config));
    }
}
