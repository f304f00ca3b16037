//! Tracing subscriber setup for the binary.
//!
//! `RUST_LOG` overrides the default filter. Set `GRADEFLOW_LOG_FORMAT=json`
//! for one JSON object per line. Records emitted through the `log` facade are
//! forwarded into tracing.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("GRADEFLOW_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Installs the global subscriber. Returns an error if one is already set.
pub fn init_tracing(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_target(true).with_thread_ids(true)),
        )?,
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(true).with_thread_ids(true)),
        )?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_log_format_from_env() {
        std::env::set_var("GRADEFLOW_LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
        std::env::set_var("GRADEFLOW_LOG_FORMAT", "pretty");
        assert_eq!(LogFormat::from_env(), LogFormat::Text);
        std::env::remove_var("GRADEFLOW_LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Text);
    }
}
