#![forbid(unsafe_code)]

use anyhow::Context;
use config::Logging;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable with extra filter directives, e.g.
/// `PRAESIDIUM_LOG=guard=trace`.
pub const ENV_VAR: &str = "PRAESIDIUM_LOG";

fn filter(level: &str) -> anyhow::Result<EnvFilter> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.parse()?)
        .with_env_var(ENV_VAR)
        .from_env()?;
    Ok(filter)
}

fn writer(logging: &Logging) -> anyhow::Result<BoxMakeWriter> {
    let Some(path) = &logging.file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok(BoxMakeWriter::new(Mutex::new(file)))
}

/// Install the global subscriber. Fails without side effects if the host
/// already installed one.
pub fn init(logging: &Logging) -> anyhow::Result<()> {
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_level(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(writer(logging)?);

    tracing_subscriber::registry()
        .with(layer)
        .with(filter(&logging.level)?)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_builds_a_filter() {
        assert!(filter(&Logging::default().level).is_ok());
        assert!(filter("guard=debug").is_ok());
    }

    #[test]
    fn invalid_level_is_an_error() {
        assert!(filter("guard=loud").is_err());
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let logging = Logging {
            file: Some("/nonexistent-dir/praesidium/log.txt".into()),
            ..Default::default()
        };
        assert!(writer(&logging).is_err());
    }
}
