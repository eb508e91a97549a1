//! # caisse
//!
//! Command-line runner for the promotion and loyalty rules.
//!
//! ## Usage
//! ```text
//! caisse checkout sale.json --now 2026-06-15T12:00:00Z
//! caisse tier 1250000
//! caisse points 27000
//! caisse --config ./caisse.toml config show
//! ```
//!
//! Reports go to stdout as JSON, logs go to stderr.

mod checkout;
mod cli;
mod config;
mod error;

use anyhow::Context;
use clap::Parser;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::cli::Cli;
use crate::config::{CaisseConfig, LoggingSettings};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config file is read so that load warnings
    // are not lost.
    let startup = startup_filter(|key| std::env::var(key).ok());
    let (subscriber, filter) = subscriber(&startup.directives, std::io::stderr);
    subscriber.init();

    let config = load_config(&cli, &filter, startup.from_rust_log)?;
    cli.run(&config)?;
    Ok(())
}

/// Filter in force until the config file has been read.
#[derive(Debug, PartialEq, Eq)]
struct StartupFilter {
    directives: String,
    /// `RUST_LOG` stays in force for the whole run.
    from_rust_log: bool,
}

/// First valid filter of `RUST_LOG`, `CAISSE_LOG` and the built-in default.
fn startup_filter(lookup: impl Fn(&str) -> Option<String>) -> StartupFilter {
    let valid = |key: &str| lookup(key).filter(|d| EnvFilter::try_new(d).is_ok());

    if let Some(directives) = valid("RUST_LOG") {
        return StartupFilter {
            directives,
            from_rust_log: true,
        };
    }
    StartupFilter {
        directives: valid("CAISSE_LOG").unwrap_or_else(|| LoggingSettings::default().filter),
        from_rust_log: false,
    }
}

/// Builds the stderr subscriber with a filter that can be swapped later.
fn subscriber<W>(
    directives: &str,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(EnvFilter::new(directives));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Loads the config, then switches logging to its filter unless `RUST_LOG`
/// was set.
fn load_config(
    cli: &Cli,
    filter: &FilterHandle,
    keep_rust_log: bool,
) -> anyhow::Result<CaisseConfig> {
    let config = if cli.needs_config() {
        CaisseConfig::load(cli.config.clone()).context("Failed to load configuration")?
    } else {
        CaisseConfig::load_or_default(cli.config.clone())
    };

    if !keep_rust_log {
        let configured = EnvFilter::try_new(&config.logging.filter)
            .context("Invalid logging.filter")?;
        filter
            .reload(configured)
            .context("Failed to apply logging.filter")?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_startup_filter_order() {
        let both = startup_filter(env(&[("RUST_LOG", "trace"), ("CAISSE_LOG", "warn")]));
        assert_eq!(
            both,
            StartupFilter {
                directives: "trace".to_string(),
                from_rust_log: true
            }
        );

        let caisse_only = startup_filter(env(&[("CAISSE_LOG", "warn")]));
        assert_eq!(caisse_only.directives, "warn");
        assert!(!caisse_only.from_rust_log);

        let none = startup_filter(env(&[]));
        assert_eq!(none.directives, LoggingSettings::default().filter);
    }

    #[test]
    fn test_startup_filter_skips_invalid_rust_log() {
        let startup = startup_filter(env(&[("RUST_LOG", "caisse=loud")]));
        assert_eq!(startup.directives, LoggingSettings::default().filter);
        assert!(!startup.from_rust_log);
    }

    #[test]
    fn test_config_load_warnings_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caisse.toml");
        std::fs::write(&path, "[loyalty\npointsValue = ").unwrap();
        let cli = Cli::try_parse_from([
            "caisse",
            "--config",
            path.to_str().unwrap(),
            "config",
            "init",
            "--force",
        ])
        .unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let (subscriber, filter) = subscriber("warn", move || writer.clone());

        let config = tracing::subscriber::with_default(subscriber, || {
            load_config(&cli, &filter, false)
        })
        .unwrap();

        assert_eq!(config, CaisseConfig::default());
        assert!(captured.contents().contains("Failed to load config"));
    }
}
