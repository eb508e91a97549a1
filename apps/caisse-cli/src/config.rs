//! # CLI Configuration
//!
//! Loyalty program and logging settings for the `caisse` binary.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAISSE_POINTS_PER_FCFA=0.02                                        │
//! │     CAISSE_LOG=debug                                                   │
//! │                                                                         │
//! │  2. TOML Config File (--config, or the platform config dir)            │
//! │     ~/.config/caisse/caisse.toml (Linux)                               │
//! │     ~/Library/Application Support/com.caisse.caisse/caisse.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.01 points per franc, 5 FCFA per point, 100 points minimum        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # caisse.toml
//! [loyalty]
//! pointsPerFCFA = 0.01
//! pointsValue = 5
//! minPointsToRedeem = 100
//! isActive = true
//!
//! [loyalty.bonus]
//! startDate = "2026-06-01T00:00:00Z"
//! endDate = "2026-06-30T23:59:59Z"
//! multiplier = 2.0
//!
//! [logging]
//! filter = "info,caisse=debug"
//! ```

use std::path::PathBuf;

use caisse_core::validation::validate_loyalty_program;
use caisse_core::{LoyaltyProgram, Money, PointsRate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// File name looked up in the platform config dir.
pub const CONFIG_FILE_NAME: &str = "caisse.toml";

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,caisse=debug".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaisseConfig {
    /// The loyalty program in force.
    #[serde(default)]
    pub loyalty: LoyaltyProgram,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl CaisseConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (caisse.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CliResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> CliResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CliError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml()?)?;
        info!(?path, "Config saved");

        Ok(path)
    }

    /// Pretty TOML, as written by [`CaisseConfig::save`].
    pub fn to_toml(&self) -> CliResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CliResult<()> {
        validate_loyalty_program(&self.loyalty)?;

        if self.logging.filter.trim().is_empty() {
            return Err(CliError::InvalidConfig(
                "logging.filter must not be empty".into(),
            ));
        }

        EnvFilter::try_new(&self.logging.filter).map_err(|e| {
            CliError::InvalidConfig(format!(
                "logging.filter '{}' is not a valid filter: {}",
                self.logging.filter, e
            ))
        })?;

        Ok(())
    }

    /// Applies `CAISSE_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Values that do not parse are skipped.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(active) = lookup("CAISSE_LOYALTY_ACTIVE") {
            match active.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.loyalty.is_active = true,
                "0" | "false" | "no" | "off" => self.loyalty.is_active = false,
                _ => warn!(value = %active, "Unknown CAISSE_LOYALTY_ACTIVE value"),
            }
        }

        if let Some(rate) = lookup("CAISSE_POINTS_PER_FCFA") {
            match rate.parse::<f64>() {
                Ok(r) if r.is_finite() && r >= 0.0 => {
                    debug!(rate = r, "Overriding earn rate from environment");
                    self.loyalty.points_per_fcfa = PointsRate::from_per_unit(r);
                }
                _ => warn!(value = %rate, "Ignoring invalid CAISSE_POINTS_PER_FCFA"),
            }
        }

        if let Some(value) = lookup("CAISSE_POINT_VALUE") {
            match value.parse::<i64>() {
                Ok(v) => self.loyalty.points_value = Money::from_units(v),
                Err(_) => warn!(value = %value, "Ignoring invalid CAISSE_POINT_VALUE"),
            }
        }

        if let Some(min) = lookup("CAISSE_MIN_POINTS_TO_REDEEM") {
            match min.parse::<u64>() {
                Ok(m) => self.loyalty.min_points_to_redeem = m,
                Err(_) => warn!(value = %min, "Ignoring invalid CAISSE_MIN_POINTS_TO_REDEEM"),
            }
        }

        if let Some(filter) = lookup("CAISSE_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caisse", "caisse")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_core::BonusMultiplier;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CaisseConfig::default();
        assert_eq!(config.loyalty, LoyaltyProgram::default());
        assert_eq!(config.logging.filter, "info,caisse=debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caisse.toml");
        std::fs::write(
            &path,
            r#"
[loyalty]
pointsPerFCFA = 0.02
pointsValue = 10
isActive = false

[loyalty.bonus]
startDate = "2026-06-01T00:00:00Z"
endDate = "2026-06-30T23:59:59Z"
multiplier = 1.5
"#,
        )
        .unwrap();

        let config = CaisseConfig::load(Some(path)).unwrap();
        assert_eq!(config.loyalty.points_per_fcfa, PointsRate::from_micros(20_000));
        assert_eq!(config.loyalty.points_value, Money::from_units(10));
        assert_eq!(config.loyalty.min_points_to_redeem, 100); // default kept
        assert!(!config.loyalty.is_active);
        assert_eq!(
            config.loyalty.bonus.map(|b| b.multiplier),
            Some(BonusMultiplier::from_bps(15_000))
        );
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaisseConfig::load(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.loyalty, LoyaltyProgram::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("caisse.toml");

        let mut config = CaisseConfig::default();
        config.loyalty.min_points_to_redeem = 250;
        config.logging.filter = "warn".to_string();

        let written = config.save(Some(path.clone())).unwrap();
        assert_eq!(written, path);
        assert!(path.exists());

        let loaded = CaisseConfig::load(Some(path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caisse.toml");
        std::fs::write(&path, "[loyalty\npointsValue = ").unwrap();

        assert!(matches!(
            CaisseConfig::load(Some(path.clone())),
            Err(CliError::ConfigLoadFailed(_))
        ));
        assert_eq!(CaisseConfig::load_or_default(Some(path)), CaisseConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = CaisseConfig::default();
        config.logging.filter = "  ".to_string();
        assert!(matches!(config.validate(), Err(CliError::InvalidConfig(_))));

        let mut config = CaisseConfig::default();
        config.loyalty.points_value = Money::from_units(-5);
        assert!(matches!(config.validate(), Err(CliError::Core(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CaisseConfig::default();
        config.apply_overrides(overrides(&[
            ("CAISSE_LOYALTY_ACTIVE", "off"),
            ("CAISSE_POINTS_PER_FCFA", "0.05"),
            ("CAISSE_POINT_VALUE", "7"),
            ("CAISSE_MIN_POINTS_TO_REDEEM", "50"),
            ("CAISSE_LOG", "trace"),
        ]));

        assert!(!config.loyalty.is_active);
        assert_eq!(config.loyalty.points_per_fcfa, PointsRate::from_micros(50_000));
        assert_eq!(config.loyalty.points_value, Money::from_units(7));
        assert_eq!(config.loyalty.min_points_to_redeem, 50);
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn test_invalid_env_overrides_ignored() {
        let mut config = CaisseConfig::default();
        config.apply_overrides(overrides(&[
            ("CAISSE_LOYALTY_ACTIVE", "maybe"),
            ("CAISSE_POINTS_PER_FCFA", "-1"),
            ("CAISSE_POINT_VALUE", "five"),
        ]));
        assert_eq!(config, CaisseConfig::default());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = CaisseConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[loyalty]"));
        assert!(toml_str.contains("pointsPerFCFA"));
        assert!(toml_str.contains("[logging]"));
    }
}
