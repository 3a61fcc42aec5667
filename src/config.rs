//! Marketplace configuration.
//!
//! Every role is configured from a TOML document; every field has a default
//! so an empty document describes a working deployment. Durations are written
//! the human way (`"15s"`, `"250ms"`).
//!
//! ```toml
//! [registry]
//! address = "central@rec.foi.hr"
//!
//! [[stations]]
//! address = "station1@rec.foi.hr"
//! time_unit = "100ms"
//!
//! [renter]
//! station = "station1@rec.foi.hr"
//! vehicle = "mercedes"
//! days = 2
//! ```

use std::path::Path;
use std::time::Duration;

use rental_hub_core::Address;
use serde::Deserialize;

use crate::vehicle::{VehicleSpec, standard_fleet};

const DEFAULT_REGISTRY: &str = "central@rec.foi.hr";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration of a whole marketplace deployment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub registry: RegistryConfig,
    pub stations: Vec<StationConfig>,
    pub renter: Option<RenterConfig>,
}

impl MarketConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        config.resolve_registry();
        config.validate()?;
        Ok(config)
    }

    /// Points every station without its own `registry` at `[registry]`.
    pub fn resolve_registry(&mut self) {
        for station in &mut self.stations {
            if station.registry.is_none() {
                station.registry = Some(self.registry.address.clone());
            }
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for station in &self.stations {
            station.validate()?;
        }
        if let Some(renter) = &self.renter {
            renter.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub address: Address,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: Address::new(DEFAULT_REGISTRY),
        }
    }
}

/// Configuration of one station.
///
/// The station's own address is the address of the mailbox it is spawned
/// with; `address` here tells the deployment which mailbox to open.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub address: Address,
    /// Where to send `registerStation`. Unset in a marketplace file means the
    /// `[registry]` address.
    pub registry: Option<Address>,
    #[serde(with = "humantime_value")]
    pub time_unit: Duration,
    /// Charging cycle period, in time units.
    pub charge_period: f64,
    /// How long a charging cycle blocks, in time units.
    pub charge_duration: f64,
    /// Uncollected reservations are released after this long. Unset keeps
    /// reservations until the vehicle is returned.
    #[serde(with = "humantime_value::option")]
    pub reservation_ttl: Option<Duration>,
    /// Registration is repeated at this interval until a membership update
    /// lists the station.
    #[serde(with = "humantime_value")]
    pub register_interval: Duration,
    /// Number of replies remembered for answering retried requests.
    pub reply_cache: usize,
    pub fleet: Vec<VehicleSpec>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            address: Address::new("station@rec.foi.hr"),
            registry: None,
            time_unit: Duration::from_secs(1),
            charge_period: 15.0,
            charge_duration: 20.0,
            reservation_ttl: None,
            register_interval: Duration::from_secs(5),
            reply_cache: 256,
            fleet: standard_fleet(),
        }
    }
}

impl StationConfig {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// The registry this station registers with.
    pub fn registry(&self) -> Address {
        self.registry
            .clone()
            .unwrap_or_else(|| Address::new(DEFAULT_REGISTRY))
    }

    pub fn charge_period(&self) -> Duration {
        self.time_unit.mul_f64(self.charge_period)
    }

    pub fn charge_duration(&self) -> Duration {
        self.time_unit.mul_f64(self.charge_duration)
    }

    fn units(&self, count: f64) -> Option<Duration> {
        Duration::try_from_secs_f64(self.time_unit.as_secs_f64() * count).ok()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.charge_period.is_finite() && self.charge_period > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "station {}: charge_period must be positive",
                self.address
            )));
        }
        if !(self.charge_duration.is_finite() && self.charge_duration >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "station {}: charge_duration must not be negative",
                self.address
            )));
        }
        if !self.units(self.charge_period).is_some_and(|d| !d.is_zero()) {
            return Err(ConfigError::Invalid(format!(
                "station {}: charge_period of {} time units is out of range",
                self.address, self.charge_period
            )));
        }
        if self.units(self.charge_duration).is_none() {
            return Err(ConfigError::Invalid(format!(
                "station {}: charge_duration of {} time units is out of range",
                self.address, self.charge_duration
            )));
        }
        if self.time_unit.is_zero() || self.register_interval.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "station {}: time_unit and register_interval must be non-zero",
                self.address
            )));
        }
        Ok(())
    }
}

/// Configuration of one rental session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenterConfig {
    pub address: Address,
    /// Station the session starts at.
    pub station: Address,
    pub vehicle: String,
    pub days: u32,
    /// How long each request waits for its reply.
    #[serde(with = "humantime_value")]
    pub reply_timeout: Duration,
    /// Sends of one request before the session gives up.
    pub max_attempts: u32,
    /// Redirects followed before the session gives up.
    pub max_redirects: u32,
    /// Wall-clock length of one time unit while driving or charging.
    #[serde(with = "humantime_value")]
    pub time_unit: Duration,
    /// Specs the renter knows the vehicles by.
    pub catalogue: Vec<VehicleSpec>,
}

impl Default for RenterConfig {
    fn default() -> Self {
        Self {
            address: Address::new("user@rec.foi.hr"),
            station: Address::new("station@rec.foi.hr"),
            vehicle: String::new(),
            days: 1,
            reply_timeout: Duration::from_secs(10),
            max_attempts: 3,
            max_redirects: 8,
            time_unit: Duration::from_secs(1),
            catalogue: standard_fleet(),
        }
    }
}

impl RenterConfig {
    pub fn new(station: impl Into<Address>, vehicle: &str, days: u32) -> Self {
        Self {
            station: station.into(),
            vehicle: vehicle.trim().to_owned(),
            days,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("renter: max_attempts must be at least 1".into()));
        }
        if self.reply_timeout.is_zero() {
            return Err(ConfigError::Invalid("renter: reply_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

mod humantime_value {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = MarketConfig::from_toml_str("").unwrap();
        assert_eq!(config.registry.address.as_str(), DEFAULT_REGISTRY);
        assert!(config.stations.is_empty());
        assert!(config.renter.is_none());

        let station = StationConfig::default();
        assert_eq!(station.charge_period(), Duration::from_secs(15));
        assert_eq!(station.charge_duration(), Duration::from_secs(20));
        assert_eq!(station.fleet.len(), 6);
    }

    #[test]
    fn parses_human_durations() {
        let config = MarketConfig::from_toml_str(
            r#"
            [[stations]]
            address = "station1@rec.foi.hr"
            time_unit = "100ms"
            reservation_ttl = "2m"

            [renter]
            station = "station1"
            vehicle = "mercedes"
            days = 2
            reply_timeout = "250ms"
            "#,
        )
        .unwrap();

        let station = &config.stations[0];
        assert_eq!(station.address.as_str(), "station1@rec.foi.hr");
        assert_eq!(station.charge_period(), Duration::from_millis(1500));
        assert_eq!(station.reservation_ttl, Some(Duration::from_secs(120)));

        let renter = config.renter.unwrap();
        assert_eq!(renter.days, 2);
        assert_eq!(renter.reply_timeout, Duration::from_millis(250));
        assert_eq!(renter.max_attempts, 3);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            MarketConfig::from_toml_str("[renter]\nmax_attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MarketConfig::from_toml_str("[[stations]]\ntime_unit = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            MarketConfig::from_toml_str("[[stations]]\ncharge_period = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_charge_period_below_timer_resolution() {
        assert!(matches!(
            MarketConfig::from_toml_str(
                "[[stations]]\ntime_unit = \"1ns\"\ncharge_period = 0.25"
            ),
            Err(ConfigError::Invalid(_))
        ));

        let station = StationConfig {
            time_unit: Duration::from_nanos(1),
            charge_period: 2.0,
            ..StationConfig::default()
        };
        assert!(station.validate().is_ok());
        assert_eq!(station.charge_period(), Duration::from_nanos(2));
    }

    #[test]
    fn stations_register_with_the_configured_registry() {
        let config = MarketConfig::from_toml_str(
            r#"
            [registry]
            address = "hub@rec.foi.hr"

            [[stations]]
            address = "station1@rec.foi.hr"

            [[stations]]
            address = "station2@rec.foi.hr"
            registry = "backup@rec.foi.hr"
            "#,
        )
        .unwrap();

        assert_eq!(config.stations[0].registry().as_str(), "hub@rec.foi.hr");
        assert_eq!(config.stations[1].registry().as_str(), "backup@rec.foi.hr");
        assert_eq!(
            StationConfig::new("station3").registry().as_str(),
            DEFAULT_REGISTRY
        );
    }
}
