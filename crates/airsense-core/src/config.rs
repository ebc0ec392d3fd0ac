//! Device configuration
//!
//! [`Config`] carries the build-time settings (Wi-Fi credentials and board).
//! [`Configuration`] holds the runtime settings that can be pushed by the
//! cloud or set locally, parsed from JSON documents.

use core::str::FromStr;

use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::board::BoardType;

#[derive(Serialize, Deserialize, Debug)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub board: BoardType,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid JSON: {0}")]
    Json(String<64>),
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
    #[error("Ignore, configuration control is {0}")]
    Rejected(&'static str),
}

/// Who is allowed to change the device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigurationControl {
    Local,
    Cloud,
    #[default]
    Both,
}

impl ConfigurationControl {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
            Self::Both => "both",
        }
    }
}

impl FromStr for ConfigurationControl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            "both" => Ok(Self::Both),
            _ => Err(ConfigError::InvalidValue("configurationControl")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PmStandard {
    #[default]
    Ugm3,
    UsAqi,
}

impl FromStr for PmStandard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ugm3" => Ok(Self::Ugm3),
            "us-aqi" => Ok(Self::UsAqi),
            _ => Err(ConfigError::InvalidValue("pmStandard")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl FromStr for TemperatureUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Self::Celsius),
            "f" => Ok(Self::Fahrenheit),
            _ => Err(ConfigError::InvalidValue("temperatureUnit")),
        }
    }
}

/// Where a configuration document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Local,
    Cloud,
}

/// Longest string value accepted in a configuration document.
const MAX_VALUE_LEN: usize = 128;

type Value = String<MAX_VALUE_LEN>;

/// Wire form of a configuration document. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigDocument {
    configuration_control: Option<Value>,
    post_data_to_air_gradient: Option<bool>,
    country: Option<Value>,
    pm_standard: Option<Value>,
    temperature_unit: Option<Value>,
    abc_days: Option<u16>,
    mqtt_broker_url: Option<Value>,
    model: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    configuration_control: ConfigurationControl,
    post_data_to_airgradient: bool,
    country: String<2>,
    pm_standard: PmStandard,
    temperature_unit: TemperatureUnit,
    abc_days: u16,
    mqtt_broker_url: String<128>,
    model: String<16>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            configuration_control: ConfigurationControl::Both,
            post_data_to_airgradient: true,
            country: String::new(),
            pm_standard: PmStandard::Ugm3,
            temperature_unit: TemperatureUnit::Celsius,
            abc_days: 8,
            mqtt_broker_url: String::new(),
            model: String::new(),
        }
    }
}

fn bounded<const N: usize>(value: &str, field: &'static str) -> Result<String<N>, ConfigError> {
    String::try_from(value).map_err(|_| ConfigError::InvalidValue(field))
}

impl Configuration {
    /// Apply a JSON configuration document.
    ///
    /// The whole document is validated before anything is applied, so a bad
    /// value leaves the configuration untouched. Returns whether any setting
    /// changed.
    pub fn parse(&mut self, json: &str, source: ConfigSource) -> Result<bool, ConfigError> {
        let rejected_by = match (source, self.configuration_control) {
            (ConfigSource::Cloud, ConfigurationControl::Local) => Some("local"),
            (ConfigSource::Local, ConfigurationControl::Cloud) => Some("cloud"),
            _ => None,
        };
        if let Some(control) = rejected_by {
            warn!("Ignore, cause ConfigurationControl is {}", control);
            return Err(ConfigError::Rejected(control));
        }

        let mut unescaped = [0u8; MAX_VALUE_LEN];
        let (doc, _) = serde_json_core::from_str_escaped::<ConfigDocument>(json, &mut unescaped)
            .map_err(|e| {
                let mut message = String::new();
                let _ = core::fmt::write(&mut message, format_args!("{}", e));
                warn!("Configuration parse failed: {}", message);
                ConfigError::Json(message)
            })?;

        let mut next = self.clone();
        if let Some(control) = doc.configuration_control {
            next.configuration_control = control.parse()?;
        }
        if let Some(post) = doc.post_data_to_air_gradient {
            next.post_data_to_airgradient = post;
        }
        if let Some(country) = doc.country {
            // An empty country clears it.
            if !country.is_empty() && country.len() != 2 {
                return Err(ConfigError::InvalidValue("country"));
            }
            next.country = bounded(&country, "country")?;
        }
        if let Some(standard) = doc.pm_standard {
            next.pm_standard = standard.parse()?;
        }
        if let Some(unit) = doc.temperature_unit {
            next.temperature_unit = unit.parse()?;
        }
        if let Some(days) = doc.abc_days {
            next.abc_days = days;
        }
        if let Some(url) = doc.mqtt_broker_url {
            next.mqtt_broker_url = bounded(&url, "mqttBrokerUrl")?;
        }
        if let Some(model) = doc.model {
            next.model = bounded(&model, "model")?;
        }

        let changed = next != *self;
        if changed {
            info!("Configuration updated from {:?}", source);
            *self = next;
        }
        Ok(changed)
    }

    pub fn configuration_control(&self) -> ConfigurationControl {
        self.configuration_control
    }

    pub fn set_configuration_control(&mut self, control: ConfigurationControl) {
        self.configuration_control = control;
    }

    pub fn is_post_data_to_airgradient(&self) -> bool {
        self.post_data_to_airgradient
    }

    pub fn set_post_data_to_airgradient(&mut self, enabled: bool) {
        self.post_data_to_airgradient = enabled;
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn pm_standard(&self) -> PmStandard {
        self.pm_standard
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.temperature_unit
    }

    pub fn abc_days(&self) -> u16 {
        self.abc_days
    }

    pub fn mqtt_broker_url(&self) -> &str {
        &self.mqtt_broker_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cloud_document() {
        let mut config = Configuration::default();
        let json = r#"{"country":"TH","pmStandard":"us-aqi","temperatureUnit":"f","abcDays":30,"postDataToAirGradient":false,"model":"I-9PSL"}"#;

        assert_eq!(config.parse(json, ConfigSource::Cloud), Ok(true));
        assert_eq!(config.country(), "TH");
        assert_eq!(config.pm_standard(), PmStandard::UsAqi);
        assert_eq!(config.temperature_unit(), TemperatureUnit::Fahrenheit);
        assert_eq!(config.abc_days(), 30);
        assert_eq!(config.model(), "I-9PSL");
        assert!(!config.is_post_data_to_airgradient());
    }

    #[test]
    fn test_same_document_twice_is_unchanged() {
        let mut config = Configuration::default();
        let json = r#"{"country":"DE"}"#;

        assert_eq!(config.parse(json, ConfigSource::Cloud), Ok(true));
        assert_eq!(config.parse(json, ConfigSource::Cloud), Ok(false));
    }

    #[test]
    fn test_cloud_rejected_under_local_control() {
        let mut config = Configuration::default();
        config.set_configuration_control(ConfigurationControl::Local);

        assert_eq!(
            config.parse(r#"{"country":"US"}"#, ConfigSource::Cloud),
            Err(ConfigError::Rejected("local"))
        );
        assert_eq!(config.country(), "");
        assert_eq!(
            config.parse(r#"{"country":"US"}"#, ConfigSource::Local),
            Ok(true)
        );
    }

    #[test]
    fn test_local_rejected_under_cloud_control() {
        let mut config = Configuration::default();
        config
            .parse(r#"{"configurationControl":"cloud"}"#, ConfigSource::Cloud)
            .unwrap();

        assert_eq!(
            config.parse(r#"{"abcDays":1}"#, ConfigSource::Local),
            Err(ConfigError::Rejected("cloud"))
        );
    }

    #[test]
    fn test_invalid_value_applies_nothing() {
        let mut config = Configuration::default();
        let json = r#"{"country":"GB","pmStandard":"mg"}"#;

        assert_eq!(
            config.parse(json, ConfigSource::Cloud),
            Err(ConfigError::InvalidValue("pmStandard"))
        );
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_string_escapes_are_decoded() {
        let mut config = Configuration::default();
        let json = r#"{"mqttBrokerUrl":"mqtt:\/\/broker.local:1883","model":"I-9PSL"}"#;

        assert_eq!(config.parse(json, ConfigSource::Cloud), Ok(true));
        assert_eq!(config.mqtt_broker_url(), "mqtt://broker.local:1883");
        assert_eq!(config.model(), "I-9PSL");
    }

    #[test]
    fn test_empty_country_clears_it() {
        let mut config = Configuration::default();
        config
            .parse(r#"{"country":"TH"}"#, ConfigSource::Cloud)
            .unwrap();

        let json = r#"{"country":"","abcDays":14}"#;
        assert_eq!(config.parse(json, ConfigSource::Cloud), Ok(true));
        assert_eq!(config.country(), "");
        assert_eq!(config.abc_days(), 14);
    }

    #[test]
    fn test_country_must_be_two_letters() {
        let mut config = Configuration::default();

        assert_eq!(
            config.parse(r#"{"country":"USA"}"#, ConfigSource::Cloud),
            Err(ConfigError::InvalidValue("country"))
        );
    }

    #[test]
    fn test_malformed_json() {
        let mut config = Configuration::default();

        assert!(matches!(
            config.parse("{\"country\":", ConfigSource::Cloud),
            Err(ConfigError::Json(_))
        ));
    }
}
