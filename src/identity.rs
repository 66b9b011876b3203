use crate::config::DeviceConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use tracing::debug;
use uuid::Uuid;

const DMI_VENDOR_PATH: &str = "/sys/class/dmi/id/sys_vendor";
const DMI_PRODUCT_PATH: &str = "/sys/class/dmi/id/product_name";
const UNKNOWN: &str = "Unknown";

/// Process-lifetime identity announced to the server.
///
/// Generated once at startup and passed to whoever needs it; never
/// persisted, so every run announces a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(Uuid);

impl DeviceIdentity {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Manufacturer and model of the host device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    pub fn new<S: Into<String>>(manufacturer: S, model: S) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
        }
    }

    /// Config overrides first, then the platform DMI tables, then "Unknown"
    pub fn detect(config: &DeviceConfig) -> Self {
        let manufacturer = config
            .manufacturer
            .clone()
            .or_else(|| read_dmi(DMI_VENDOR_PATH))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let model = config
            .model
            .clone()
            .or_else(|| read_dmi(DMI_PRODUCT_PATH))
            .unwrap_or_else(|| UNKNOWN.to_string());

        debug!("Device: manufacturer={:?} model={:?}", manufacturer, model);
        Self {
            manufacturer,
            model,
        }
    }

    /// Human-readable label sent in the notification payload
    pub fn name(&self) -> String {
        device_name(&self.manufacturer, &self.model)
    }
}

fn read_dmi(path: &str) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Combine manufacturer and model into a display label.
///
/// A model that already starts with the manufacturer (ignoring case) is
/// used alone; otherwise the manufacturer is prefixed in title case.
pub fn device_name(manufacturer: &str, model: &str) -> String {
    if model
        .to_lowercase()
        .starts_with(&manufacturer.to_lowercase())
    {
        capitalize(model)
    } else {
        format!("{} {}", capitalize(&manufacturer.to_lowercase()), model)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_with_manufacturer_prefix() {
        assert_eq!(device_name("Samsung", "samsung galaxy s3"), "Samsung galaxy s3");
        assert_eq!(device_name("Google", "Google Pixel 7"), "Google Pixel 7");
    }

    #[test]
    fn test_model_without_manufacturer_prefix() {
        assert_eq!(device_name("HTC", "Desire"), "Htc Desire");
        assert_eq!(device_name("acme", "X1"), "Acme X1");
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(device_name("", "nexus"), "Nexus");
        assert_eq!(device_name("", ""), "");
    }

    #[test]
    fn test_identity_is_unique_and_stable() {
        let a = DeviceIdentity::generate();
        let b = DeviceIdentity::generate();
        assert_ne!(a, b);

        let copy = a;
        assert_eq!(copy.to_string(), a.to_string());
        assert_eq!(a.to_string().len(), 36);
        assert_eq!(a.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_detect_prefers_config_overrides() {
        let config = DeviceConfig {
            manufacturer: Some("Acme".to_string()),
            model: Some("X1".to_string()),
        };
        let info = DeviceInfo::detect(&config);
        assert_eq!(info, DeviceInfo::new("Acme", "X1"));
        assert_eq!(info.name(), "Acme X1");
    }

    #[test]
    fn test_detect_never_returns_empty_values() {
        let info = DeviceInfo::detect(&DeviceConfig::default());
        assert!(!info.manufacturer.is_empty());
        assert!(!info.model.is_empty());
    }
}
