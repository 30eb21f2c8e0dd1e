//! Encoder configuration
//!
//! Every default the pipeline relies on lives here rather than inline at the
//! call sites. Configuration is plain data and can be loaded from JSON.

use crate::error::FitError;
use serde::{Deserialize, Serialize};

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
pub const FIT_EPOCH_OFFSET_SECS: i64 = 631_065_600;

/// Manufacturer id reserved for development / unregistered producers
pub const MANUFACTURER_DEVELOPMENT: u16 = 255;

/// Title used when the request carries no usable title
pub const DEFAULT_TITLE: &str = "Workout";

/// Base filename used when the request carries no usable title
pub const DEFAULT_FILENAME: &str = "workout";

/// Placeholder serial number; carries no meaning for workout files
pub const DEFAULT_SERIAL_NUMBER: u32 = 0x1234_5678;

/// Maximum string payload in bytes, excluding the NUL terminator
pub const DEFAULT_MAX_STRING_BYTES: u8 = 50;

/// FIT protocol version 2.0
pub const DEFAULT_PROTOCOL_VERSION: u8 = 0x20;

/// FIT profile version 21.32
pub const DEFAULT_PROFILE_VERSION: u16 = 2132;

/// Configuration shared by the normalizer, message builder and encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub default_title: String,
    pub default_filename: String,
    pub serial_number: u32,
    pub manufacturer: u16,
    pub product: u16,
    pub max_string_bytes: u8,
    pub protocol_version: u8,
    pub profile_version: u16,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            default_filename: DEFAULT_FILENAME.to_string(),
            serial_number: DEFAULT_SERIAL_NUMBER,
            manufacturer: MANUFACTURER_DEVELOPMENT,
            product: 0,
            max_string_bytes: DEFAULT_MAX_STRING_BYTES,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            profile_version: DEFAULT_PROFILE_VERSION,
        }
    }
}

impl FitConfig {
    /// Load a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, FitError> {
        let config: FitConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce a well-formed file
    pub fn validate(&self) -> Result<(), FitError> {
        if self.max_string_bytes == 0 || self.max_string_bytes == u8::MAX {
            return Err(FitError::Validation(format!(
                "max_string_bytes must be between 1 and 254, got {}",
                self.max_string_bytes
            )));
        }
        if self.default_title.trim().is_empty() {
            return Err(FitError::Validation(
                "default_title must not be blank".to_string(),
            ));
        }
        if self.default_title.contains('\0') {
            return Err(FitError::Validation(
                "default_title must not contain NUL characters".to_string(),
            ));
        }
        if self.default_title.len() > self.max_string_bytes as usize {
            return Err(FitError::Validation(format!(
                "default_title exceeds {} bytes",
                self.max_string_bytes
            )));
        }
        if self.default_filename.is_empty()
            || !self
                .default_filename
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(FitError::Validation(format!(
                "default_filename must be non-empty and filesystem-safe, got {:?}",
                self.default_filename
            )));
        }
        if self.serial_number == 0 {
            // serial_number is uint32z, zero is its invalid value
            return Err(FitError::Validation(
                "serial_number must be non-zero".to_string(),
            ));
        }
        if self.manufacturer == u16::MAX || self.product == u16::MAX {
            return Err(FitError::Validation(
                "manufacturer and product must not be 0xFFFF".to_string(),
            ));
        }
        Ok(())
    }

    /// Width of a fixed-size string field, including the NUL terminator
    pub fn string_field_size(&self) -> u8 {
        self.max_string_bytes.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FitConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.string_field_size(), 51);
    }

    #[test]
    fn test_from_json_merges_defaults() {
        let config = FitConfig::from_json(r#"{"serial_number": 42}"#).unwrap();
        assert_eq!(config.serial_number, 42);
        assert_eq!(config.default_title, DEFAULT_TITLE);
        assert_eq!(config.max_string_bytes, DEFAULT_MAX_STRING_BYTES);
    }

    #[test]
    fn test_rejects_unusable_string_size() {
        assert!(FitConfig::from_json(r#"{"max_string_bytes": 0}"#).is_err());
        assert!(FitConfig::from_json(r#"{"max_string_bytes": 255}"#).is_err());
    }

    #[test]
    fn test_accepts_widest_string_size() {
        let config = FitConfig::from_json(r#"{"max_string_bytes": 254}"#).unwrap();
        assert_eq!(config.string_field_size(), 255);
    }

    #[test]
    fn test_rejects_nul_in_default_title() {
        assert!(FitConfig::from_json(r#"{"default_title": "Work\u0000out"}"#).is_err());
    }

    #[test]
    fn test_rejects_unsafe_default_filename() {
        let err = FitConfig::from_json(r#"{"default_filename": "../etc"}"#).unwrap_err();
        assert!(matches!(err, FitError::Validation(_)));
    }

    #[test]
    fn test_rejects_zero_serial() {
        assert!(FitConfig::from_json(r#"{"serial_number": 0}"#).is_err());
    }
}
