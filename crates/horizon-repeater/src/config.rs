//! Container configuration.
//!
//! The cache lengths control how far past the viewport elements are realized,
//! in multiples of the viewport size. A value of 2.0 realizes one viewport
//! worth of items before and one after the visible window.
//!
//! ```
//! use horizon_repeater::RepeaterConfig;
//!
//! let config = RepeaterConfig::from_toml_str("vertical_cache_length = 4.0").unwrap();
//! assert_eq!(config.vertical_cache_length, 4.0);
//! assert_eq!(config.horizontal_cache_length, 2.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RepeaterError, Result};

/// Default cache length for both axes.
pub const DEFAULT_CACHE_LENGTH: f32 = 2.0;

/// Settings of an [`ItemsRepeater`](crate::ItemsRepeater).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterConfig {
    /// Horizontal overscan in viewport widths.
    pub horizontal_cache_length: f32,
    /// Vertical overscan in viewport heights.
    pub vertical_cache_length: f32,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            horizontal_cache_length: DEFAULT_CACHE_LENGTH,
            vertical_cache_length: DEFAULT_CACHE_LENGTH,
        }
    }
}

impl RepeaterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate the result.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| RepeaterError::invalid_config("config", e.to_string()))
    }

    pub fn with_horizontal_cache_length(mut self, length: f32) -> Self {
        self.horizontal_cache_length = length;
        self
    }

    pub fn with_vertical_cache_length(mut self, length: f32) -> Self {
        self.vertical_cache_length = length;
        self
    }

    /// Reject cache lengths that are negative or not a number.
    pub fn validate(&self) -> Result<()> {
        check_cache_length("horizontal_cache_length", self.horizontal_cache_length)?;
        check_cache_length("vertical_cache_length", self.vertical_cache_length)
    }
}

fn check_cache_length(option: &'static str, value: f32) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(RepeaterError::invalid_config(
            option,
            format!("cache length must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepeaterConfig::default();
        assert_eq!(config.horizontal_cache_length, 2.0);
        assert_eq!(config.vertical_cache_length, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = RepeaterConfig::from_toml_str("horizontal_cache_length = 0.5\n").unwrap();
        assert_eq!(config.horizontal_cache_length, 0.5);
        assert_eq!(config.vertical_cache_length, DEFAULT_CACHE_LENGTH);
    }

    #[test]
    fn test_negative_length_rejected() {
        let err = RepeaterConfig::from_toml_str("vertical_cache_length = -1.0").unwrap_err();
        assert!(matches!(
            err,
            RepeaterError::InvalidConfig { option: "vertical_cache_length", .. }
        ));
        assert!(RepeaterConfig::new().with_horizontal_cache_length(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = RepeaterConfig::from_toml_str("vertical_cache_length = \"lots\"").unwrap_err();
        assert!(matches!(err, RepeaterError::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RepeaterConfig::new().with_vertical_cache_length(3.0);
        let text = config.to_toml_string().unwrap();
        assert_eq!(RepeaterConfig::from_toml_str(&text).unwrap(), config);
    }
}
