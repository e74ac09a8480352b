// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    /// Validate that a number is within range
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<()> {
        if !allowed.contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be one of {}, got '{}'",
                field,
                allowed.join(", "),
                value
            )));
        }
        Ok(())
    }

    /// Validate a base path: empty, or starting with `/` and not ending with one
    pub fn is_base_path(value: &str, field: &str) -> Result<()> {
        if !value.is_empty() && (!value.starts_with('/') || value.ends_with('/')) {
            return Err(ConfigError::ValidationError(format!(
                "{} must start with '/' and not end with '/', got '{}'",
                field, value
            )));
        }
        Ok(())
    }

    /// Validate URL scheme
    pub fn has_scheme(value: &str, schemes: &[&str], field: &str) -> Result<()> {
        let matches = schemes
            .iter()
            .any(|scheme| value.starts_with(&format!("{}://", scheme)));
        if !matches {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a {} URL",
                field,
                schemes.join("/")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("en", "defaults.language").is_ok());
        assert!(ConfigValidator::not_empty("  ", "defaults.language").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());
        let err = ConfigValidator::in_range(11, 1, 10, "field").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: field must be between 1 and 10, got 11");
    }

    #[test]
    fn test_one_of_validation() {
        assert!(ConfigValidator::one_of("strip", &["strip", "reject"], "field").is_ok());
        assert!(ConfigValidator::one_of("drop", &["strip", "reject"], "field").is_err());
    }

    #[test]
    fn test_base_path_validation() {
        assert!(ConfigValidator::is_base_path("", "http.base").is_ok());
        assert!(ConfigValidator::is_base_path("/api", "http.base").is_ok());
        assert!(ConfigValidator::is_base_path("api", "http.base").is_err());
        assert!(ConfigValidator::is_base_path("/api/", "http.base").is_err());
    }

    #[test]
    fn test_scheme_validation() {
        assert!(ConfigValidator::has_scheme("redis://localhost", &["redis", "rediss"], "cache.url").is_ok());
        assert!(ConfigValidator::has_scheme("localhost:6379", &["redis"], "cache.url").is_err());
    }
}
