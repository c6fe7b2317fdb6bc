//! Common validation utilities.

use validator::ValidationError;

/// Lowest accepted rule priority.
pub const MIN_RULE_PRIORITY: i32 = 1;

/// Highest accepted rule priority.
pub const MAX_RULE_PRIORITY: i32 = 100;

lazy_static::lazy_static! {
    /// Rule keys are plain identifiers: ASCII letters, digits and underscores.
    pub static ref RULE_KEY_REGEX: regex::Regex = regex::Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that speed is finite and non-negative.
pub fn validate_speed(speed: f64) -> Result<(), ValidationError> {
    if speed.is_finite() && speed >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("speed_range");
        err.message = Some("Speed must be non-negative".into());
        Err(err)
    }
}

/// Validates an alert rule key: non-blank and matching `^[A-Za-z0-9_]+$`.
pub fn validate_rule_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        let mut err = ValidationError::new("rule_key_required");
        err.message = Some("Rule key must not be empty".into());
        return Err(err);
    }

    if !RULE_KEY_REGEX.is_match(key) {
        let mut err = ValidationError::new("rule_key_format");
        err.message =
            Some("Rule key may only contain letters, digits and underscores".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a rule name is not blank.
pub fn validate_rule_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("rule_name_required");
        err.message = Some("Rule name must not be empty".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a rule priority is within 1..=100.
pub fn validate_priority(priority: i32) -> Result<(), ValidationError> {
    if (MIN_RULE_PRIORITY..=MAX_RULE_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        let mut err = ValidationError::new("priority_range");
        err.message = Some("Priority must be between 1 and 100".into());
        Err(err)
    }
}
