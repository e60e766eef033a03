//! Per-field coercion and validation.
//!
//! Each function takes the raw string for one field and returns the typed
//! value or a [`ConfigError`] naming that field and the rejected input.

use super::error::ConfigError;
use super::log_level::LogLevel;

pub const MIN_PORT: i64 = 1;
pub const MAX_PORT: i64 = 65535;

/// Boolean field.
///
/// Accepts `true/false`, `1/0`, `yes/no`, `y/n`, `on/off` and `t/f`,
/// case-insensitively.
pub fn boolean(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" | "t" => Ok(true),
        "false" | "0" | "no" | "n" | "off" | "f" => Ok(false),
        _ => Err(ConfigError::TypeCoercion {
            field,
            value: raw.to_string(),
            expected: "a boolean (true/false)",
        }),
    }
}

/// TCP port: an integer in `1..=65535`.
pub fn port(field: &'static str, raw: &str) -> Result<u16, ConfigError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::TypeCoercion {
            field,
            value: raw.to_string(),
            expected: "an integer",
        })?;

    if !(MIN_PORT..=MAX_PORT).contains(&value) {
        return Err(ConfigError::Range {
            field,
            value: raw.trim().to_string(),
            min: MIN_PORT,
            max: MAX_PORT,
        });
    }

    Ok(value as u16)
}

/// Log level, matched case-insensitively.
pub fn log_level(field: &'static str, raw: &str) -> Result<LogLevel, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidEnumValue {
        field,
        value: raw.to_string(),
        allowed: LogLevel::allowed(),
    })
}
