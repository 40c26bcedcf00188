//! Environment-variable accessors used at service startup.
//!
//! A variable that is set to the empty string counts as unset everywhere.

use std::str::FromStr;

use crate::error::ConfigError;

/// Load `.env` from the working directory, if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "failed to load .env"),
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Value of `key`, failing when it is unset or empty.
pub fn require_env(key: &str) -> Result<String, ConfigError> {
    non_empty(key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

/// Value of `key` parsed as a number.
///
/// Accepts what a JavaScript `Number(value)` conversion accepts: decimal and
/// exponent forms, `0x`/`0o`/`0b` integer literals, signed `Infinity`, and
/// whitespace-only text (which reads as `0`).
pub fn require_env_number(key: &str) -> Result<f64, ConfigError> {
    let value = require_env(key)?;
    match parse_number(&value) {
        Some(num) => Ok(num),
        None => Err(ConfigError::NotNumeric {
            key: key.to_string(),
            value,
        }),
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let text = value.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    match text {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    let radix = match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &text[2..];
        if digits.is_empty() {
            return None;
        }
        return digits.chars().try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        });
    }

    // Rust also reads `inf`, `infinity` and `nan`; JS does not.
    if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    text.parse::<f64>().ok().filter(|num| !num.is_nan())
}

/// Value of `key` parsed as `T`, e.g. a `u16` port.
pub fn require_env_parse<T>(key: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = require_env(key)?;
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        value,
        reason: e.to_string(),
    })
}

/// Value of `key`, or `default` when it is unset or empty.
pub fn optional_env(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| default.to_string())
}
