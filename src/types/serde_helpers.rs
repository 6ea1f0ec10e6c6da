//! Custom serde deserializers for flexible type handling
//!
//! Provides custom deserializers to handle the loosely typed values that
//! browser clients and the remote provider send.

use serde::{Deserialize, Deserializer, de};

/// Deserialize a flexible boolean value that can be:
/// - JSON boolean: `true`, `false`
/// - Integer: `0` (false), any positive integer (true, negative integers treated as false)
/// - String: `"0"`, `"1"`, `"false"`, `"true"` (case-insensitive)
///
/// Cookie objects pasted from browser extensions are not consistent about
/// how `httpOnly`/`secure` are encoded.
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleBool {
        Bool(bool),
        Int(i64),
        String(String),
    }

    let value: Option<FlexibleBool> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(FlexibleBool::Bool(b)) => Ok(Some(b)),
        Some(FlexibleBool::Int(i)) => Ok(Some(i > 0)),
        Some(FlexibleBool::String(s)) => {
            let s_lower = s.trim().to_lowercase();
            match s_lower.as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(de::Error::custom(format!("invalid boolean string: {}", s))),
            }
        }
    }
}

/// Deserialize an integer that may arrive as a JSON number or a numeric string.
///
/// Provider envelopes normally carry numeric codes, but some gateways
/// stringify them.
pub fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        String(String),
    }

    match FlexibleInt::deserialize(deserializer)? {
        FlexibleInt::Int(i) => Ok(i),
        FlexibleInt::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        FlexibleInt::Float(f) => Err(de::Error::custom(format!("invalid integer: {}", f))),
        FlexibleInt::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid integer string: {}", s))),
    }
}
