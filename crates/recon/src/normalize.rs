//! Parcel identifier normalization.
//!
//! The same rule is applied to CSV cells and GeoJSON property values so that
//! keys from both sources compare by plain string equality.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Canonical parcel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ParcelKey(String);

impl ParcelKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParcelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Why a raw identifier could not be turned into a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MalformedIdentifier {
    /// Field absent or JSON `null`.
    Missing,
    /// Blank after trimming.
    Empty,
    /// JSON value that is not a string or an integer.
    UnsupportedType(&'static str),
    /// Does not fit the configured format.
    Pattern(String),
}

impl fmt::Display for MalformedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "identifier is missing"),
            Self::Empty => write!(f, "identifier is empty"),
            Self::UnsupportedType(kind) => write!(f, "identifier has unsupported type {kind}"),
            Self::Pattern(raw) => {
                write!(f, "identifier '{raw}' does not match the cadastral parcel format")
            }
        }
    }
}

impl std::error::Error for MalformedIdentifier {}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Format convention applied after trimming and uppercasing.
///
/// ```toml
/// [normalization]
/// rule = "zero_pad"
/// width = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum NormalizationRule {
    /// Left-pad with `0` up to `width` characters. Longer values are kept whole.
    ZeroPad {
        #[serde(default)]
        width: usize,
    },
    /// French cadastre parcel id: INSEE code (5) + prefix (3) + section (2) + number (4).
    Cadastral,
}

impl Default for NormalizationRule {
    fn default() -> Self {
        Self::ZeroPad { width: 0 }
    }
}

impl fmt::Display for NormalizationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPad { width } => write!(f, "zero_pad(width={width})"),
            Self::Cadastral => write!(f, "cadastral"),
        }
    }
}

fn cadastral_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // insee, optional 3-digit prefix, optional padding zero, 1-2 letter section, number
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{5})\s*(\d{3})?\s*0?([A-Z]{1,2})\s*(\d{1,4})$")
            .expect("cadastral pattern is a valid regex")
    })
}

impl NormalizationRule {
    /// Normalize a textual identifier.
    pub fn normalize(&self, raw: &str) -> Result<ParcelKey, MalformedIdentifier> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MalformedIdentifier::Empty);
        }
        let upper = trimmed.to_uppercase();

        match self {
            Self::ZeroPad { width } => Ok(ParcelKey(zero_pad(upper, *width))),
            Self::Cadastral => {
                let caps = cadastral_pattern()
                    .captures(&upper)
                    .ok_or_else(|| MalformedIdentifier::Pattern(trimmed.to_string()))?;
                let insee = &caps[1];
                let prefix = caps.get(2).map_or("000", |m| m.as_str());
                let section = &caps[3];
                let number = &caps[4];
                Ok(ParcelKey(format!("{insee}{prefix}{section:0>2}{number:0>4}")))
            }
        }
    }

    /// Normalize a GeoJSON property value. Strings and integral numbers are accepted.
    pub fn normalize_value(&self, raw: Option<&Value>) -> Result<ParcelKey, MalformedIdentifier> {
        match raw {
            None | Some(Value::Null) => Err(MalformedIdentifier::Missing),
            Some(Value::String(s)) => self.normalize(s),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    self.normalize(&i.to_string())
                } else if let Some(u) = n.as_u64() {
                    self.normalize(&u.to_string())
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() && f.fract() == 0.0 => {
                            if f.abs() < 1e15 {
                                self.normalize(&format!("{f:.0}"))
                            } else {
                                Err(MalformedIdentifier::UnsupportedType("number out of range"))
                            }
                        }
                        _ => Err(MalformedIdentifier::UnsupportedType("non-integer number")),
                    }
                }
            }
            Some(Value::Bool(_)) => Err(MalformedIdentifier::UnsupportedType("boolean")),
            Some(Value::Array(_)) => Err(MalformedIdentifier::UnsupportedType("array")),
            Some(Value::Object(_)) => Err(MalformedIdentifier::UnsupportedType("object")),
        }
    }
}

fn zero_pad(value: String, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        value
    } else {
        let mut padded = "0".repeat(width - len);
        padded.push_str(&value);
        padded
    }
}
