//! Interval specifications and boundary arithmetic
//!
//! Averaging intervals, schedule periods and schedule offsets all arrive from
//! configuration in several spellings. Everything here normalizes them to a
//! plain `f64` number of seconds:
//!
//! | Form                | Example                              |
//! |---------------------|--------------------------------------|
//! | Number of seconds   | `60`, `"60"`                         |
//! | ISO-8601 duration   | `"PT1M"`, `"P1DT12H"`, `"PT0.5S"`    |
//! | Colon delimited     | `"0:01:00"` (H:M:S), `"1:00:00:00"`  |
//! | Field mapping       | `{"MINUTES": 1}`, `{"hour": 1, "sec": 30}` |
//! | Boolean             | `false` (disabled), `true` (default) |

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use serde::Deserialize;
use thiserror_no_std::Error;

use crate::math;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_WEEK: f64 = 604_800.0;

/// Errors raised while normalizing an interval specification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntervalError {
    /// Interval is negative, NaN or infinite
    #[error("Interval out of range: {value}")]
    OutOfRange {
        /// The rejected value in seconds
        value: f64,
    },

    /// Text could not be read as any supported interval form
    #[error("Malformed interval: {text:?}")]
    Malformed {
        /// The rejected text
        text: String,
    },

    /// Mapping contained a key that is not a time unit
    #[error("Unknown interval field: {field:?}")]
    UnknownField {
        /// The rejected key
        field: String,
    },

    /// `true` was given but the consumer has no default interval
    #[error("Interval enabled but no default is available")]
    NoDefault,
}

/// An interval as written in configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    /// `false` disables, `true` selects the consumer's default
    Enabled(bool),
    /// Plain number of seconds
    Seconds(f64),
    /// Numeric, ISO-8601 or colon-delimited text
    Text(String),
    /// Unit name to count, e.g. `{"HOURS": 1, "MINUTES": 30}`
    Fields(BTreeMap<String, f64>),
}

impl IntervalSpec {
    /// Convert to seconds without range checks beyond finiteness.
    ///
    /// Offsets may legitimately be zero or negative (they are normalized into
    /// the period later), so this does not reject either.
    pub fn seconds(&self, default: Option<f64>) -> Result<f64, IntervalError> {
        let value = match self {
            Self::Enabled(false) => 0.0,
            Self::Enabled(true) => default.ok_or(IntervalError::NoDefault)?,
            Self::Seconds(value) => *value,
            Self::Text(text) => parse_text(text)?,
            Self::Fields(fields) => parse_fields(fields)?,
        };
        if !value.is_finite() {
            return Err(IntervalError::OutOfRange { value });
        }
        Ok(value)
    }
}

impl From<f64> for IntervalSpec {
    fn from(value: f64) -> Self {
        Self::Seconds(value)
    }
}

impl From<&str> for IntervalSpec {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Normalize an averaging interval.
///
/// Returns `Ok(None)` when averaging is disabled (zero or `false`). A missing
/// specification falls back to `default`, which may itself be `None`.
pub fn parse_interval(
    spec: Option<&IntervalSpec>,
    default: Option<f64>,
) -> Result<Option<f64>, IntervalError> {
    let value = match spec {
        Some(spec) => spec.seconds(default)?,
        None => match default {
            Some(value) => value,
            None => return Ok(None),
        },
    };
    if !value.is_finite() || value < 0.0 {
        return Err(IntervalError::OutOfRange { value });
    }
    if value == 0.0 {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Read interval text in any of the supported string forms.
pub fn parse_text(text: &str) -> Result<f64, IntervalError> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let upper = body.to_ascii_uppercase();

    let parsed = if upper.starts_with('P') {
        parse_iso8601(&upper)
    } else if upper.contains(':') {
        parse_colon(&upper)
    } else {
        parse_decimal(&upper)
    };

    match parsed {
        Some(value) if negative => Ok(-value),
        Some(value) => Ok(value),
        None => Err(IntervalError::Malformed {
            text: text.to_string(),
        }),
    }
}

/// Unsigned decimal seconds, exponent allowed (`90`, `2.5`, `1e3`).
fn parse_decimal(text: &str) -> Option<f64> {
    if !text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn is_plain_number(text: &str) -> bool {
    !text.is_empty()
        && text.bytes().any(|b| b.is_ascii_digit())
        && text.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && text.bytes().filter(|&b| b == b'.').count() <= 1
}

/// `P[nW][nD][T[nH][nM][nS]]`, fractions allowed on any component.
fn parse_iso8601(text: &str) -> Option<f64> {
    let body = text.strip_prefix('P')?;
    let (date, time) = match body.find('T') {
        Some(split) => (&body[..split], Some(&body[split + 1..])),
        None => (body, None),
    };

    let mut seen = false;
    let mut total = iso_components(date, &[('W', SECONDS_PER_WEEK), ('D', SECONDS_PER_DAY)], &mut seen)?;
    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        total += iso_components(
            time,
            &[('H', SECONDS_PER_HOUR), ('M', SECONDS_PER_MINUTE), ('S', 1.0)],
            &mut seen,
        )?;
    }
    seen.then_some(total)
}

/// Units must appear in the order given and at most once each.
fn iso_components(mut text: &str, units: &[(char, f64)], seen: &mut bool) -> Option<f64> {
    let mut total = 0.0;
    let mut next_unit = 0;
    while !text.is_empty() {
        let end = text.find(|c: char| c.is_ascii_alphabetic())?;
        let number = &text[..end];
        if !is_plain_number(number) {
            return None;
        }
        let value: f64 = number.parse().ok()?;

        let unit = text[end..].chars().next()?;
        let position = next_unit + units[next_unit..].iter().position(|(u, _)| *u == unit)?;
        total += value * units[position].1;
        next_unit = position + 1;
        *seen = true;

        text = &text[end + unit.len_utf8()..];
    }
    Some(total)
}

/// `H:M:S` or `D:H:M:S`.
fn parse_colon(text: &str) -> Option<f64> {
    let scales: &[f64] = match text.split(':').count() {
        3 => &[SECONDS_PER_HOUR, SECONDS_PER_MINUTE, 1.0],
        4 => &[SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, 1.0],
        _ => return None,
    };

    let mut total = 0.0;
    for (part, scale) in text.split(':').zip(scales) {
        let part = part.trim();
        if !is_plain_number(part) {
            return None;
        }
        total += part.parse::<f64>().ok()? * scale;
    }
    Some(total)
}

fn parse_fields(fields: &BTreeMap<String, f64>) -> Result<f64, IntervalError> {
    let mut total = 0.0;
    for (key, value) in fields {
        let scale = match key.trim().to_ascii_uppercase().as_str() {
            "DAYS" | "DAY" => SECONDS_PER_DAY,
            "HOURS" | "HOUR" => SECONDS_PER_HOUR,
            "MINUTES" | "MINUTE" | "MIN" => SECONDS_PER_MINUTE,
            "SECONDS" | "SECOND" | "SEC" => 1.0,
            _ => {
                return Err(IntervalError::UnknownField { field: key.clone() });
            }
        };
        total += value * scale;
    }
    Ok(total)
}

/// Start of the interval-aligned bucket containing `time`.
#[inline]
pub fn floor_boundary(time: f64, interval: f64) -> f64 {
    math::floor(time / interval) * interval
}

/// First interval-aligned boundary strictly after `time`.
#[inline]
pub fn ceil_boundary(time: f64, interval: f64) -> f64 {
    floor_boundary(time, interval) + interval
}
