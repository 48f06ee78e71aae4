//! Expiry durations in a compact, deliberately narrow grammar.
//!
//! Accepted: an unsigned, non-zero integer immediately followed by exactly one
//! lowercase unit letter:
//!
//! | suffix | unit    |
//! |--------|---------|
//! | `m`    | minutes |
//! | `h`    | hours   |
//! | `d`    | days    |
//! | `w`    | weeks   |
//!
//! Fractions, signs, whitespace, compound values (`1d12h`) and bare numbers
//! are all rejected.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Units from largest to smallest, used by [`format`].
const UNITS: [(char, u64); 4] = [('w', WEEK), ('d', DAY), ('h', HOUR), ('m', MINUTE)];

/// Expiry parsing and range errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpiryError {
    #[error("INVALID_DURATION_FORMAT: {input:?} (expected a whole number followed by m, h, d or w, e.g. 10m, 12h, 3d, 1w)")]
    InvalidFormat { input: String },

    #[error("lifetime {value} is below the minimum of {min}")]
    BelowMinimum { value: Lifetime, min: Lifetime },

    #[error("lifetime {value} exceeds the maximum of {max}")]
    AboveMaximum { value: Lifetime, max: Lifetime },
}

fn unit_seconds(unit: char) -> Option<u64> {
    UNITS.iter().find(|(suffix, _)| *suffix == unit).map(|(_, secs)| *secs)
}

/// Parse an expiry string such as `10m` or `3d` into a duration.
pub fn parse(text: &str) -> Result<Duration, ExpiryError> {
    let invalid = || ExpiryError::InvalidFormat { input: text.to_string() };

    let unit = text.chars().last().ok_or_else(invalid)?;
    let digits = &text[..text.len() - unit.len_utf8()];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let multiplier = unit_seconds(unit).ok_or_else(invalid)?;
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }

    let secs = value.checked_mul(multiplier).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}

/// Check that `lifetime` lies within `[min, max]`.
pub fn validate(lifetime: Duration, min: Duration, max: Duration) -> Result<(), ExpiryError> {
    if lifetime < min {
        return Err(ExpiryError::BelowMinimum { value: Lifetime(lifetime), min: Lifetime(min) });
    }
    if lifetime > max {
        return Err(ExpiryError::AboveMaximum { value: Lifetime(lifetime), max: Lifetime(max) });
    }
    Ok(())
}

/// Render a duration in the largest unit that divides it evenly.
///
/// Sub-minute remainders are truncated, so only whole-minute durations
/// survive a `parse(format(d))` round trip.
pub fn format(lifetime: Duration) -> String {
    let secs = lifetime.as_secs();
    for (suffix, unit) in UNITS {
        if secs >= unit && secs % unit == 0 {
            return format!("{}{suffix}", secs / unit);
        }
    }
    format!("{}m", secs / MINUTE)
}

/// A validated-shape expiry duration.
///
/// Serializes to and from the compact string form, so configuration files and
/// environment variables carry `"3d"` rather than raw seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lifetime(Duration);

impl Lifetime {
    pub const fn minutes(n: u64) -> Self {
        Self(Duration::from_secs(n * MINUTE))
    }

    pub const fn hours(n: u64) -> Self {
        Self(Duration::from_secs(n * HOUR))
    }

    pub const fn days(n: u64) -> Self {
        Self(Duration::from_secs(n * DAY))
    }

    pub const fn weeks(n: u64) -> Self {
        Self(Duration::from_secs(n * WEEK))
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Check this lifetime against inclusive bounds.
    pub fn check_bounds(self, min: Lifetime, max: Lifetime) -> Result<Self, ExpiryError> {
        validate(self.0, min.0, max.0).map(|()| self)
    }
}

impl FromStr for Lifetime {
    type Err = ExpiryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).map(Lifetime)
    }
}

impl TryFrom<String> for Lifetime {
    type Error = ExpiryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lifetime> for String {
    fn from(value: Lifetime) -> Self {
        value.to_string()
    }
}

impl From<Lifetime> for Duration {
    fn from(value: Lifetime) -> Self {
        value.0
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.0))
    }
}
