//! Timeout parsing for human-readable durations like "10s" or "500ms".

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

/// Parse a request timeout string like "10s", "1500ms" or "2m".
///
/// Supported units:
/// - `ms` - milliseconds
/// - `s` - seconds
/// - `m` - minutes
///
/// The input is case-insensitive and whitespace is trimmed. A zero timeout is
/// rejected because it would make every request fail immediately.
///
/// # Examples
///
/// ```
/// use coinfolio::duration::parse_timeout;
/// use std::time::Duration;
///
/// assert_eq!(parse_timeout("10s").unwrap(), Duration::from_secs(10));
/// assert_eq!(parse_timeout("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
/// ```
pub fn parse_timeout(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    // "ms" must be checked before "m" and "s".
    let (num, millis_per_unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1_000)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60_000)
    } else {
        anyhow::bail!("Timeout must end with ms, s, or m");
    };

    let num: u64 = num
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in timeout: {s:?}"))?;
    if num == 0 {
        anyhow::bail!("Timeout must be greater than zero");
    }

    let millis = num
        .checked_mul(millis_per_unit)
        .context("Timeout is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Format a timeout using the largest unit that divides it evenly.
///
/// # Examples
///
/// ```
/// use coinfolio::duration::format_timeout;
/// use std::time::Duration;
///
/// assert_eq!(format_timeout(Duration::from_secs(120)), "2m");
/// assert_eq!(format_timeout(Duration::from_secs(10)), "10s");
/// assert_eq!(format_timeout(Duration::from_millis(1500)), "1500ms");
/// ```
pub fn format_timeout(d: Duration) -> String {
    let millis = d.as_millis();

    if millis >= 60_000 && millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else if millis >= 1_000 && millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{millis}ms")
    }
}

/// Serde deserializer for timeout strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_timeout")]`.
pub fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timeout(&s).map_err(de::Error::custom)
}

/// Serde serializer producing the same format `deserialize_timeout` accepts.
pub fn serialize_timeout<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timeout(*d))
}
