//! Interval parser for CLI arguments and configuration values.
//!
//! Supported formats:
//! - Bare integer: microseconds (`250000`)
//! - Suffixed: `500us`, `200ms`, `5s`, `1m`

use std::time::Duration;

/// Error type for interval parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationError {
    pub input: String,
    pub message: String,
}

impl std::fmt::Display for DurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse interval '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for DurationError {}

/// Microseconds per unit. Two-letter suffixes precede `s`, which would
/// otherwise match the tail of `us` and `ms`.
const UNITS: &[(&str, u64)] = &[
    ("us", 1),
    ("ms", 1_000),
    ("s", 1_000_000),
    ("m", 60_000_000),
];

/// Parses an interval string into a strictly positive duration.
///
/// | Input | Result |
/// |-------|--------|
/// | `250000` | 250 ms |
/// | `500us` | 500 µs |
/// | `200ms` | 200 ms |
/// | `5s` | 5 s |
/// | `1m` | 60 s |
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let input = input.trim();
    let error = |message: &str| DurationError {
        input: input.to_string(),
        message: message.to_string(),
    };

    if input.is_empty() {
        return Err(error("empty value"));
    }

    let (digits, scale) = UNITS
        .iter()
        .find_map(|(suffix, scale)| input.strip_suffix(suffix).map(|d| (d, *scale)))
        .unwrap_or((input, 1));

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(error("expected a positive integer with optional us, ms, s or m suffix"));
    }

    let value: u64 = digits.parse().map_err(|_| error("value out of range"))?;
    let micros = value
        .checked_mul(scale)
        .ok_or_else(|| error("value out of range"))?;
    if micros == 0 {
        return Err(error("interval must be greater than zero"));
    }

    Ok(Duration::from_micros(micros))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_integer_is_microseconds() {
        assert_eq!(parse_duration("250000").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1").unwrap(), Duration::from_micros(1));
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_duration("500us").unwrap(), Duration::from_micros(500));
        assert_eq!(parse_duration("200ms").unwrap(), Duration::from_millis(200));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration(" 2s ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_minute_is_sixty_seconds() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("1m").unwrap().as_micros(), 60_000_000);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for input in ["", "0", "0s", "-5s", "5x", "s", "1.5s", "5 s", "ms"] {
            assert!(parse_duration(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_rejects_overflow() {
        let err = parse_duration("18446744073709551615m").unwrap_err();
        assert_eq!(err.message, "value out of range");
    }

    #[test]
    fn test_error_message_names_input() {
        let err = parse_duration("fast").unwrap_err();
        assert!(err.to_string().contains("'fast'"));
    }
}
