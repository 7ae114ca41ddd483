use std::time::Duration;

use crate::config::ConfigError;

/// Unit suffixes accepted in interval strings, with their length in nanoseconds.
const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses an interval string such as `30s`, `1m`, `1h30m` or `1.5h`.
///
/// The string is a sequence of decimal numbers, each followed by a unit
/// (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`). The total must be strictly positive.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInterval`] for empty input, a missing or
/// unknown unit, a malformed number, or a zero/negative total.
///
/// # Examples
///
/// ```
/// use gator::util::parse_interval;
/// use std::time::Duration;
///
/// assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_interval("soon").is_err());
/// ```
pub fn parse_interval(input: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidInterval {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.starts_with('-') {
        return Err(invalid("interval must be positive"));
    }

    let mut rest = s;
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        if number.is_empty() || number == "." {
            return Err(invalid("expected a number"));
        }
        if unit.is_empty() {
            return Err(invalid("missing unit (use ns, us, ms, s, m or h)"));
        }

        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| invalid(&format!("unknown unit {unit:?}")))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if fraction.contains('.') {
            return Err(invalid("malformed number"));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number out of range"))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("interval too large"))?;

        if !fraction.is_empty() {
            let fraction: f64 = format!("0.{fraction}")
                .parse()
                .map_err(|_| invalid("malformed number"))?;
            nanos = nanos.saturating_add((fraction * scale as f64).round() as u128);
        }

        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| invalid("interval too large"))?;
    }

    if total_nanos == 0 {
        return Err(invalid("interval must be positive"));
    }

    let nanos = u64::try_from(total_nanos).map_err(|_| invalid("interval too large"))?;
    Ok(Duration::from_nanos(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_interval("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_interval("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_compound_and_fractional() {
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_interval("+10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_interval("  45s ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_rejects_invalid_input() {
        for input in ["", "   ", "soon", "10", "s", "10x", "1.2.3s", ".s", "1m-2s"] {
            let err = parse_interval(input).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidInterval { .. }),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("0h0m").is_err());
        assert!(parse_interval("-5s").is_err());
    }

    #[test]
    fn test_error_names_input() {
        let err = parse_interval("forever").unwrap_err();
        assert!(err.to_string().contains("forever"));
    }

    proptest! {
        #[test]
        fn prop_whole_seconds_round_trip(secs in 1u64..1_000_000) {
            prop_assert_eq!(parse_interval(&format!("{secs}s")).unwrap(), Duration::from_secs(secs));
        }

        #[test]
        fn prop_minutes_equal_sixty_seconds(mins in 1u64..10_000) {
            prop_assert_eq!(
                parse_interval(&format!("{mins}m")).unwrap(),
                parse_interval(&format!("{}s", mins * 60)).unwrap()
            );
        }
    }
}
