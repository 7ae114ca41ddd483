//! Canonicalization of feed-supplied text and dates.
//!
//! Feed authors are inconsistent: titles come padded with whitespace,
//! descriptions are often empty, and `pubDate` shows up in half a dozen
//! formats. Everything here is pure and total: bad input becomes `None`,
//! never an error.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

type DateParser = fn(&str) -> Option<DateTime<FixedOffset>>;

/// Date strategies in the order they are tried. The first match wins.
const DATE_PARSERS: &[(&str, DateParser)] = &[
    ("rfc1123z", parse_rfc1123_numeric),
    ("rfc1123", parse_rfc1123_named),
    ("rfc822z", parse_rfc822_numeric),
    ("rfc822", parse_rfc822_named),
    ("rfc3339", parse_rfc3339),
    ("rfc3339nano", parse_rfc3339_fractional),
    ("ctime_zone", parse_ctime_with_zone),
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Trims `raw`; an empty result is `None`.
///
/// ```
/// use gator::feed::normalize_text;
///
/// assert_eq!(normalize_text("  Hello World  ").as_deref(), Some("Hello World"));
/// assert_eq!(normalize_text(" \n\t "), None);
/// ```
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses a feed date into UTC, or `None` if no known format matches.
///
/// ```
/// use gator::feed::normalize_date;
///
/// let at = normalize_date("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
/// assert_eq!(at.to_rfc3339(), "2006-01-02T22:04:05+00:00");
/// assert_eq!(normalize_date("not-a-date"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_PARSERS
        .iter()
        .find_map(|(_, parse)| parse(trimmed))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Name of the first date strategy that accepts `raw`, for diagnostics.
pub fn matching_date_format(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    DATE_PARSERS
        .iter()
        .find(|(_, parse)| parse(trimmed).is_some())
        .map(|(name, _)| *name)
}

// ============================================================================
// Strategies
// ============================================================================

/// `Mon, 02 Jan 2006 15:04:05 -0700`
fn parse_rfc1123_numeric(s: &str) -> Option<DateTime<FixedOffset>> {
    let rest = strip_weekday(s, ", ")?;
    DateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S %z").ok()
}

/// `Mon, 02 Jan 2006 15:04:05 GMT`
fn parse_rfc1123_named(s: &str) -> Option<DateTime<FixedOffset>> {
    let rest = strip_weekday(s, ", ")?;
    with_named_zone(rest, "%d %b %Y %H:%M:%S")
}

/// `02 Jan 06 15:04 -0700`
fn parse_rfc822_numeric(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, "%d %b %y %H:%M %z").ok()
}

/// `02 Jan 06 15:04 MST`
fn parse_rfc822_named(s: &str) -> Option<DateTime<FixedOffset>> {
    with_named_zone(s, "%d %b %y %H:%M")
}

/// `2006-01-02T15:04:05Z07:00`, whole seconds only.
fn parse_rfc3339(s: &str) -> Option<DateTime<FixedOffset>> {
    if s.contains('.') {
        return None;
    }
    DateTime::parse_from_rfc3339(s).ok()
}

/// `2006-01-02T15:04:05.999999999Z07:00`
fn parse_rfc3339_fractional(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// `Mon Jan 02 15:04:05 -0700 2006`
fn parse_ctime_with_zone(s: &str) -> Option<DateTime<FixedOffset>> {
    let rest = strip_weekday(s, " ")?;
    DateTime::parse_from_str(rest, "%b %d %H:%M:%S %z %Y").ok()
}

// ============================================================================
// Helpers
// ============================================================================

/// Drops a leading weekday name and separator. The weekday is not checked
/// against the date; plenty of feeds get it wrong.
fn strip_weekday<'a>(s: &'a str, separator: &str) -> Option<&'a str> {
    let (day, rest) = s.split_once(separator)?;
    WEEKDAYS
        .iter()
        .any(|name| name.eq_ignore_ascii_case(day))
        .then(|| rest.trim_start())
}

/// Parses `<datetime> <ZONE>` where ZONE is an abbreviation rather than an offset.
fn with_named_zone(s: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let (local, zone) = s.rsplit_once(' ')?;
    let offset = FixedOffset::east_opt(named_zone_offset(zone)?)?;
    NaiveDateTime::parse_from_str(local, format)
        .ok()?
        .and_local_timezone(offset)
        .single()
}

/// Offset in seconds east of UTC for an RFC 822 zone name.
///
/// Unrecognized alphabetic abbreviations are read as UTC, matching how most
/// feed readers treat them.
fn named_zone_offset(zone: &str) -> Option<i32> {
    const HOUR: i32 = 3600;
    let hours = match zone {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        other if (3..=5).contains(&other.len())
            && other.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            0
        }
        _ => return None,
    };
    Some(hours * HOUR)
}
