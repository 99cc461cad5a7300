use super::{Span, ValidationError, ValidationErrorKind, ValidationResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const DATE_ONLY_LEN: usize = 10;
const SECONDS_PER_DAY: i64 = 86_400;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// An inclusive range of publish instants, in unix seconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// None means no lower bound
    pub min: Option<i64>,
    /// None means no upper bound
    pub max: Option<i64>,
}

impl TimeRange {
    pub fn at_least(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: i64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Parse a publish-date filter relative to `now`.
///
/// - `>7d` published within the last 7 days
/// - `<1y` published more than a year ago
/// - `>=2024-01-15`, `<=2024-01-15` on/after or on/before a day
/// - `2024-01-01..2024-02-01` a closed range, either end may be left open
/// - `2024-01-15` the whole day
/// - `1704067200` or `=1704067200` one exact instant
pub fn validate_time(value: &str, span: Span, now: DateTime<Utc>) -> ValidationResult<TimeRange> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(span, ValidationErrorKind::EmptyValue));
    }

    if let Some((left, right)) = value.split_once("..") {
        let min = optional_instant(left, span, now)?;
        let max = optional_instant(right, span, now)?.map(|(ts, day)| end_of(ts, day));
        let min = min.map(|(ts, _)| ts);
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(ValidationError::new(
                    span,
                    ValidationErrorKind::InvalidRange {
                        reason: "start of range is after its end".to_string(),
                    },
                ));
            }
        }
        return Ok(TimeRange { min, max });
    }

    if let Some(rest) = value.strip_prefix(">=") {
        let (ts, _) = instant(rest, span, now)?;
        return Ok(TimeRange::at_least(ts));
    }
    if let Some(rest) = value.strip_prefix("<=") {
        let (ts, day) = instant(rest, span, now)?;
        return Ok(TimeRange::at_most(end_of(ts, day)));
    }
    if let Some(rest) = value.strip_prefix('>') {
        let (ts, day) = instant(rest, span, now)?;
        return Ok(TimeRange::at_least(end_of(ts, day).saturating_add(1)));
    }
    if let Some(rest) = value.strip_prefix('<') {
        let (ts, _) = instant(rest, span, now)?;
        return Ok(TimeRange::at_most(ts.saturating_sub(1)));
    }
    if let Some(rest) = value.strip_prefix('=') {
        let (ts, day) = instant(rest, span, now)?;
        return Ok(TimeRange::between(ts, end_of(ts, day)));
    }

    let (ts, day) = instant(value, span, now)?;
    Ok(TimeRange::between(ts, end_of(ts, day)))
}

/// Last second covered by an instant: a whole day for dates, itself otherwise.
fn end_of(ts: i64, whole_day: bool) -> i64 {
    if whole_day {
        ts.saturating_add(SECONDS_PER_DAY - 1)
    } else {
        ts
    }
}

fn optional_instant(
    s: &str,
    span: Span,
    now: DateTime<Utc>,
) -> ValidationResult<Option<(i64, bool)>> {
    let s = s.trim();
    if s.is_empty() {
        Ok(None)
    } else {
        instant(s, span, now).map(Some)
    }
}

/// Resolve one time value. The flag is true when it named a whole day.
fn instant(s: &str, span: Span, now: DateTime<Utc>) -> ValidationResult<(i64, bool)> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValidationError::new(
            span,
            ValidationErrorKind::InvalidTimeSpec {
                value: s.to_string(),
                reason: "empty time specification".to_string(),
            },
        ));
    }

    if let Ok(ts) = s.parse::<i64>() {
        return Ok((ts, false));
    }
    if let Some(ts) = parse_relative_time(s, now) {
        return Ok((ts, false));
    }
    if let Some(ts) = parse_absolute_time(s) {
        return Ok((ts, s.len() <= DATE_ONLY_LEN));
    }

    Err(ValidationError::new(
        span,
        ValidationErrorKind::InvalidTimeSpec {
            value: s.to_string(),
            reason: "expected a relative age (7d, 2w, 1mo), a date (2024-01-15) \
                     or a unix timestamp"
                .to_string(),
        },
    ))
}

/// `now` minus an age such as `30min`, `2h`, `7d`.
fn parse_relative_time(s: &str, now: DateTime<Utc>) -> Option<i64> {
    let digit_end = s.find(|c: char| !c.is_ascii_digit())?;
    if digit_end == 0 {
        return None;
    }

    let num: i64 = s[..digit_end].parse().ok()?;
    let seconds = match s[digit_end..].trim().to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => num,
        "m" | "min" | "mins" | "minute" | "minutes" => num.checked_mul(60)?,
        "h" | "hr" | "hrs" | "hour" | "hours" => num.checked_mul(3_600)?,
        "d" | "day" | "days" => num.checked_mul(SECONDS_PER_DAY)?,
        "w" | "wk" | "wks" | "week" | "weeks" => num.checked_mul(7 * SECONDS_PER_DAY)?,
        "mo" | "mon" | "month" | "months" => num.checked_mul(30 * SECONDS_PER_DAY)?,
        "y" | "yr" | "yrs" | "year" | "years" => num.checked_mul(365 * SECONDS_PER_DAY)?,
        _ => return None,
    };

    let age = Duration::try_seconds(seconds)?;
    now.checked_sub_signed(age).map(|t| t.timestamp())
}

/// Dates and datetimes are read as UTC.
fn parse_absolute_time(s: &str) -> Option<i64> {
    if s.len() > DATE_ONLY_LEN {
        DATE_FORMATS
            .iter()
            .flat_map(|date| {
                TIME_FORMATS
                    .iter()
                    .flat_map(move |time| [format!("{date}T{time}"), format!("{date} {time}")])
            })
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, &fmt).ok())
            .map(|dt| dt.and_utc().timestamp())
    } else {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
    }
}
