//! ISO 8601 durations and the query time window.

use chrono::{DateTime, Months, TimeDelta, Utc};
use thiserror::Error;
use tracing::warn;

/// Window used when the requested duration cannot be parsed.
pub const DEFAULT_WINDOW: &str = "PT12H";

const DATE_DESIGNATORS: &str = "YMWD";
const TIME_DESIGNATORS: &str = "HMS";

/// The duration string was not a valid ISO 8601 duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISO 8601 duration: {0:?}")]
pub struct InvalidDuration(pub String);

/// A parsed `P[nY][nM][nW][nD][T[nH][nM][nS]]` duration.
///
/// Years and months are kept apart from the fixed-length part because
/// their length depends on the date they are subtracted from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IsoDuration {
    pub months: u32,
    pub days: i64,
    pub seconds: f64,
}

impl IsoDuration {
    /// Parse an ISO 8601 duration such as `PT1H`, `P1Y` or `P1DT12H`.
    pub fn parse(s: &str) -> Result<Self, InvalidDuration> {
        let invalid = || InvalidDuration(s.to_string());

        let body = s.trim().strip_prefix('P').ok_or_else(invalid)?;
        let (date, time) = match body.split_once('T') {
            Some((_, "")) => return Err(invalid()),
            Some((date, time)) => (date, Some(time)),
            None => (body, None),
        };

        let mut duration = IsoDuration::default();
        let mut components = 0;

        let mut date_units = DATE_DESIGNATORS.chars();
        for (value, unit) in components_of(date).ok_or_else(invalid)? {
            // Designators appear at most once, in order.
            if !date_units.any(|u| u == unit) {
                return Err(invalid());
            }
            let whole = whole_number(value).ok_or_else(invalid)?;
            match unit {
                'Y' => {
                    let add = months(whole.checked_mul(12)).ok_or_else(invalid)?;
                    duration.months = duration.months.checked_add(add).ok_or_else(invalid)?;
                }
                'M' => {
                    let add = months(Some(whole)).ok_or_else(invalid)?;
                    duration.months = duration.months.checked_add(add).ok_or_else(invalid)?;
                }
                'W' => {
                    let add = whole.checked_mul(7).ok_or_else(invalid)?;
                    duration.days = duration.days.checked_add(add).ok_or_else(invalid)?;
                }
                _ => duration.days = duration.days.checked_add(whole).ok_or_else(invalid)?,
            }
            components += 1;
        }

        if let Some(time) = time {
            let mut time_units = TIME_DESIGNATORS.chars();
            for (value, unit) in components_of(time).ok_or_else(invalid)? {
                if !time_units.any(|u| u == unit) {
                    return Err(invalid());
                }
                let seconds = match unit {
                    'H' => whole_number(value).ok_or_else(invalid)? as f64 * 3600.0,
                    'M' => whole_number(value).ok_or_else(invalid)? as f64 * 60.0,
                    _ => value.parse::<f64>().map_err(|_| invalid())?,
                };
                if !seconds.is_finite() {
                    return Err(invalid());
                }
                duration.seconds += seconds;
                components += 1;
            }
        }

        if components == 0 {
            return Err(invalid());
        }

        Ok(duration)
    }

    /// Subtract this duration from `instant`, `None` on overflow.
    pub fn before(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let fixed = TimeDelta::try_days(self.days)?
            .checked_add(&TimeDelta::try_milliseconds((self.seconds * 1000.0).round() as i64)?)?;

        instant
            .checked_sub_months(Months::new(self.months))?
            .checked_sub_signed(fixed)
    }
}

/// Lower bound of the query window: `now` minus `duration`.
///
/// An unparseable duration falls back to [`DEFAULT_WINDOW`] rather than
/// failing the request.
pub fn window_start(now: DateTime<Utc>, duration: &str) -> DateTime<Utc> {
    let parsed = IsoDuration::parse(duration).and_then(|d| {
        d.before(now)
            .ok_or_else(|| InvalidDuration(duration.to_string()))
    });

    match parsed {
        Ok(start) => start,
        Err(e) => {
            warn!(error = %e, fallback = DEFAULT_WINDOW, "failed to parse date interval");
            now - TimeDelta::hours(12)
        }
    }
}

// Split "1Y2M" into [("1", 'Y'), ("2", 'M')]. None if a number lacks a unit
// or a unit lacks a number.
fn components_of(s: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            continue;
        }
        if i == start {
            return None;
        }
        out.push((&s[start..i], c));
        start = i + c.len_utf8();
    }

    if start != s.len() {
        return None;
    }
    Some(out)
}

fn months(n: Option<i64>) -> Option<u32> {
    n.and_then(|n| u32::try_from(n).ok())
}

fn whole_number(s: &str) -> Option<i64> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}
