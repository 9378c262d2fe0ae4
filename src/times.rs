use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{EncodeError, EventRecord};

pub const COMPACT_UTC: &str = "%Y%m%dT%H%M%SZ";

const DEFAULT_LENGTH_MINUTES: i64 = 120;

static HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:h|hrs?|hours?|std|stunden?)").unwrap());
static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:min|minutes?|minuten)").unwrap());

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Start and end of an event as handed to the document builder.
///
/// For all-day spans both values are `YYYY-MM-DD` dates, otherwise they are
/// ISO 8601 timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpan {
    pub all_day: bool,
    pub start: String,
    pub end: String,
}

impl EventSpan {
    /// Whether both ends should be written as `VALUE=DATE`.
    pub fn is_date_valued(&self) -> bool {
        self.all_day || (self.start.len() == 10 && self.end.len() == 10)
    }
}

/// Works out when an event starts and ends.
///
/// Explicit start/end timestamps win. Otherwise the date, clock time and
/// free-form duration are combined in `zone`; a record with a date but no
/// time becomes an all-day event.
pub fn derive_times(record: &EventRecord, zone: Tz) -> Result<EventSpan, EncodeError> {
    if let Some((start, end)) = record.explicit_span() {
        return Ok(EventSpan {
            all_day: false,
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let date = record.date_prefix();
    if date.is_empty() {
        return Err(EncodeError::MissingRequiredField("date"));
    }

    let Some(time) = record.time() else {
        return Ok(EventSpan {
            all_day: true,
            start: date.clone(),
            end: date,
        });
    };

    let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| EncodeError::MalformedTimestamp(date.clone()))?;

    let start = localize(zone, day.and_time(parse_clock(time)))
        .ok_or_else(|| EncodeError::MalformedTimestamp(format!("{date} {time}")))?;

    let end = Duration::try_minutes(length_minutes(record.duration()))
        .and_then(|length| start.checked_add_signed(length))
        .ok_or_else(|| EncodeError::MalformedTimestamp(record.duration().to_string()))?;

    Ok(EventSpan {
        all_day: false,
        start: start.to_rfc3339(),
        end: end.to_rfc3339(),
    })
}

/// Converts an ISO 8601 timestamp to `YYYYMMDDTHHMMSSZ`.
///
/// Timestamps without an offset are read as local time in `zone`.
pub fn to_utc_compact(iso: &str, zone: Tz) -> Result<String, EncodeError> {
    parse_instant(iso, zone)
        .map(|instant| instant.format(COMPACT_UTC).to_string())
        .ok_or_else(|| EncodeError::MalformedTimestamp(iso.to_string()))
}

fn parse_instant(iso: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let iso = iso.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(iso) {
        return Some(instant.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(instant) = DateTime::parse_from_str(iso, format) {
            return Some(instant.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(iso, format) {
            return localize(zone, naive).map(|local| local.with_timezone(&Utc));
        }
    }

    let day = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
    localize(zone, day.and_hms_opt(0, 0, 0)?).map(|local| local.with_timezone(&Utc))
}

/// Pins a wall-clock time to `zone`.
///
/// Ambiguous times (clocks going back) take the earlier instant, times inside
/// a gap (clocks going forward) are moved one hour later.
pub(crate) fn localize(zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Some(local),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let shifted = naive.checked_add_signed(Duration::try_hours(1)?)?;
            zone.from_local_datetime(&shifted).earliest()
        }
    }
}

/// `HH:MM` from the first two colon-separated tokens, 09:00 otherwise.
fn parse_clock(time: &str) -> NaiveTime {
    let mut parts = time.split(':').map(str::trim);
    let hour = parts.next().and_then(|h| h.parse::<u32>().ok());
    let minute = parts.next().and_then(|m| m.parse::<u32>().ok());

    hour.zip(minute)
        .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
        .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
}

/// Event length in minutes guessed from text like "90 min" or "2h".
fn length_minutes(duration: &str) -> i64 {
    let duration = duration.to_lowercase();
    let leading_number = |re: &Regex| {
        re.captures(&duration)
            .and_then(|caps| caps[1].parse::<i64>().ok())
    };

    if let Some(hours) = leading_number(&*HOURS) {
        return hours.checked_mul(60).unwrap_or(DEFAULT_LENGTH_MINUTES);
    }

    leading_number(&*MINUTES).unwrap_or(DEFAULT_LENGTH_MINUTES)
}
