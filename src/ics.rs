use chrono::{DateTime, NaiveDate, Utc};
use ics::{
    components::{Parameter, Property},
    properties::{Description, DtEnd, DtStart, Location, Summary},
    ICalendar,
};
use log::{debug, warn};

use crate::times::{derive_times, to_utc_compact, EventSpan, COMPACT_UTC};
use crate::{EncodeError, EncoderConfig, EventRecord};

/// Stands in for the id of records that have none.
pub const UNKNOWN_ID: &str = "unknown";
/// Summary of events without a title.
pub const DEFAULT_SUMMARY: &str = "Termin";

const FILENAME_FALLBACK: &str = "event";

/// A finished single-event `.ics` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Turns event records into calendar documents.
///
/// Holds no mutable state, so one encoder can be cloned into as many tasks
/// as needed.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode(&self, record: &EventRecord) -> Result<CalendarDocument, EncodeError> {
        self.encode_at(record, Utc::now())
    }

    /// Like [`Encoder::encode`], stamping the document with `now`.
    pub fn encode_at(
        &self,
        record: &EventRecord,
        now: DateTime<Utc>,
    ) -> Result<CalendarDocument, EncodeError> {
        let span = derive_times(record, self.config.time_zone)?;
        let (start, end) = self.span_properties(&span)?;

        let uid = match &record.id {
            Some(id) => format!("{id}@{}", self.config.uid_domain),
            None => {
                warn!("Event record without id, using placeholder UID");
                format!("{UNKNOWN_ID}@{}", self.config.uid_domain)
            }
        };

        let mut ics_event = ics::Event::new(uid.clone(), now.format(COMPACT_UTC).to_string());

        ics_event.push(start);
        ics_event.push(end);
        ics_event.push(Summary::new(escape(
            record.title().unwrap_or(DEFAULT_SUMMARY),
        )));
        ics_event.push(Location::new(escape(record.location())));
        ics_event.push(Description::new(escape(record.description())));
        ics_event.push(Property::new("URL", escape(record.url())));

        let mut calendar = ICalendar::new("2.0", self.config.product_id.clone());
        calendar.push(Property::new("CALSCALE", "GREGORIAN"));
        calendar.push(Property::new("METHOD", "PUBLISH"));
        calendar.add_event(ics_event);

        debug!("Encoded event {uid}");

        Ok(CalendarDocument {
            filename: suggest_filename(record),
            bytes: calendar.to_string().into_bytes(),
        })
    }

    fn span_properties(
        &self,
        span: &EventSpan,
    ) -> Result<(DtStart<'static>, DtEnd<'static>), EncodeError> {
        if span.is_date_valued() {
            let mut start = DtStart::new(compact_date(&span.start)?);
            start.add(Parameter::new("VALUE", "DATE"));

            let mut end = DtEnd::new(compact_date(&span.end)?);
            end.add(Parameter::new("VALUE", "DATE"));

            return Ok((start, end));
        }

        let zone = self.config.time_zone;
        Ok((
            DtStart::new(to_utc_compact(&span.start, zone)?),
            DtEnd::new(to_utc_compact(&span.end, zone)?),
        ))
    }
}

fn compact_date(date: &str) -> Result<String, EncodeError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|day| day.format("%Y%m%d").to_string())
        .map_err(|_| EncodeError::MalformedTimestamp(date.to_string()))
}

/// Escapes a TEXT value for a content line.
///
/// Backslashes go first so the escapes added afterwards stay intact. Carriage
/// returns are folded into the newline they belong to.
pub fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\\n")
}

/// `<title-slug>_<date>.ics`, e.g. `burgerdialog-neue-mitte_2025-09-01.ics`.
///
/// The result is a single path component that is safe inside a quoted
/// header value. Only digits and dashes of the date survive.
pub fn suggest_filename(record: &EventRecord) -> String {
    let stem = record
        .title()
        .map(slug::slugify)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FILENAME_FALLBACK.to_string());

    let date: String = record
        .date_prefix()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();

    format!("{stem}_{date}.ics")
}
