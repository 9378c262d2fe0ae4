use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use events_ics::{
    derive_times, escape, suggest_filename, to_utc_compact, EncodeError, Encoder, EncoderConfig,
    EventRecord,
};

fn berlin() -> chrono_tz::Tz {
    EncoderConfig::default().time_zone
}

fn record(json: &str) -> EventRecord {
    serde_json::from_str(json).unwrap()
}

#[test]
fn explicit_timestamps_are_returned_unchanged() {
    let cases = [
        ("2025-08-15T19:00:00+02:00", "2025-08-15T21:00:00+02:00"),
        ("2025-08-15T17:00:00Z", "2025-08-15T19:00:00Z"),
        ("2025-08-15 19:00", "2025-08-15 21:00"),
    ];

    for (start, end) in cases {
        let mut row = record(r#"{"datum": "2025-01-01", "uhrzeit": "10:00"}"#);
        row.start_timestamp = Some(start.into());
        row.end_timestamp = Some(end.into());

        let span = derive_times(&row, berlin()).unwrap();

        assert!(!span.all_day);
        assert_eq!((span.start.as_str(), span.end.as_str()), (start, end));
    }
}

#[test]
fn evening_event_with_two_hours() {
    let row = record(r#"{"datum": "2025-08-15", "uhrzeit": "19:00", "dauer": "2h"}"#);

    let span = derive_times(&row, berlin()).unwrap();

    assert!(!span.all_day);
    assert_eq!(span.start, "2025-08-15T19:00:00+02:00");
    assert_eq!(span.end, "2025-08-15T21:00:00+02:00");
}

#[test]
fn date_without_time_is_all_day() {
    for json in [
        r#"{"datum": "2025-08-15"}"#,
        r#"{"datum": "2025-08-15", "uhrzeit": ""}"#,
        r#"{"datum": "2025-08-15T00:00:00", "uhrzeit": null}"#,
    ] {
        let span = derive_times(&record(json), berlin()).unwrap();

        assert!(span.all_day, "{json}");
        assert_eq!(span.start, "2025-08-15", "{json}");
        assert_eq!(span.end, span.start, "{json}");
    }
}

#[test]
fn escaping_does_not_double_escape() {
    assert_eq!(escape("a,b;c\nd"), r"a\,b\;c\nd");
}

#[test]
fn utc_compact_of_a_utc_instant() {
    assert_eq!(
        to_utc_compact("2025-08-15T17:00:00+00:00", berlin()).unwrap(),
        "20250815T170000Z"
    );
}

#[test]
fn suggested_filenames() {
    assert_eq!(
        suggest_filename(&record(
            r#"{"titel": "Bürgerdialog Neue Mitte", "datum": "2025-09-01"}"#
        )),
        "burgerdialog-neue-mitte_2025-09-01.ics"
    );
    assert_eq!(suggest_filename(&record("{}")), "event_.ics");
}

#[test]
fn stammtisch_document() {
    let row = record(
        r#"{
            "id": 12,
            "titel": "Stammtisch",
            "datum": "2025-08-15",
            "uhrzeit": "19:00",
            "ort": "Gasthaus",
            "published": true
        }"#,
    );
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 6, 30, 0).unwrap();

    let document = Encoder::default().encode_at(&row, now).unwrap();
    let text = String::from_utf8(document.bytes).unwrap();

    assert!(text.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(text.ends_with("END:VCALENDAR\r\n"));
    assert!(!text.replace("\r\n", "").contains('\n'), "bare line feed in {text:?}");

    let lines: Vec<&str> = text.lines().collect();
    let event_block: Vec<&str> = lines
        .iter()
        .skip_while(|l| **l != "BEGIN:VEVENT")
        .take_while(|l| **l != "END:VEVENT")
        .copied()
        .collect();

    assert_eq!(lines.iter().filter(|l| **l == "BEGIN:VEVENT").count(), 1);

    let mut properties: Vec<&str> = event_block[1..].to_vec();
    properties.sort_unstable();
    assert_eq!(
        properties,
        [
            "DESCRIPTION:",
            "DTEND:20250815T190000Z",
            "DTSTAMP:20250801T063000Z",
            "DTSTART:20250815T170000Z",
            "LOCATION:Gasthaus",
            "SUMMARY:Stammtisch",
            "UID:12@events-ics",
            "URL:",
        ]
    );
    assert_eq!(document.filename, "stammtisch_2025-08-15.ics");
}

#[test]
fn malformed_start_never_yields_a_document() {
    let mut row = record(r#"{"id": 1, "titel": "Kaputt", "datum": "2025-08-15"}"#);
    row.start_timestamp = Some("not-a-date".into());
    row.end_timestamp = Some("2025-08-15T21:00:00+02:00".into());

    assert_eq!(
        Encoder::default().encode(&row),
        Err(EncodeError::MalformedTimestamp("not-a-date".into()))
    );
    assert!(to_utc_compact("not-a-date", berlin()).is_err());
}

#[test]
fn encoder_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync + Clone>() {}
    assert_send_sync::<Encoder>();

    let encoder = Encoder::default();
    let handles: Vec<_> = (1..=4i64)
        .map(|day| {
            let encoder = encoder.clone();
            std::thread::spawn(move || {
                let row = EventRecord {
                    id: Some(day.into()),
                    title: Some("Infostand".into()),
                    date: Some(format!("2025-08-0{day}")),
                    ..Default::default()
                };
                encoder.encode(&row).map(|document| document.filename)
            })
        })
        .collect();

    let names: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert_eq!(
        names,
        [
            "infostand_2025-08-01.ics",
            "infostand_2025-08-02.ics",
            "infostand_2025-08-03.ics",
            "infostand_2025-08-04.ics",
        ]
    );
}
