use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use futures::future;
use log::{error, info, warn};
use tokio::{fs, task};

use crate::{CalendarDocument, Encoder, EventRecord, EventSource, ExportError};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// Encodes every record concurrently. Records that cannot be encoded are
/// logged and left out; the result keeps the input order otherwise.
pub async fn encode_batch(encoder: &Encoder, records: Vec<EventRecord>) -> Vec<CalendarDocument> {
    let handles = records.into_iter().map(|record| {
        let encoder = encoder.clone();
        task::spawn_blocking(move || {
            let result = encoder.encode(&record);
            (record.id, result)
        })
    });

    future::join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| match joined {
            Ok((_, Ok(document))) => Some(document),
            Ok((id, Err(err))) => {
                let id = id.map(|id| id.to_string()).unwrap_or_default();
                warn!("Skipping event {id:?}: {err}");
                None
            }
            Err(err) => {
                error!("Encoder task failed: {err}");
                None
            }
        })
        .collect()
}

/// Writes one `.ics` file per published event on or after `from` into `dir`.
pub async fn export_upcoming<S: EventSource>(
    source: &S,
    encoder: &Encoder,
    from: NaiveDate,
    limit: usize,
    dir: &Path,
) -> Result<ExportSummary, ExportError> {
    let records = source.upcoming_events(from, limit).await?;
    let total = records.len();
    info!("Exporting {total} events from {from} into {}", dir.display());

    let documents = encode_batch(encoder, records).await;
    let mut skipped = total - documents.len();

    fs::create_dir_all(dir).await?;

    let mut taken = HashSet::new();
    let mut written = Vec::with_capacity(documents.len());
    for document in documents {
        if !is_plain_filename(&document.filename) {
            warn!("Refusing to write {:?} outside of export directory", document.filename);
            skipped += 1;
            continue;
        }

        let path = dir.join(unique_filename(&mut taken, &document.filename));
        fs::write(&path, &document.bytes).await?;
        written.push(path);
    }

    info!("Wrote {} files, skipped {skipped}", written.len());

    Ok(ExportSummary { written, skipped })
}

/// True for exactly one normal path component, so joining it onto the
/// export directory cannot leave it.
fn is_plain_filename(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Two events with the same title on the same day would otherwise overwrite
/// each other; later ones get a numeric suffix.
fn unique_filename(taken: &mut HashSet<String>, filename: &str) -> String {
    if taken.insert(filename.to_string()) {
        return filename.to_string();
    }

    let stem = filename.strip_suffix(".ics").unwrap_or(filename);
    (2..)
        .map(|n| format!("{stem}-{n}.ics"))
        .find(|candidate| taken.insert(candidate.clone()))
        .unwrap_or_else(|| filename.to_string())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{RecordId, StoreError};

    struct FixedSource(Vec<EventRecord>);

    #[async_trait]
    impl EventSource for FixedSource {
        async fn published_event(&self, _id: &str) -> Result<Option<EventRecord>, StoreError> {
            Ok(None)
        }

        async fn upcoming_events(
            &self,
            _from: NaiveDate,
            limit: usize,
        ) -> Result<Vec<EventRecord>, StoreError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn record(id: i64, title: &str, date: &str) -> EventRecord {
        EventRecord {
            id: Some(RecordId::Number(id)),
            title: Some(title.into()),
            date: Some(date.into()),
            published: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn batch_skips_malformed_records() {
        let records = vec![
            record(1, "Stammtisch", "2025-08-15"),
            EventRecord {
                start_timestamp: Some("not-a-date".into()),
                end_timestamp: Some("later".into()),
                ..record(2, "Kaputt", "2025-08-16")
            },
            record(3, "Infostand", "2025-08-17"),
        ];

        let documents = encode_batch(&Encoder::default(), records).await;
        let names: Vec<_> = documents.iter().map(|d| d.filename.as_str()).collect();

        assert_eq!(names, ["stammtisch_2025-08-15.ics", "infostand_2025-08-17.ics"]);
    }

    #[tokio::test]
    async fn writes_one_file_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixedSource(vec![
            record(1, "Stammtisch", "2025-08-15"),
            record(2, "Stammtisch", "2025-08-15"),
            EventRecord {
                date: None,
                ..record(3, "Ohne Datum", "")
            },
            record(4, "Sommerfest", "2025-08-30"),
        ]);
        let from = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();

        let summary = export_upcoming(&source, &Encoder::default(), from, 10, dir.path())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(
            summary.written,
            [
                dir.path().join("stammtisch_2025-08-15.ics"),
                dir.path().join("stammtisch_2025-08-15-2.ics"),
                dir.path().join("sommerfest_2025-08-30.ics"),
            ]
        );

        let second = std::fs::read_to_string(&summary.written[1]).unwrap();
        assert!(second.contains("UID:2@events-ics\r\n"));
        assert!(second.contains("DTSTART;VALUE=DATE:20250815\r\n"));
    }

    #[tokio::test]
    async fn respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixedSource(vec![
            record(1, "Eins", "2025-08-15"),
            record(2, "Zwei", "2025-08-16"),
        ]);
        let from = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();

        let summary = export_upcoming(&source, &Encoder::default(), from, 1, dir.path())
            .await
            .unwrap();

        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn files_stay_inside_export_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("a").join("b");
        let source = FixedSource(vec![
            EventRecord {
                start_timestamp: Some("2025-08-15T19:00:00+02:00".into()),
                end_timestamp: Some("2025-08-15T21:00:00+02:00".into()),
                ..record(1, "x", "/../../pwn")
            },
            record(2, "Sommerfest", "2025-08-30"),
        ]);
        let from = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();

        let summary = export_upcoming(&source, &Encoder::default(), from, 10, &dir)
            .await
            .unwrap();

        assert_eq!(summary.written, [dir.join("x_.ics"), dir.join("sommerfest_2025-08-30.ics")]);
        for path in &summary.written {
            let resolved = path.canonicalize().unwrap();
            assert_eq!(resolved.parent(), Some(dir.canonicalize().unwrap().as_path()));
        }
        assert!(!root.path().join("a").join("pwn.ics").exists());
    }

    #[test]
    fn only_single_components_are_plain_filenames() {
        assert!(is_plain_filename("stammtisch_2025-08-15.ics"));
        assert!(is_plain_filename("x_.ics"));

        for name in ["x_/../../pwn.ics", "../x.ics", "/etc/x.ics", "a/b.ics", "..", ".", ""] {
            assert!(!is_plain_filename(name), "{name:?}");
        }
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let mut taken = HashSet::new();

        assert_eq!(unique_filename(&mut taken, "a_2025-01-01.ics"), "a_2025-01-01.ics");
        assert_eq!(unique_filename(&mut taken, "a_2025-01-01.ics"), "a_2025-01-01-2.ics");
        assert_eq!(unique_filename(&mut taken, "a_2025-01-01.ics"), "a_2025-01-01-3.ics");
    }
}
