//! Single-event iCalendar export for published event rows.
//!
//! The [`Encoder`] turns one [`EventRecord`] into a `.ics` document. The
//! [`server`] and [`export`] modules wire it to an upstream [`EventSource`].

pub mod cache;
pub mod config;
pub mod export;
pub mod server;
pub mod store;
pub mod times;

mod error;
mod ics;
mod record;

pub use config::{BackendConfig, EncoderConfig};
pub use error::{ConfigError, EncodeError, ExportError, StoreError};
pub use self::ics::{escape, suggest_filename, CalendarDocument, Encoder, DEFAULT_SUMMARY, UNKNOWN_ID};
pub use record::{EventRecord, RecordId};
pub use store::{EventSource, SupabaseStore};
pub use times::{derive_times, to_utc_compact, EventSpan};
