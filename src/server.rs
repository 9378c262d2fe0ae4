use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{error, info, warn};

use crate::cache::RecordCache;
use crate::{Encoder, EventRecord, EventSource, StoreError};

pub const EVENT_PATH: &str = "/ics/:id";

pub struct AppState<S> {
    pub source: S,
    pub encoder: Encoder,
    pub cache: RecordCache,
}

pub fn router<S: EventSource>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route(EVENT_PATH, get(handle_event_ics::<S>))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
        .with_state(state)
}

async fn handle_event_ics<S: EventSource>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Response {
    let id = id.trim().trim_end_matches(".ics");

    let record = match fetch_record(&state, id).await {
        Ok(Some(record)) => record,
        Ok(None) => return (StatusCode::NOT_FOUND, "Unknown event").into_response(),
        Err(err) => {
            error!("Failed to fetch event {id}: {err}");
            return (StatusCode::BAD_GATEWAY, "Failed to fetch event").into_response();
        }
    };

    let document = match state.encoder.encode(&record) {
        Ok(document) => document,
        Err(err) => {
            warn!("Cannot encode event {id}: {err}");
            return (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response();
        }
    };

    info!("Serving {} for event {id}", document.filename);

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.bytes,
    )
        .into_response()
}

async fn fetch_record<S: EventSource>(
    state: &Arc<AppState<S>>,
    id: &str,
) -> Result<Option<Arc<EventRecord>>, StoreError> {
    if let Some(record) = state.cache.get(id).await {
        return Ok(Some(record));
    }

    let Some(record) = state.source.published_event(id).await? else {
        return Ok(None);
    };

    Ok(Some(state.cache.insert(id, record).await))
}
