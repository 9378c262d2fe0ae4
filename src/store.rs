use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;

use crate::{BackendConfig, EventRecord, StoreError};

const EVENTS_PATH: &str = "/rest/v1/events";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Read access to published event rows.
///
/// Implementations only ever hand out rows whose published flag is set.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    async fn published_event(&self, id: &str) -> Result<Option<EventRecord>, StoreError>;

    /// Published events on or after `from`, earliest first.
    async fn upcoming_events(
        &self,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StoreError>;
}

/// Event table behind a PostgREST endpoint.
pub struct SupabaseStore {
    client: reqwest::Client,
    config: BackendConfig,
}

impl SupabaseStore {
    pub fn new(config: BackendConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, config })
    }

    async fn select(&self, filters: &[(&str, String)]) -> Result<Vec<EventRecord>, StoreError> {
        let url = format!("{}{EVENTS_PATH}", self.config.base_url);
        debug!("Querying {url} with {filters:?}");

        let response = self
            .client
            .get(&url)
            .query(&[("select", "*"), ("published", "eq.true")])
            .query(filters)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl EventSource for SupabaseStore {
    async fn published_event(&self, id: &str) -> Result<Option<EventRecord>, StoreError> {
        let rows = self
            .select(&[("id", format!("eq.{id}")), ("limit", "1".to_string())])
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn upcoming_events(
        &self,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StoreError> {
        self.select(&[
            ("datum", format!("gte.{}", from.format("%Y-%m-%d"))),
            ("order", "datum.asc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }
}
