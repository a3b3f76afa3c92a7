//! Client for the error-tracking ingestion API.
//!
//! Every failed gateway invocation produces exactly one diagnostic
//! event, POSTed to `{ingest_url}/api/{project_id}/store/`. Delivery is
//! awaited by the caller before the request's own response is built, so
//! an event is never left in flight when the hosting environment tears
//! the request task down.

use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Client identifier carried in the auth header.
const SENTRY_CLIENT: &str = "slack-bridge/0";
/// Ingestion protocol version.
const SENTRY_VERSION: u8 = 7;
const LOGGER: &str = "slack-bridge-logger";
const PLATFORM: &str = "rust";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("event delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("ingestion endpoint returned status {0}")]
    UnexpectedStatus(u16),
}

/// Per-deployment ingestion credentials. Read from the configuration
/// store at failure time, never baked into the deployment file.
#[derive(Clone, Debug)]
pub struct ProjectCredentials {
    pub project_id: String,
    pub key: String,
}

/// One diagnostic event. Built fresh per failure; event ids are never
/// reused across events.
#[derive(Serialize, Debug)]
pub struct Event {
    pub event_id: String,
    pub message: String,
    pub timestamp: f64,
    pub logger: &'static str,
    pub platform: &'static str,
}

impl Event {
    fn new(message: String, timestamp: f64) -> Self {
        Event {
            event_id: Uuid::new_v4().to_string(),
            message,
            timestamp,
            logger: LOGGER,
            platform: PLATFORM,
        }
    }
}

/// `X-Sentry-Auth` value: comma-separated key=value tokens, in the
/// order the ingestion API documents them.
fn auth_header(timestamp: f64, key: &str) -> String {
    [
        format!("Sentry sentry_version={SENTRY_VERSION}"),
        format!("sentry_timestamp={timestamp}"),
        format!("sentry_client={SENTRY_CLIENT}"),
        format!("sentry_key={key}"),
    ]
    .join(", ")
}

pub struct Reporter {
    client: reqwest::Client,
    ingest_url: Url,
    timeout: Duration,
}

impl Reporter {
    pub fn new(ingest_url: Url, timeout: Duration) -> Self {
        Reporter {
            client: reqwest::Client::new(),
            ingest_url,
            timeout,
        }
    }

    /// Build an event around `message` and deliver it. Resolves only
    /// once delivery has finished (either way) or the timeout fires.
    pub async fn send(
        &self,
        credentials: &ProjectCredentials,
        message: String,
    ) -> Result<(), TelemetryError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0);
        let event = Event::new(message, timestamp);

        let url = format!(
            "{}/api/{}/store/",
            self.ingest_url.as_str().trim_end_matches('/'),
            credentials.project_id,
        );

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("X-Sentry-Auth", auth_header(timestamp, &credentials.key))
            .json(&event)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(TelemetryError::UnexpectedStatus(status.as_u16())),
        }
    }
}
