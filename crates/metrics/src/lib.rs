use chrono::{DateTime, Utc};
use lambda_runtime::tracing;
use model::resource::{RESOURCE, SEND_ANONYMIZED_METRIC, SERVICE_TOKEN, SOLUTION_ID, UUID, VERSION};
use model::{Properties, property_text};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use url::Url;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// Properties describing the request itself rather than the deployment
const NON_DATA_PROPERTIES: [&str; 6] = [
    SERVICE_TOKEN,
    RESOURCE,
    SOLUTION_ID,
    UUID,
    VERSION,
    SEND_ANONYMIZED_METRIC,
];

/// Anonymous usage record accepted by the solutions metrics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnonymizedMetric {
    pub solution: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub time_stamp: String,
    pub version: String,
    pub data: Properties,
}

impl AnonymizedMetric {
    /// Build the record from custom resource properties.
    ///
    /// Everything except the identifying fields is forwarded under `Data`.
    pub fn from_properties(
        properties: &Properties,
        now: DateTime<Utc>,
    ) -> Result<AnonymizedMetric, MetricsError> {
        let required = |key: &'static str| {
            property_text(properties, key).ok_or(MetricsError::MissingProperty(key))
        };

        let data: Properties = properties
            .iter()
            .filter(|(key, _)| !NON_DATA_PROPERTIES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(AnonymizedMetric {
            solution: required(SOLUTION_ID)?,
            uuid: required(UUID)?,
            time_stamp: now.format(TIMESTAMP_FORMAT).to_string(),
            version: required(VERSION)?,
            data,
        })
    }
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("missing metric property {0}")]
    MissingProperty(&'static str),
    #[error("failed to serialize metric: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("metric request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("metric rejected with status {0}")]
    Rejected(u16),
}

/// Posts anonymized metrics to the collection endpoint.
#[derive(Clone)]
pub struct MetricsClient {
    client: Client,
    endpoint: Url,
}

impl MetricsClient {
    pub fn new(client: Client, endpoint: Url) -> Self {
        MetricsClient { client, endpoint }
    }

    /// Best effort delivery, failures are logged and never returned.
    /// Returns whether the endpoint accepted the metric.
    pub async fn send(&self, properties: &Properties) -> bool {
        match self.try_send(properties).await {
            Ok(()) => {
                tracing::info!("Anonymized metric delivered");
                true
            }
            Err(err) => {
                tracing::warn!("Failed to send anonymized metric: {err}");
                false
            }
        }
    }

    /// A single delivery attempt.
    pub async fn try_send(&self, properties: &Properties) -> Result<(), MetricsError> {
        let metric: AnonymizedMetric = AnonymizedMetric::from_properties(properties, Utc::now())?;
        let payload: Vec<u8> = serde_json::to_vec(&metric)?;

        tracing::debug!(
            endpoint = self.endpoint.as_str(),
            "Sending metric {}",
            String::from_utf8_lossy(&payload)
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status: StatusCode = response.status();

        if !status.is_success() {
            return Err(MetricsError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}
