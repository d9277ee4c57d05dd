use model::env::{
    DEFAULT_METRICS_ENDPOINT, DEFAULT_SOLUTION_IDENTIFIER, METRICS_ENDPOINT, SOLUTION_IDENTIFIER,
};
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Settings read from the Lambda environment at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderConfig {
    pub solution_identifier: String,
    pub metrics_endpoint: Url,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name} value {value}: {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ResponderConfig {
    pub fn from_env() -> Result<ResponderConfig, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source, unset and empty values fall back to defaults.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ResponderConfig, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let solution_identifier: String = read(SOLUTION_IDENTIFIER)
            .unwrap_or_else(|| DEFAULT_SOLUTION_IDENTIFIER.to_string());

        let endpoint: String =
            read(METRICS_ENDPOINT).unwrap_or_else(|| DEFAULT_METRICS_ENDPOINT.to_string());
        let metrics_endpoint: Url =
            Url::parse(&endpoint).map_err(|source| ConfigError::InvalidUrl {
                name: METRICS_ENDPOINT,
                value: endpoint.clone(),
                source,
            })?;

        Ok(ResponderConfig {
            solution_identifier,
            metrics_endpoint,
        })
    }

    /// The HTTP client shared by every invocation of this execution environment.
    pub fn http_client(&self) -> Result<Client, ConfigError> {
        Ok(Client::builder()
            .user_agent(self.solution_identifier.as_str())
            .build()?)
    }
}
