use async_trait::async_trait;
use lambda_runtime::tracing;
use model::event::{InvocationContext, LifecycleEvent};
use model::outcome::{CallbackBody, CallbackOutcome};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Delivers the outcome of an invocation to the orchestrator.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    async fn respond(
        &self,
        event: &LifecycleEvent,
        context: &InvocationContext,
        outcome: &CallbackOutcome,
    ) -> Result<CallbackReceipt, CallbackError>;
}

/// Acknowledgement from the response URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackReceipt {
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("failed to serialize callback body: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("callback rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// PUTs the callback body to the pre-signed `ResponseURL` of the event.
///
/// The URL signature covers the content length and no content type, so the body is
/// serialized once and sent with an explicit length and an empty content type.
/// There is a single attempt, if it fails the orchestrator will time out the request.
#[derive(Clone)]
pub struct HttpCallbackTransport {
    client: Client,
}

impl HttpCallbackTransport {
    pub fn new(client: Client) -> Self {
        HttpCallbackTransport { client }
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn respond(
        &self,
        event: &LifecycleEvent,
        context: &InvocationContext,
        outcome: &CallbackOutcome,
    ) -> Result<CallbackReceipt, CallbackError> {
        let body: CallbackBody = CallbackBody::new(event, context, outcome);
        let payload: Vec<u8> = serde_json::to_vec(&body)?;

        tracing::debug!(
            status = ?body.status,
            physical_resource_id = body.physical_resource_id,
            "Sending callback of {} bytes",
            payload.len()
        );

        let response = self
            .client
            .put(event.response_url.as_str())
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, payload.len())
            .body(payload)
            .send()
            .await?;

        let status: StatusCode = response.status();

        if !status.is_success() {
            let body: String = response.text().await.unwrap_or_default();

            return Err(CallbackError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(CallbackReceipt {
            status: status.as_u16(),
        })
    }
}
