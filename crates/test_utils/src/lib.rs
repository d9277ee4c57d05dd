use async_trait::async_trait;
use callback::{CallbackError, CallbackReceipt, CallbackTransport};
use lambda_runtime::tracing::dispatcher::DefaultGuard;
use lambda_runtime::tracing::Level;
use model::event::{InvocationContext, LifecycleEvent};
use model::outcome::{CallbackBody, CallbackOutcome};
use serde_json::{Value, json};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// Test identifiers echoed in every callback
pub const TEST_STACK_ID: &str =
    "arn:aws:cloudformation:eu-west-1:123456789012:stack/mxc-test/7e2f2a10-0000-4000-8000-000000000000";
pub const TEST_LOG_STREAM: &str = "2026/10/14/[$LATEST]0123456789abcdef";
pub const TEST_RESPONSE_URL: &str = "https://cloudformation-custom-resource-response-euwest1.s3.amazonaws.com/signed";

/// Create a CloudFormation event with the given request type and resource properties
pub fn lifecycle_event(request_type: &str, properties: Value) -> LifecycleEvent {
    lifecycle_event_with_url(request_type, properties, TEST_RESPONSE_URL)
}

/// As `lifecycle_event` but responding to a custom URL, e.g. a mock server
pub fn lifecycle_event_with_url(
    request_type: &str,
    properties: Value,
    response_url: &str,
) -> LifecycleEvent {
    let logical_resource_id: String = properties
        .get("Resource")
        .and_then(Value::as_str)
        .unwrap_or("CustomResource")
        .to_string();

    serde_json::from_value(json!({
        "RequestType": request_type,
        "ServiceToken": "arn:aws:lambda:eu-west-1:123456789012:function:mxc-test-custom-resource",
        "ResponseURL": response_url,
        "StackId": TEST_STACK_ID,
        "RequestId": "3f5c1a4e-request",
        "LogicalResourceId": logical_resource_id,
        "ResourceType": "AWS::CloudFormation::CustomResource",
        "ResourceProperties": properties,
    }))
    .expect("Test event should decode")
}

/// Properties for an anonymized metric resource
pub fn metric_properties(send: &str) -> Value {
    json!({
        "Resource": "AnonymizedMetric",
        "SolutionId": "SO0133",
        "UUID": "5a3c1d2e-0000-4000-8000-000000000001",
        "Version": "v1.2.0",
        "SendAnonymizedMetric": send,
    })
}

/// Lowercase 8-4-4-4-12 hex groups
pub fn is_canonical_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    let lengths: Vec<usize> = groups.iter().map(|group| group.len()).collect();

    lengths == [8, 4, 4, 4, 12]
        && groups.iter().all(|group| {
            group
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}

pub fn test_context() -> InvocationContext {
    InvocationContext::new("c0ffee00-aws-request", TEST_LOG_STREAM)
}

/// Records callback bodies instead of sending them.
#[derive(Default)]
pub struct RecordingTransport {
    bodies: Mutex<Vec<CallbackBody>>,
}

impl RecordingTransport {
    pub fn bodies(&self) -> Vec<CallbackBody> {
        self.bodies
            .lock()
            .map(|bodies| bodies.clone())
            .unwrap_or_default()
    }

    /// The only callback sent, panics unless exactly one was recorded
    pub fn single(&self) -> CallbackBody {
        let bodies: Vec<CallbackBody> = self.bodies();
        assert_eq!(1, bodies.len(), "Expected exactly one callback");

        bodies.into_iter().next().expect("One callback recorded")
    }
}

#[async_trait]
impl CallbackTransport for RecordingTransport {
    async fn respond(
        &self,
        event: &LifecycleEvent,
        context: &InvocationContext,
        outcome: &CallbackOutcome,
    ) -> Result<CallbackReceipt, CallbackError> {
        let body: CallbackBody = CallbackBody::new(event, context, outcome);

        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.push(body);
        }

        Ok(CallbackReceipt { status: 200 })
    }
}

/// A transport which records the attempt and then fails as if the URL had expired.
#[derive(Default)]
pub struct RejectingTransport {
    pub inner: RecordingTransport,
}

#[async_trait]
impl CallbackTransport for RejectingTransport {
    async fn respond(
        &self,
        event: &LifecycleEvent,
        context: &InvocationContext,
        outcome: &CallbackOutcome,
    ) -> Result<CallbackReceipt, CallbackError> {
        self.inner.respond(event, context, outcome).await?;

        Err(CallbackError::Rejected {
            status: 403,
            body: "Request has expired".to_string(),
        })
    }
}

/// Collects formatted log output so tests can assert on it.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Capture INFO and above on the current thread until the guard is dropped
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(Level::INFO)
            .with_writer(self.clone())
            .finish();

        subscriber.set_default()
    }

    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
            .unwrap_or_default()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.contents().contains(text)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.extend_from_slice(bytes);
        }

        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
