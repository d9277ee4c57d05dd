use crate::HandlerError;
use crate::config::{ConfigError, ResponderConfig};
use crate::generator::{IdGenerator, RandomIdGenerator, uuid_response};
use crate::obligation::CallbackObligation;
use callback::{CallbackTransport, HttpCallbackTransport};
use futures::FutureExt;
use lambda_runtime::tracing::{self, Instrument, Span};
use metrics::MetricsClient;
use model::ResponseData;
use model::event::{InvocationContext, LifecycleEvent, RequestType};
use model::outcome::CallbackOutcome;
use model::resource::{ResourceKind, SEND_ANONYMIZED_METRIC};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// What a handler did for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Update, Delete or an unrecognised request type
    NoOp,
    Generated(ResponseData),
    MetricSent,
    /// Delivery failed and was dropped, the resource still succeeds
    MetricDropped,
    MetricDisabled,
    Unrecognized(String),
}

impl Dispatched {
    pub fn into_data(self) -> ResponseData {
        match self {
            Dispatched::Generated(data) => data,
            _ => ResponseData::new(),
        }
    }
}

/// Answers CloudFormation custom resource requests.
pub struct LifecycleResponder {
    transport: Arc<dyn CallbackTransport>,
    metrics: MetricsClient,
    ids: Arc<dyn IdGenerator>,
}

impl LifecycleResponder {
    pub fn new(transport: Arc<dyn CallbackTransport>, metrics: MetricsClient) -> Self {
        LifecycleResponder {
            transport,
            metrics,
            ids: Arc::new(RandomIdGenerator),
        }
    }

    /// A responder sharing one HTTP client between the callback and the metrics endpoint.
    pub fn from_config(config: &ResponderConfig) -> Result<Self, ConfigError> {
        let client: reqwest::Client = config.http_client()?;

        Ok(LifecycleResponder::new(
            Arc::new(HttpCallbackTransport::new(client.clone())),
            MetricsClient::new(client, config.metrics_endpoint.clone()),
        ))
    }

    pub fn with_id_generator(self, ids: Arc<dyn IdGenerator>) -> Self {
        LifecycleResponder { ids, ..self }
    }

    /// Handle one event and report the outcome back to CloudFormation.
    ///
    /// Exactly one callback is attempted whatever the handler does, including panicking.
    /// Returns the outcome that was reported.
    pub async fn handle(
        &self,
        event: &LifecycleEvent,
        context: &InvocationContext,
    ) -> CallbackOutcome {
        let span: Span = tracing::span!(
            tracing::Level::INFO,
            "CustomResource",
            request_id = %event.request_id,
            aws_request_id = %context.aws_request_id,
            logical_resource_id = %event.logical_resource_id,
            request_type = %event.request_type
        );

        async {
            tracing::debug!(
                "Request {}",
                serde_json::to_string(&event.redacted()).unwrap_or_default()
            );

            let obligation: CallbackObligation =
                CallbackObligation::acquire(self.transport.as_ref(), event, context);

            let outcome: CallbackOutcome =
                match AssertUnwindSafe(self.dispatch(event)).catch_unwind().await {
                    Ok(Ok(dispatched)) => {
                        tracing::info!("Handled as {:?}", dispatched);
                        CallbackOutcome::success(dispatched.into_data())
                    }
                    Ok(Err(err)) => {
                        tracing::error!("Handler failed: {err}");
                        CallbackOutcome::failure(err.to_string())
                    }
                    Err(panic) => {
                        let err: HandlerError = HandlerError::Panicked(panic_message(&*panic));
                        tracing::error!("Handler failed: {err}");
                        CallbackOutcome::failure(err.to_string())
                    }
                };

            obligation.fulfil(outcome).await
        }
        .instrument(span)
        .await
    }

    /// Run the handler for the event. Only `Create` requests do any work as none of the
    /// resources allocate anything which would need updating or removing.
    pub(crate) async fn dispatch(&self, event: &LifecycleEvent) -> Result<Dispatched, HandlerError> {
        if event.request_type != RequestType::Create {
            return Ok(Dispatched::NoOp);
        }

        let kind: ResourceKind = event.resource_kind();

        tracing::info!(resource = %kind, "Dispatching resource");

        match kind {
            ResourceKind::Uuid => uuid_response(self.ids.as_ref()).map(Dispatched::Generated),
            ResourceKind::AnonymizedMetric => {
                if event.property(SEND_ANONYMIZED_METRIC) == Some("Yes") {
                    if self.metrics.send(&event.resource_properties).await {
                        Ok(Dispatched::MetricSent)
                    } else {
                        Ok(Dispatched::MetricDropped)
                    }
                } else {
                    Ok(Dispatched::MetricDisabled)
                }
            }
            ResourceKind::Unknown(name) => {
                tracing::info!("{name}: not defined as a custom resource, sending success response");
                Ok(Dispatched::Unrecognized(name))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::outcome::{CallbackBody, ResponseStatus};
    use serde_json::{Value, json};
    use test_utils::{
        LogCapture, RecordingTransport, RejectingTransport, is_canonical_uuid, lifecycle_event,
        lifecycle_event_with_url, metric_properties, test_context,
    };
    use url::Url;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const UNREACHABLE_METRICS: &str = "http://127.0.0.1:9/generic";

    struct FailingIdGenerator;

    impl IdGenerator for FailingIdGenerator {
        fn generate(&self) -> Result<Uuid, HandlerError> {
            Err(HandlerError::IdGeneration("entropy source unavailable".to_string()))
        }
    }

    struct PanickingIdGenerator;

    impl IdGenerator for PanickingIdGenerator {
        fn generate(&self) -> Result<Uuid, HandlerError> {
            panic!("generator poisoned")
        }
    }

    fn metrics_client(endpoint: &str) -> MetricsClient {
        MetricsClient::new(reqwest::Client::new(), Url::parse(endpoint).unwrap())
    }

    fn responder(transport: Arc<RecordingTransport>, metrics_endpoint: &str) -> LifecycleResponder {
        LifecycleResponder::new(transport, metrics_client(metrics_endpoint))
    }

    async fn metrics_server(status: u16, expected_posts: u64) -> MockServer {
        let server: MockServer = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generic"))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_posts)
            .mount(&server)
            .await;

        server
    }

    #[tokio::test]
    async fn non_create_requests_succeed_without_data() {
        let server: MockServer = metrics_server(200, 0).await;
        let endpoint: String = format!("{}/generic", server.uri());

        for request_type in ["Update", "Delete", "Rollback"] {
            for properties in [
                json!({"Resource": "UUID"}),
                metric_properties("Yes"),
                json!({"Resource": "UnknownKind"}),
            ] {
                let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
                let event: LifecycleEvent = lifecycle_event(request_type, properties);

                let outcome: CallbackOutcome = responder(transport.clone(), &endpoint)
                    .handle(&event, &test_context())
                    .await;

                let body: CallbackBody = transport.single();
                assert_eq!(CallbackOutcome::success(ResponseData::new()), outcome);
                assert_eq!(ResponseStatus::Success, body.status);
                assert!(body.data.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn create_uuid_returns_fresh_canonical_id() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let responder: LifecycleResponder = responder(transport.clone(), UNREACHABLE_METRICS);
        let event: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UUID"}));

        responder.handle(&event, &test_context()).await;
        responder.handle(&event, &test_context()).await;

        let bodies: Vec<CallbackBody> = transport.bodies();
        let ids: Vec<&String> = bodies
            .iter()
            .map(|body| body.data.get("UUID").expect("UUID should be returned"))
            .collect();

        assert_eq!(2, ids.len());
        assert!(bodies.iter().all(|body| body.status == ResponseStatus::Success));
        assert!(ids.iter().all(|id| is_canonical_uuid(id)));
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn disabled_metric_is_not_sent() {
        let server: MockServer = metrics_server(200, 0).await;
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let event: LifecycleEvent = lifecycle_event("Create", metric_properties("No"));

        let outcome: CallbackOutcome =
            responder(transport.clone(), &format!("{}/generic", server.uri()))
                .handle(&event, &test_context())
                .await;

        assert_eq!(CallbackOutcome::success(ResponseData::new()), outcome);
        assert_eq!(ResponseStatus::Success, transport.single().status);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enabled_metric_is_sent_once() {
        let server: MockServer = metrics_server(200, 1).await;
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let event: LifecycleEvent = lifecycle_event("Create", metric_properties("Yes"));

        let outcome: CallbackOutcome =
            responder(transport.clone(), &format!("{}/generic", server.uri()))
                .handle(&event, &test_context())
                .await;

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let metric: Value = serde_json::from_slice(&requests[0].body).unwrap();

        assert_eq!(1, requests.len());
        assert_eq!(json!("SO0133"), metric["Solution"]);
        assert_eq!(json!("5a3c1d2e-0000-4000-8000-000000000001"), metric["UUID"]);
        assert_eq!(json!("v1.2.0"), metric["Version"]);
        assert!(metric["TimeStamp"].is_string());
        assert_eq!(CallbackOutcome::success(ResponseData::new()), outcome);
        assert_eq!(ResponseStatus::Success, transport.single().status);
    }

    #[tokio::test]
    async fn rejected_metric_still_succeeds() {
        let server: MockServer = metrics_server(500, 1).await;
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let event: LifecycleEvent = lifecycle_event("Create", metric_properties("Yes"));

        responder(transport.clone(), &format!("{}/generic", server.uri()))
            .handle(&event, &test_context())
            .await;

        assert_eq!(ResponseStatus::Success, transport.single().status);
    }

    #[tokio::test]
    async fn unreachable_metrics_endpoint_still_succeeds() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let event: LifecycleEvent = lifecycle_event("Create", metric_properties("Yes"));

        let outcome: CallbackOutcome = responder(transport.clone(), UNREACHABLE_METRICS)
            .handle(&event, &test_context())
            .await;

        assert_eq!(CallbackOutcome::success(ResponseData::new()), outcome);
        assert_eq!(ResponseStatus::Success, transport.single().status);
    }

    #[tokio::test]
    async fn unknown_resource_succeeds_without_data() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let responder: LifecycleResponder = responder(transport.clone(), UNREACHABLE_METRICS);
        let event: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UnknownKind"}));

        let dispatched: Dispatched = responder.dispatch(&event).await.unwrap();
        assert_eq!(Dispatched::Unrecognized("UnknownKind".to_string()), dispatched);

        responder.handle(&event, &test_context()).await;

        let body: CallbackBody = transport.single();
        assert_eq!(ResponseStatus::Success, body.status);
        assert!(body.data.is_empty());
    }

    #[tokio::test]
    async fn unknown_resource_is_logged() {
        let logs: LogCapture = LogCapture::default();
        let _guard = logs.install();

        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let event: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UnknownKind"}));

        responder(transport.clone(), UNREACHABLE_METRICS)
            .handle(&event, &test_context())
            .await;

        assert!(
            logs.contains("UnknownKind: not defined as a custom resource"),
            "Missing log line in {}",
            logs.contents()
        );
        assert_eq!(ResponseStatus::Success, transport.single().status);
    }

    #[tokio::test]
    async fn metric_dispatch_reports_delivery() {
        let event: LifecycleEvent = lifecycle_event("Create", metric_properties("Yes"));

        let accepting: MockServer = metrics_server(200, 1).await;
        let delivered: Dispatched = responder(
            Arc::new(RecordingTransport::default()),
            &format!("{}/generic", accepting.uri()),
        )
        .dispatch(&event)
        .await
        .unwrap();

        let failing: MockServer = metrics_server(500, 1).await;
        let dropped: Dispatched = responder(
            Arc::new(RecordingTransport::default()),
            &format!("{}/generic", failing.uri()),
        )
        .dispatch(&event)
        .await
        .unwrap();

        assert_eq!(Dispatched::MetricSent, delivered);
        assert_eq!(Dispatched::MetricDropped, dropped);
    }

    #[tokio::test]
    async fn failing_generator_reports_failure_once() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let responder: LifecycleResponder = responder(transport.clone(), UNREACHABLE_METRICS)
            .with_id_generator(Arc::new(FailingIdGenerator));
        let event: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UUID"}));

        let outcome: CallbackOutcome = responder.handle(&event, &test_context()).await;

        let body: CallbackBody = transport.single();
        assert!(matches!(outcome, CallbackOutcome::Failure { .. }));
        assert_eq!(ResponseStatus::Failed, body.status);
        assert!(
            body.reason
                .as_deref()
                .is_some_and(|reason| reason.contains("entropy source unavailable"))
        );
        assert!(body.data.is_empty());
    }

    #[tokio::test]
    async fn panicking_generator_reports_failure_once() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let responder: LifecycleResponder = responder(transport.clone(), UNREACHABLE_METRICS)
            .with_id_generator(Arc::new(PanickingIdGenerator));
        let event: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UUID"}));

        responder.handle(&event, &test_context()).await;

        let body: CallbackBody = transport.single();
        assert_eq!(ResponseStatus::Failed, body.status);
        assert_eq!(
            Some("handler panicked: generator poisoned".to_string()),
            body.reason
        );
    }

    #[tokio::test]
    async fn physical_id_is_stable_across_invocations() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let responder: LifecycleResponder = responder(transport.clone(), UNREACHABLE_METRICS);
        let create: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UUID"}));
        let retry: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UUID"}));

        responder.handle(&create, &test_context()).await;
        responder.handle(&retry, &test_context()).await;

        let bodies: Vec<CallbackBody> = transport.bodies();
        assert_eq!(2, bodies.len());
        assert_eq!(bodies[0].physical_resource_id, bodies[1].physical_resource_id);
        assert_eq!(create.logical_resource_id, bodies[0].logical_resource_id);
    }

    #[tokio::test]
    async fn rejected_callback_does_not_escape() {
        let transport: Arc<RejectingTransport> = Arc::new(RejectingTransport::default());
        let responder: LifecycleResponder =
            LifecycleResponder::new(transport.clone(), metrics_client(UNREACHABLE_METRICS));
        let event: LifecycleEvent = lifecycle_event("Create", json!({"Resource": "UUID"}));

        let outcome: CallbackOutcome = responder.handle(&event, &test_context()).await;

        assert!(matches!(outcome, CallbackOutcome::Success { .. }));
        assert_eq!(1, transport.inner.bodies().len());
    }

    #[tokio::test]
    async fn puts_callback_to_presigned_url() {
        let callback_server: MockServer = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/presigned"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&callback_server)
            .await;

        let responder: LifecycleResponder = LifecycleResponder::new(
            Arc::new(HttpCallbackTransport::new(reqwest::Client::new())),
            metrics_client(UNREACHABLE_METRICS),
        );
        let event: LifecycleEvent = lifecycle_event_with_url(
            "Create",
            json!({"Resource": "UUID"}),
            &format!("{}/presigned", callback_server.uri()),
        );

        let outcome: CallbackOutcome = responder.handle(&event, &test_context()).await;

        let requests: Vec<Request> = callback_server.received_requests().await.unwrap();
        let body: CallbackBody = serde_json::from_slice(&requests[0].body).unwrap();

        assert_eq!(CallbackOutcome::success(body.data.clone()), outcome);
        assert_eq!(ResponseStatus::Success, body.status);
        assert!(body.data.contains_key("UUID"));
    }
}
