use lambda_runtime::{LambdaEvent, service_fn, tracing};
use model::Error;
use model::event::LifecycleEvent;
use responder::config::ResponderConfig;
use responder::{LifecycleResponder, lambda_handler};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config: ResponderConfig = ResponderConfig::from_env()?;
    tracing::info!(
        metrics_endpoint = config.metrics_endpoint.as_str(),
        "Starting custom resource handler for {}",
        config.solution_identifier
    );

    // Built once per execution environment and shared by every invocation
    let responder: LifecycleResponder = LifecycleResponder::from_config(&config)?;
    let responder: &LifecycleResponder = &responder;

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<LifecycleEvent>| async move {
            lambda_handler(responder, event).await
        },
    ))
    .await
}
