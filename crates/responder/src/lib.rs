use lambda_runtime::{Context, LambdaEvent};
use model::event::{InvocationContext, LifecycleEvent};
use thiserror::Error;

pub mod config;
pub mod generator;
pub mod lifecycle;
pub mod obligation;

pub use lifecycle::{Dispatched, LifecycleResponder};

/// Errors raised by a custom resource handler, reported to CloudFormation as `FAILED`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to generate id: {0}")]
    IdGeneration(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Entry point for `lambda_runtime::run()`.
///
/// The outcome goes to CloudFormation through the callback, so the invocation itself
/// always completes normally.
///
/// ```ignore
/// let responder: LifecycleResponder = LifecycleResponder::from_config(&config)?;
/// let responder: &LifecycleResponder = &responder;
///
/// lambda_runtime::run(service_fn(move |event: LambdaEvent<LifecycleEvent>| async move {
///     lambda_handler(responder, event).await
/// }))
/// .await
/// ```
pub async fn lambda_handler(
    responder: &LifecycleResponder,
    event: LambdaEvent<LifecycleEvent>,
) -> Result<(), model::Error> {
    let context: InvocationContext = invocation_context(&event.context);

    responder.handle(&event.payload, &context).await;

    Ok(())
}

pub fn invocation_context(context: &Context) -> InvocationContext {
    InvocationContext::new(
        context.request_id.clone(),
        context.env_config.log_stream.clone(),
    )
}
