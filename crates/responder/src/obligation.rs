use callback::CallbackTransport;
use lambda_runtime::tracing;
use model::event::{InvocationContext, LifecycleEvent};
use model::outcome::CallbackOutcome;

/// The duty to answer CloudFormation, taken on as soon as an event is accepted.
///
/// `fulfil` consumes the obligation so a second callback cannot be sent. Dropping it
/// unfulfilled leaves the stack waiting until its own timeout, which is logged.
#[must_use = "CloudFormation blocks until the callback is sent"]
pub struct CallbackObligation<'a> {
    transport: &'a dyn CallbackTransport,
    event: &'a LifecycleEvent,
    context: &'a InvocationContext,
    fulfilled: bool,
}

impl<'a> CallbackObligation<'a> {
    pub fn acquire(
        transport: &'a dyn CallbackTransport,
        event: &'a LifecycleEvent,
        context: &'a InvocationContext,
    ) -> Self {
        CallbackObligation {
            transport,
            event,
            context,
            fulfilled: false,
        }
    }

    /// Send the outcome once. Transport errors are logged, there is nothing else to report to.
    pub async fn fulfil(mut self, outcome: CallbackOutcome) -> CallbackOutcome {
        self.fulfilled = true;

        match self
            .transport
            .respond(self.event, self.context, &outcome)
            .await
        {
            Ok(receipt) => tracing::info!(
                status = receipt.status,
                "Sent {:?} callback",
                outcome.status()
            ),
            Err(err) => tracing::error!("Failed to send {:?} callback: {err}", outcome.status()),
        }

        outcome
    }
}

impl Drop for CallbackObligation<'_> {
    fn drop(&mut self) {
        if !self.fulfilled {
            tracing::error!(
                request_id = %self.event.request_id,
                "Callback obligation dropped without a response"
            );
        }
    }
}
