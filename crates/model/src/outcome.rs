use crate::event::{InvocationContext, LifecycleEvent};
use crate::ResponseData;
use serde::{Deserialize, Serialize};

/// The result reported back to CloudFormation, produced once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success { data: ResponseData },
    Failure { reason: String },
}

impl CallbackOutcome {
    pub fn success(data: ResponseData) -> Self {
        CallbackOutcome::Success { data }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        CallbackOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> ResponseStatus {
        match self {
            CallbackOutcome::Success { .. } => ResponseStatus::Success,
            CallbackOutcome::Failure { .. } => ResponseStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// JSON body PUT to the pre-signed response URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackBody {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub data: ResponseData,
}

impl CallbackBody {
    pub fn new(
        event: &LifecycleEvent,
        context: &InvocationContext,
        outcome: &CallbackOutcome,
    ) -> Self {
        let (reason, data) = match outcome {
            CallbackOutcome::Success { data } => (None, data.clone()),
            CallbackOutcome::Failure { reason } if reason.trim().is_empty() => {
                (Some(default_reason(context)), ResponseData::new())
            }
            CallbackOutcome::Failure { reason } => (Some(reason.clone()), ResponseData::new()),
        };

        CallbackBody {
            status: outcome.status(),
            reason,
            physical_resource_id: physical_resource_id(event, context),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
        }
    }
}

fn default_reason(context: &InvocationContext) -> String {
    format!(
        "See the details in CloudWatch Log Stream: {}",
        context.log_stream_name
    )
}

/// The id CloudFormation tracks the resource under.
///
/// Changing it on an update makes CloudFormation delete the old resource, so the
/// fallbacks only apply when the event does not carry one.
pub fn physical_resource_id(event: &LifecycleEvent, context: &InvocationContext) -> String {
    [
        event.physical_resource_id.as_deref(),
        Some(context.log_stream_name.as_str()),
    ]
    .into_iter()
    .flatten()
    .find(|id| !id.is_empty())
    .unwrap_or(event.logical_resource_id.as_str())
    .to_string()
}
