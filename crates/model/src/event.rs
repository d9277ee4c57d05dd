use crate::resource::ResourceKind;
use crate::Properties;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const REDACTED: &str = "<redacted>";

/// The lifecycle action CloudFormation is requesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Create,
    Update,
    Delete,
    Other(String),
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => RequestType::Create,
            "Update" => RequestType::Update,
            "Delete" => RequestType::Delete,
            _ => RequestType::Other(value),
        }
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        value.to_string()
    }
}

impl Display for RequestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestType::Create => f.write_str("Create"),
            RequestType::Update => f.write_str("Update"),
            RequestType::Delete => f.write_str("Delete"),
            RequestType::Other(other) => f.write_str(other),
        }
    }
}

/// A custom resource request sent by CloudFormation.
///
/// The identifiers are opaque to the handlers and are echoed back in the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
    #[serde(default)]
    pub resource_properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<Properties>,
}

impl LifecycleEvent {
    pub fn resource_kind(&self) -> ResourceKind {
        ResourceKind::from_properties(&self.resource_properties)
    }

    /// A string property, `None` when absent or not a string.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.resource_properties
            .get(key)
            .and_then(|value| value.as_str())
    }

    /// Copy safe for logging: the response URL is pre-signed and grants write access.
    pub fn redacted(&self) -> LifecycleEvent {
        LifecycleEvent {
            response_url: REDACTED.to_string(),
            ..self.clone()
        }
    }
}

/// Details of the Lambda invocation the responder runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub log_stream_name: String,
}

impl InvocationContext {
    pub fn new(aws_request_id: impl Into<String>, log_stream_name: impl Into<String>) -> Self {
        InvocationContext {
            aws_request_id: aws_request_id.into(),
            log_stream_name: log_stream_name.into(),
        }
    }
}
