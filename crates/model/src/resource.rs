use crate::Properties;
use std::fmt::{Display, Formatter};

/// Property keys understood by the custom resource.
pub const RESOURCE: &str = "Resource";
pub const SERVICE_TOKEN: &str = "ServiceToken";
pub const SEND_ANONYMIZED_METRIC: &str = "SendAnonymizedMetric";
pub const SOLUTION_ID: &str = "SolutionId";
pub const UUID: &str = "UUID";
pub const VERSION: &str = "Version";

/// The kind of custom resource being requested, decoded from the `Resource` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Uuid,
    AnonymizedMetric,
    // Kept so it can be logged, never fails provisioning
    Unknown(String),
}

impl ResourceKind {
    pub fn from_properties(properties: &Properties) -> Self {
        let name: &str = properties
            .get(RESOURCE)
            .and_then(|value| value.as_str())
            .unwrap_or_default();

        ResourceKind::from(name)
    }
}

impl From<&str> for ResourceKind {
    fn from(name: &str) -> Self {
        match name {
            "UUID" => ResourceKind::Uuid,
            "AnonymizedMetric" => ResourceKind::AnonymizedMetric,
            other => ResourceKind::Unknown(other.to_string()),
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Uuid => f.write_str("UUID"),
            ResourceKind::AnonymizedMetric => f.write_str("AnonymizedMetric"),
            ResourceKind::Unknown(name) => f.write_str(name),
        }
    }
}
