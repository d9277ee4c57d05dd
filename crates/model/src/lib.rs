use serde_json::Value;
use std::collections::BTreeMap;

pub mod env;
pub mod event;
pub mod outcome;
pub mod resource;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Values returned to CloudFormation under `Data`, readable with `Fn::GetAtt`.
pub type ResponseData = BTreeMap<String, String>;

/// Raw `ResourceProperties` as sent by CloudFormation.
pub type Properties = serde_json::Map<String, Value>;

/// Read a property as text. CloudFormation sends strings, numbers are stringified.
pub fn property_text(properties: &Properties, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::Null => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}
