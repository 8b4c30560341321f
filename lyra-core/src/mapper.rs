//! Mapper - Translate between attribute maps and vendor request/response shapes
//!
//! Expanding builds a vendor request from desired attributes; flattening
//! turns a vendor response back into attributes. Both directions are pure.

use std::collections::HashMap;

use crate::provider::{ErrorKind, ProviderError, ProviderResult};
use crate::resource::{Attributes, Value};

/// Remote State Mapper of one resource kind
pub trait Mapper: Send + Sync {
    /// Request for the vendor "set" call
    type Request: Send;
    /// Response of the vendor "get" call
    type Response: Send;

    /// Build the vendor request from the decoded identifier keys and the full
    /// desired attribute set (schema defaults already applied).
    ///
    /// Optional attributes absent from `desired` are left out of the request.
    fn to_request(&self, keys: &[String], desired: &Attributes) -> ProviderResult<Self::Request>;

    /// Every attribute the read contract promises, server-assigned ones included
    fn from_response(&self, response: Self::Response) -> Attributes;
}

/// Get a string attribute
pub fn get_str<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a str> {
    attributes.get(name).and_then(Value::as_str)
}

/// Get a boolean attribute
pub fn get_bool(attributes: &Attributes, name: &str) -> Option<bool> {
    attributes.get(name).and_then(Value::as_bool)
}

/// Expand a string-to-string map attribute; `None` when absent
pub fn expand_string_map(
    attributes: &Attributes,
    name: &str,
) -> ProviderResult<Option<HashMap<String, String>>> {
    let Some(value) = attributes.get(name) else {
        return Ok(None);
    };
    let map = value.as_map().ok_or_else(|| {
        ProviderError::new(
            ErrorKind::InvalidAttributes,
            format!("attribute '{}' must be a map", name),
        )
    })?;

    map.iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k.clone(), s.clone())),
            _ => Err(ProviderError::new(
                ErrorKind::InvalidAttributes,
                format!("attribute '{}' key '{}' must be a string", name, k),
            )),
        })
        .collect::<ProviderResult<HashMap<_, _>>>()
        .map(Some)
}

/// Flatten a string-to-string map into a map attribute value
pub fn flatten_string_map(map: &HashMap<String, String>) -> Value {
    Value::string_map(map.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}
