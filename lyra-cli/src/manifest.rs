//! Manifest - the JSON document declaring the desired resources
//!
//! ```json
//! {
//!   "provider": { "region": "us-east-1" },
//!   "resources": [
//!     { "type": "iot_thing_principal_attachment", "name": "sensor",
//!       "attributes": { "thing": "sensor-01", "principal": "arn:..." } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use lyra_core::resource::{Attributes, Resource, ResourceId, Value};
use lyra_core::schema::ResourceSchema;
use lyra_provider_aws::ProviderConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    resources: Vec<ResourceDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDecl {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))
    }

    /// Desired resources in declaration order. Names must be unique per type.
    pub fn resources(&self) -> Result<Vec<Resource>, String> {
        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(self.resources.len());

        for decl in &self.resources {
            let id = ResourceId::new(&decl.resource_type, &decl.name);
            if !seen.insert(id.clone()) {
                return Err(format!("Duplicate resource {}", id));
            }

            let mut attributes = Attributes::new();
            for (name, json) in &decl.attributes {
                let value = attribute_value(&format!("attribute '{}'", name), json)
                    .map_err(|e| format!("{}: {}", id, e))?;
                attributes.insert(name.clone(), value);
            }
            resources.push(Resource { id, attributes });
        }
        Ok(resources)
    }

    /// Check the provider block and every resource against its schema,
    /// returning the desired resources on success
    pub fn validate(&self, schemas: &[ResourceSchema]) -> Result<Vec<Resource>, String> {
        self.provider.validate()?;
        let resources = self.resources()?;

        let mut all_errors = Vec::new();
        for resource in &resources {
            let Some(schema) = schemas
                .iter()
                .find(|s| s.resource_type == resource.id.resource_type)
            else {
                all_errors.push(format!(
                    "{}: unknown resource type '{}'",
                    resource.id, resource.id.resource_type
                ));
                continue;
            };

            if let Err(errors) = schema.validate(&resource.attributes) {
                for error in errors {
                    all_errors.push(format!("{}: {}", resource.id, error));
                }
            }
        }

        if all_errors.is_empty() {
            Ok(resources)
        } else {
            Err(all_errors.join("\n"))
        }
    }
}

/// Convert a manifest value, rejecting what attributes cannot hold instead
/// of dropping or rounding it
fn attribute_value(path: &str, json: &serde_json::Value) -> Result<Value, String> {
    match json {
        serde_json::Value::Null => Err(format!("{} is null", path)),
        serde_json::Value::Number(n) if n.as_i64().is_none() => {
            Err(format!("{} must be an integer, got {}", path, n))
        }
        serde_json::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| attribute_value(&format!("{}[{}]", path, i), item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| attribute_value(&format!("{}.{}", path, k), v).map(|v| (k.clone(), v)))
            .collect::<Result<_, String>>()
            .map(Value::Map),
        scalar => Value::from_json(scalar).ok_or_else(|| format!("{} is not supported", path)),
    }
}
