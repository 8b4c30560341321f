//! State file structures for persisting managed resources
//!
//! The `identifier` of every record is the composite identifier handed out by
//! the provider at creation time. It is stored verbatim and never recomputed.

use std::collections::HashMap;

use lyra_core::resource::{Attributes, ResourceId, State, Value};
use serde::{Deserialize, Serialize};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Lyra that last modified this state
    pub lyra_version: String,
    /// All managed resources and their last read state
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            lyra_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and stamp the current version before a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.lyra_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    /// Add or update a resource in the state
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == resource.resource_type && r.name == resource.name)
        {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    /// Remove a resource from the state
    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == id.resource_type && r.name == id.name)?;
        Some(self.resources.remove(pos))
    }

    /// Record the outcome of a provider call. A state that no longer exists,
    /// or never got an identifier, removes the record.
    pub fn record(&mut self, state: &State, provider: &str) {
        match ResourceState::from_state(state, provider) {
            Some(resource) => self.upsert_resource(resource),
            None => {
                self.remove_resource(&state.id);
            }
        }
    }

    /// Recorded states keyed by resource id, as the differ expects them
    pub fn current_states(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| {
                let state = r.to_state();
                (state.id.clone(), state)
            })
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "iot_thing_principal_attachment")
    pub resource_type: String,
    /// Logical resource name from the manifest
    pub name: String,
    /// Provider name (e.g., "aws")
    pub provider: String,
    /// Composite identifier of the remote resource
    pub identifier: String,
    /// All attributes of the resource as JSON values
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(
        id: &ResourceId,
        provider: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: id.resource_type.clone(),
            name: id.name.clone(),
            provider: provider.into(),
            identifier: identifier.into(),
            attributes: HashMap::new(),
        }
    }

    /// Set an attribute value
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// `None` for states that cannot be recorded (absent or without identifier)
    pub fn from_state(state: &State, provider: &str) -> Option<Self> {
        if !state.exists {
            return None;
        }
        let identifier = state.identifier.as_deref()?;
        Some(Self {
            attributes: state
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
            ..Self::new(&state.id, provider, identifier)
        })
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn to_state(&self) -> State {
        let attributes: Attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        State::existing(self.id(), attributes).with_identifier(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attachment() -> State {
        let mut attrs = Attributes::new();
        attrs.insert("thing".to_string(), Value::String("sensor-01".to_string()));
        attrs.insert(
            "principal".to_string(),
            Value::String("arn:aws:iot:us-east-1:1:cert/ab".to_string()),
        );
        State::existing(ResourceId::new("iot_thing_principal_attachment", "cert"), attrs)
            .with_identifier("sensor-01|arn:aws:iot:us-east-1:1:cert/ab")
    }

    #[test]
    fn test_state_file_new() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_state_file_increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn test_record_and_read_back() {
        let mut file = StateFile::new();
        let state = attachment();
        file.record(&state, "aws");

        assert_eq!(file.resources.len(), 1);
        assert_eq!(
            file.resources[0].identifier,
            "sensor-01|arn:aws:iot:us-east-1:1:cert/ab"
        );
        assert_eq!(file.current_states().get(&state.id), Some(&state));
    }

    #[test]
    fn test_record_missing_resource_removes_it() {
        let mut file = StateFile::new();
        let state = attachment();
        file.record(&state, "aws");
        file.record(&State::not_found(state.id.clone()), "aws");
        assert!(file.resources.is_empty());
        assert!(file.find_resource(&state.id).is_none());
    }

    #[test]
    fn test_state_without_identifier_is_not_recorded() {
        let state = State::existing(ResourceId::new("x", "y"), Attributes::new());
        assert_eq!(ResourceState::from_state(&state, "aws"), None);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut file = StateFile::new();
        let id = ResourceId::new("cognito_identity_provider_principal_tag", "eng");
        file.upsert_resource(
            ResourceState::new(&id, "aws", "pool:a").with_attribute("use_defaults", json!(true)),
        );
        file.upsert_resource(
            ResourceState::new(&id, "aws", "pool:a").with_attribute("use_defaults", json!(false)),
        );

        assert_eq!(file.resources.len(), 1);
        assert_eq!(
            file.resources[0].attributes.get("use_defaults"),
            Some(&json!(false))
        );
        assert!(file.remove_resource(&id).is_some());
        assert!(file.remove_resource(&id).is_none());
    }

    #[test]
    fn test_state_file_serialization() {
        let mut file = StateFile::new();
        file.record(&attachment(), "aws");

        let json = serde_json::to_string_pretty(&file).unwrap();
        assert!(json.contains("\"lyra_version\""));
        let deserialized: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.lineage, file.lineage);
        assert_eq!(deserialized.resources, file.resources);
    }
}
