//! Effect - A side effect described as a value
//!
//! Effects are produced by the differ and only executed by the Interpreter.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Refresh the recorded state of a resource
    Read { id: ResourceId, identifier: String },
    Create(Resource),
    /// In-place update of mutable attributes
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete and recreate because a force-new attribute changed
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    Delete { id: ResourceId, identifier: String },
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read { id, .. } => id,
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } => id,
            Effect::Replace { id, .. } => id,
            Effect::Delete { id, .. } => id,
        }
    }

    /// Whether executing this Effect changes anything remotely
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read { .. })
    }

    /// Short verb used in plan output
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Read { .. } => "read",
            Effect::Create(_) => "create",
            Effect::Update { .. } => "update",
            Effect::Replace { .. } => "replace",
            Effect::Delete { .. } => "delete",
        }
    }
}
