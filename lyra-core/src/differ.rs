//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the desired state declared in the manifest with the state last
//! read from the Provider, and generates the list of required Effects (Plan).

use std::collections::{BTreeSet, HashMap};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Attributes, Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with mutable differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete and create
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Attributes whose desired value differs from the current one, sorted.
///
/// `desired` is expected to have schema defaults applied. Computed attributes
/// and `_`-prefixed keys are ignored; an empty map or list equals an absent
/// one.
pub fn changed_attributes(
    schema: &ResourceSchema,
    desired: &Attributes,
    current: &Attributes,
) -> Vec<String> {
    let mut names: BTreeSet<&str> = desired.keys().map(String::as_str).collect();
    names.extend(
        current
            .keys()
            .map(String::as_str)
            .filter(|name| schema.get(name).is_some()),
    );

    names
        .into_iter()
        .filter(|name| !name.starts_with('_'))
        .filter(|name| !schema.get(name).is_some_and(|a| a.computed))
        .filter(|name| !same_value(desired.get(*name), current.get(*name)))
        .map(str::to_string)
        .collect()
}

fn same_value(desired: Option<&Value>, current: Option<&Value>) -> bool {
    match (desired, current) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        (Some(Value::Map(m)), None) | (None, Some(Value::Map(m))) => m.is_empty(),
        (Some(Value::List(l)), None) | (None, Some(Value::List(l))) => l.is_empty(),
        _ => false,
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(schema: &ResourceSchema, desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let resolved = schema.apply_defaults(&desired.attributes);
    let changed = changed_attributes(schema, &resolved, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else if changed.iter().any(|name| schema.is_force_new(name)) {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Compute Diffs for all resources and generate a Plan.
///
/// Recorded states with no desired counterpart become Delete effects, after
/// all other effects.
pub fn create_plan(
    schemas: &[ResourceSchema],
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let schema = schemas
            .iter()
            .find(|s| s.resource_type == resource.id.resource_type)
            .cloned()
            .unwrap_or_else(|| ResourceSchema::new(resource.id.resource_type.clone()));

        match diff(&schema, resource, &current) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => plan.add(Effect::Update { id, from, to }),
            Diff::Replace { id, from, to, .. } => plan.add(Effect::Replace { id, from, to }),
            Diff::NoChange(_) => {}
        }
    }

    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|state| state.exists)
        .filter(|state| !desired.iter().any(|r| r.id == state.id))
        .collect();
    orphans.sort_by_key(|state| state.id.to_string());

    for state in orphans {
        if let Some(identifier) = &state.identifier {
            plan.add(Effect::Delete {
                id: state.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    plan
}
