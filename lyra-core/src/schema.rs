//! Schema - Define type schemas for resources
//!
//! Each resource kind declares a static schema: attribute names, types,
//! mutability and default-on-absence values. Desired state is validated
//! against it before any request is built.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Value that clears an attribute of this type, if the type has one
    pub fn empty_value(&self) -> Option<Value> {
        match self {
            AttributeType::List(_) => Some(Value::List(Vec::new())),
            AttributeType::Map(_) => Some(Value::Map(HashMap::new())),
            AttributeType::Custom { base, .. } => base.empty_value(),
            _ => None,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Assigned by the remote side; never sent, always read back
    pub computed: bool,
    /// Changing this attribute replaces the remote resource
    pub force_new: bool,
    /// Value used when the attribute is absent from desired state
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Whether a change to this attribute can be applied in place
    pub fn is_mutable(&self) -> bool {
        !self.force_new && !self.computed
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    pub fn is_force_new(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.force_new)
    }

    /// Names of attributes that can be updated in place, sorted
    pub fn mutable_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.is_mutable())
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Fill in default-on-absence values for attributes missing from `attributes`
    pub fn apply_defaults(&self, attributes: &Attributes) -> Attributes {
        let mut resolved = attributes.clone();
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !resolved.contains_key(name)
            {
                resolved.insert(name.clone(), default.clone());
            }
        }
        resolved
    }

    /// Give every mutable attribute absent from `attributes` its empty value,
    /// so a request built from the result clears it remotely
    pub fn fill_cleared(&self, attributes: &Attributes) -> Attributes {
        let mut filled = attributes.clone();
        for (name, schema) in &self.attributes {
            if schema.is_mutable()
                && !filled.contains_key(name)
                && let Some(empty) = schema.attr_type.empty_value()
            {
                filled.insert(name.clone(), empty);
            }
        }
        filled
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Type check each attribute
        for (name, value) in attributes {
            match self.attributes.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if schema.computed => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by_key(|e| e.to_string());
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// String-to-string map (tag maps and the like)
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_schema() -> ResourceSchema {
        ResourceSchema::new("tagged")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("tags", types::string_map()))
            .attribute(
                AttributeSchema::new("use_defaults", AttributeType::Bool)
                    .with_default(Value::Bool(true)),
            )
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn empty_value_only_for_collections() {
        assert_eq!(
            types::string_map().empty_value(),
            Some(Value::Map(HashMap::new()))
        );
        assert_eq!(
            AttributeType::List(Box::new(AttributeType::Int)).empty_value(),
            Some(Value::List(Vec::new()))
        );
        assert_eq!(AttributeType::Bool.empty_value(), None);
    }

    #[test]
    fn fill_cleared_covers_absent_mutable_collections() {
        let schema = tag_schema();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("a".to_string()));

        let filled = schema.fill_cleared(&schema.apply_defaults(&attrs));
        assert_eq!(filled.get("tags"), Some(&Value::Map(HashMap::new())));
        assert_eq!(filled.get("use_defaults"), Some(&Value::Bool(true)));
        assert!(!filled.contains_key("arn"));

        attrs.insert("tags".to_string(), Value::string_map([("k", "v")]));
        let filled = schema.fill_cleared(&attrs);
        assert_eq!(filled.get("tags"), Some(&Value::string_map([("k", "v")])));
    }

    #[test]
    fn custom_type_checks_base_first() {
        let t = AttributeType::Custom {
            name: "Short".to_string(),
            base: Box::new(AttributeType::String),
            validate: |v| match v {
                Value::String(s) if s.len() <= 3 => Ok(()),
                _ => Err("too long".to_string()),
            },
        };
        assert!(t.validate(&Value::String("abc".to_string())).is_ok());
        assert!(matches!(
            t.validate(&Value::String("abcd".to_string())),
            Err(TypeError::ValidationFailed { .. })
        ));
        assert!(matches!(
            t.validate(&Value::Int(1)),
            Err(TypeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn validate_string_map() {
        let t = types::string_map();
        assert!(t.validate(&Value::string_map([("dept", "eng")])).is_ok());

        let mut bad = HashMap::new();
        bad.insert("dept".to_string(), Value::Int(1));
        assert!(matches!(
            t.validate(&Value::Map(bad)),
            Err(TypeError::MapValueError { .. })
        ));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = tag_schema();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("a".to_string()));
        attrs.insert("tags".to_string(), Value::string_map([("k", "v")]));
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = tag_schema();
        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], TypeError::MissingRequired { name } if name == "name"));
    }

    #[test]
    fn unknown_and_computed_attributes_are_rejected() {
        let schema = tag_schema();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("a".to_string()));
        attrs.insert("arn".to_string(), Value::String("arn:x".to_string()));
        attrs.insert("colour".to_string(), Value::String("red".to_string()));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::ComputedAttribute { name } if name == "arn"))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::UnknownAttribute { name } if name == "colour"))
        );
    }

    #[test]
    fn apply_defaults_only_fills_absent_attributes() {
        let schema = tag_schema();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("a".to_string()));

        let resolved = schema.apply_defaults(&attrs);
        assert_eq!(resolved.get("use_defaults"), Some(&Value::Bool(true)));

        attrs.insert("use_defaults".to_string(), Value::Bool(false));
        let resolved = schema.apply_defaults(&attrs);
        assert_eq!(resolved.get("use_defaults"), Some(&Value::Bool(false)));
        assert!(!resolved.contains_key("tags"));
    }

    #[test]
    fn mutable_attributes_exclude_force_new_and_computed() {
        let schema = tag_schema();
        assert_eq!(schema.mutable_attributes(), vec!["tags", "use_defaults"]);
        assert!(schema.is_force_new("name"));
        assert!(!schema.is_force_new("tags"));
    }
}
