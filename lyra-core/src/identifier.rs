//! Identifier - Composite resource identifier codec
//!
//! A remote resource is addressed by one opaque string built from its key
//! attributes. The string is persisted by the host engine, so the delimiter,
//! the field order and the split rule of every format are part of the
//! durable state contract and must not change.

use crate::resource::{Attributes, Value};

/// How `decode` assigns segments to fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// No key may contain the delimiter; exactly one segment per field
    Exact,
    /// The first key may contain the delimiter. Decoding splits from the
    /// right: the trailing fields take one segment each and everything
    /// before them is the first key.
    LeadingComposite,
}

/// Identifier codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("expected ID in format {format}, received: {id}")]
    Malformed { id: String, format: String },

    #[error("expected {expected} key(s), got {got}")]
    KeyCount { expected: usize, got: usize },

    #[error("key '{field}' must not be empty")]
    EmptyKey { field: &'static str },

    #[error("key '{field}' must not contain '{delimiter}': {value}")]
    DelimiterInKey {
        field: &'static str,
        delimiter: char,
        value: String,
    },

    #[error("key attribute '{field}' is missing or not a string")]
    MissingKey { field: &'static str },
}

/// Identifier format of one resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierFormat {
    delimiter: char,
    fields: &'static [&'static str],
    split: Split,
}

impl IdentifierFormat {
    /// `fields` lists the key attribute names in encoding order.
    pub const fn new(delimiter: char, fields: &'static [&'static str], split: Split) -> Self {
        Self {
            delimiter,
            fields,
            split,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Human readable format, e.g. `identity_pool_id:identity_provider_name`
    pub fn describe(&self) -> String {
        self.fields.join(self.delimiter.to_string().as_str())
    }

    pub fn encode<S: AsRef<str>>(&self, keys: &[S]) -> Result<String, IdentifierError> {
        if keys.len() != self.fields.len() {
            return Err(IdentifierError::KeyCount {
                expected: self.fields.len(),
                got: keys.len(),
            });
        }

        for (i, (field, key)) in self.fields.iter().copied().zip(keys).enumerate() {
            let key = key.as_ref();
            if key.is_empty() {
                return Err(IdentifierError::EmptyKey { field });
            }
            let may_contain_delimiter = i == 0 && self.split == Split::LeadingComposite;
            if !may_contain_delimiter && key.contains(self.delimiter) {
                return Err(IdentifierError::DelimiterInKey {
                    field,
                    delimiter: self.delimiter,
                    value: key.to_string(),
                });
            }
        }

        Ok(keys
            .iter()
            .map(|k| k.as_ref())
            .collect::<Vec<&str>>()
            .join(self.delimiter.to_string().as_str()))
    }

    pub fn decode(&self, id: &str) -> Result<Vec<String>, IdentifierError> {
        let sep = self.delimiter.to_string();
        let parts: Vec<&str> = id.split(self.delimiter).collect();
        let field_count = self.fields.len();

        let keys: Vec<String> = match self.split {
            Split::Exact if parts.len() == field_count => {
                parts.iter().map(|s| s.to_string()).collect()
            }
            Split::LeadingComposite if parts.len() >= field_count => {
                let leading_len = parts.len() - (field_count - 1);
                let mut keys = vec![parts[..leading_len].join(sep.as_str())];
                keys.extend(parts[leading_len..].iter().map(|s| s.to_string()));
                keys
            }
            _ => return Err(self.malformed(id)),
        };

        if keys.iter().any(String::is_empty) {
            return Err(self.malformed(id));
        }
        Ok(keys)
    }

    /// Extract the key values from an attribute map, in field order
    pub fn keys_from(&self, attributes: &Attributes) -> Result<Vec<String>, IdentifierError> {
        self.fields
            .iter()
            .copied()
            .map(|field| {
                attributes
                    .get(field)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or(IdentifierError::MissingKey { field })
            })
            .collect()
    }

    /// Rebuild the key attributes from decoded keys
    pub fn key_attributes(&self, keys: &[String]) -> Attributes {
        self.fields
            .iter()
            .zip(keys)
            .map(|(field, key)| (field.to_string(), Value::String(key.clone())))
            .collect()
    }

    fn malformed(&self, id: &str) -> IdentifierError {
        IdentifierError::Malformed {
            id: id.to_string(),
            format: self.describe(),
        }
    }
}
