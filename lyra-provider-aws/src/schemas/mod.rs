//! AWS resource schema definitions

pub mod cognito;
pub mod iot;
pub mod types;

use lyra_core::schema::ResourceSchema;

/// Returns all AWS schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    let mut schemas = Vec::new();
    schemas.extend(cognito::schemas());
    schemas.extend(iot::schemas());
    schemas
}
