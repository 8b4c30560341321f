//! Cognito Identity schema definitions

use lyra_core::resource::Value;
use lyra_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws;

pub const PRINCIPAL_TAG: &str = "cognito_identity_provider_principal_tag";

/// Returns the schema for identity provider principal tag mappings
pub fn principal_tag_schema() -> ResourceSchema {
    ResourceSchema::new(PRINCIPAL_TAG)
        .with_description(
            "Principal tags of an identity provider linked to a Cognito identity pool",
        )
        .attribute(
            AttributeSchema::new("identity_pool_id", aws::identity_pool_id())
                .required()
                .force_new()
                .with_description("The identity pool ID"),
        )
        .attribute(
            AttributeSchema::new("identity_provider_name", aws::identity_provider_name())
                .required()
                .force_new()
                .with_description("The name of the identity provider"),
        )
        .attribute(
            AttributeSchema::new("principal_tags", types::string_map())
                .with_description("Map of tag keys to identity provider claims"),
        )
        .attribute(
            AttributeSchema::new("use_defaults", AttributeType::Bool)
                .with_default(Value::Bool(true))
                .with_description("Use the default principal tag mappings"),
        )
}

/// Returns all Cognito Identity schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![principal_tag_schema()]
}
