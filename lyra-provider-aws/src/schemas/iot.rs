//! IoT schema definitions

use lyra_core::schema::{AttributeSchema, ResourceSchema};

use super::types as aws;

pub const THING_PRINCIPAL_ATTACHMENT: &str = "iot_thing_principal_attachment";

/// Returns the schema for attaching a principal to a thing
pub fn thing_principal_attachment_schema() -> ResourceSchema {
    ResourceSchema::new(THING_PRINCIPAL_ATTACHMENT)
        .with_description("Attachment of a principal (certificate or identity) to an IoT thing")
        .attribute(
            AttributeSchema::new("thing", aws::thing_name())
                .required()
                .force_new()
                .with_description("The name of the thing"),
        )
        .attribute(
            AttributeSchema::new("principal", aws::arn())
                .required()
                .force_new()
                .with_description("The ARN of the principal to attach"),
        )
}

/// Returns all IoT schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![thing_principal_attachment_schema()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_has_no_mutable_attributes() {
        assert!(thing_principal_attachment_schema()
            .mutable_attributes()
            .is_empty());
    }
}
