//! Concrete resources
//!
//! Each resource pairs a schema, an identifier format and a mapper with the
//! vendor client calls it needs.

pub mod principal_tag;
pub mod thing_principal_attachment;

pub use principal_tag::{CognitoIdentityApi, PrincipalTag};
pub use thing_principal_attachment::{IotApi, ThingPrincipalAttachment};
