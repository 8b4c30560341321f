//! cognito_identity_provider_principal_tag
//!
//! Principal tag mapping of an identity provider in a Cognito identity pool.
//! There is no create/delete API: the mapping always exists once the
//! provider is linked, so Create and Update both set it and Delete resets it
//! to the defaults with no tags.

use std::collections::HashMap;

use aws_sdk_cognitoidentity::Client as CognitoIdentityClient;
use lyra_core::context::Context;
use lyra_core::identifier::{IdentifierFormat, Split};
use lyra_core::mapper::{Mapper, expand_string_map, flatten_string_map, get_bool};
use lyra_core::provider::{BoxFuture, ErrorKind, ProviderError, ProviderResult, RemoteResult};
use lyra_core::reconciler::RemoteResource;
use lyra_core::resource::{Attributes, Value};
use lyra_core::schema::ResourceSchema;

use crate::error::classify;
use crate::schemas::cognito::principal_tag_schema;

/// `<identity_pool_id>:<identity_provider_name>`. Pool IDs contain `:`
/// themselves, so the provider name is taken from the right.
pub const IDENTIFIER: IdentifierFormat = IdentifierFormat::new(
    ':',
    &["identity_pool_id", "identity_provider_name"],
    Split::LeadingComposite,
);

/// Request and response shape of the principal tag attribute map calls
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrincipalTagMap {
    pub identity_pool_id: String,
    pub identity_provider_name: String,
    pub principal_tags: Option<HashMap<String, String>>,
    pub use_defaults: Option<bool>,
}

/// Cognito Identity calls used by this resource
pub trait CognitoIdentityApi: Send + Sync {
    fn set_principal_tag_attribute_map(
        &self,
        input: PrincipalTagMap,
    ) -> BoxFuture<'_, RemoteResult<()>>;

    fn get_principal_tag_attribute_map(
        &self,
        identity_pool_id: &str,
        identity_provider_name: &str,
    ) -> BoxFuture<'_, RemoteResult<PrincipalTagMap>>;
}

impl CognitoIdentityApi for CognitoIdentityClient {
    fn set_principal_tag_attribute_map(
        &self,
        input: PrincipalTagMap,
    ) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(async move {
            CognitoIdentityClient::set_principal_tag_attribute_map(self)
                .identity_pool_id(input.identity_pool_id)
                .identity_provider_name(input.identity_provider_name)
                .set_principal_tags(input.principal_tags)
                .set_use_defaults(input.use_defaults)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| classify(e, |e| e.is_resource_not_found_exception()))
        })
    }

    fn get_principal_tag_attribute_map(
        &self,
        identity_pool_id: &str,
        identity_provider_name: &str,
    ) -> BoxFuture<'_, RemoteResult<PrincipalTagMap>> {
        let pool = identity_pool_id.to_string();
        let provider = identity_provider_name.to_string();
        Box::pin(async move {
            let output = CognitoIdentityClient::get_principal_tag_attribute_map(self)
                .identity_pool_id(&pool)
                .identity_provider_name(&provider)
                .send()
                .await
                .map_err(|e| classify(e, |e| e.is_resource_not_found_exception()))?;

            Ok(PrincipalTagMap {
                identity_pool_id: output.identity_pool_id().unwrap_or(pool.as_str()).to_string(),
                identity_provider_name: output
                    .identity_provider_name()
                    .unwrap_or(provider.as_str())
                    .to_string(),
                principal_tags: output.principal_tags().cloned(),
                use_defaults: output.use_defaults(),
            })
        })
    }
}

pub struct PrincipalTagMapper;

impl Mapper for PrincipalTagMapper {
    type Request = PrincipalTagMap;
    type Response = PrincipalTagMap;

    fn to_request(&self, keys: &[String], desired: &Attributes) -> ProviderResult<PrincipalTagMap> {
        let [identity_pool_id, identity_provider_name] = keys else {
            return Err(ProviderError::new(
                ErrorKind::MalformedIdentifier,
                format!("expected 2 keys, got {}", keys.len()),
            ));
        };
        Ok(PrincipalTagMap {
            identity_pool_id: identity_pool_id.clone(),
            identity_provider_name: identity_provider_name.clone(),
            principal_tags: expand_string_map(desired, "principal_tags")?,
            use_defaults: get_bool(desired, "use_defaults"),
        })
    }

    fn from_response(&self, response: PrincipalTagMap) -> Attributes {
        let mut attributes = IDENTIFIER.key_attributes(&[
            response.identity_pool_id,
            response.identity_provider_name,
        ]);
        attributes.insert(
            "principal_tags".to_string(),
            flatten_string_map(&response.principal_tags.unwrap_or_default()),
        );
        // An unset flag reads back as the service default
        attributes.insert(
            "use_defaults".to_string(),
            Value::Bool(response.use_defaults.unwrap_or(true)),
        );
        attributes
    }
}

/// Principal tag resource bound to a Cognito Identity client
pub struct PrincipalTag<C> {
    client: C,
    schema: ResourceSchema,
}

impl<C: CognitoIdentityApi> PrincipalTag<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            schema: principal_tag_schema(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: CognitoIdentityApi> RemoteResource for PrincipalTag<C> {
    type Mapper = PrincipalTagMapper;

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn identifier_format(&self) -> &IdentifierFormat {
        &IDENTIFIER
    }

    fn mapper(&self) -> &PrincipalTagMapper {
        &PrincipalTagMapper
    }

    fn put<'a>(&'a self, _ctx: &'a Context, request: PrincipalTagMap) -> BoxFuture<'a, RemoteResult<()>> {
        self.client.set_principal_tag_attribute_map(request)
    }

    fn get<'a>(
        &'a self,
        _ctx: &'a Context,
        keys: &'a [String],
    ) -> BoxFuture<'a, RemoteResult<PrincipalTagMap>> {
        self.client.get_principal_tag_attribute_map(&keys[0], &keys[1])
    }

    fn remove<'a>(&'a self, _ctx: &'a Context, keys: &'a [String]) -> BoxFuture<'a, RemoteResult<()>> {
        self.client.set_principal_tag_attribute_map(PrincipalTagMap {
            identity_pool_id: keys[0].clone(),
            identity_provider_name: keys[1].clone(),
            principal_tags: Some(HashMap::new()),
            use_defaults: Some(true),
        })
    }
}
