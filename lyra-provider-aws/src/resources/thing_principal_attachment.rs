//! iot_thing_principal_attachment
//!
//! Attaches a principal (certificate, Cognito identity, ...) to an IoT thing.
//! Both attributes are force-new, so Update never reaches the service.

use aws_sdk_iot::Client as IotClient;
use lyra_core::context::Context;
use lyra_core::identifier::{IdentifierFormat, Split};
use lyra_core::mapper::{Mapper, get_str};
use lyra_core::provider::{
    BoxFuture, ErrorKind, ProviderError, ProviderResult, RemoteError, RemoteResult,
};
use lyra_core::reconciler::RemoteResource;
use lyra_core::resource::Attributes;
use lyra_core::schema::ResourceSchema;

use crate::error::classify;
use crate::schemas::iot::thing_principal_attachment_schema;

/// `<thing>|<principal>`. Principal ARNs contain `:` and `/`, thing names
/// never contain `|`.
pub const IDENTIFIER: IdentifierFormat =
    IdentifierFormat::new('|', &["thing", "principal"], Split::Exact);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingPrincipal {
    pub thing: String,
    pub principal: String,
}

/// IoT calls used by this resource
pub trait IotApi: Send + Sync {
    fn attach_thing_principal(&self, thing: &str, principal: &str) -> BoxFuture<'_, RemoteResult<()>>;

    /// Every principal attached to `thing`, across all pages
    fn list_thing_principals(&self, thing: &str) -> BoxFuture<'_, RemoteResult<Vec<String>>>;

    fn detach_thing_principal(&self, thing: &str, principal: &str) -> BoxFuture<'_, RemoteResult<()>>;
}

impl IotApi for IotClient {
    fn attach_thing_principal(&self, thing: &str, principal: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let (thing, principal) = (thing.to_string(), principal.to_string());
        Box::pin(async move {
            IotClient::attach_thing_principal(self)
                .thing_name(thing)
                .principal(principal)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| classify(e, |e| e.is_resource_not_found_exception()))
        })
    }

    fn list_thing_principals(&self, thing: &str) -> BoxFuture<'_, RemoteResult<Vec<String>>> {
        let thing = thing.to_string();
        Box::pin(async move {
            let mut principals = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let output = IotClient::list_thing_principals(self)
                    .thing_name(&thing)
                    .set_next_token(next_token.take())
                    .send()
                    .await
                    .map_err(|e| classify(e, |e| e.is_resource_not_found_exception()))?;

                principals.extend(output.principals().iter().cloned());
                match output.next_token() {
                    Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                    _ => break,
                }
            }
            Ok(principals)
        })
    }

    fn detach_thing_principal(&self, thing: &str, principal: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let (thing, principal) = (thing.to_string(), principal.to_string());
        Box::pin(async move {
            IotClient::detach_thing_principal(self)
                .thing_name(thing)
                .principal(principal)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| classify(e, |e| e.is_resource_not_found_exception()))
        })
    }
}

pub struct ThingPrincipalMapper;

impl Mapper for ThingPrincipalMapper {
    type Request = ThingPrincipal;
    type Response = ThingPrincipal;

    fn to_request(&self, _keys: &[String], desired: &Attributes) -> ProviderResult<ThingPrincipal> {
        let field = |name: &str| {
            get_str(desired, name).map(str::to_string).ok_or_else(|| {
                ProviderError::new(
                    ErrorKind::InvalidAttributes,
                    format!("attribute '{}' must be a string", name),
                )
            })
        };
        Ok(ThingPrincipal {
            thing: field("thing")?,
            principal: field("principal")?,
        })
    }

    fn from_response(&self, response: ThingPrincipal) -> Attributes {
        IDENTIFIER.key_attributes(&[response.thing, response.principal])
    }
}

/// Thing principal attachment resource bound to an IoT client
pub struct ThingPrincipalAttachment<C> {
    client: C,
    schema: ResourceSchema,
}

impl<C: IotApi> ThingPrincipalAttachment<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            schema: thing_principal_attachment_schema(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: IotApi> RemoteResource for ThingPrincipalAttachment<C> {
    type Mapper = ThingPrincipalMapper;

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn identifier_format(&self) -> &IdentifierFormat {
        &IDENTIFIER
    }

    fn mapper(&self) -> &ThingPrincipalMapper {
        &ThingPrincipalMapper
    }

    fn put<'a>(&'a self, _ctx: &'a Context, request: ThingPrincipal) -> BoxFuture<'a, RemoteResult<()>> {
        Box::pin(async move {
            self.client
                .attach_thing_principal(&request.thing, &request.principal)
                .await
        })
    }

    fn get<'a>(
        &'a self,
        _ctx: &'a Context,
        keys: &'a [String],
    ) -> BoxFuture<'a, RemoteResult<ThingPrincipal>> {
        Box::pin(async move {
            let (thing, principal) = (&keys[0], &keys[1]);
            let attached = self.client.list_thing_principals(thing).await?;
            if !attached.iter().any(|p| p == principal) {
                return Err(RemoteError::not_found(format!(
                    "principal {} is not attached to thing {}",
                    principal, thing
                )));
            }
            Ok(ThingPrincipal {
                thing: thing.clone(),
                principal: principal.clone(),
            })
        })
    }

    fn remove<'a>(&'a self, _ctx: &'a Context, keys: &'a [String]) -> BoxFuture<'a, RemoteResult<()>> {
        self.client.detach_thing_principal(&keys[0], &keys[1])
    }
}
