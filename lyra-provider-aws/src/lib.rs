//! Lyra AWS Provider
//!
//! AWS Provider implementation: Cognito Identity principal tags and IoT
//! thing principal attachments, dispatched by resource type.

pub mod config;
mod error;
pub mod resources;
pub mod schemas;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;

use aws_sdk_cognitoidentity::Client as CognitoIdentityClient;
use aws_sdk_iot::Client as IotClient;
use log::debug;
use lyra_core::context::Context;
use lyra_core::provider::{
    BoxFuture, Operation, Provider, ProviderError, ProviderResult,
};
use lyra_core::reconciler::{Reconciler, ResourceReconciler};
use lyra_core::resource::{Resource, ResourceId, State};
use lyra_core::schema::ResourceSchema;

pub use config::ProviderConfig;
use resources::{CognitoIdentityApi, IotApi, PrincipalTag, ThingPrincipalAttachment};

/// AWS Provider
pub struct AwsProvider {
    reconcilers: HashMap<String, Box<dyn ResourceReconciler>>,
}

impl AwsProvider {
    /// Create a new AWS Provider from the manifest's provider block
    pub async fn new(config: &ProviderConfig) -> Self {
        let sdk_config = config.load_sdk_config().await;
        debug!(
            "AWS provider region: {}",
            sdk_config
                .region()
                .map(|r| r.as_ref())
                .unwrap_or("(default chain)")
        );
        Self::with_clients(
            CognitoIdentityClient::new(&sdk_config),
            IotClient::new(&sdk_config),
        )
    }

    /// Create with specific clients (for testing)
    pub fn with_clients<C, I>(cognito: C, iot: I) -> Self
    where
        C: CognitoIdentityApi + 'static,
        I: IotApi + 'static,
    {
        let reconcilers: Vec<Box<dyn ResourceReconciler>> = vec![
            Box::new(Reconciler::new(PrincipalTag::new(cognito))),
            Box::new(Reconciler::new(ThingPrincipalAttachment::new(iot))),
        ];
        Self {
            reconcilers: reconcilers
                .into_iter()
                .map(|r| (r.resource_type().to_string(), r))
                .collect(),
        }
    }

    fn reconciler(
        &self,
        id: &ResourceId,
        operation: Operation,
    ) -> ProviderResult<&dyn ResourceReconciler> {
        self.reconcilers
            .get(&id.resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| {
                ProviderError::unknown_resource_type(&id.resource_type)
                    .during(operation)
                    .for_resource(id.clone())
            })
    }
}

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        let mut schemas: Vec<ResourceSchema> =
            self.reconcilers.values().map(|r| r.schema().clone()).collect();
        schemas.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        schemas
    }

    fn read(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let (ctx, id, identifier) = (ctx.clone(), id.clone(), identifier.to_string());
        Box::pin(async move {
            self.reconciler(&id, Operation::Read)?
                .read(&ctx, &id, &identifier)
                .await
        })
    }

    fn create(&self, ctx: &Context, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let (ctx, resource) = (ctx.clone(), resource.clone());
        Box::pin(async move {
            self.reconciler(&resource.id, Operation::Create)?
                .create(&ctx, &resource)
                .await
        })
    }

    fn update(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let (ctx, id, identifier) = (ctx.clone(), id.clone(), identifier.to_string());
        let (from, to) = (from.clone(), to.clone());
        Box::pin(async move {
            self.reconciler(&id, Operation::Update)?
                .update(&ctx, &identifier, &from, &to)
                .await
        })
    }

    fn delete(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let (ctx, id, identifier) = (ctx.clone(), id.clone(), identifier.to_string());
        Box::pin(async move {
            self.reconciler(&id, Operation::Delete)?
                .delete(&ctx, &id, &identifier)
                .await
        })
    }

    fn import(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let (ctx, id, identifier) = (ctx.clone(), id.clone(), identifier.to_string());
        Box::pin(async move {
            self.reconciler(&id, Operation::Import)?
                .import(&ctx, &id, &identifier)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::provider::ErrorKind;
    use lyra_core::resource::Value;

    use crate::schemas::cognito::PRINCIPAL_TAG;
    use crate::schemas::iot::THING_PRINCIPAL_ATTACHMENT;
    use crate::testing::{FakeCognito, FakeIot};

    fn provider() -> AwsProvider {
        let iot = FakeIot::default();
        iot.create_thing("sensor-01");
        AwsProvider::with_clients(FakeCognito::default(), iot)
    }

    #[test]
    fn schemas_cover_both_resources() {
        let names: Vec<String> = provider()
            .schemas()
            .into_iter()
            .map(|s| s.resource_type)
            .collect();
        assert_eq!(names, vec![PRINCIPAL_TAG, THING_PRINCIPAL_ATTACHMENT]);
    }

    #[tokio::test]
    async fn dispatches_by_resource_type() {
        let provider = provider();
        let ctx = Context::new();
        let resource = Resource::new(THING_PRINCIPAL_ATTACHMENT, "sensor")
            .with_attribute("thing", Value::String("sensor-01".to_string()))
            .with_attribute(
                "principal",
                Value::String("arn:aws:iot:us-east-1:123456789012:cert/ab".to_string()),
            );

        let state = provider.create(&ctx, &resource).await.unwrap();
        let identifier = state.identifier.clone().unwrap();

        let read = provider.read(&ctx, &resource.id, &identifier).await.unwrap();
        assert_eq!(read, state);

        provider.delete(&ctx, &resource.id, &identifier).await.unwrap();
        let gone = provider.import(&ctx, &resource.id, &identifier).await.unwrap();
        assert!(!gone.exists);
    }

    #[tokio::test]
    async fn unknown_resource_type() {
        let provider = provider();
        let id = ResourceId::new("s3_bucket", "logs");
        let err = provider
            .read(&Context::new(), &id, "logs")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownResourceType);
        assert_eq!(err.operation, Some(Operation::Read));
        assert_eq!(err.resource_id, Some(id));
    }
}
