//! Reconciler - Drive one remote resource through its lifecycle
//!
//! ```text
//! Absent -> Creating -> Present -> Updating -> Present -> Deleting -> Absent
//! ```
//!
//! Only `Present` is observable between calls. A call either succeeds,
//! fails, or leaves a remote side effect applied but unrecorded; the next
//! Read reconciles the latter. The reconciler keeps no state of its own and
//! assumes the host engine serializes calls per identifier.

use log::{debug, warn};

use crate::context::Context;
use crate::differ::changed_attributes;
use crate::identifier::IdentifierFormat;
use crate::mapper::Mapper;
use crate::provider::{
    BoxFuture, ErrorKind, Operation, ProviderError, ProviderResult, RemoteResult,
};
use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

type RequestOf<R> = <<R as RemoteResource>::Mapper as Mapper>::Request;
type ResponseOf<R> = <<R as RemoteResource>::Mapper as Mapper>::Response;

/// Vendor-facing half of a resource kind: schema, identifier format, mapper
/// and the three vendor calls.
///
/// Implementations classify vendor errors into [`crate::provider::RemoteError`]
/// and never retry on their own.
pub trait RemoteResource: Send + Sync {
    type Mapper: Mapper;

    fn schema(&self) -> &ResourceSchema;

    fn identifier_format(&self) -> &IdentifierFormat;

    fn mapper(&self) -> &Self::Mapper;

    /// Vendor "set" call, used by both Create and Update
    fn put<'a>(&'a self, ctx: &'a Context, request: RequestOf<Self>) -> BoxFuture<'a, RemoteResult<()>>;

    /// Vendor "get" call; `RemoteError::NotFound` when the resource is gone
    fn get<'a>(&'a self, ctx: &'a Context, keys: &'a [String]) -> BoxFuture<'a, RemoteResult<ResponseOf<Self>>>;

    /// Vendor delete (or set-to-empty) call
    fn remove<'a>(&'a self, ctx: &'a Context, keys: &'a [String]) -> BoxFuture<'a, RemoteResult<()>>;
}

/// Object-safe lifecycle of one resource type, as dispatched by a provider
pub trait ResourceReconciler: Send + Sync {
    fn resource_type(&self) -> &str;

    fn schema(&self) -> &ResourceSchema;

    fn create<'a>(&'a self, ctx: &'a Context, desired: &'a Resource) -> BoxFuture<'a, ProviderResult<State>>;

    fn read<'a>(
        &'a self,
        ctx: &'a Context,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    fn update<'a>(
        &'a self,
        ctx: &'a Context,
        identifier: &'a str,
        previous: &'a State,
        desired: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    fn delete<'a>(
        &'a self,
        ctx: &'a Context,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn import<'a>(
        &'a self,
        ctx: &'a Context,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>>;
}

/// Generic Create/Read/Update/Delete/Import over a [`RemoteResource`]
pub struct Reconciler<R> {
    remote: R,
}

impl<R: RemoteResource> Reconciler<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn resource_type(&self) -> &str {
        &self.remote.schema().resource_type
    }

    /// Apply defaults and validate desired attributes at the boundary
    fn resolve_desired(&self, desired: &Resource) -> ProviderResult<Attributes> {
        let schema = self.remote.schema();
        let attributes = schema.apply_defaults(&desired.attributes);
        schema
            .validate(&attributes)
            .map_err(|errors| ProviderError::invalid_attributes(&errors))?;
        Ok(attributes)
    }

    fn decode(&self, identifier: &str) -> ProviderResult<Vec<String>> {
        self.remote
            .identifier_format()
            .decode(identifier)
            .map_err(ProviderError::malformed_identifier)
    }

    pub async fn create(&self, ctx: &Context, desired: &Resource) -> ProviderResult<State> {
        let fail = |e: ProviderError| e.during(Operation::Create).for_resource(desired.id.clone());

        let attributes = self.resolve_desired(desired).map_err(fail)?;
        let format = self.remote.identifier_format();
        let keys = format.keys_from(&attributes).map_err(|e| {
            fail(ProviderError::new(ErrorKind::InvalidAttributes, e.to_string()).with_cause(e))
        })?;
        // Encode before calling out so a key that cannot round-trip is
        // rejected without touching the remote side.
        let identifier = format.encode(&keys).map_err(|e| {
            fail(ProviderError::new(ErrorKind::InvalidAttributes, e.to_string()).with_cause(e))
        })?;
        let request = self
            .remote
            .mapper()
            .to_request(&keys, &attributes)
            .map_err(fail)?;

        debug!("Creating {} {}", desired.id, identifier);
        ctx.run(self.remote.put(ctx, request))
            .await
            .map_err(ProviderError::from)
            .and_then(|r| r.map_err(ProviderError::from))
            .map_err(|e| fail(rejected_on_write(e)).with_identifier(identifier.clone()))?;

        // The read-back is part of Create: its failure is a failed Create
        let state = self.read(ctx, &desired.id, &identifier).await.map_err(fail)?;
        if !state.exists {
            return Err(fail(ProviderError::new(
                ErrorKind::RemoteNotFound,
                "resource was not found after it was created",
            ))
            .with_identifier(identifier));
        }
        Ok(state)
    }

    pub async fn read(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let fail = |e: ProviderError| {
            e.during(Operation::Read)
                .with_identifier(identifier)
                .for_resource(id.clone())
        };

        let keys = self.decode(identifier).map_err(fail)?;
        debug!("Reading {} {}", id, identifier);

        let response = match ctx.run(self.remote.get(ctx, &keys)).await {
            Err(interrupted) => return Err(fail(interrupted.into())),
            Ok(Err(e)) if e.is_not_found() => {
                warn!("{} {} not found, removing from state", id, identifier);
                return Ok(State::not_found(id.clone()));
            }
            Ok(Err(e)) => return Err(fail(e.into())),
            Ok(Ok(response)) => response,
        };

        let attributes = self.remote.mapper().from_response(response);
        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    pub async fn update(
        &self,
        ctx: &Context,
        identifier: &str,
        previous: &State,
        desired: &Resource,
    ) -> ProviderResult<State> {
        let fail = |e: ProviderError| {
            e.during(Operation::Update)
                .with_identifier(identifier)
                .for_resource(desired.id.clone())
        };

        let keys = self.decode(identifier).map_err(fail)?;
        let attributes = self.resolve_desired(desired).map_err(fail)?;
        let schema = self.remote.schema();

        let changed = changed_attributes(schema, &attributes, &previous.attributes);
        let forcing: Vec<String> = changed
            .iter()
            .filter(|name| schema.is_force_new(name))
            .cloned()
            .collect();
        if !forcing.is_empty() {
            return Err(fail(ProviderError::requires_replacement(&forcing)));
        }

        if changed.is_empty() {
            debug!("{} {} has no changes, skipping update", desired.id, identifier);
            return Ok(previous.clone().with_identifier(identifier));
        }

        // Replace semantics: the request carries every mutable attribute,
        // not only the changed ones. Removed collections are sent empty.
        let request = self
            .remote
            .mapper()
            .to_request(&keys, &schema.fill_cleared(&attributes))
            .map_err(fail)?;

        debug!(
            "Updating {} {} (changed: {})",
            desired.id,
            identifier,
            changed.join(", ")
        );
        match ctx.run(self.remote.put(ctx, request)).await {
            Err(interrupted) => return Err(fail(interrupted.into())),
            Ok(Err(e)) if e.is_not_found() => {
                let mut err = ProviderError::from(e);
                err.message = format!("resource no longer exists: {}", err.message);
                return Err(fail(err));
            }
            Ok(Err(e)) => return Err(fail(e.into())),
            Ok(Ok(())) => {}
        }

        self.read(ctx, &desired.id, identifier).await.map_err(fail)
    }

    pub async fn delete(&self, ctx: &Context, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let fail = |e: ProviderError| {
            e.during(Operation::Delete)
                .with_identifier(identifier)
                .for_resource(id.clone())
        };

        let keys = self.decode(identifier).map_err(fail)?;
        debug!("Deleting {} {}", id, identifier);

        match ctx.run(self.remote.remove(ctx, &keys)).await {
            Err(interrupted) => Err(fail(interrupted.into())),
            Ok(Err(e)) if e.is_not_found() => {
                debug!("{} {} already gone", id, identifier);
                Ok(())
            }
            Ok(Err(e)) => Err(fail(e.into())),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Import is Read with a caller-supplied identifier
    pub async fn import(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        self.read(ctx, id, identifier).await.map_err(|mut e| {
            e.operation = Some(Operation::Import);
            e
        })
    }
}

/// A write that hits not-found is still a rejected write
fn rejected_on_write(err: ProviderError) -> ProviderError {
    if err.kind == ErrorKind::RemoteNotFound {
        ProviderError {
            kind: ErrorKind::RemoteRejected,
            ..err
        }
    } else {
        err
    }
}

impl<R: RemoteResource> ResourceReconciler for Reconciler<R> {
    fn resource_type(&self) -> &str {
        Reconciler::resource_type(self)
    }

    fn schema(&self) -> &ResourceSchema {
        self.remote.schema()
    }

    fn create<'a>(&'a self, ctx: &'a Context, desired: &'a Resource) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(Reconciler::create(self, ctx, desired))
    }

    fn read<'a>(
        &'a self,
        ctx: &'a Context,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(Reconciler::read(self, ctx, id, identifier))
    }

    fn update<'a>(
        &'a self,
        ctx: &'a Context,
        identifier: &'a str,
        previous: &'a State,
        desired: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(Reconciler::update(self, ctx, identifier, previous, desired))
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a Context,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(Reconciler::delete(self, ctx, id, identifier))
    }

    fn import<'a>(
        &'a self,
        ctx: &'a Context,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(Reconciler::import(self, ctx, id, identifier))
    }
}
