//! Provider - Trait abstracting resource operations
//!
//! A Provider is the host engine's view of a vendor API: it exposes
//! Create/Read/Update/Delete/Import for every resource type it manages and
//! reports failures through one error taxonomy.

use std::future::Future;
use std::pin::Pin;

use crate::context::{Context, Interrupted};
use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Lifecycle operation, recorded on errors for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
        };
        write!(f, "{}", name)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Identifier string does not decode; never retried
    MalformedIdentifier,
    /// Vendor call failed with anything other than not-found
    RemoteRejected,
    /// Vendor reported the resource missing where it must exist
    RemoteNotFound,
    /// Caller cancelled or the deadline passed
    OperationCancelled,
    /// Desired attributes failed schema validation
    InvalidAttributes,
    /// A force-new attribute changed; the resource must be replaced
    RequiresReplacement,
    /// No reconciler is registered for the resource type
    UnknownResourceType,
}

/// Failure reported by a vendor SDK binding, classified once at the boundary
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("{code}: {message}")]
    Rejected {
        code: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RemoteError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub operation: Option<Operation>,
    pub resource_id: Option<ResourceId>,
    pub identifier: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] ", id)?;
        }
        match (self.operation, &self.identifier) {
            (Some(op), Some(identifier)) => write!(f, "{} {}: ", op, identifier)?,
            (Some(op), None) => write!(f, "{}: ", op)?,
            (None, Some(identifier)) => write!(f, "{}: ", identifier)?,
            (None, None) => {}
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            resource_id: None,
            identifier: None,
            cause: None,
        }
    }

    pub fn malformed_identifier(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(ErrorKind::MalformedIdentifier, cause.to_string()).with_cause(cause)
    }

    pub fn invalid_attributes(errors: &[TypeError]) -> Self {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(ErrorKind::InvalidAttributes, message)
    }

    pub fn requires_replacement(attributes: &[String]) -> Self {
        Self::new(
            ErrorKind::RequiresReplacement,
            format!(
                "changing {} requires replacing the resource",
                attributes.join(", ")
            ),
        )
    }

    pub fn unknown_resource_type(resource_type: &str) -> Self {
        Self::new(
            ErrorKind::UnknownResourceType,
            format!("Unknown resource type: {}", resource_type),
        )
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn during(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// RemoteRejected and RemoteNotFound both mean the vendor refused the call
    pub fn is_remote_rejected(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RemoteRejected | ErrorKind::RemoteNotFound
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::OperationCancelled
    }
}

impl From<RemoteError> for ProviderError {
    fn from(err: RemoteError) -> Self {
        let kind = if err.is_not_found() {
            ErrorKind::RemoteNotFound
        } else {
            ErrorKind::RemoteRejected
        };
        Self::new(kind, err.to_string()).with_cause(err)
    }
}

impl From<Interrupted> for ProviderError {
    fn from(reason: Interrupted) -> Self {
        Self::new(ErrorKind::OperationCancelled, reason.to_string())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main Provider trait
///
/// The host engine drives every managed resource through these operations.
/// All of them are async and take the caller's [`Context`], which is passed
/// through unmodified to the vendor calls.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Schemas of every resource type this Provider can handle
    fn schemas(&self) -> Vec<ResourceSchema>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the remote resource no longer exists.
    fn read(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the composite identifier
    fn create(&self, ctx: &Context, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource; deleting a missing resource succeeds
    fn delete(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Adopt an existing remote resource by its raw identifier; behaves like `read`
    fn import(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        (**self).schemas()
    }

    fn read(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(ctx, id, identifier)
    }

    fn create(&self, ctx: &Context, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(ctx, resource)
    }

    fn update(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(ctx, id, identifier, from, to)
    }

    fn delete(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(ctx, id, identifier)
    }

    fn import(
        &self,
        ctx: &Context,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(ctx, id, identifier)
    }
}
