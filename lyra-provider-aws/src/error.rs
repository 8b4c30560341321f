//! Classification of AWS SDK errors into remote errors
//!
//! Every SDK operation error is classified exactly once, here, using the
//! modeled `ResourceNotFoundException` of the operation.

use aws_sdk_cognitoidentity::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use lyra_core::provider::RemoteError;

/// Classify an SDK error. `is_not_found` inspects the modeled service error.
pub(crate) fn classify<E, R>(err: SdkError<E, R>, is_not_found: fn(&E) -> bool) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let not_found = err.as_service_error().is_some_and(is_not_found);
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    remote_error(not_found, code, message, Box::new(err))
}

fn remote_error(
    not_found: bool,
    code: Option<String>,
    message: String,
    source: Box<dyn std::error::Error + Send + Sync>,
) -> RemoteError {
    if not_found {
        return RemoteError::not_found(message);
    }
    RemoteError::Rejected {
        code: code.unwrap_or_else(|| "RequestFailed".to_string()),
        message,
        source: Some(source),
    }
}
