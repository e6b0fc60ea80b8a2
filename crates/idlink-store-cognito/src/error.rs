//! Mapping of Cognito SDK failures onto directory errors.

use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use idlink_core::DirectoryError;
use std::error::Error;
use std::fmt::Debug;

/// Convert an SDK failure of `operation` into a [`DirectoryError`].
///
/// Service errors keep their code and message so that link conflicts can be
/// recognised; everything else (dispatch, timeouts, credentials) is a transport error.
pub fn classify<E, R>(operation: &'static str, err: SdkError<E, R>) -> DirectoryError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    if let SdkError::ServiceError(service) = &err {
        let inner = service.err();
        return DirectoryError::from_service(
            operation,
            inner.code().unwrap_or("Unknown"),
            inner.message().unwrap_or_default(),
        );
    }
    DirectoryError::Transport {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}
