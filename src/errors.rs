// src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::json;

/// Normalized error taxonomy for every data-mutating action.
///
/// Store-specific failures are converted into one of these variants before
/// they reach a handler, so the HTTP layer and the clients only ever see a
/// stable set of user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Requested record was not found")]
    NotFound,
    #[error("You do not have permission to perform this action")]
    PermissionDenied,
    #[error("A record with the same identity already exists")]
    AlreadyExists,
    #[error("Too many requests, please try again later")]
    ResourceExhausted,
    #[error("Operation rejected, the system is not in the required state")]
    FailedPrecondition,
    #[error("Operation was aborted due to a conflict")]
    Aborted,
    #[error("A supplied value is outside the permitted range")]
    OutOfRange,
    #[error("Operation is not implemented")]
    Unimplemented,
    #[error("Internal storage error")]
    Internal,
    #[error("Service is currently unavailable")]
    Unavailable,
    #[error("Unrecoverable data loss or corruption")]
    DataLoss,
    #[error("You must be signed in to perform this action")]
    Unauthenticated,
    #[error("Unknown storage error")]
    Unknown,
    #[error("{0}")]
    Validation(String),
}

impl ActionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ActionError::Validation(msg.into())
    }
}

impl From<mongodb::error::Error> for ActionError {
    fn from(err: mongodb::error::Error) -> Self {
        error!("store error: {}", err);
        match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref write_err))
                if write_err.code == 11000 =>
            {
                ActionError::AlreadyExists
            }
            ErrorKind::Command(ref command_err) => match command_err.code {
                11000 | 11001 => ActionError::AlreadyExists,
                13 => ActionError::PermissionDenied,
                18 => ActionError::Unauthenticated,
                26 => ActionError::NotFound,
                _ => ActionError::Internal,
            },
            ErrorKind::Authentication { .. } => ActionError::Unauthenticated,
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => ActionError::Unavailable,
            ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
                ActionError::Internal
            }
            _ => ActionError::Unknown,
        }
    }
}

impl From<mongodb::bson::ser::Error> for ActionError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        error!("document encode error: {}", err);
        ActionError::Internal
    }
}

impl From<mongodb::bson::de::Error> for ActionError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        error!("document decode error: {}", err);
        ActionError::Internal
    }
}

impl ResponseError for ActionError {
    fn status_code(&self) -> StatusCode {
        match self {
            ActionError::NotFound => StatusCode::NOT_FOUND,
            ActionError::PermissionDenied => StatusCode::FORBIDDEN,
            ActionError::AlreadyExists | ActionError::Aborted => StatusCode::CONFLICT,
            ActionError::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            ActionError::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            ActionError::OutOfRange | ActionError::Validation(_) => StatusCode::BAD_REQUEST,
            ActionError::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            ActionError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ActionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ActionError::Internal | ActionError::DataLoss | ActionError::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
