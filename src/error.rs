use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidSelection(String),

    #[error("malformed interval at line {line_number}: {content:?}")]
    MalformedInterval { line_number: usize, content: String },

    #[error("malformed variant record at line {line_number}: {reason}")]
    MalformedVariant { line_number: usize, reason: String },

    #[error("input not sorted: {0}")]
    Unsorted(String),

    #[error("file too large (limit {limit} bytes)")]
    FileTooLarge { limit: u64 },

    #[error("region queries timed out with {pending} of {total} still pending")]
    RegionTimeout { pending: usize, total: usize },

    #[error("filtering cancelled")]
    Cancelled,

    #[error("region query {slot} failed: {message}")]
    RegionQuery { slot: usize, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct VarsieveError {
    pub varsieve: VarsieveErrorBody,
}

#[derive(Debug, Serialize)]
pub struct VarsieveErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl Error {
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidSelection(_) => "InvalidSelection",
            Error::MalformedInterval { .. } => "MalformedInterval",
            Error::MalformedVariant { .. } => "MalformedVariant",
            Error::Unsorted(_) => "Unsorted",
            Error::FileTooLarge { .. } => "FileTooLarge",
            Error::RegionTimeout { .. } => "RegionTimeout",
            Error::Cancelled => "Cancelled",
            Error::RegionQuery { .. } => "RegionQuery",
            Error::NotFound(_) => "NotFound",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidSelection(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::MalformedInterval { .. }
            | Error::MalformedVariant { .. }
            | Error::Unsorted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::RegionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Cancelled
            | Error::RegionQuery { .. }
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = VarsieveError {
            varsieve: VarsieveErrorBody {
                error: self.error_type(),
                message: self.to_string(),
            },
        };
        (self.status_code(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::InvalidSelection("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::MalformedInterval {
                line_number: 3,
                content: "1\t100".into()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::FileTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Error::RegionTimeout {
                pending: 1,
                total: 4
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_malformed_interval_message() {
        let err = Error::MalformedInterval {
            line_number: 2,
            content: "1\t100".into(),
        };
        assert_eq!(err.to_string(), "malformed interval at line 2: \"1\\t100\"");
        assert_eq!(err.error_type(), "MalformedInterval");
    }
}
