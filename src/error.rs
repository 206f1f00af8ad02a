//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The transaction type was something other than "income" or "outcome".
    #[error("invalid type \"{0}\" for this transaction, expected \"income\" or \"outcome\"")]
    InvalidTransactionType(String),

    /// An empty string was used as a transaction title.
    #[error("transaction title cannot be empty")]
    EmptyTransactionTitle,

    /// A transaction value was negative, NaN or infinite.
    #[error("transaction value must be a non-negative number, got {0}")]
    InvalidTransactionValue(f64),

    /// An empty string was used as a category title.
    #[error("category title cannot be empty")]
    EmptyCategoryTitle,

    /// An outcome would have taken the balance total below zero.
    #[error("insufficient funds to perform this transaction")]
    InsufficientFunds,

    /// The transaction ID is not a valid UUID.
    #[error("transaction ID \"{0}\" is invalid")]
    InvalidTransactionId(String),

    /// The database rejected the delete statement.
    #[error("transaction cannot be deleted")]
    DeleteFailed,

    /// Tried to delete a transaction that does not exist.
    #[error("transaction cannot be found")]
    DeleteMissingTransaction,

    /// The CSV file could not be parsed as a list of transactions.
    #[error("wrong file format: {0}")]
    InvalidCSV(String),

    /// An imported row referred to a category that could not be resolved.
    #[error("could not resolve the category \"{0}\" for an imported transaction")]
    MissingCategory(String),

    /// The multipart form did not contain a usable CSV file.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A file could not be written to or read from disk.
    ///
    /// Holds the original error as a string.
    #[error("an IO error occurred: {0}")]
    IoError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidTransactionType(_)
            | Error::EmptyTransactionTitle
            | Error::InvalidTransactionValue(_)
            | Error::EmptyCategoryTitle
            | Error::InsufficientFunds
            | Error::InvalidTransactionId(_)
            | Error::DeleteFailed
            | Error::DeleteMissingTransaction
            | Error::InvalidCSV(_)
            | Error::MissingCategory(_)
            | Error::MultipartError(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::SqlError(_) | Error::DatabaseLockError | Error::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Always "error".
    pub status: String,
    /// A description of what went wrong.
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal details are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (
            status_code,
            Json(ErrorBody {
                status: "error".to_owned(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{body, http::StatusCode, response::IntoResponse};

    use super::{Error, ErrorBody};

    async fn into_error_body(error: Error) -> (StatusCode, ErrorBody) {
        let response = error.into_response();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not read response body");
        let body = serde_json::from_slice(&bytes).expect("Could not parse error body");

        (status, body)
    }

    #[tokio::test]
    async fn domain_errors_are_bad_requests_with_message() {
        let (status, body) = into_error_body(Error::InsufficientFunds).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, "error");
        assert_eq!(body.message, "insufficient funds to perform this transaction");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = into_error_body(Error::IoError("disk on fire".to_owned())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("disk on fire"));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }
}
