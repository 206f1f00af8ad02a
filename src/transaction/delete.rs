use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{
    AppState, Error, db::lock_connection, transaction::core::delete_transaction_row,
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete the transaction whose ID is the UUID string `id`.
///
/// Returns `true` once the transaction has been removed.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransactionId] if `id` is not a UUID, before touching the database,
/// - [Error::DeleteFailed] if the database rejects the delete,
/// - or [Error::DeleteMissingTransaction] if there is no transaction with that ID.
pub fn delete_transaction(id: &str, connection: &Connection) -> Result<bool, Error> {
    let transaction_id =
        Uuid::try_parse(id).map_err(|_| Error::InvalidTransactionId(id.to_owned()))?;

    let rows_affected = delete_transaction_row(transaction_id, connection).map_err(|error| {
        tracing::error!("Could not delete transaction {transaction_id}: {error}");
        Error::DeleteFailed
    })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    tracing::info!("Deleted transaction {transaction_id}");

    Ok(true)
}

/// A route handler for deleting a transaction, responds with 204 No Content on success.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Path(transaction_id): Path<String>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(&transaction_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
