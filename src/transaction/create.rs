//! Creates single transactions while keeping the balance from going negative.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    category::{CategoryTitle, create_category, get_category_by_title},
    db::lock_connection,
    transaction::{
        Transaction, TransactionType, balance::get_balance, core::insert_transaction,
    },
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    /// Text detailing the transaction.
    pub title: String,
    /// Either "income" or "outcome", validated by [create_transaction].
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// The value of the transaction.
    pub value: f64,
    /// The title of the category, created if it does not exist yet.
    pub category: String,
}

/// Validate and save a single transaction.
///
/// Outcomes are only accepted if the balance total stays at or above zero.
/// The balance check, the category lookup/creation and the insert run in one
/// immediate SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransactionType] if the type is not exactly "income" or "outcome",
/// - [Error::EmptyTransactionTitle] if the title is blank,
/// - [Error::InvalidTransactionValue] if the value is negative or not finite,
/// - [Error::EmptyCategoryTitle] if the category title is blank,
/// - [Error::InsufficientFunds] if an outcome would take the total below zero,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    request: CreateTransactionRequest,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction_type: TransactionType = request.transaction_type.parse()?;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(Error::EmptyTransactionTitle);
    }

    if !request.value.is_finite() || request.value < 0.0 {
        return Err(Error::InvalidTransactionValue(request.value));
    }

    let category_title = CategoryTitle::new(&request.category)?;

    let tx = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    if transaction_type == TransactionType::Outcome {
        let balance = get_balance(&tx)?;

        if balance.total - request.value < 0.0 {
            tracing::debug!(
                "Rejected outcome of {} with a balance total of {}",
                request.value,
                balance.total
            );
            return Err(Error::InsufficientFunds);
        }
    }

    let category = match get_category_by_title(&category_title, &tx)? {
        Some(category) => category,
        None => create_category(category_title, &tx)?,
    };

    let transaction = insert_transaction(
        Transaction::build(title, transaction_type, request.value, category),
        &tx,
    )?;

    tx.commit()?;

    Ok(transaction)
}

/// A route handler for creating a new transaction, responds with the saved transaction.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(request, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}
