//! Lists every transaction together with the current balance.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    db::lock_connection,
    transaction::{
        Transaction,
        balance::{Balance, get_balance},
        core::get_all_transactions,
    },
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct TransactionsState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The response body for the transactions listing.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionsWithBalance {
    /// Every transaction, oldest first.
    pub transactions: Vec<Transaction>,
    /// The balance over `transactions`.
    pub balance: Balance,
}

/// A route handler that responds with all transactions and the balance.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionsState>,
) -> Result<Json<TransactionsWithBalance>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transactions = get_all_transactions(&connection)?;
    let balance = get_balance(&connection)?;

    Ok(Json(TransactionsWithBalance {
        transactions,
        balance,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        transaction::{
            balance::Balance,
            create::{CreateTransactionRequest, create_transaction},
        },
    };

    use super::{TransactionsState, get_transactions_endpoint};

    #[tokio::test]
    async fn lists_transactions_with_balance() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        for (title, transaction_type, value) in
            [("Salary", "income", 300.0), ("Groceries", "outcome", 120.0)]
        {
            create_transaction(
                CreateTransactionRequest {
                    title: title.to_owned(),
                    transaction_type: transaction_type.to_owned(),
                    value,
                    category: "Misc".to_owned(),
                },
                &conn,
            )
            .unwrap();
        }
        let state = TransactionsState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = get_transactions_endpoint(State(state))
            .await
            .expect("Could not list transactions");

        assert_eq!(response.0.transactions.len(), 2);
        assert_eq!(response.0.transactions[0].title, "Salary");
        assert_eq!(
            response.0.balance,
            Balance {
                income: 300.0,
                outcome: 120.0,
                total: 180.0
            }
        );
    }
}
