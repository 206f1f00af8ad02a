//! Computes the running balance from the stored transactions.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The sum of all incomes and outcomes, and their difference.
///
/// Derived on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// The sum of the values of all income transactions.
    pub income: f64,
    /// The sum of the values of all outcome transactions.
    pub outcome: f64,
    /// `income - outcome`.
    pub total: f64,
}

/// Compute the balance over every transaction in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_balance(connection: &Connection) -> Result<Balance, Error> {
    let (income, outcome): (f64, f64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type = 'income' THEN value END), 0.0),
            COALESCE(SUM(CASE WHEN type = 'outcome' THEN value END), 0.0)
         FROM \"transaction\";",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Balance {
        income,
        outcome,
        total: income - outcome,
    })
}
