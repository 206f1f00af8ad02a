//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, Statement,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    category::{Category, map_category_row_with_offset},
    database_id::TransactionId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money that came in.
    Income,
    /// Money that went out.
    Outcome,
}

impl TransactionType {
    /// The canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Outcome => "outcome",
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    /// Only the exact strings "income" and "outcome" are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "outcome" => Ok(TransactionType::Outcome),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// An income or outcome, i.e. an event where money was either earned or spent.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub title: String,
    /// Whether the transaction was an income or an outcome.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money earned or spent, never negative.
    pub value: f64,
    /// The category the transaction belongs to.
    pub category: Category,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new, unsaved transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        title: &str,
        transaction_type: TransactionType,
        value: f64,
        category: Category,
    ) -> TransactionBuilder {
        TransactionBuilder {
            title: title.to_owned(),
            transaction_type,
            value,
            category,
        }
    }
}

/// A transaction that has not been saved to the database yet.
///
/// The ID and timestamps are assigned by [insert_transaction] and
/// [insert_transactions].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// A human-readable description of the transaction.
    pub title: String,

    /// Whether the transaction was an income or an outcome.
    pub transaction_type: TransactionType,

    /// The monetary amount of the transaction.
    ///
    /// The direction of the money is given by `transaction_type`, so this is
    /// always zero or positive.
    pub value: f64,

    /// The category of the transaction, e.g. "Groceries", "Salary", "Rent".
    ///
    /// The category must already exist in the database.
    pub category: Category,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const INSERT_TRANSACTION_SQL: &str = "INSERT INTO \"transaction\"
    (id, title, type, value, category_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    RETURNING id, title, type, value, created_at, updated_at";

const SELECT_TRANSACTION_SQL: &str = "SELECT
    t.id, t.title, t.type, t.value, t.created_at, t.updated_at,
    c.id, c.title, c.created_at, c.updated_at
    FROM \"transaction\" t
    INNER JOIN category c ON t.category_id = c.id";

/// Save a new transaction in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingCategory] if the builder's category is not in the database,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut stmt = connection.prepare(INSERT_TRANSACTION_SQL)?;

    insert_with_statement(&mut stmt, builder)
}

/// Save many transactions in the database, preparing the insert statement once.
///
/// Returns the saved transactions in the same order as `builders`.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// Stops at and returns the first error, see [insert_transaction].
pub fn insert_transactions(
    builders: Vec<TransactionBuilder>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut stmt = connection.prepare(INSERT_TRANSACTION_SQL)?;
    let mut transactions = Vec::with_capacity(builders.len());

    for builder in builders {
        transactions.push(insert_with_statement(&mut stmt, builder)?);
    }

    Ok(transactions)
}

fn insert_with_statement(
    stmt: &mut Statement,
    builder: TransactionBuilder,
) -> Result<Transaction, Error> {
    let now = OffsetDateTime::now_utc();
    let TransactionBuilder {
        title,
        transaction_type,
        value,
        category,
    } = builder;
    let category_id = category.id;
    let category_title = category.title.to_string();

    stmt.query_row(
        (
            Uuid::new_v4(),
            &title,
            transaction_type,
            value,
            category_id,
            now,
            now,
        ),
        move |row| {
            Ok(Transaction {
                id: row.get(0)?,
                title: row.get(1)?,
                transaction_type: row.get(2)?,
                value: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
                category,
            })
        },
    )
    .map_err(|error| match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::MissingCategory(category_title),
        error => error.into(),
    })
}

/// Retrieve a transaction and its category from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
#[cfg(test)]
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!("{SELECT_TRANSACTION_SQL} WHERE t.id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve every transaction with its category, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is a SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION_SQL} ORDER BY t.created_at ASC, t.rowid ASC"
        ))?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// The number of rows touched by a statement.
pub type RowsAffected = usize;

/// Delete the transaction with `id`, returning how many rows were removed (0 or 1).
///
/// The raw SQL error is returned so callers can decide how to report it.
pub fn delete_transaction_row(
    id: TransactionId,
    connection: &Connection,
) -> Result<RowsAffected, rusqlite::Error> {
    connection.execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// The category table must be created first.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'outcome')),
                value REAL NOT NULL CHECK (value >= 0),
                category_id BLOB NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
                );

        CREATE INDEX IF NOT EXISTS idx_transaction_type ON \"transaction\"(type);",
    )?;

    Ok(())
}

/// Map a database row from a transaction-category join to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let title = row.get(1)?;
    let transaction_type = row.get(2)?;
    let value = row.get(3)?;
    let created_at = row.get(4)?;
    let updated_at = row.get(5)?;
    let category = map_category_row_with_offset(row, 6)?;

    Ok(Transaction {
        id,
        title,
        transaction_type,
        value,
        category,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
