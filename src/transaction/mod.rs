//! Transaction management for the bookkeeping service.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and deleting transactions
//! - The balance over all transactions
//! - The create, delete, import and listing handlers and their routes

mod balance;
mod core;
mod create;
mod delete;
mod import;
mod list;

pub use balance::Balance;
pub use core::{Transaction, TransactionType, create_transaction_table};
pub use create::create_transaction_endpoint;
pub use delete::delete_transaction_endpoint;
pub use import::{CsvTransaction, import_transactions_endpoint, import_transactions_from_file};
pub use list::{TransactionsWithBalance, get_transactions_endpoint};

#[cfg(test)]
pub use core::{
    count_transactions, delete_transaction_row, get_all_transactions, get_transaction,
    insert_transaction, insert_transactions,
};
