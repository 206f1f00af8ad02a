//! Database ID type definitions.

use uuid::Uuid;

/// Identifier of a transaction row, generated on insert.
pub type TransactionId = Uuid;

/// Identifier of a category row, generated on insert.
pub type CategoryId = Uuid;
