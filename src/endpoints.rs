//! The API endpoints URIs.

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to delete a transaction.
pub const DELETE_TRANSACTION: &str = "/transactions/{transaction_id}";
/// The route to import transactions from a CSV file.
pub const IMPORT_TRANSACTIONS: &str = "/transactions/import";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// Assumes that the parameter is enclosed in braces, e.g. `{transaction_id}`
/// and that there is only one parameter.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: impl std::fmt::Display) -> String {
    match (endpoint_path.find('{'), endpoint_path.find('}')) {
        (Some(start), Some(end)) if start < end => format!(
            "{}{id}{}",
            &endpoint_path[..start],
            &endpoint_path[end + 1..]
        ),
        _ => endpoint_path.to_owned(),
    }
}
