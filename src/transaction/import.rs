//! Bulk imports transactions from CSV files.
//!
//! The expected format is a header row followed by rows with the columns
//! `title,type,value,category`. Every field is trimmed and rows with an empty
//! field are skipped.

use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Multipart, State},
    http::StatusCode,
};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use uuid::Uuid;

use crate::{
    AppState, Error,
    category::{Category, CategoryTitle, create_categories, get_categories_by_titles},
    db::lock_connection,
    transaction::{Transaction, TransactionType, core::insert_transactions},
};

/// The number of columns read from each CSV row.
const COLUMN_COUNT: usize = 4;

/// The name of the multipart form field that holds the CSV file.
const FILE_FIELD: &str = "file";

/// A transaction read from one CSV row, before its category is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTransaction {
    /// The first column.
    pub title: String,
    /// The second column, "income" or "outcome".
    pub transaction_type: TransactionType,
    /// The third column, a non-negative number.
    pub value: f64,
    /// The fourth column.
    pub category: CategoryTitle,
}

/// Parses CSV data with a header row and the columns `title,type,value,category`.
///
/// The data is read row by row from `reader`. The first row is treated as a
/// header and its contents are ignored. Rows where any of the four fields is
/// empty after trimming are skipped, and extra trailing fields are ignored.
///
/// An empty document yields no transactions.
///
/// # Errors
/// Returns [Error::InvalidCSV] with the reason and line number if the data
/// is not valid UTF-8 CSV, a type is not "income" or "outcome", or a value is
/// not a non-negative number.
pub fn parse_transactions_csv<R: Read>(reader: R) -> Result<Vec<CsvTransaction>, Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // The header's contents are ignored, but it must still be readable CSV.
    csv_reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?;

    let mut transactions = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|error| Error::InvalidCSV(error.to_string()))?;
        let line = record.position().map_or(0, |position| position.line());

        let [title, raw_type, raw_value, category]: [&str; COLUMN_COUNT] =
            [0, 1, 2, 3].map(|column| record.get(column).unwrap_or_default());

        if title.is_empty() || raw_type.is_empty() || raw_value.is_empty() || category.is_empty()
        {
            tracing::debug!("Skipping line {line} because it has an empty field: {record:?}");
            continue;
        }

        let transaction_type = raw_type.parse::<TransactionType>().map_err(|_| {
            Error::InvalidCSV(format!(
                "line {line}: \"{raw_type}\" is not a valid type, expected \"income\" or \"outcome\""
            ))
        })?;

        let value = raw_value
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .ok_or_else(|| {
                Error::InvalidCSV(format!(
                    "line {line}: \"{raw_value}\" is not a non-negative number"
                ))
            })?;

        transactions.push(CsvTransaction {
            title: title.to_owned(),
            transaction_type,
            value,
            category: CategoryTitle::new_unchecked(category),
        });
    }

    Ok(transactions)
}

/// Save parsed CSV rows, creating any categories that do not exist yet.
///
/// Categories are matched on their exact title. Each missing title is created
/// once no matter how many rows use it. Categories and transactions are saved
/// in one immediate SQL transaction, so a failure leaves no new categories
/// behind.
///
/// Returns the saved transactions in the order of `rows`.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingCategory] if a row's category cannot be resolved,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn save_imported_transactions(
    rows: Vec<CsvTransaction>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let tx = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let titles: Vec<CategoryTitle> = {
        let mut seen = HashSet::new();

        rows.iter()
            .map(|row| &row.category)
            .filter(|title| seen.insert(*title))
            .cloned()
            .collect()
    };

    let existing_categories = get_categories_by_titles(&titles, &tx)?;

    let new_titles: Vec<CategoryTitle> = {
        let existing_titles: HashSet<&CategoryTitle> = existing_categories
            .iter()
            .map(|category| &category.title)
            .collect();

        titles
            .into_iter()
            .filter(|title| !existing_titles.contains(title))
            .collect()
    };

    let new_categories = create_categories(new_titles, &tx)?;
    tracing::debug!(
        "Created {} new categories, reusing {}",
        new_categories.len(),
        existing_categories.len()
    );

    let mut category_pool: HashMap<CategoryTitle, Category> = HashMap::new();
    for category in new_categories.into_iter().chain(existing_categories) {
        category_pool
            .entry(category.title.clone())
            .or_insert(category);
    }

    let builders = rows
        .into_iter()
        .map(|row| {
            let category = category_pool
                .get(&row.category)
                .cloned()
                .ok_or_else(|| Error::MissingCategory(row.category.to_string()))?;

            Ok(Transaction::build(
                &row.title,
                row.transaction_type,
                row.value,
                category,
            ))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let transactions = insert_transactions(builders, &tx)?;

    tx.commit()?;

    Ok(transactions)
}

/// Import every transaction in the CSV file at `path`, then remove the file.
///
/// The file is removed whether or not the import succeeds. Failing to remove
/// it is logged and does not change the result.
///
/// # Errors
/// This function will return a:
/// - [Error::IoError] if the file cannot be opened,
/// - [Error::InvalidCSV] if the file is not in the expected format,
/// - or any error from [save_imported_transactions].
pub fn import_transactions_from_file(
    path: &Path,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let result = read_and_save(path, connection);

    if let Err(error) = fs::remove_file(path) {
        tracing::warn!("Could not remove imported file {}: {error}", path.display());
    }

    result
}

fn read_and_save(path: &Path, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let start_time = std::time::Instant::now();

    let file = File::open(path).map_err(|error| {
        tracing::error!("Could not open {}: {error}", path.display());
        Error::IoError(error.to_string())
    })?;

    let rows = parse_transactions_csv(file)
        .inspect_err(|error| tracing::debug!("Failed to parse {}: {error}", path.display()))?;

    let transactions = save_imported_transactions(rows, connection)?;

    tracing::info!(
        "Imported {} transactions from {} in {}ms",
        transactions.len(),
        path.display(),
        start_time.elapsed().as_millis()
    );

    Ok(transactions)
}

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where uploaded files are written before they are imported.
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// Route handler for importing transactions from an uploaded CSV file.
///
/// The file is read from the multipart field named `file`, written to the
/// upload directory and then imported. Responds with the saved transactions.
pub async fn import_transactions_endpoint(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Transaction>>), Error> {
    let path = save_upload(&mut multipart, &state.upload_dir).await?;

    let connection = lock_connection(&state.db_connection).inspect_err(|_| {
        if let Err(error) = fs::remove_file(&path) {
            tracing::warn!("Could not remove uploaded file {}: {error}", path.display());
        }
    })?;
    let transactions = import_transactions_from_file(&path, &connection)?;

    Ok((StatusCode::CREATED, Json(transactions)))
}

async fn save_upload(multipart: &mut Multipart, upload_dir: &Path) -> Result<PathBuf, Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("<unnamed>").to_owned();
        let data = field.bytes().await.map_err(|error| {
            tracing::error!("Could not read data from multipart form field: {error}");
            Error::MultipartError(error.to_string())
        })?;

        tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

        let path = upload_dir.join(format!("{}.csv", Uuid::new_v4()));
        tokio::fs::write(&path, &data).await.map_err(|error| {
            tracing::error!("Could not write upload to {}: {error}", path.display());
            Error::IoError(error.to_string())
        })?;

        return Ok(path);
    }

    Err(Error::MultipartError(format!(
        "the form has no field named \"{FILE_FIELD}\""
    )))
}


#[cfg(test)]
mod import_tests {
    use std::{io::Write, path::PathBuf};

    use rusqlite::Connection;
    use tempfile::TempDir;

    use crate::{
        Error,
        category::{CategoryTitle, create_category, get_categories_by_titles},
        db::initialize,
        transaction::{TransactionType, count_transactions, get_all_transactions},
    };

    use super::{CsvTransaction, import_transactions_from_file, save_imported_transactions};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn must_write_file(dir: &TempDir, contents: &[u8]) -> PathBuf {
        let path = dir.path().join("import.csv");
        let mut file = std::fs::File::create(&path).expect("Could not create test file");
        file.write_all(contents).expect("Could not write test file");
        path
    }

    fn count_categories(conn: &Connection) -> usize {
        conn.query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn imports_rows_and_creates_categories() {
        let conn = get_test_connection();
        let dir = TempDir::new().unwrap();
        let path = must_write_file(
            &dir,
            b"title,type,value,category\nSalary,income,5000,Work\nRent,outcome,1200,Housing\n",
        );

        let imported = import_transactions_from_file(&path, &conn).expect("Could not import");

        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].title, "Salary");
        assert_eq!(imported[0].category.title.as_ref(), "Work");
        assert_eq!(imported[1].title, "Rent");
        assert_eq!(imported[1].transaction_type, TransactionType::Outcome);
        assert_eq!(imported[1].category.title.as_ref(), "Housing");
        assert_eq!(count_categories(&conn), 2);
        assert_eq!(get_all_transactions(&conn).unwrap(), imported);
        assert!(!path.exists(), "want the imported file to be removed");
    }

    #[test]
    fn drops_rows_with_empty_cells() {
        let conn = get_test_connection();
        let dir = TempDir::new().unwrap();
        let path = must_write_file(
            &dir,
            b"title,type,value,category\nSalary,income,5000,Work\nCoffee,outcome,,Food\n",
        );

        let imported = import_transactions_from_file(&path, &conn).expect("Could not import");

        assert_eq!(imported.len(), 1);
        assert_eq!(count_transactions(&conn), Ok(1));
    }

    #[test]
    fn reuses_existing_category() {
        let conn = get_test_connection();
        let existing = create_category(CategoryTitle::new_unchecked("Work"), &conn).unwrap();
        let dir = TempDir::new().unwrap();
        let path = must_write_file(
            &dir,
            b"title,type,value,category\nSalary,income,5000,Work\nBonus,income,100,Work\n",
        );

        let imported = import_transactions_from_file(&path, &conn).expect("Could not import");

        assert_eq!(imported[0].category, existing);
        assert_eq!(imported[1].category, existing);
        assert_eq!(count_categories(&conn), 1);
    }

    #[test]
    fn creates_each_new_category_once() {
        let conn = get_test_connection();
        let dir = TempDir::new().unwrap();
        let path = must_write_file(
            &dir,
            b"title,type,value,category\n\
            Lunch,outcome,10,Food\n\
            Dinner,outcome,20,Food\n\
            Salary,income,100,Work\n\
            Snack,outcome,2,Food\n",
        );

        let imported = import_transactions_from_file(&path, &conn).expect("Could not import");

        assert_eq!(imported.len(), 4);
        assert_eq!(count_categories(&conn), 2);
        let food = get_categories_by_titles(&[CategoryTitle::new_unchecked("Food")], &conn)
            .unwrap();
        assert_eq!(food.len(), 1);
        assert_eq!(imported[0].category, food[0]);
        assert_eq!(imported[3].category, food[0]);
    }

    #[test]
    fn skips_balance_check() {
        let conn = get_test_connection();
        let dir = TempDir::new().unwrap();
        let path = must_write_file(&dir, b"title,type,value,category\nRent,outcome,1200,Housing\n");

        let imported = import_transactions_from_file(&path, &conn);

        assert!(imported.is_ok());
    }

    #[test]
    fn binary_file_is_wrong_format_and_saves_nothing() {
        let conn = get_test_connection();
        let dir = TempDir::new().unwrap();
        let path = must_write_file(
            &dir,
            b"title,type,value,category\n\xff\xfe\xfd,\x00\x01,\x80\x81,\xc3\x28\n",
        );

        let result = import_transactions_from_file(&path, &conn);

        assert!(matches!(result, Err(Error::InvalidCSV(_))));
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_eq!(count_categories(&conn), 0);
        assert!(!path.exists(), "want the file to be removed after a failed import");
    }

    #[test]
    fn missing_file_is_io_error() {
        let conn = get_test_connection();
        let dir = TempDir::new().unwrap();

        let result = import_transactions_from_file(&dir.path().join("nope.csv"), &conn);

        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn failed_insert_rolls_back_new_categories() {
        let conn = get_test_connection();
        // Negative values pass the row struct but fail the table's check constraint.
        let rows = vec![
            CsvTransaction {
                title: "Salary".to_owned(),
                transaction_type: TransactionType::Income,
                value: 10.0,
                category: CategoryTitle::new_unchecked("Work"),
            },
            CsvTransaction {
                title: "Oops".to_owned(),
                transaction_type: TransactionType::Outcome,
                value: -1.0,
                category: CategoryTitle::new_unchecked("Mistakes"),
            },
        ];

        let result = save_imported_transactions(rows, &conn);

        assert!(matches!(result, Err(Error::SqlError(_))));
        assert_eq!(count_categories(&conn), 0);
        assert_eq!(count_transactions(&conn), Ok(0));
    }
}
