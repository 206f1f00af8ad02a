//! Database operations for categories.

use rusqlite::{Connection, Row, params_from_iter};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    category::{Category, CategoryTitle},
};

/// Create a category and return it with its generated ID and timestamps.
pub fn create_category(title: CategoryTitle, connection: &Connection) -> Result<Category, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO category (id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, title, created_at, updated_at",
        )?
        .query_row((Uuid::new_v4(), title.as_ref(), now, now), map_row)
        .map_err(|error| error.into())
}

/// Create many categories, one per title, in the order given.
///
/// Titles are inserted as-is, deduplicating them is up to the caller.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
pub fn create_categories(
    titles: Vec<CategoryTitle>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let now = OffsetDateTime::now_utc();

    let mut stmt = connection.prepare(
        "INSERT INTO category (id, title, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, title, created_at, updated_at",
    )?;

    let mut categories = Vec::with_capacity(titles.len());

    for title in titles {
        let category = stmt.query_row((Uuid::new_v4(), title.as_ref(), now, now), map_row)?;
        categories.push(category);
    }

    Ok(categories)
}

/// Retrieve a single category by ID.
#[cfg(test)]
pub fn get_category(
    category_id: crate::database_id::CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, title, created_at, updated_at FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Find the first category whose title exactly matches `title`.
///
/// Returns `Ok(None)` if there is no such category.
pub fn get_category_by_title(
    title: &CategoryTitle,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    let result = connection
        .prepare(
            "SELECT id, title, created_at, updated_at FROM category
             WHERE title = :title ORDER BY created_at ASC LIMIT 1;",
        )?
        .query_row(&[(":title", title.as_ref())], map_row);

    match result {
        Ok(category) => Ok(Some(category)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// The most titles bound to a single `IN (...)` query, well under SQLite's variable limit.
const MAX_TITLES_PER_QUERY: usize = 500;

/// Retrieve every category whose title is one of `titles`.
///
/// Long lists of titles are looked up in several queries.
pub fn get_categories_by_titles(
    titles: &[CategoryTitle],
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let mut categories = Vec::new();

    for chunk in titles.chunks(MAX_TITLES_PER_QUERY) {
        let placeholders = (1..=chunk.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT id, title, created_at, updated_at FROM category WHERE title IN ({placeholders});"
        );
        let params = params_from_iter(chunk.iter().map(|title| title.as_ref()));

        for category in connection.prepare(&query)?.query_map(params, map_row)? {
            categories.push(category?);
        }
    }

    Ok(categories)
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id BLOB PRIMARY KEY,
            title TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_title ON category(title);",
    )?;

    Ok(())
}

/// Map a database row to a category, starting at column `offset`.
pub(crate) fn map_category_row_with_offset(
    row: &Row,
    offset: usize,
) -> Result<Category, rusqlite::Error> {
    let id = row.get(offset)?;
    let raw_title: String = row.get(offset + 1)?;
    let title = CategoryTitle::new_unchecked(&raw_title);
    let created_at = row.get(offset + 2)?;
    let updated_at = row.get(offset + 3)?;

    Ok(Category {
        id,
        title,
        created_at,
        updated_at,
    })
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    map_category_row_with_offset(row, 0)
}

#[cfg(test)]
mod category_query_tests {
    use std::collections::HashSet;

    use rusqlite::Connection;
    use uuid::Uuid;

    use crate::{
        Error,
        category::{
            CategoryTitle, create_categories, create_category, get_categories_by_titles,
            get_category, get_category_by_title,
        },
    };

    use super::create_category_table;

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_db_connection();
        let title = CategoryTitle::new("Categorically a category").unwrap();

        let category = create_category(title.clone(), &connection);

        let got_category = category.expect("Could not create category");
        assert!(!got_category.id.is_nil());
        assert_eq!(got_category.title, title);
    }

    #[test]
    fn get_category_succeeds() {
        let connection = get_test_db_connection();
        let inserted = create_category(CategoryTitle::new_unchecked("Foo"), &connection)
            .expect("Could not create test category");

        let selected = get_category(inserted.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_db_connection();
        create_category(CategoryTitle::new_unchecked("Foo"), &connection)
            .expect("Could not create test category");

        let selected = get_category(Uuid::new_v4(), &connection);

        assert_eq!(selected, Err(Error::NotFound));
    }

    #[test]
    fn get_category_by_title_finds_exact_match() {
        let connection = get_test_db_connection();
        let inserted = create_category(CategoryTitle::new_unchecked("Food"), &connection)
            .expect("Could not create test category");
        create_category(CategoryTitle::new_unchecked("Rent"), &connection)
            .expect("Could not create test category");

        let found = get_category_by_title(&CategoryTitle::new_unchecked("Food"), &connection)
            .expect("Could not query category");

        assert_eq!(found, Some(inserted));
    }

    #[test]
    fn get_category_by_title_returns_none_when_absent() {
        let connection = get_test_db_connection();
        create_category(CategoryTitle::new_unchecked("Food"), &connection)
            .expect("Could not create test category");

        let found = get_category_by_title(&CategoryTitle::new_unchecked("food"), &connection)
            .expect("Could not query category");

        assert_eq!(found, None);
    }

    #[test]
    fn create_categories_inserts_all_in_order() {
        let connection = get_test_db_connection();
        let titles = vec![
            CategoryTitle::new_unchecked("Work"),
            CategoryTitle::new_unchecked("Housing"),
        ];

        let categories =
            create_categories(titles.clone(), &connection).expect("Could not create categories");

        let got_titles: Vec<_> = categories.into_iter().map(|c| c.title).collect();
        assert_eq!(got_titles, titles);
    }

    #[test]
    fn get_categories_by_titles_returns_only_matches() {
        let connection = get_test_db_connection();
        let inserted = create_categories(
            vec![
                CategoryTitle::new_unchecked("Work"),
                CategoryTitle::new_unchecked("Housing"),
                CategoryTitle::new_unchecked("Fun"),
            ],
            &connection,
        )
        .expect("Could not create categories");

        let found = get_categories_by_titles(
            &[
                CategoryTitle::new_unchecked("Work"),
                CategoryTitle::new_unchecked("Fun"),
                CategoryTitle::new_unchecked("Travel"),
            ],
            &connection,
        )
        .expect("Could not query categories");

        let want = HashSet::from([inserted[0].clone(), inserted[2].clone()]);
        assert_eq!(HashSet::from_iter(found), want);
    }

    #[test]
    fn get_categories_by_titles_with_no_titles_is_empty() {
        let connection = get_test_db_connection();

        let found = get_categories_by_titles(&[], &connection).expect("Could not query");

        assert!(found.is_empty());
    }

    #[test]
    fn get_categories_by_titles_beyond_sqlite_variable_limit() {
        let connection = get_test_db_connection();
        let first = create_category(CategoryTitle::new_unchecked("Title 0"), &connection)
            .expect("Could not create category");
        let last = create_category(CategoryTitle::new_unchecked("Title 32999"), &connection)
            .expect("Could not create category");
        let titles: Vec<CategoryTitle> = (0..33_000)
            .map(|index| CategoryTitle::new_unchecked(&format!("Title {index}")))
            .collect();

        let found = get_categories_by_titles(&titles, &connection)
            .expect("Could not query categories");

        assert_eq!(HashSet::from_iter(found), HashSet::from([first, last]));
    }
}
