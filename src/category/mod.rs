//! Categories for grouping transactions.

mod db;
mod domain;

pub(crate) use db::map_category_row_with_offset;
pub use db::{
    create_categories, create_category, create_category_table, get_categories_by_titles,
    get_category_by_title,
};
pub use domain::{Category, CategoryTitle};

#[cfg(test)]
pub use db::get_category;
