//! Persistent catalog of ingested books.
//!
//! The pipeline treats this crate as a collaborator: it asks "have I seen
//! this before?" ([`Repository::is_file_in_stock`],
//! [`Repository::is_archive_in_stock`]) and hands over finished records
//! ([`Repository::new_book`]). The serving layer that browses the catalog
//! lives elsewhere and only shares the schema.

mod db;
pub mod error;
mod models;
mod repo;
mod schema;

pub use crate::db::Database;
pub use crate::models::BookRecord;
pub use crate::repo::Repository;
