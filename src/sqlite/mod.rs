//! Read-only access to SQLite database files.

pub mod btree;
pub mod core;
pub mod db;
pub mod error;

#[cfg(test)]
pub(crate) mod fixture;

pub use self::core::schema::{ScanPolicy, SchemaCatalog};
pub use db::SQLiteDatabase;
