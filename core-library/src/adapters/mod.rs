//! Database adapter implementations
//!
//! Concrete implementations of the `DatabaseAdapter` trait.

pub mod sqlite_native;

pub use sqlite_native::SqliteAdapter;
