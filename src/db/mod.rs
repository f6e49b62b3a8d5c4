// Re-export the Database struct and other public items
mod article;
mod cluster;
pub mod core;
mod embedding;
mod schema;

// Re-export Database and the row trait
pub use self::core::Database;
pub use sqlx::Row;
