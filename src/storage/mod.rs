// storage/mod.rs
// SQLite connection and schema management for the durable scan cache

pub mod migrations;
pub mod pool;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
