pub mod models;
pub mod store;

pub use store::Store;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Open the SQLite database, creating the file on first run, and bring the
/// schema up to date. Foreign keys are enabled per connection so deleting a
/// search cascades to its listings.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// In-memory store for tests. Pinned to a single connection: each SQLite
/// `:memory:` connection is its own database.
#[cfg(test)]
pub async fn memory_store() -> Store {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("in-memory pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    Store::new(pool)
}
