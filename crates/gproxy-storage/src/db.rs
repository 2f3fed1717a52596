use std::sync::{OnceLock, RwLock};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};

use crate::migrations::run_migrations;

struct SharedDb {
    dsn: String,
    connection: DatabaseConnection,
}

static SHARED_DB: OnceLock<RwLock<Option<SharedDb>>> = OnceLock::new();

/// Connects to the SQLite store at `dsn`, enables foreign-key enforcement (off by default in
/// SQLite), and runs pending migrations. Subsequent calls with the same `dsn` return the cached
/// connection rather than opening a new pool.
pub async fn connect_shared(dsn: &str) -> Result<DatabaseConnection, DbErr> {
    let lock = SHARED_DB.get_or_init(|| RwLock::new(None));
    if let Ok(guard) = lock.read()
        && let Some(shared) = guard.as_ref()
            && shared.dsn == dsn {
                return Ok(shared.connection.clone());
            }

    let connection = Database::connect(dsn).await?;
    connection
        .execute_unprepared("PRAGMA foreign_keys = ON")
        .await?;
    run_migrations(&connection)
        .await
        .map_err(|err| DbErr::Custom(err.to_string()))?;

    if let Ok(mut guard) = lock.write() {
        *guard = Some(SharedDb {
            dsn: dsn.to_string(),
            connection: connection.clone(),
        });
    }
    Ok(connection)
}
