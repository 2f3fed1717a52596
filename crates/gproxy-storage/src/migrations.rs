//! Schema version is tracked both in SQLite's `user_version` pragma and in the
//! `schema_migrations(version, applied_at)` table, mirroring the contract in the component
//! design: each migration runs in its own transaction; a failure aborts the whole run and leaves
//! the store at the prior version.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use time::OffsetDateTime;

use crate::error::{StorageError, StorageResult};

#[async_trait]
pub trait Migration: Send + Sync {
    fn version(&self) -> i64;
    fn name(&self) -> &'static str;
    async fn up(&self, tx: &DatabaseTransaction) -> Result<(), sea_orm::DbErr>;
    async fn down(&self, tx: &DatabaseTransaction) -> Result<(), sea_orm::DbErr>;
}

/// One independently-versioned, reversible schema step. Declares its `up`/`down` statement
/// slices and the version/name pair recorded in `schema_migrations`.
macro_rules! sql_migration {
    ($struct_name:ident, $version:expr, $name:expr, $up:expr, $down:expr) => {
        struct $struct_name;

        #[async_trait]
        impl Migration for $struct_name {
            fn version(&self) -> i64 {
                $version
            }

            fn name(&self) -> &'static str {
                $name
            }

            async fn up(&self, tx: &DatabaseTransaction) -> Result<(), sea_orm::DbErr> {
                for statement in $up {
                    tx.execute_unprepared(statement).await?;
                }
                Ok(())
            }

            async fn down(&self, tx: &DatabaseTransaction) -> Result<(), sea_orm::DbErr> {
                for statement in $down {
                    tx.execute_unprepared(statement).await?;
                }
                Ok(())
            }
        }
    };
}

sql_migration!(InitialSchema, 1, "initial_schema", INITIAL_SCHEMA_UP, INITIAL_SCHEMA_DOWN);
sql_migration!(AddApiKeys, 2, "add_api_keys", API_KEYS_UP, API_KEYS_DOWN);
sql_migration!(AddRequestLogs, 3, "add_request_logs", REQUEST_LOGS_UP, REQUEST_LOGS_DOWN);
sql_migration!(AddOauthAccounts, 4, "add_oauth_accounts", OAUTH_ACCOUNTS_UP, OAUTH_ACCOUNTS_DOWN);
sql_migration!(
    AddCodeSwitchConfigs,
    5,
    "add_code_switch_configs",
    CODE_SWITCH_UP,
    CODE_SWITCH_DOWN
);
sql_migration!(AddTunnelConfigs, 6, "add_tunnel_configs", TUNNEL_CONFIGS_UP, TUNNEL_CONFIGS_DOWN);
sql_migration!(AddTunnelStats, 7, "add_tunnel_stats", TUNNEL_STATS_UP, TUNNEL_STATS_DOWN);
sql_migration!(AddTunnelLogs, 8, "add_tunnel_logs", TUNNEL_LOGS_UP, TUNNEL_LOGS_DOWN);
sql_migration!(
    AddConversationHistory,
    9,
    "add_conversation_history",
    CONVERSATION_HISTORY_UP,
    CONVERSATION_HISTORY_DOWN
);
sql_migration!(
    AddOauthPoolSelectionIndex,
    10,
    "add_oauth_pool_selection_index",
    OAUTH_POOL_INDEX_UP,
    OAUTH_POOL_INDEX_DOWN
);

fn all_migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(InitialSchema),
        Box::new(AddApiKeys),
        Box::new(AddRequestLogs),
        Box::new(AddOauthAccounts),
        Box::new(AddCodeSwitchConfigs),
        Box::new(AddTunnelConfigs),
        Box::new(AddTunnelStats),
        Box::new(AddTunnelLogs),
        Box::new(AddConversationHistory),
        Box::new(AddOauthPoolSelectionIndex),
    ]
}

/// Runs every migration whose version exceeds the store's current version, in order, each in
/// its own transaction. Idempotent: a second call with nothing new to apply is a no-op.
pub async fn run_migrations(db: &DatabaseConnection) -> StorageResult<()> {
    bootstrap_migrations_table(db).await?;
    let current = current_version(db).await?;

    let mut migrations = all_migrations();
    migrations.sort_by_key(|m| m.version());

    for migration in migrations.into_iter().filter(|m| m.version() > current) {
        let tx = db.begin().await?;
        migration.up(&tx).await.map_err(StorageError::Db)?;
        record_version(&tx, migration.version(), migration.name()).await?;
        tx.commit().await?;
    }

    Ok(())
}

async fn bootstrap_migrations_table(db: &DatabaseConnection) -> StorageResult<()> {
    db.execute_unprepared(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
            version INTEGER PRIMARY KEY, \
            name TEXT NOT NULL, \
            applied_at TEXT NOT NULL\
        )",
    )
    .await?;
    Ok(())
}

async fn current_version(db: &DatabaseConnection) -> StorageResult<i64> {
    use sea_orm::{FromQueryResult, Statement};

    #[derive(FromQueryResult)]
    struct MaxVersion {
        max_version: Option<i64>,
    }

    let backend = db.get_database_backend();
    let row = MaxVersion::find_by_statement(Statement::from_string(
        backend,
        "SELECT MAX(version) AS max_version FROM schema_migrations",
    ))
    .one(db)
    .await?;

    Ok(row.and_then(|r| r.max_version).unwrap_or(0))
}

async fn record_version(
    tx: &DatabaseTransaction,
    version: i64,
    name: &str,
) -> StorageResult<()> {
    use sea_orm::Statement;

    let now = OffsetDateTime::now_utc();
    let backend = tx.get_database_backend();
    tx.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES ($1, $2, $3)",
        [
            version.into(),
            name.into(),
            now.format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default()
                .into(),
        ],
    ))
    .await?;
    Ok(())
}

const INITIAL_SCHEMA_UP: &[&str] = &[
    "CREATE TABLE providers (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        adapter_type TEXT NOT NULL,
        api_key_encrypted TEXT NOT NULL,
        base_url TEXT NOT NULL,
        chat_path TEXT NOT NULL,
        models_path TEXT NOT NULL,
        cached_model_ids_json TEXT NOT NULL DEFAULT '[]',
        enabled INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        logo TEXT,
        color TEXT,
        passthrough INTEGER NOT NULL DEFAULT 0,
        passthrough_slug TEXT UNIQUE,
        is_pool INTEGER NOT NULL DEFAULT 0,
        pool_strategy TEXT,
        oauth_account_id TEXT,
        oauth_provider_type TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE bridge_proxies (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        inbound_adapter_id TEXT NOT NULL,
        outbound_kind TEXT NOT NULL,
        outbound_id TEXT NOT NULL,
        proxy_path TEXT NOT NULL UNIQUE,
        enabled INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE model_mappings (
        id TEXT PRIMARY KEY,
        proxy_id TEXT NOT NULL REFERENCES bridge_proxies(id) ON DELETE CASCADE,
        source_model TEXT,
        target_model TEXT NOT NULL,
        is_default INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE UNIQUE INDEX model_mappings_default_per_proxy
        ON model_mappings(proxy_id) WHERE is_default = 1",
];

const INITIAL_SCHEMA_DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS model_mappings",
    "DROP TABLE IF EXISTS bridge_proxies",
    "DROP TABLE IF EXISTS providers",
];

const API_KEYS_UP: &[&str] = &[
    "CREATE TABLE api_keys (
        id TEXT PRIMARY KEY,
        key_value TEXT NOT NULL UNIQUE,
        label TEXT,
        enabled INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        last_used_at TEXT
    )",
    "CREATE TABLE settings (
        key TEXT PRIMARY KEY,
        value_json TEXT NOT NULL
    )",
];

const API_KEYS_DOWN: &[&str] = &["DROP TABLE IF EXISTS settings", "DROP TABLE IF EXISTS api_keys"];

const REQUEST_LOGS_UP: &[&str] = &[
    "CREATE TABLE request_logs (
        id TEXT PRIMARY KEY,
        proxy_id TEXT REFERENCES bridge_proxies(id) ON DELETE SET NULL,
        proxy_path TEXT NOT NULL,
        source_model TEXT,
        target_model TEXT,
        http_status INTEGER,
        input_tokens INTEGER,
        output_tokens INTEGER,
        latency_ms INTEGER,
        request_body BLOB,
        response_body BLOB,
        error TEXT,
        source TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX request_logs_created_at ON request_logs(created_at)",
];

const REQUEST_LOGS_DOWN: &[&str] = &["DROP TABLE IF EXISTS request_logs"];

const OAUTH_ACCOUNTS_UP: &[&str] = &["CREATE TABLE oauth_accounts (
        id TEXT PRIMARY KEY,
        provider_type TEXT NOT NULL,
        email TEXT NOT NULL,
        access_token_encrypted TEXT NOT NULL,
        refresh_token_encrypted TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        token_type TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        health_status TEXT NOT NULL DEFAULT 'active',
        consecutive_failures INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        pool_enabled INTEGER NOT NULL DEFAULT 1,
        pool_weight INTEGER NOT NULL DEFAULT 0,
        last_used_at TEXT,
        last_refresh_at TEXT,
        metadata_json TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"];

const OAUTH_ACCOUNTS_DOWN: &[&str] = &["DROP TABLE IF EXISTS oauth_accounts"];

const CODE_SWITCH_UP: &[&str] = &[
    "CREATE TABLE code_switch_configs (
        id TEXT PRIMARY KEY,
        cli TEXT NOT NULL,
        provider_id TEXT NOT NULL REFERENCES providers(id) ON DELETE CASCADE,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE code_model_mappings (
        id TEXT PRIMARY KEY,
        code_switch_id TEXT NOT NULL REFERENCES code_switch_configs(id) ON DELETE CASCADE,
        provider_id TEXT NOT NULL,
        source_model TEXT NOT NULL,
        mapping_type TEXT NOT NULL,
        target_model TEXT NOT NULL,
        UNIQUE(code_switch_id, provider_id, source_model, mapping_type)
    )",
];

const CODE_SWITCH_DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS code_model_mappings",
    "DROP TABLE IF EXISTS code_switch_configs",
];

const TUNNEL_CONFIGS_UP: &[&str] = &["CREATE TABLE tunnel_configs (
        id TEXT PRIMARY KEY,
        device_id TEXT NOT NULL UNIQUE,
        tunnel_id TEXT,
        subdomain TEXT,
        domain TEXT,
        hostname TEXT,
        credentials_encrypted TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"];

const TUNNEL_CONFIGS_DOWN: &[&str] = &["DROP TABLE IF EXISTS tunnel_configs"];

const TUNNEL_STATS_UP: &[&str] = &["CREATE TABLE tunnel_stats (
        id TEXT PRIMARY KEY,
        day TEXT NOT NULL UNIQUE,
        requests INTEGER NOT NULL DEFAULT 0,
        bytes_up INTEGER NOT NULL DEFAULT 0,
        bytes_down INTEGER NOT NULL DEFAULT 0,
        errors INTEGER NOT NULL DEFAULT 0,
        avg_latency_ms REAL NOT NULL DEFAULT 0,
        unique_ips INTEGER NOT NULL DEFAULT 0
    )"];

const TUNNEL_STATS_DOWN: &[&str] = &["DROP TABLE IF EXISTS tunnel_stats"];

const TUNNEL_LOGS_UP: &[&str] = &[
    "CREATE TABLE tunnel_access_logs (
        id TEXT PRIMARY KEY,
        at TEXT NOT NULL,
        source_ip TEXT,
        method TEXT NOT NULL,
        path TEXT NOT NULL,
        status INTEGER NOT NULL,
        latency_ms INTEGER NOT NULL,
        bytes_up INTEGER NOT NULL,
        bytes_down INTEGER NOT NULL
    )",
    "CREATE TABLE tunnel_system_logs (
        id TEXT PRIMARY KEY,
        at TEXT NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL
    )",
];

const TUNNEL_LOGS_DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS tunnel_system_logs",
    "DROP TABLE IF EXISTS tunnel_access_logs",
];

const OAUTH_POOL_INDEX_UP: &[&str] =
    &["CREATE INDEX oauth_accounts_pool_selection ON oauth_accounts(provider_type, health_status)"];

const OAUTH_POOL_INDEX_DOWN: &[&str] = &["DROP INDEX IF EXISTS oauth_accounts_pool_selection"];

const CONVERSATION_HISTORY_UP: &[&str] = &[
    "CREATE TABLE conversations (
        id TEXT PRIMARY KEY,
        title TEXT,
        provider_id TEXT REFERENCES providers(id) ON DELETE SET NULL,
        proxy_id TEXT REFERENCES bridge_proxies(id) ON DELETE SET NULL,
        model TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        reasoning_content TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX messages_conversation_id ON messages(conversation_id)",
];

const CONVERSATION_HISTORY_DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS messages",
    "DROP TABLE IF EXISTS conversations",
];

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    #[tokio::test]
    async fn running_migrations_twice_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        run_migrations(&db).await.unwrap();

        let version = current_version(&db).await.unwrap();
        assert_eq!(version, 10);
    }

    #[tokio::test]
    async fn migrations_run_in_version_order() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();

        let mut migrations = all_migrations();
        migrations.sort_by_key(|m| m.version());
        assert_eq!(migrations.len(), 10);
        for (expected_version, migration) in (1..=10).zip(migrations.iter()) {
            assert_eq!(migration.version(), expected_version);
        }
    }
}
