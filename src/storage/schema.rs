use crate::error::StorageError;
use sqlx::SqlitePool;

const DDL: &str = "
CREATE TABLE IF NOT EXISTS integration_tokens (
    tenant_id     INTEGER PRIMARY KEY CHECK (tenant_id > 0),
    client_id     TEXT    NOT NULL,
    client_secret TEXT    NOT NULL,
    access_token  TEXT,
    refresh_token TEXT,
    expires_in    INTEGER NOT NULL DEFAULT 3600,
    updated_at    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS synced_customers (
    external_id         TEXT    PRIMARY KEY,
    tenant_id           INTEGER NOT NULL,
    legacy_id           INTEGER,
    legacy_uuid         TEXT,
    name                TEXT,
    tax_document        TEXT,
    email               TEXT,
    phone               TEXT,
    active              INTEGER NOT NULL DEFAULT 1,
    person_type         TEXT,
    profiles            TEXT    NOT NULL DEFAULT '[]',
    notes               TEXT,
    external_created_at TEXT,
    external_updated_at TEXT,
    contract_id         TEXT,
    contract_status     TEXT,
    contract_number     TEXT,
    contract_start_date TEXT,
    contract_due_date   TEXT,
    created_at          TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_synced_customers_tenant
    ON synced_customers(tenant_id);
";

pub(super) async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::raw_sql(DDL).execute(pool).await?;
    Ok(())
}
