use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{SecretRecord, TenantId, TenantProviderConfig},
    stl_api::errors::StoreError,
};

#[derive(FromRow)]
struct ProviderConfigRow {
    tenant_id: String,
    active_provider_id: String,
    active: bool,
    commission_bps: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProviderConfigRow> for TenantProviderConfig {
    type Error = StoreError;

    fn try_from(row: ProviderConfigRow) -> Result<Self, Self::Error> {
        let commission_bps = row
            .commission_bps
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::CorruptRecord(format!("commission_bps for tenant {}. {e}", row.tenant_id)))?;
        Ok(Self {
            tenant_id: TenantId(row.tenant_id),
            active_provider_id: row.active_provider_id,
            active: row.active,
            commission_bps,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SecretRow {
    format: String,
    key_name: String,
    ciphertext: String,
    updated_at: DateTime<Utc>,
}

pub async fn fetch_provider_config(
    tenant_id: &TenantId,
    conn: &mut SqliteConnection,
) -> Result<Option<TenantProviderConfig>, StoreError> {
    let row = sqlx::query_as::<_, ProviderConfigRow>(
        r#"
            SELECT tenant_id, active_provider_id, active, commission_bps, created_at, updated_at
            FROM tenant_provider_configs
            WHERE tenant_id = $1
        "#,
    )
    .bind(tenant_id.as_str())
    .fetch_optional(conn)
    .await?;
    row.map(TenantProviderConfig::try_from).transpose()
}

pub async fn upsert_provider_config(
    config: &TenantProviderConfig,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO tenant_provider_configs
                (tenant_id, active_provider_id, active, commission_bps, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id) DO UPDATE SET
                active_provider_id = excluded.active_provider_id,
                active = excluded.active,
                commission_bps = excluded.commission_bps,
                updated_at = excluded.updated_at
        "#,
    )
    .bind(config.tenant_id.as_str())
    .bind(config.active_provider_id.as_str())
    .bind(config.active)
    .bind(config.commission_bps.map(i64::from))
    .bind(config.created_at)
    .bind(config.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_secret_record(
    tenant_id: &TenantId,
    conn: &mut SqliteConnection,
) -> Result<Option<SecretRecord>, StoreError> {
    let row = sqlx::query_as::<_, SecretRow>(
        "SELECT format, key_name, ciphertext, updated_at FROM tenant_secrets WHERE tenant_id = $1",
    )
    .bind(tenant_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| SecretRecord {
        format: r.format,
        key_name: r.key_name,
        ciphertext: r.ciphertext,
        updated_at: r.updated_at,
    }))
}

pub async fn upsert_secret_record(
    tenant_id: &TenantId,
    record: &SecretRecord,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO tenant_secrets (tenant_id, format, key_name, ciphertext, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id) DO UPDATE SET
                format = excluded.format,
                key_name = excluded.key_name,
                ciphertext = excluded.ciphertext,
                updated_at = excluded.updated_at
        "#,
    )
    .bind(tenant_id.as_str())
    .bind(record.format.as_str())
    .bind(record.key_name.as_str())
    .bind(record.ciphertext.as_str())
    .bind(record.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}
