mod push_transactions;
mod tenant_configs;

use std::{env, fmt::Debug, str::FromStr};

use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    db_types::{PushTransaction, SecretRecord, TenantId, TenantProviderConfig},
    push_payment::PushStatus,
    stl_api::errors::StoreError,
    traits::{PushTransactionStore, TenantConfigStore},
};

const SQLITE_DB_URL: &str = "sqlite://data/settlement.db";

pub fn db_url() -> String {
    let result = env::var("STL_DATABASE_URL").unwrap_or_else(|_| {
        info!("STL_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

#[derive(Clone)]
pub struct SqliteStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteStore ({})", self.url)
    }
}

impl SqliteStore {
    /// Connect to the database at `url`, creating it if necessary, and bring the schema up to date.
    ///
    /// Every connection to `sqlite::memory:` opens a separate database, so in-memory stores are limited to a single
    /// connection that is never recycled.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };
        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("🗃️ Settlement database ready at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub async fn new_from_env(max_connections: u32) -> Result<Self, StoreError> {
        Self::new_with_url(&db_url(), max_connections).await
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TenantConfigStore for SqliteStore {
    async fn fetch_provider_config(&self, tenant_id: &TenantId) -> Result<Option<TenantProviderConfig>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        tenant_configs::fetch_provider_config(tenant_id, &mut conn).await
    }

    async fn upsert_provider_config(&self, config: &TenantProviderConfig) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        tenant_configs::upsert_provider_config(config, &mut conn).await?;
        trace!("🗃️ Provider config for tenant {} saved", config.tenant_id);
        Ok(())
    }

    async fn fetch_secret_record(&self, tenant_id: &TenantId) -> Result<Option<SecretRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        tenant_configs::fetch_secret_record(tenant_id, &mut conn).await
    }

    async fn upsert_secret_record(&self, tenant_id: &TenantId, record: &SecretRecord) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        tenant_configs::upsert_secret_record(tenant_id, record, &mut conn).await?;
        trace!("🗃️ Secret record for tenant {tenant_id} saved under key {}", record.key_name);
        Ok(())
    }
}

impl PushTransactionStore for SqliteStore {
    async fn insert_push_transaction(&self, transaction: &PushTransaction) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        push_transactions::insert(transaction, &mut conn).await?;
        debug!("🗃️ Push transaction {} saved", transaction.transaction_id);
        Ok(())
    }

    async fn fetch_push_transaction(&self, transaction_id: &str) -> Result<Option<PushTransaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        push_transactions::fetch(transaction_id, &mut conn).await
    }

    async fn update_push_status(
        &self,
        transaction_id: &str,
        expected: PushStatus,
        status: PushStatus,
        raw_code: Option<&str>,
    ) -> Result<PushTransaction, StoreError> {
        let mut tx = self.pool.begin().await?;
        push_transactions::update_status(transaction_id, expected, status, raw_code, &mut tx).await?;
        let updated = push_transactions::fetch(transaction_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("push transaction {transaction_id}")))?;
        tx.commit().await?;
        debug!("🗃️ Push transaction {transaction_id} is now {status}");
        Ok(updated)
    }

    async fn fetch_open_push_transactions(&self) -> Result<Vec<PushTransaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        push_transactions::fetch_open(&mut conn).await
    }
}
