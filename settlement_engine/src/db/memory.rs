use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::Utc;

use crate::{
    db_types::{PushTransaction, SecretRecord, TenantId, TenantProviderConfig},
    push_payment::PushStatus,
    stl_api::errors::StoreError,
    traits::{PushTransactionStore, TenantConfigStore},
};

#[derive(Default)]
struct Tables {
    configs: HashMap<TenantId, TenantProviderConfig>,
    secrets: HashMap<TenantId, SecretRecord>,
    push_transactions: HashMap<String, PushTransaction>,
}

/// Store backend that keeps everything in process memory. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&tables)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

impl TenantConfigStore for MemoryStore {
    async fn fetch_provider_config(&self, tenant_id: &TenantId) -> Result<Option<TenantProviderConfig>, StoreError> {
        Ok(self.read(|t| t.configs.get(tenant_id).cloned()))
    }

    async fn upsert_provider_config(&self, config: &TenantProviderConfig) -> Result<(), StoreError> {
        self.write(|t| {
            let mut config = config.clone();
            if let Some(existing) = t.configs.get(&config.tenant_id) {
                config.created_at = existing.created_at;
            }
            t.configs.insert(config.tenant_id.clone(), config);
        });
        Ok(())
    }

    async fn fetch_secret_record(&self, tenant_id: &TenantId) -> Result<Option<SecretRecord>, StoreError> {
        Ok(self.read(|t| t.secrets.get(tenant_id).cloned()))
    }

    async fn upsert_secret_record(&self, tenant_id: &TenantId, record: &SecretRecord) -> Result<(), StoreError> {
        self.write(|t| t.secrets.insert(tenant_id.clone(), record.clone()));
        Ok(())
    }
}

impl PushTransactionStore for MemoryStore {
    async fn insert_push_transaction(&self, transaction: &PushTransaction) -> Result<(), StoreError> {
        self.write(|t| {
            if t.push_transactions.contains_key(&transaction.transaction_id) {
                return Err(StoreError::DatabaseError(format!(
                    "Push transaction {} already exists",
                    transaction.transaction_id
                )));
            }
            t.push_transactions.insert(transaction.transaction_id.clone(), transaction.clone());
            Ok(())
        })
    }

    async fn fetch_push_transaction(&self, transaction_id: &str) -> Result<Option<PushTransaction>, StoreError> {
        Ok(self.read(|t| t.push_transactions.get(transaction_id).cloned()))
    }

    async fn update_push_status(
        &self,
        transaction_id: &str,
        expected: PushStatus,
        status: PushStatus,
        raw_code: Option<&str>,
    ) -> Result<PushTransaction, StoreError> {
        self.write(|t| {
            let tx = t
                .push_transactions
                .get_mut(transaction_id)
                .ok_or_else(|| StoreError::NotFound(format!("push transaction {transaction_id}")))?;
            if tx.status != expected {
                return Err(StoreError::StatusChanged {
                    transaction_id: transaction_id.to_string(),
                    expected,
                    actual: tx.status,
                });
            }
            tx.status = status;
            if let Some(code) = raw_code {
                tx.raw_code = Some(code.to_string());
            }
            tx.updated_at = Utc::now();
            Ok(tx.clone())
        })
    }

    async fn fetch_open_push_transactions(&self) -> Result<Vec<PushTransaction>, StoreError> {
        let mut open = self.read(|t| {
            t.push_transactions.values().filter(|tx| tx.status.is_open()).cloned().collect::<Vec<_>>()
        });
        open.sort_by_key(|tx| tx.created_at);
        Ok(open)
    }
}

#[cfg(test)]
mod test {
    use stl_common::{Currency, MinorUnits};

    use super::*;
    use crate::db_types::{NewPushTransaction, OrderId};

    fn new_tx(id: &str) -> PushTransaction {
        NewPushTransaction {
            transaction_id: id.into(),
            tenant_id: TenantId::from("t-1"),
            provider_id: "pushNetworkC".into(),
            payer_reference: "3001234567".into(),
            order_id: OrderId::from("order-1"),
            amount: MinorUnits::from(10_000),
            currency: "COP".parse::<Currency>().unwrap(),
        }
        .into()
    }

    #[tokio::test]
    async fn upsert_keeps_creation_time() {
        let store = MemoryStore::new();
        let first = TenantProviderConfig::new("t-1".into(), "cardNetworkA");
        store.upsert_provider_config(&first).await.unwrap();
        let mut second = TenantProviderConfig::new("t-1".into(), "hostedCheckoutB");
        second.created_at = Utc::now() + chrono::Duration::days(1);
        store.upsert_provider_config(&second).await.unwrap();
        let stored = store.fetch_provider_config(&"t-1".into()).await.unwrap().unwrap();
        assert_eq!(stored.active_provider_id, "hostedCheckoutB");
        assert_eq!(stored.created_at, first.created_at);
    }

    #[tokio::test]
    async fn duplicate_push_transactions_are_refused() {
        let store = MemoryStore::new();
        store.insert_push_transaction(&new_tx("tx-1")).await.unwrap();
        assert!(store.insert_push_transaction(&new_tx("tx-1")).await.is_err());
    }

    #[tokio::test]
    async fn only_open_transactions_are_listed() {
        let store = MemoryStore::new();
        for id in ["tx-1", "tx-2", "tx-3"] {
            store.insert_push_transaction(&new_tx(id)).await.unwrap();
        }
        store.update_push_status("tx-2", PushStatus::Initiated, PushStatus::Completed, Some("33")).await.unwrap();
        store.update_push_status("tx-3", PushStatus::Initiated, PushStatus::Unknown, Some("77")).await.unwrap();
        let open = store.fetch_open_push_transactions().await.unwrap();
        let ids = open.iter().map(|tx| tx.transaction_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"tx-1"));
        assert!(ids.contains(&"tx-3"));
    }

    #[tokio::test]
    async fn updating_a_missing_transaction_fails() {
        let store = MemoryStore::new();
        let err = store.update_push_status("nope", PushStatus::Initiated, PushStatus::Pending, None).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn stale_status_updates_are_refused() {
        let store = MemoryStore::new();
        store.insert_push_transaction(&new_tx("tx-1")).await.unwrap();
        store.update_push_status("tx-1", PushStatus::Initiated, PushStatus::Unknown, Some("77")).await.unwrap();
        let err = store.update_push_status("tx-1", PushStatus::Initiated, PushStatus::Pending, None).await.unwrap_err();
        assert!(matches!(err, StoreError::StatusChanged { actual: PushStatus::Unknown, .. }));
        let stored = store.fetch_push_transaction("tx-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PushStatus::Unknown);
        assert_eq!(stored.raw_code.as_deref(), Some("77"));
    }
}
