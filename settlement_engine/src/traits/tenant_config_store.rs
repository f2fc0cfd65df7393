use crate::{
    db_types::{SecretRecord, TenantId, TenantProviderConfig},
    stl_api::errors::StoreError,
};

/// A document store keyed by tenant id.
///
/// The public and secret halves of a tenant's configuration are kept as separate records so that reading which
/// provider a tenant uses never touches the ciphertext.
#[allow(async_fn_in_trait)]
pub trait TenantConfigStore: Clone {
    /// Fetch the public provider record for the tenant. A tenant that was never onboarded returns `Ok(None)`.
    async fn fetch_provider_config(&self, tenant_id: &TenantId) -> Result<Option<TenantProviderConfig>, StoreError>;

    /// Insert or replace the public provider record. `created_at` of an existing record is preserved.
    async fn upsert_provider_config(&self, config: &TenantProviderConfig) -> Result<(), StoreError>;

    async fn fetch_secret_record(&self, tenant_id: &TenantId) -> Result<Option<SecretRecord>, StoreError>;

    /// Insert or replace the encrypted credential record for the tenant.
    async fn upsert_secret_record(&self, tenant_id: &TenantId, record: &SecretRecord) -> Result<(), StoreError>;
}
