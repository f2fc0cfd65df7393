//! Custody of merchant credentials.
//!
//! [`CredentialVault`] is the only component that turns a tenant's [`SecretRecord`] into [`DecryptedCredentials`]
//! and back. It serializes credentials to JSON, hands the bytes to an [`EnvelopeCipher`], and persists only the
//! resulting ciphertext together with a format marker and the key name. Nothing decrypted is cached.
mod transit_cipher;

#[cfg(feature = "insecure-dev-cipher")]
mod passthrough;

use chrono::Utc;
use log::*;
#[cfg(feature = "insecure-dev-cipher")]
pub use passthrough::PassthroughCipher;
pub use transit_cipher::TransitCipher;
use zeroize::Zeroizing;

use crate::{
    credentials::DecryptedCredentials,
    db_types::{SecretRecord, TenantId},
    stl_api::errors::SettlementError,
    traits::{EnvelopeCipher, TenantConfigStore},
};

/// Format marker for records written by this vault.
pub const ENVELOPE_FORMAT: &str = "envelope-v1";

pub struct CredentialVault<S, C> {
    store: S,
    cipher: C,
}

impl<S, C> CredentialVault<S, C> {
    pub fn new(store: S, cipher: C) -> Self {
        Self { store, cipher }
    }
}

impl<S, C> CredentialVault<S, C>
where
    S: TenantConfigStore,
    C: EnvelopeCipher,
{
    /// Encrypt `credentials` and store them as the tenant's secret record, replacing any previous one.
    pub async fn store(&self, tenant_id: &TenantId, credentials: &DecryptedCredentials) -> Result<(), SettlementError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(credentials).map_err(|e| {
            SettlementError::CredentialUnavailable(format!("Could not serialize credentials. {e}"))
        })?);
        let ciphertext = self.cipher.encrypt(&plaintext).await.map_err(|e| {
            error!("🔐️ Could not encrypt credentials for tenant {tenant_id}. {e}");
            SettlementError::from(e)
        })?;
        let record = SecretRecord {
            format: ENVELOPE_FORMAT.to_string(),
            key_name: self.cipher.key_name(),
            ciphertext,
            updated_at: Utc::now(),
        };
        self.store.upsert_secret_record(tenant_id, &record).await?;
        info!("🔐️ Credentials for tenant {tenant_id} stored under key {}", record.key_name);
        Ok(())
    }

    /// Load and decrypt the tenant's credentials. Any failure along the way, including an unreachable key service,
    /// is a [`SettlementError::CredentialUnavailable`].
    pub async fn reveal(&self, tenant_id: &TenantId) -> Result<DecryptedCredentials, SettlementError> {
        let record = self
            .store
            .fetch_secret_record(tenant_id)
            .await
            .map_err(|e| SettlementError::CredentialUnavailable(format!("Could not load the secret record. {e}")))?
            .ok_or_else(|| {
                SettlementError::CredentialUnavailable(format!("Tenant {tenant_id} has no stored credentials"))
            })?;
        if record.format != ENVELOPE_FORMAT {
            return Err(SettlementError::CredentialUnavailable(format!(
                "Unsupported secret record format '{}'",
                record.format
            )));
        }
        let key_name = self.cipher.key_name();
        if record.key_name != key_name {
            warn!(
                "🔐️ Credentials for tenant {tenant_id} were encrypted under key {}, but the vault is using {key_name}",
                record.key_name
            );
        }
        let plaintext = Zeroizing::new(self.cipher.decrypt(&record.ciphertext).await.map_err(|e| {
            error!("🔐️ Could not decrypt credentials for tenant {tenant_id}. {e}");
            SettlementError::from(e)
        })?);
        let credentials = serde_json::from_slice::<DecryptedCredentials>(&plaintext).map_err(|e| {
            SettlementError::CredentialUnavailable(format!("Decrypted credentials could not be parsed. {e}"))
        })?;
        trace!("🔐️ Credentials for tenant {tenant_id} revealed");
        Ok(credentials)
    }
}

#[cfg(test)]
mod test {
    use mockall::mock;

    use super::*;
    use crate::{db::MemoryStore, stl_api::errors::CipherError};

    mock! {
        pub Cipher {}
        impl EnvelopeCipher for Cipher {
            fn key_name(&self) -> String;
            async fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError>;
            async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError>;
        }
    }

    fn credentials() -> DecryptedCredentials {
        DecryptedCredentials::new("APP_USR-secret-token", "acct-1").with_refresh_token("TG-refresh")
    }

    #[tokio::test]
    async fn only_ciphertext_is_stored() {
        let _ = env_logger::try_init();
        let store = MemoryStore::new();
        let mut cipher = MockCipher::new();
        cipher.expect_key_name().return_const("creds".to_string());
        cipher
            .expect_encrypt()
            .withf(|plaintext: &[u8]| String::from_utf8_lossy(plaintext).contains("APP_USR-secret-token"))
            .times(1)
            .returning(|_| Ok("vault:v1:c2VhbGVk".to_string()));
        let vault = CredentialVault::new(store.clone(), cipher);
        let tenant = TenantId::from("t-1");
        vault.store(&tenant, &credentials()).await.unwrap();
        let record = store.fetch_secret_record(&tenant).await.unwrap().unwrap();
        assert_eq!(record.format, ENVELOPE_FORMAT);
        assert_eq!(record.key_name, "creds");
        assert_eq!(record.ciphertext, "vault:v1:c2VhbGVk");
    }

    #[tokio::test]
    async fn reveal_parses_decrypted_json() {
        let store = MemoryStore::new();
        let plaintext = serde_json::to_vec(&credentials()).unwrap();
        let mut cipher = MockCipher::new();
        cipher.expect_key_name().return_const("creds".to_string());
        cipher.expect_encrypt().returning(|_| Ok("vault:v1:opaque".to_string()));
        cipher.expect_decrypt().withf(|c: &str| c == "vault:v1:opaque").returning(move |_| Ok(plaintext.clone()));
        let vault = CredentialVault::new(store, cipher);
        let tenant = TenantId::from("t-1");
        vault.store(&tenant, &credentials()).await.unwrap();
        assert_eq!(vault.reveal(&tenant).await.unwrap(), credentials());
    }

    #[tokio::test]
    async fn key_service_outage_is_credential_unavailable() {
        let store = MemoryStore::new();
        let mut cipher = MockCipher::new();
        cipher.expect_key_name().return_const("creds".to_string());
        cipher.expect_encrypt().returning(|_| Ok("vault:v1:opaque".to_string()));
        cipher.expect_decrypt().returning(|_| Err(CipherError::Unreachable("connection refused".into())));
        let vault = CredentialVault::new(store, cipher);
        let tenant = TenantId::from("t-1");
        vault.store(&tenant, &credentials()).await.unwrap();
        let err = vault.reveal(&tenant).await.unwrap_err();
        assert!(matches!(err, SettlementError::CredentialUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_record_is_credential_unavailable() {
        let vault = CredentialVault::new(MemoryStore::new(), MockCipher::new());
        let err = vault.reveal(&TenantId::from("nobody")).await.unwrap_err();
        assert!(matches!(err, SettlementError::CredentialUnavailable(_)));
    }

    #[tokio::test]
    async fn foreign_formats_are_refused() {
        let store = MemoryStore::new();
        let tenant = TenantId::from("t-1");
        let record = SecretRecord {
            format: "plaintext".into(),
            key_name: "creds".into(),
            ciphertext: "{}".into(),
            updated_at: Utc::now(),
        };
        store.upsert_secret_record(&tenant, &record).await.unwrap();
        let vault = CredentialVault::new(store, MockCipher::new());
        assert!(matches!(vault.reveal(&tenant).await, Err(SettlementError::CredentialUnavailable(_))));
    }
}
