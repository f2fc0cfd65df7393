use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stl_common::{Currency, MinorUnits};

use crate::push_payment::PushStatus;

//--------------------------------------     TenantId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------     OrderId       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------   TenantProviderConfig   -------------------------------------------------
/// The public half of a tenant's provider configuration. Any component may read it; it never holds secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProviderConfig {
    pub tenant_id: TenantId,
    pub active_provider_id: String,
    /// Tenants are soft-deactivated, never deleted.
    pub active: bool,
    /// Overrides the platform commission rate for this tenant, in basis points.
    pub commission_bps: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantProviderConfig {
    pub fn new(tenant_id: TenantId, active_provider_id: &str) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            active_provider_id: active_provider_id.to_string(),
            active: true,
            commission_bps: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_commission_bps(mut self, bps: u32) -> Self {
        self.commission_bps = Some(bps);
        self
    }
}

//--------------------------------------      SecretRecord      ---------------------------------------------------
/// The secret half of a tenant's provider configuration, exactly as persisted. Only the vault can turn it back into
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Structural marker describing how `ciphertext` was produced, e.g. `envelope-v1`
    pub format: String,
    /// The named key of the envelope-encryption service that can decrypt `ciphertext`
    pub key_name: String,
    pub ciphertext: String,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     PushTransaction     ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTransaction {
    /// Assigned by the push network when the payment request is accepted
    pub transaction_id: String,
    pub tenant_id: TenantId,
    pub provider_id: String,
    pub payer_reference: String,
    pub order_id: OrderId,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub status: PushStatus,
    /// The last status code the network reported for this transaction
    pub raw_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPushTransaction {
    pub transaction_id: String,
    pub tenant_id: TenantId,
    pub provider_id: String,
    pub payer_reference: String,
    pub order_id: OrderId,
    pub amount: MinorUnits,
    pub currency: Currency,
}

impl From<NewPushTransaction> for PushTransaction {
    fn from(value: NewPushTransaction) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: value.transaction_id,
            tenant_id: value.tenant_id,
            provider_id: value.provider_id,
            payer_reference: value.payer_reference,
            order_id: value.order_id,
            amount: value.amount,
            currency: value.currency,
            status: PushStatus::Initiated,
            raw_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}
