use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stl_common::{Currency, MinorUnits};

use crate::{
    db_types::{OrderId, TenantId},
    push_payment::PushStatus,
};

/// A merchant's request to take payment for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckout {
    pub order_id: OrderId,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub description: String,
    #[serde(default)]
    pub provider_metadata: BTreeMap<String, String>,
}

impl NewCheckout {
    pub fn new(order_id: &str, amount: MinorUnits, currency: Currency, description: &str) -> Self {
        Self {
            order_id: OrderId::from(order_id),
            amount,
            currency,
            description: description.to_string(),
            provider_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.provider_metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Where to send a merchant to link their account. `state` must be echoed back by the network's redirect and
/// checked by the caller before [`crate::CheckoutApi::complete_onboarding`] is called.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingRequest {
    pub tenant_id: TenantId,
    pub provider_id: String,
    pub url: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled,
    /// The transaction had already left a cancellable state. Nothing was sent to the network.
    NoOp { status: PushStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReverseOutcome {
    Reversed,
    /// The network never debited the payer.
    NothingToReverse,
    /// The transaction was already reversed.
    NoOp { status: PushStatus },
}

/// The result of one reconciliation pass over open push transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub polled: usize,
    pub updated: usize,
    pub failed: usize,
    /// Transactions whose outcome the network could not tell us. Candidates for an operator reversal.
    pub unknown: Vec<String>,
}
