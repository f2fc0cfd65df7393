use std::env;

use log::*;
use serde::Serialize;
use stl_common::MinorUnits;

/// 5% unless configured otherwise
pub const DEFAULT_COMMISSION_BPS: u32 = 500;
const MAX_BPS: u32 = 10_000;

/// The platform's cut of a checkout, computed once before the checkout is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionSplit {
    pub gross: MinorUnits,
    pub commission: MinorUnits,
    pub net: MinorUnits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionPolicy {
    default_bps: u32,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self { default_bps: DEFAULT_COMMISSION_BPS }
    }
}

impl CommissionPolicy {
    /// Rates above 100% are clamped to 100%.
    pub fn new(default_bps: u32) -> Self {
        Self { default_bps: default_bps.min(MAX_BPS) }
    }

    pub fn new_from_env_or_default() -> Self {
        let bps = env::var("STL_COMMISSION_BPS")
            .ok()
            .and_then(|s| s.parse::<u32>().map_err(|e| warn!("Invalid value for STL_COMMISSION_BPS ({s}). {e}")).ok())
            .unwrap_or_else(|| {
                info!("STL_COMMISSION_BPS not set, using {DEFAULT_COMMISSION_BPS} as default");
                DEFAULT_COMMISSION_BPS
            });
        Self::new(bps)
    }

    pub fn default_bps(&self) -> u32 {
        self.default_bps
    }

    /// Split `amount` using the tenant's override if it has one. The commission is rounded half-up to the nearest
    /// minor unit and the merchant receives the rest.
    pub fn split(&self, amount: MinorUnits, tenant_override_bps: Option<u32>) -> CommissionSplit {
        let bps = tenant_override_bps.map(|b| b.min(MAX_BPS)).unwrap_or(self.default_bps);
        let commission = amount.basis_points(bps);
        CommissionSplit { gross: amount, commission, net: amount - commission }
    }
}
