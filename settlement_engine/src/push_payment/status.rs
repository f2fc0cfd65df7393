use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use stl_common::MinorUnits;

/// Lifecycle of a push payment.
///
/// ```text
/// INITIATED ─> PENDING ─> COMPLETED | REJECTED | EXPIRED | FAILED | UNKNOWN
///     │           │
///     └───────────┴─> CANCELLED
///
/// any terminal state, or UNKNOWN ─> REVERSED
/// ```
///
/// `Unknown` is not terminal. It means the network gave an answer we could not interpret, so the payment may or may
/// not have settled. A later poll can still resolve it, and an operator can reverse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushStatus {
    Initiated,
    Pending,
    Completed,
    Rejected,
    Expired,
    Failed,
    Unknown,
    Cancelled,
    Reversed,
}

/// Status codes reported in the push network's status query.
const NETWORK_STATUS_CODES: [(&str, PushStatus); 7] = [
    ("35", PushStatus::Pending),
    ("33", PushStatus::Completed),
    ("34", PushStatus::Rejected),
    ("36", PushStatus::Expired),
    ("37", PushStatus::Failed),
    ("38", PushStatus::Cancelled),
    ("39", PushStatus::Reversed),
];

impl PushStatus {
    /// Map a raw network status code. Codes outside the table are [`PushStatus::Unknown`], never an error.
    pub fn from_network_code(code: &str) -> Self {
        NETWORK_STATUS_CODES
            .iter()
            .find(|(c, _)| *c == code.trim())
            .map(|(_, status)| *status)
            .unwrap_or(PushStatus::Unknown)
    }

    pub fn is_terminal(&self) -> bool {
        use PushStatus::*;
        matches!(self, Completed | Rejected | Expired | Failed | Cancelled | Reversed)
    }

    /// Payments the network may still be working on. These are the ones worth polling.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: PushStatus) -> bool {
        use PushStatus::*;
        match (self, next) {
            (Initiated, Pending) => true,
            (Initiated | Pending | Unknown, Completed | Rejected | Expired | Failed | Unknown) => true,
            (Unknown, Pending) => true,
            (Initiated | Pending, Cancelled) => true,
            (Completed | Rejected | Expired | Failed | Cancelled | Unknown, Reversed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PushStatus::Initiated => "INITIATED",
            PushStatus::Pending => "PENDING",
            PushStatus::Completed => "COMPLETED",
            PushStatus::Rejected => "REJECTED",
            PushStatus::Expired => "EXPIRED",
            PushStatus::Failed => "FAILED",
            PushStatus::Unknown => "UNKNOWN",
            PushStatus::Cancelled => "CANCELLED",
            PushStatus::Reversed => "REVERSED",
        }
    }
}

impl Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIATED" => Ok(Self::Initiated),
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            "EXPIRED" => Ok(Self::Expired),
            "FAILED" => Ok(Self::Failed),
            "UNKNOWN" => Ok(Self::Unknown),
            "CANCELLED" => Ok(Self::Cancelled),
            "REVERSED" => Ok(Self::Reversed),
            other => Err(format!("Invalid push status: {other}")),
        }
    }
}

/// What the network reported on a status query, and what the local record now says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushStatusReport {
    pub transaction_id: String,
    /// The network's view, mapped through the status table
    pub status: PushStatus,
    pub raw_code: String,
    pub amount: Option<MinorUnits>,
    pub error_message: Option<String>,
    /// The status of the stored record after this report was applied. Differs from `status` when the reported state
    /// is not a valid next step for the record.
    pub recorded_status: PushStatus,
}
