use std::fmt::Display;

use network_tools::NetworkApiError;
use thiserror::Error;

use crate::{db_types::TenantId, push_payment::PushStatus};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    /// A conditional status update found the record in a different state than the caller read it in.
    #[error("Push transaction {transaction_id} is no longer {expected}. It is now {actual}")]
    StatusChanged { transaction_id: String, expected: PushStatus, actual: PushStatus },
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::DatabaseError(format!("Migration failed. {e}"))
    }
}

#[derive(Debug, Clone, Error)]
pub enum CipherError {
    #[error("The key service could not be reached. {0}")]
    Unreachable(String),
    #[error("The key service refused the request. {0}")]
    Rejected(String),
    #[error("Invalid payload. {0}")]
    InvalidPayload(String),
}

/// Classification of the business rejection codes the push network returns in its response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushBusinessErrorKind {
    AccountBlocked,
    RecordNotFound,
    TransactionExpired,
    TransactionRejected,
    InvalidParameters,
    PermissionDenied,
    Unclassified,
}

const BUSINESS_CODES: [(&str, PushBusinessErrorKind); 7] = [
    ("11-9L", PushBusinessErrorKind::AccountBlocked),
    ("10-454", PushBusinessErrorKind::RecordNotFound),
    ("10-455", PushBusinessErrorKind::TransactionExpired),
    ("11-18L", PushBusinessErrorKind::TransactionRejected),
    ("20-07A", PushBusinessErrorKind::InvalidParameters),
    ("20-05A", PushBusinessErrorKind::InvalidParameters),
    ("11-37L", PushBusinessErrorKind::PermissionDenied),
];

impl PushBusinessErrorKind {
    pub fn from_code(code: &str) -> Self {
        BUSINESS_CODES
            .iter()
            .find(|(c, _)| *c == code.trim())
            .map(|(_, kind)| *kind)
            .unwrap_or(PushBusinessErrorKind::Unclassified)
    }
}

impl Display for PushBusinessErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AccountBlocked => "account blocked",
            Self::RecordNotFound => "record not found",
            Self::TransactionExpired => "transaction expired",
            Self::TransactionRejected => "transaction rejected",
            Self::InvalidParameters => "invalid parameters",
            Self::PermissionDenied => "permission denied",
            Self::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Tenant {0} has no payment provider configured")]
    NoProviderConfigured(TenantId),
    #[error("Tenant {0} has been deactivated")]
    TenantInactive(TenantId),
    #[error("Payment provider '{0}' is not implemented")]
    ProviderNotImplemented(String),
    #[error("{provider} does not support {operation}")]
    UnsupportedOperation { provider: String, operation: &'static str },
    #[error("The payment network refused to authorize the merchant. {0}")]
    UpstreamAuthError(String),
    #[error("The payment network rejected the request. {0}")]
    ProviderRejected(String),
    #[error("The payment network is unavailable. {0}")]
    UpstreamUnavailable(String),
    #[error("The payment network sent a response that could not be understood. {0}")]
    UnexpectedResponse(String),
    #[error("Merchant credentials are unavailable. {0}")]
    CredentialUnavailable(String),
    #[error("'{0}' is not a valid payer reference. Expected a 10-digit mobile number starting with 3")]
    InvalidPayerReference(String),
    #[error("Push payment {kind} [{code}]: {message}")]
    PushPaymentBusinessError { kind: PushBusinessErrorKind, code: String, message: String },
    #[error("Push transaction {0} does not exist")]
    TransactionNotFound(String),
    #[error("A push transaction cannot move from {from} to {to}")]
    InvalidTransition { from: PushStatus, to: PushStatus },
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("Configuration error. {0}")]
    Configuration(String),
    #[error("Storage error. {0}")]
    StoreError(#[from] StoreError),
}

impl SettlementError {
    /// Only failures where the network may never have seen the request are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    /// Map a network error raised while linking a merchant account. Any refusal from the network means the code or
    /// refresh token is no good.
    pub fn from_auth_failure(e: NetworkApiError) -> Self {
        match e {
            NetworkApiError::Unauthorized { message, .. } | NetworkApiError::Rejected { message, .. } => {
                Self::UpstreamAuthError(message)
            },
            other => other.into(),
        }
    }
}

impl From<NetworkApiError> for SettlementError {
    fn from(e: NetworkApiError) -> Self {
        match e {
            NetworkApiError::Transport(msg) => Self::UpstreamUnavailable(msg),
            NetworkApiError::Unauthorized { status, message } | NetworkApiError::Rejected { status, message } => {
                Self::ProviderRejected(format!("Error {status}. {message}"))
            },
            NetworkApiError::Business { code, message } => {
                let kind = PushBusinessErrorKind::from_code(&code);
                Self::PushPaymentBusinessError { kind, code, message }
            },
            NetworkApiError::JsonError(msg) | NetworkApiError::MissingField(msg) => Self::UnexpectedResponse(msg),
            NetworkApiError::Initialization(msg) | NetworkApiError::InvalidUrl(msg) => Self::Configuration(msg),
        }
    }
}

impl From<CipherError> for SettlementError {
    fn from(e: CipherError) -> Self {
        Self::CredentialUnavailable(e.to_string())
    }
}
