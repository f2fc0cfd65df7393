//! # Collaborator contracts
//!
//! The engine never talks to a database or a key service directly. It goes through these traits, which backends
//! implement:
//!
//! * [`TenantConfigStore`] holds each tenant's public provider record and its encrypted secret record.
//! * [`PushTransactionStore`] holds push payment records between polls.
//! * [`EnvelopeCipher`] encrypts and decrypts under one named key held by an external key service.
//!
//! [`SettlementStore`] is implemented for anything that provides both store traits.
mod envelope_cipher;
mod push_transaction_store;
mod tenant_config_store;

pub use envelope_cipher::EnvelopeCipher;
pub use push_transaction_store::PushTransactionStore;
pub use tenant_config_store::TenantConfigStore;

pub trait SettlementStore: TenantConfigStore + PushTransactionStore {}

impl<T> SettlementStore for T where T: TenantConfigStore + PushTransactionStore {}
