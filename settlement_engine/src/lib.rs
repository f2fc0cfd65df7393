//! Settlement Engine
//!
//! The settlement engine lets a multi-tenant platform take payments on behalf of its merchants through several
//! payment networks, while keeping a platform commission on every sale. It is network-agnostic: each network lives
//! behind a [`providers::PaymentProvider`] adapter.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@db`] and [`traits`]). An SQLite backend and an in-memory backend implement the store traits.
//!    Tenant credentials are never stored in the clear; the [`vault`] encrypts them through an
//!    [`traits::EnvelopeCipher`] before they reach the store.
//! 2. Payment networks ([`providers`] and [`push_payment`]). Adapters translate the engine's checkout contract into
//!    each network's API. Push networks additionally have a transaction lifecycle that is polled to completion.
//! 3. The public API ([`stl_api`]). [`CheckoutApi`] is the entry point for onboarding, checkout and push payment
//!    operations.
pub mod db;

pub mod commission;
pub mod credentials;
pub mod db_types;
pub mod providers;
pub mod push_payment;
pub mod stl_api;
pub mod token_cache;
pub mod traits;
pub mod vault;

pub use commission::{CommissionPolicy, CommissionSplit};
pub use credentials::DecryptedCredentials;
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteStore;
pub use db::MemoryStore;
pub use providers::{CheckoutSession, ProviderFactory, ProviderRegistry, ProviderSettings};
pub use stl_api::{
    checkout_api::CheckoutApi,
    checkout_objects::{CancelOutcome, NewCheckout, OnboardingRequest, ReconcileSummary, ReverseOutcome},
    errors::{CipherError, PushBusinessErrorKind, SettlementError, StoreError},
};
pub use token_cache::TokenCache;
pub use vault::CredentialVault;
