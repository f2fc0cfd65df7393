//! # Settlement engine public API
//!
//! [`checkout_api::CheckoutApi`] is the programmatic entry point of the engine. It is created from a store backend
//! that implements the [`crate::traits::SettlementStore`] traits, an [`crate::traits::EnvelopeCipher`], a
//! [`crate::providers::ProviderFactory`] and the platform's [`crate::CommissionPolicy`].
//!
//! ```rust,ignore
//! use settlement_engine::{CheckoutApi, CommissionPolicy, ProviderFactory, ProviderSettings, SqliteStore};
//! let store = SqliteStore::new_from_env(5).await?;
//! let tokens = Arc::new(TokenCache::new(&settings.http)?);
//! let api = CheckoutApi::new(store, cipher, ProviderFactory::new(settings, tokens)?, CommissionPolicy::default());
//! let session = api.create_checkout(&tenant_id, checkout).await?;
//! ```
//!
//! * [`checkout_objects`] holds the request and outcome types of the API.
//! * [`errors`] holds every error the engine returns.
pub mod checkout_api;
pub mod checkout_objects;
pub mod errors;
