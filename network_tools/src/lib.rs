//! # Network tools
//!
//! Thin HTTP clients for the external services the settlement engine talks to. Each client translates between
//! plain Rust values and one network's JSON envelope; none of them retry, cache or persist anything. Those policies
//! belong to the engine.
//!
//! * [`CardNetworkApi`]: OAuth-linked card network (authorization URL, code exchange, checkout preferences)
//! * [`HostedCheckoutApi`]: hosted payment links
//! * [`PushNetworkApi`]: asynchronous push payments
//! * [`ClientCredentialsApi`]: client-credentials token exchange
//! * [`TransitApi`]: envelope encryption via an OpenBao/Vault transit engine
mod card_api;
mod config;
mod error;
mod hosted_api;
mod http;
mod oauth;
mod push_api;
mod transit;

pub mod data_objects;

pub use card_api::CardNetworkApi;
pub use config::{CardNetworkConfig, HostedCheckoutConfig, HttpSettings, PushNetworkConfig, TransitConfig};
pub use error::NetworkApiError;
pub use hosted_api::HostedCheckoutApi;
pub use oauth::ClientCredentialsApi;
pub use push_api::{PushNetworkApi, PUSH_STATUS_OK};
pub use transit::TransitApi;
