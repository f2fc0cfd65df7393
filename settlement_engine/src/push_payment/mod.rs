//! # Push payments
//!
//! Push networks do not redirect the payer to a checkout page. Instead the merchant asks the network to send a
//! payment request to the payer's phone, and then polls until the payer accepts, declines, or the request expires.
//!
//! * [`PushStatus`] is the transaction state machine and the fixed mapping from network status codes.
//! * [`RetryPolicy`] is the bounded backoff applied to every network call.
//! * [`PushPaymentService`] performs the network calls.
mod payer;
mod retry;
mod service;
mod status;

pub use payer::normalize_payer_reference;
pub use retry::RetryPolicy;
pub use service::{PushPaymentService, ReversalOutcome};
pub use status::{PushStatus, PushStatusReport};
