use std::{env, env::VarError};

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Operator tool for the tenant checkout settlement engine")]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "onboard", about = "Print the URL a merchant visits to link their account")]
    RequestOnboarding(TenantProviderParams),
    #[clap(name = "complete-onboarding", about = "Exchange the authorization code sent back by the network")]
    CompleteOnboarding {
        #[command(flatten)]
        target: TenantProviderParams,
        /// The one-time authorization code
        #[arg(short = 'c', long = "code")]
        code: String,
    },
    #[clap(
        name = "store-credentials",
        about = "Store credentials a merchant entered by hand. Secret values are read from STL_MANUAL_* variables"
    )]
    StoreCredentials(StoreCredentialsParams),
    #[clap(name = "set-provider", about = "Switch a tenant to another payment provider")]
    SetProvider(TenantProviderParams),
    #[clap(name = "set-commission", about = "Override the platform commission for a tenant")]
    SetCommission {
        #[arg(short = 't', long = "tenant")]
        tenant: String,
        /// Commission in basis points. Leave out to return to the platform default.
        #[arg(short = 'b', long = "bps")]
        bps: Option<u32>,
    },
    #[clap(name = "deactivate", about = "Soft-deactivate a tenant")]
    Deactivate {
        #[arg(short = 't', long = "tenant")]
        tenant: String,
    },
    #[clap(name = "checkout", about = "Create a checkout with the tenant's active provider")]
    Checkout(CheckoutParams),
    #[command(subcommand)]
    Push(PushCommand),
    #[clap(name = "watch", about = "Poll open push payments until interrupted")]
    Watch,
    #[clap(name = "envs", about = "Show the non-secret environment configuration")]
    Envs,
}

#[derive(Debug, Subcommand)]
pub enum PushCommand {
    #[clap(name = "initiate", about = "Send a payment request to a payer's phone")]
    Initiate {
        #[arg(short = 't', long = "tenant")]
        tenant: String,
        /// The payer's 10-digit mobile number
        #[arg(short = 'p', long = "payer")]
        payer: String,
        /// Amount in minor units
        #[arg(short = 'a', long = "amount")]
        amount: i64,
        #[arg(short = 'o', long = "order")]
        order_id: String,
    },
    #[clap(name = "poll")]
    Poll { transaction_id: String },
    #[clap(name = "cancel")]
    Cancel { transaction_id: String },
    #[clap(name = "reverse", about = "Return the funds of a settled or unknown push payment")]
    Reverse { transaction_id: String },
    #[clap(name = "reconcile", about = "Poll every open push payment once")]
    Reconcile,
}

#[derive(Debug, Args)]
pub struct TenantProviderParams {
    #[arg(short = 't', long = "tenant")]
    pub tenant: String,
    /// cardNetworkA, hostedCheckoutB or pushNetworkC
    #[arg(short = 'p', long = "provider")]
    pub provider: String,
}

#[derive(Debug, Args)]
pub struct StoreCredentialsParams {
    #[command(flatten)]
    pub target: TenantProviderParams,
    /// The merchant's account (or commerce code) at the network
    #[arg(short = 'a', long = "account")]
    pub account_id: String,
    /// Client id for networks using client-credentials auth
    #[arg(long = "client-id")]
    pub client_id: Option<String>,
    #[arg(long = "public-key")]
    pub public_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckoutParams {
    #[arg(short = 't', long = "tenant")]
    pub tenant: String,
    #[arg(short = 'o', long = "order")]
    pub order_id: String,
    /// Amount in minor units
    #[arg(short = 'a', long = "amount")]
    pub amount: i64,
    #[arg(short = 'c', long = "currency", default_value = "COP")]
    pub currency: String,
    #[arg(short = 'd', long = "description")]
    pub description: String,
    /// Extra provider fields, as key=value
    #[arg(short = 'm', long = "meta")]
    pub metadata: Vec<String>,
}

pub fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "STL_DATABASE_URL",
        "STL_DATABASE_MAX_CONNECTIONS",
        "STL_TRANSIT_ADDR",
        "STL_TRANSIT_KEY",
        "STL_COMMISSION_BPS",
        "STL_HTTP_TIMEOUT_SECS",
        "STL_CARD_AUTH_BASE_URL",
        "STL_CARD_API_BASE_URL",
        "STL_CARD_CLIENT_ID",
        "STL_CARD_NOTIFICATION_URL",
        "STL_HOSTED_API_BASE_URL",
        "STL_HOSTED_CHECKOUT_BASE_URL",
        "STL_PUSH_API_BASE_URL",
        "STL_PUSH_AUTH_URL",
        "STL_ONBOARDING_REDIRECT_URI",
        "STL_RETRY_BASE_DELAY_MS",
        "STL_WATCH_INTERVAL_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
