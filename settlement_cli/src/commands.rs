use std::{env, sync::Arc};

use log::*;
use serde::Serialize;
use settlement_engine::{
    db_types::{OrderId, TenantId},
    CheckoutApi,
    DecryptedCredentials,
    NewCheckout,
    ProviderFactory,
    SqliteStore,
    TokenCache,
};
use stl_common::{Currency, MinorUnits};

use crate::{
    cipher::AppCipher,
    cli::{CheckoutParams, Command, PushCommand, StoreCredentialsParams},
    config::AppConfig,
    errors::{CliError, ConfigError},
    push_watcher::start_push_watcher,
};

pub type AppApi = CheckoutApi<SqliteStore, AppCipher>;

/// Opens the database and wires the key service, token cache and provider adapters together.
pub async fn build_api(config: &AppConfig) -> Result<AppApi, CliError> {
    let store = SqliteStore::new_with_url(&config.database_url, config.max_connections).await?;
    let cipher = AppCipher::from_config(config)?;
    let tokens = Arc::new(TokenCache::new(&config.providers.http)?);
    let factory = ProviderFactory::new(config.providers.clone(), tokens)?;
    Ok(CheckoutApi::new(store, cipher, factory, config.commission))
}

pub async fn run_command(command: Command, config: AppConfig) -> Result<(), CliError> {
    if let Command::Envs = command {
        crate::cli::display_envs();
        return Ok(());
    }
    let api = build_api(&config).await?;
    match command {
        Command::RequestOnboarding(p) => {
            let request = api.request_onboarding(&TenantId::from(p.tenant.as_str()), &p.provider).await?;
            print_json(&request)
        },
        Command::CompleteOnboarding { target, code } => {
            let tenant = TenantId::from(target.tenant.as_str());
            let config = api.complete_onboarding(&tenant, &target.provider, &code).await?;
            print_json(&config)
        },
        Command::StoreCredentials(p) => {
            let credentials = manual_credentials(&p)?;
            let tenant = TenantId::from(p.target.tenant.as_str());
            let config = api.store_manual_credentials(&tenant, &p.target.provider, &credentials).await?;
            print_json(&config)
        },
        Command::SetProvider(p) => {
            let config = api.set_active_provider(&TenantId::from(p.tenant.as_str()), &p.provider).await?;
            print_json(&config)
        },
        Command::SetCommission { tenant, bps } => {
            let config = api.set_commission_override(&TenantId::from(tenant.as_str()), bps).await?;
            print_json(&config)
        },
        Command::Deactivate { tenant } => {
            let config = api.deactivate_tenant(&TenantId::from(tenant.as_str())).await?;
            print_json(&config)
        },
        Command::Checkout(p) => {
            let tenant = TenantId::from(p.tenant.as_str());
            let session = api.create_checkout(&tenant, new_checkout(&p)?).await?;
            print_json(&session)
        },
        Command::Push(push) => run_push_command(&api, push).await,
        Command::Watch => {
            let api = Arc::new(api);
            let worker = start_push_watcher(api, config.watch_interval, config.reconcile_on_start);
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("🕰️ Interrupted. Stopping the push payment watcher");
                },
                res = worker => {
                    if let Err(e) = res {
                        error!("🕰️ The push payment watcher stopped unexpectedly. {e}");
                    }
                },
            }
            Ok(())
        },
        Command::Envs => Ok(()),
    }
}

async fn run_push_command(api: &AppApi, command: PushCommand) -> Result<(), CliError> {
    match command {
        PushCommand::Initiate { tenant, payer, amount, order_id } => {
            let tx = api
                .initiate_push_payment(
                    &TenantId::from(tenant.as_str()),
                    &payer,
                    MinorUnits::from(amount),
                    &OrderId::from(order_id.as_str()),
                )
                .await?;
            print_json(&tx)
        },
        PushCommand::Poll { transaction_id } => print_json(&api.poll_push_payment(&transaction_id).await?),
        PushCommand::Cancel { transaction_id } => print_json(&api.cancel_push_payment(&transaction_id).await?),
        PushCommand::Reverse { transaction_id } => print_json(&api.reverse_push_payment(&transaction_id).await?),
        PushCommand::Reconcile => print_json(&api.reconcile_open_push_payments().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn new_checkout(params: &CheckoutParams) -> Result<NewCheckout, CliError> {
    let currency = params
        .currency
        .parse::<Currency>()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let mut checkout =
        NewCheckout::new(&params.order_id, MinorUnits::from(params.amount), currency, &params.description);
    for entry in &params.metadata {
        let (key, value) = parse_metadata(entry)?;
        checkout = checkout.with_metadata(key, value);
    }
    Ok(checkout)
}

fn parse_metadata(entry: &str) -> Result<(&str, &str), CliError> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(CliError::InvalidArgument(format!("Metadata must be given as key=value. Got '{entry}'"))),
    }
}

/// Secret values never come from the command line, so that they stay out of shell history.
fn manual_credentials(params: &StoreCredentialsParams) -> Result<DecryptedCredentials, CliError> {
    let access_token = env::var("STL_MANUAL_ACCESS_TOKEN").ok();
    let credentials = match (&params.client_id, access_token) {
        (Some(client_id), access_token) => {
            let client_secret = required_env("STL_MANUAL_CLIENT_SECRET")?;
            let api_key = required_env("STL_MANUAL_API_KEY")?;
            DecryptedCredentials::new(access_token.unwrap_or_default(), params.account_id.clone())
                .with_client_credentials(client_id, &client_secret, &api_key)
        },
        (None, Some(access_token)) => DecryptedCredentials::new(access_token, params.account_id.clone()),
        (None, None) => return Err(ConfigError::MissingValue("STL_MANUAL_ACCESS_TOKEN").into()),
    };
    Ok(match &params.public_key {
        Some(key) => credentials.with_public_key(key),
        None => credentials,
    })
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingValue(name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metadata_entries() {
        assert_eq!(parse_metadata("payer_reference=3001234567").unwrap(), ("payer_reference", "3001234567"));
        assert_eq!(parse_metadata(" note = a=b ").unwrap(), ("note", "a=b"));
        assert!(parse_metadata("no-separator").is_err());
        assert!(parse_metadata("=value").is_err());
    }

    #[test]
    fn checkout_from_arguments() {
        let params = CheckoutParams {
            tenant: "tenant-1".into(),
            order_id: "order-1".into(),
            amount: 50_000,
            currency: "cop".into(),
            description: "Two coffees".into(),
            metadata: vec!["payer_reference=3001234567".into()],
        };
        let checkout = new_checkout(&params).unwrap();
        assert_eq!(checkout.amount, MinorUnits::from(50_000));
        assert_eq!(checkout.currency.as_str(), "COP");
        assert_eq!(checkout.provider_metadata.get("payer_reference").map(String::as_str), Some("3001234567"));
    }
}
