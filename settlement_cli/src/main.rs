use clap::Parser;
use dotenvy::dotenv;
use settlement_cli::{cli::Arguments, commands::run_command, config::AppConfig};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let config = match AppConfig::from_env_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    };
    if let Err(e) = run_command(args.command, config).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
