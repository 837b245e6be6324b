use clap::Parser;
use std::process::ExitCode;

use kvs_populate::cli::Cli;
use kvs_populate::config::{self, Settings};
use kvs_populate::error::RunStatus;
use kvs_populate::init::{bootstrap, BootstrapOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(RunStatus::ConfigError.exit_code());
        }
    };
    init_tracing(&settings.log_level);

    let options = BootstrapOptions {
        store_root: config::store_root(cli.key_value_store.as_deref(), &settings),
        connection_profile: cli.connection_profile,
        crypto_root: cli.crypto_config,
        naming: cli.naming.unwrap_or(settings.naming),
        domain: cli.domain.unwrap_or(settings.domain),
        keep_going: cli.keep_going,
    };

    let status = match bootstrap(&options).await {
        Ok(report) => {
            report.print();
            report.status()
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Something went wrong.");
            RunStatus::from_error(&e)
        }
    };
    ExitCode::from(status.exit_code())
}

// RUST_LOG wins over the settings file
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
