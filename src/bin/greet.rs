//! greet — greeter CLI client
//!
//! Sends one greeting to greeterd and prints the reply.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::BoolishValueParser;
use tracing::error;

use greeter::client::{ClientConfig, greet_once};
use greeter::tls::{TlsFiles, TlsMaterial};

/// Greeter CLI client
#[derive(Parser)]
#[command(name = "greet")]
#[command(version = greeter::PKG_VERSION)]
#[command(about = "Send one greeting to greeterd")]
struct Args {
    /// Server address and port
    #[arg(short, long, env = "GREET_SERVER", default_value = "127.0.0.1:9000")]
    server: String,

    /// Name to greet with
    #[arg(short, long, default_value = "world")]
    name: String,

    /// Enable/disable mutual TLS
    #[arg(
        long,
        env = "GREET_TLS",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    tls: bool,

    /// CA root certificate file (for server validation)
    #[arg(long, default_value = "pki/ca.pem")]
    ca_cert_file: PathBuf,

    /// CA intermediate certificate file (for server validation)
    #[arg(long, default_value = "pki/support.pem")]
    int_cert_file: PathBuf,

    /// Client certificate file
    #[arg(long, default_value = "pki/client.pem")]
    cli_cert_file: PathBuf,

    /// Client certificate key file
    #[arg(long, default_value = "pki/client-key.pem")]
    cli_key_file: PathBuf,

    /// Name expected in the server certificate (default: host of --server)
    #[arg(long)]
    server_name: Option<String>,
}

impl Args {
    fn client_config(&self) -> greeter::Result<ClientConfig> {
        let mut config = ClientConfig::new(&self.server);
        if self.tls {
            let material = TlsMaterial::load(&TlsFiles {
                ca_cert: self.ca_cert_file.clone(),
                int_cert: self.int_cert_file.clone(),
                cert: self.cli_cert_file.clone(),
                key: self.cli_key_file.clone(),
            })?;
            config = config.with_tls(material);
        }
        if let Some(name) = &self.server_name {
            config = config.with_server_name(name);
        }
        config.endpoint_uri()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let result = match args.client_config() {
        Ok(config) => greet_once(&config, &args.name).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, server = %args.server, "could not greet");
            ExitCode::FAILURE
        }
    }
}
