//! greeterd — greeter daemon.
//!
//! Serves the `Greeter` gRPC service, requiring mutual TLS unless disabled,
//! until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::BoolishValueParser;
use tracing::{error, info};

use greeter::server::config::Config;
use greeter::server::{Daemon, shutdown_signal};

/// Greeter daemon — mutually-authenticated greeting service.
#[derive(Parser)]
#[command(name = "greeterd")]
#[command(version = greeter::PKG_VERSION)]
#[command(about = "Greeter gRPC daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "GREETERD_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (binds all interfaces unless --address is given).
    #[arg(short, long, env = "GREETERD_PORT")]
    port: Option<u16>,

    /// Full listen address, e.g. 127.0.0.1:9000.
    #[arg(long, env = "GREETERD_ADDRESS")]
    address: Option<String>,

    /// Enable/disable mutual TLS.
    #[arg(
        long,
        env = "GREETERD_TLS",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    tls: Option<bool>,

    /// CA root certificate file (for client validation).
    #[arg(long)]
    ca_cert_file: Option<PathBuf>,

    /// CA intermediate certificate file (for client validation).
    #[arg(long)]
    int_cert_file: Option<PathBuf>,

    /// Server certificate file.
    #[arg(long)]
    srv_cert_file: Option<PathBuf>,

    /// Server certificate key file.
    #[arg(long)]
    srv_key_file: Option<PathBuf>,

    /// Name reported in greetings (default: hostname).
    #[arg(long, env = "GREETERD_IDENTITY")]
    identity: Option<String>,

    /// Seconds in-flight requests may run after an interrupt.
    #[arg(long)]
    grace_period_secs: Option<u64>,
}

impl Args {
    /// Layer command-line values over the file/default configuration.
    fn apply(self, mut config: Config) -> greeter::Result<Config> {
        if let Some(address) = self.address {
            config.server.address = address;
        }
        if let Some(port) = self.port {
            let mut addr = config.socket_addr()?;
            addr.set_port(port);
            config.server.address = addr.to_string();
        }
        if let Some(enabled) = self.tls {
            config.tls.enabled = enabled;
        }
        if let Some(path) = self.ca_cert_file {
            config.tls.ca_cert_file = path;
        }
        if let Some(path) = self.int_cert_file {
            config.tls.int_cert_file = path;
        }
        if let Some(path) = self.srv_cert_file {
            config.tls.cert_file = path;
        }
        if let Some(path) = self.srv_key_file {
            config.tls.key_file = path;
        }
        if self.identity.is_some() {
            config.server.identity = self.identity;
        }
        if let Some(secs) = self.grace_period_secs {
            config.server.grace_period_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, transient = e.is_transient(), "greeterd failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> greeter::Result<()> {
    let file_config = Config::load(args.config.as_deref())?;
    let config = args.apply(file_config)?;

    info!(
        version = greeter::version_string(),
        address = %config.server.address,
        tls = config.tls.enabled,
        "greeterd starting"
    );

    let daemon = Daemon::bind(&config).await?;
    daemon.serve_with_shutdown(shutdown_signal()).await
}
