//! Rapid Dev Proxy
//!
//! Host-based reverse proxy for local development.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ──▶ host selection ──▶ router ──▶ forwarder ──▶ Backend
//!                    (middleware)    (query, header,    (exact,      (timeout,
//!                                     path, Host)        alias,       no redirects)
//!                                                        wildcard,
//!                                                        default)
//!     Client Response
//!     ◀───────────── response relay (streamed, idle timeout) ◀──────────────────── Backend
//!
//!     Cross-cutting: config (JSON/YAML/TOML + hot reload), logging, stats, shutdown
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rapid_dev_proxy::config::watcher::ConfigWatcher;
use rapid_dev_proxy::config::{load_config, write_sample_config, ConfigError, ProxyConfig};
use rapid_dev_proxy::lifecycle::{wait_for_signal, Shutdown};
use rapid_dev_proxy::observability::logging::init_logging;
use rapid_dev_proxy::HttpServer;

const CONFIG_ENV: &str = "RAPID_PROXY_CONFIG_FILE";

#[derive(Parser)]
#[command(name = "rapid-dev-proxy", version)]
#[command(about = "Host-based reverse proxy for local development", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Start {
        #[arg(short, long, env = CONFIG_ENV, default_value = "config.json")]
        config: PathBuf,

        /// Override proxy.host
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Override proxy.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Reload routes when the config file changes
        #[arg(long)]
        reload: bool,

        /// Log at debug level
        #[arg(long)]
        debug: bool,
    },
    /// Check a configuration file and report every problem
    Validate {
        #[arg(short, long, env = CONFIG_ENV, default_value = "config.json")]
        config: PathBuf,
    },
    /// Write a sample configuration file
    Init {
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
    /// Print the routing table
    Routes {
        #[arg(short, long, env = CONFIG_ENV, default_value = "config.json")]
        config: PathBuf,
    },
    /// Print version information
    Version,
}

/// CLI flags applied on top of the file, on startup and on every reload.
#[derive(Clone, Default)]
struct Overrides {
    host: Option<String>,
    port: Option<u16>,
    debug: bool,
}

impl Overrides {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(host) = &self.host {
            config.proxy.host = host.clone();
        }
        if let Some(port) = self.port {
            config.proxy.port = port;
        }
        if self.debug {
            config.logging.level = "DEBUG".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            config,
            host,
            port,
            reload,
            debug,
        } => start(&config, Overrides { host, port, debug }, reload).await,
        Commands::Validate { config } => validate(&config),
        Commands::Init { output } => init(&output),
        Commands::Routes { config } => routes(&config),
        Commands::Version => {
            println!("rapid-dev-proxy {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn start(
    path: &Path,
    overrides: Overrides,
    reload: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config);
    init_logging(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        "rapid-dev-proxy starting"
    );

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    print_routes(&config);

    let shutdown = Arc::new(Shutdown::new());
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    // Keeps the OS watch alive for as long as the server runs.
    let _watcher = if reload {
        let (watcher, mut file_updates) = ConfigWatcher::new(path);
        let handle = watcher.run()?;
        tokio::spawn(async move {
            while let Some(mut new_config) = file_updates.recv().await {
                overrides.apply(&mut new_config);
                if update_tx.send(new_config).is_err() {
                    break;
                }
            }
        });
        Some(handle)
    } else {
        drop(update_tx);
        None
    };

    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config);
    server.run(listener, update_rx, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match load_config(path) {
        Ok(config) => {
            println!("Configuration is valid: {}", path.display());
            println!("  Routes:  {}", config.routes.len());
            println!("  Default: {}", config.default.target);
            println!("  Listen:  {}", config.bind_address());
            println!();
            print_routes(&config);
            Ok(())
        }
        Err(ConfigError::Validation(errors)) => {
            eprintln!("Configuration is invalid: {}", path.display());
            for error in &errors {
                eprintln!("  - {error}");
            }
            Err(format!("{} validation error(s)", errors.len()).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn init(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() {
        return Err(format!("{} already exists", output.display()).into());
    }
    write_sample_config(output)?;
    println!("Sample configuration written to {}", output.display());
    println!("Start the proxy with: rapid-dev-proxy start -c {}", output.display());
    Ok(())
}

fn routes(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    print_routes(&config);
    Ok(())
}

fn print_routes(config: &ProxyConfig) {
    let width = config
        .routes
        .iter()
        .map(|(domain, _)| domain.len())
        .max()
        .unwrap_or(0)
        .max("DOMAIN".len());

    println!("{:<width$}  {:<28}  {:<20}  DESCRIPTION", "DOMAIN", "TARGET", "ALIASES");
    for (domain, route) in config.routes.iter() {
        let aliases = if route.aliases.is_empty() {
            "-".to_string()
        } else {
            route.aliases.join(", ")
        };
        println!(
            "{:<width$}  {:<28}  {:<20}  {}",
            domain,
            route.target,
            aliases,
            route.description()
        );
    }
    println!("{:<width$}  {}", "(default)", config.default.target);
}
