//! Statica - a small static file server
//!
//! This is the main entry point for the Statica CLI.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use statica_core::config::{ConfigLoader, MountConfig, StaticaConfig, normalize_listen};
use statica_core::handler::{
    Handler, HttpRequest, HttpResponse, SharedHandler, decoded_path, not_found,
};
use statica_core::server::{bind, build_route, serve};
use statica_static::{CompressionLevel, StaticHandlerBuilder, directory_exists};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "statica")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server with a configuration file
    Run {
        /// Path to the configuration file (.toml or .json)
        #[arg(default_value = "statica.toml")]
        config: String,
    },

    /// Serve a single directory
    Serve {
        /// Directory to serve
        #[arg(default_value = ".")]
        dir: String,

        /// Address to listen on
        #[arg(long, default_value = ":8080")]
        listen: String,

        /// URL prefix of the files
        #[arg(long, default_value = "/")]
        path: String,

        /// Compress responses with gzip
        #[arg(long)]
        gzip: bool,

        /// Gzip level: fast, default or best
        #[arg(long, default_value = "default")]
        gzip_level: String,

        /// Allow directory listings
        #[arg(long)]
        listing: bool,

        /// Keep the URL prefix when resolving files
        #[arg(long)]
        no_strip: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "statica.toml")]
        config: String,
    },

    /// Show version information
    Version,
}

/// Dispatches requests to the first mount whose prefix matches
struct Mounts {
    mounts: Vec<(String, SharedHandler)>,
}

#[async_trait]
impl Handler for Mounts {
    async fn handle(&self, req: HttpRequest) -> HttpResponse {
        if let [(_, only)] = self.mounts.as_slice() {
            return only.handle(req).await;
        }

        let handler = {
            let path = decoded_path(req.uri().path());
            self.mounts
                .iter()
                .find(|(prefix, _)| path.starts_with(prefix.as_str()))
                .map(|(_, handler)| handler)
        };
        match handler {
            Some(handler) => handler.handle(req).await,
            None => not_found(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The config may turn on debug logging, so load it before the subscriber
    let loaded = match &cli.command {
        Commands::Run { config } | Commands::Validate { config } => Some(ConfigLoader::load(config)),
        _ => None,
    };
    let debug = cli.debug
        || matches!(&loaded, Some(Ok(config)) if config.debug);
    init_tracing(debug);

    match cli.command {
        Commands::Run { config: config_path } => {
            let config = loaded
                .context("configuration not loaded")?
                .with_context(|| format!("Failed to load config {config_path}"))?;
            tracing::info!("📄 Loaded configuration from: {}", config_path);
            run_server(config)?;
        }

        Commands::Serve {
            dir,
            listen,
            path,
            gzip,
            gzip_level,
            listing,
            no_strip,
        } => {
            tracing::info!("Starting file server on {} serving {}", listen, dir);
            let config = StaticaConfig {
                debug,
                listen: normalize_listen(&listen),
                mounts: vec![MountConfig {
                    root: dir,
                    path: Some(path),
                    gzip,
                    gzip_level,
                    listing,
                    strip_path: !no_strip,
                    except: Vec::new(),
                }],
            };
            config.validate()?;
            run_server(config)?;
        }

        Commands::Validate { config: config_path } => {
            let result = loaded
                .context("configuration not loaded")?
                .map_err(anyhow::Error::from)
                .and_then(|config| build_mounts(&config).map(|_| config));

            match result {
                Ok(config) => {
                    println!(
                        "✅ Configuration '{}' is valid! ({} mount(s))",
                        config_path,
                        config.mounts.len()
                    );
                }
                Err(e) => {
                    eprintln!("❌ Configuration Error: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Statica v{}", statica_core::VERSION);
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    if debug {
        tracing::debug!("Debug logging enabled");
    }
}

/// Create one builder per mount, exceptions included
fn mount_builders(config: &StaticaConfig) -> anyhow::Result<Vec<StaticHandlerBuilder>> {
    config.mounts.iter().map(mount_builder).collect()
}

fn mount_builder(mount: &MountConfig) -> anyhow::Result<StaticHandlerBuilder> {
    if !directory_exists(&mount.root) {
        tracing::warn!("⚠️ Root directory {} does not exist", mount.root);
    }

    let routes = mount
        .except
        .iter()
        .map(build_route)
        .collect::<statica_core::Result<Vec<_>>>()
        .with_context(|| format!("Invalid exception route for mount {}", mount.root))?;

    let level: CompressionLevel = mount
        .gzip_level
        .parse()
        .with_context(|| format!("Invalid gzip level for mount {}", mount.root))?;

    let mut builder = StaticHandlerBuilder::new(&mount.root)
        .gzip(mount.gzip)
        .gzip_level(level)
        .listing(mount.listing)
        .strip_path(mount.strip_path);
    if let Some(path) = &mount.path {
        builder = builder.path(path);
    }
    Ok(builder.except(routes))
}

fn build_mounts(config: &StaticaConfig) -> anyhow::Result<SharedHandler> {
    let mounts = mount_builders(config)?
        .iter()
        .map(|builder| (builder.config().request_path.clone(), builder.build()))
        .collect();
    Ok(Arc::new(Mounts { mounts }))
}

fn run_server(config: StaticaConfig) -> anyhow::Result<()> {
    let addr = config.listen_addr()?;
    let handler = build_mounts(&config)?;

    tracing::info!("🚀 Starting Statica v{}", statica_core::VERSION);
    tracing::info!("🔧 Configured {} mount(s)", config.mounts.len());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(serve_until_shutdown(addr, handler))
}

async fn serve_until_shutdown(addr: SocketAddr, handler: SharedHandler) -> anyhow::Result<()> {
    let listener = bind(addr).await?;
    serve(listener, handler, shutdown_signal()).await?;
    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("🛑 Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
