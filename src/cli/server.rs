//! Server mode CLI logic
//!
//! Contains the core logic for running the HTTP server mode.

use crate::{
    Settings,
    config::{ConfigLoader, settings::split_origin_list},
    server::app,
    session::SessionRegistry,
    utils::version,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Arguments for server mode
#[derive(Debug, Default)]
pub struct ServerArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub dev: bool,
    pub trust_origin: Option<String>,
    pub verbose: bool,
}

impl ServerArgs {
    /// Apply command line overrides, the highest precedence source
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.dev {
            settings.server.development = true;
        }
        if let Some(origins) = &self.trust_origin {
            settings.admission.trust_origins = split_origin_list(origins);
        }
        if self.verbose {
            settings.logging.verbose = true;
            settings.logging.level = "debug".to_string();
        }
        settings
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
pub fn init_logging(settings: &Settings) {
    let level = if settings.logging.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    let settings = ConfigLoader::new()
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;
    let settings = args.apply(settings);
    settings.validate().context("Invalid configuration")?;

    init_logging(&settings);

    tracing::info!("Starting {}", version::banner());
    if settings.server.development {
        tracing::warn!("Development mode: admission control is disabled");
    }
    tracing::info!(
        trust_origins = ?settings.admission.trust_origins,
        probe = settings.polling.validate_credential,
        "Admission and probe configuration"
    );

    let registry = Arc::new(SessionRegistry::new());
    let sweeper = registry.spawn_sweeper(
        settings.registry.sweep_interval(),
        settings.registry.inactivity_timeout(),
    );

    let addr = parse_and_bind_address(&settings.server.host, settings.server.port).await?;
    let app = app::create_app(settings, Arc::clone(&registry))?;

    tracing::info!("{} listening on {}", version::banner(), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;

    Ok(())
}

/// Parse host string and attempt to bind to the address
///
/// - First try to bind to IPv6 (::)
/// - If that fails, fall back to IPv4 (0.0.0.0)
pub async fn parse_and_bind_address(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    // Try to parse as IP address first
    if let Ok(ip) = host.parse::<IpAddr>() {
        let addr = SocketAddr::new(ip, port);
        if ip != IpAddr::V6(Ipv6Addr::UNSPECIFIED) {
            tracing::debug!("Parsed address: {}", addr);
            return Ok(addr);
        }
    }

    match host {
        "::" => {
            let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
            tracing::debug!("Using IPv6 any address: {}", addr);

            // Test if we can bind to IPv6
            match tokio::net::TcpListener::bind(addr).await {
                Ok(_) => {
                    tracing::info!("Successfully bound to IPv6 address {}", addr);
                    Ok(addr)
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not listen on [::]:{} (Caused by {}), falling back to 0.0.0.0",
                        port,
                        e
                    );
                    let fallback_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
                    tracing::info!("Using IPv4 fallback address: {}", fallback_addr);
                    Ok(fallback_addr)
                }
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid host address: {}. Use '::' for IPv6 or '0.0.0.0' for IPv4",
                host
            );
        }
    }
}
