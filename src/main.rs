//! HTTP server binary for bilibili QR login
//!
//! Serves the QR login event stream and the cookie conversion utility.
//!
//! # Usage
//!
//! ```bash
//! bili-qr-login --port 3000 --host ::
//! ```
//!
//! # API Endpoints
//!
//! - `GET /api/qr?client=web|tv`: QR login event stream (SSE)
//! - `POST /api/convert`: Convert a cookie string for a cookie editor
//! - `GET /ping`: Health check endpoint

use bili_qr_login::cli::{ServerArgs, run_server_mode};
use clap::Parser;
use std::path::PathBuf;

/// QR login relay for bilibili
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bili-qr-login")]
struct Cli {
    /// Port to listen on [env: PORT] [default: 3000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to [env: HOST] [default: ::]
    #[arg(long)]
    host: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Development mode: admit every origin [env: QR_LOGIN_ENV or NODE_ENV=development]
    #[arg(long)]
    dev: bool,

    /// Comma separated trusted origins, `*` for any [env: TRUST_ORIGIN]
    #[arg(long, value_name = "ORIGINS")]
    trust_origin: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for ServerArgs {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            dev: cli.dev,
            trust_origin: cli.trust_origin,
            verbose: cli.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_server_mode(cli.into()).await
}
