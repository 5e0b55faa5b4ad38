//! Federation node.
//!
//! Loads `modfed.toml` (or the file given with `--config`), registers the HTTP
//! and mock bots plus every built-in transport found in the configuration, and
//! runs until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package modfed-relay -- --config demos/relay/modfed.toml
//! ```
//!
//! Then submit an action through the panel:
//!
//! ```bash
//! curl -d action_type=ban -d target_user_id=U1 -d action_moderator_id=M1 \
//!      -d action_reason=spam -d action_reason_type=spam \
//!      http://127.0.0.1:8080/action
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use modfed::core::mock::MockBot;
use modfed::prelude::*;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file, instead of searching for modfed.toml / modfed.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production"
    #[arg(short, long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = FederationRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let mut runtime = builder.build()?;

    let http_bots = runtime.register_configured_bots::<HttpBot>()?;
    let mock_bots = runtime.register_configured_bots::<MockBot>()?;
    let transports = runtime.register_builtin_transports()?;
    info!(
        bots = http_bots.len() + mock_bots.len(),
        transports = transports.len(),
        "Federation node configured"
    );

    runtime.run().await?;

    Ok(())
}
