mod config;
mod errors;
mod files;
mod logging;
mod sandbox;
mod security;
mod server;
mod terminal;

use crate::config::Config;
use crate::sandbox::ConfinedRoot;
use anyhow::Context;
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("steward.toml");
    let mut i = 1;
    while i < args.len() {
        if args[i].as_str() == "--config" {
            i += 1;
            if i >= args.len() {
                eprintln!("--config requires a path");
                std::process::exit(2);
            }
            config_path = PathBuf::from(&args[i]);
        }
        i += 1;
    }

    let cfg = Config::load_or_default(&config_path).context("loading config")?;
    cfg.validate().context("validating config")?;

    let workdir = cfg.workdir().context("determining working directory")?;
    let root = ConfinedRoot::new(&workdir).context("canonicalizing working directory")?;

    if cfg.auth.bearer_token.is_none() {
        warn!("no bearer_token configured; terminal upgrade is unauthenticated");
    }

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    info!(addr = %addr, workdir = %root.path().display(), "steward ready");
    println!("steward ready addr={} workdir={}", addr, root.path().display());

    server::serve(cfg, root).await
}
