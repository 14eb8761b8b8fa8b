use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use satya_runtime_config::ClientConfig;

use crate::config;

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus SATYA_* overrides).
    Show,
    /// Create or update `~/.config/satya/satya.toml`.
    Init(InitArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct InitArgs {
    /// Verdict service base URL.
    #[arg(long)]
    pub backend_url: Option<String>,
    /// Data store base URL.
    #[arg(long)]
    pub store_url: Option<String>,
    /// Anonymous (public) key for the data store.
    #[arg(long)]
    pub anon_key: Option<String>,
    /// Identity provider base URL, when it differs from the store.
    #[arg(long)]
    pub auth_url: Option<String>,
    /// History page size.
    #[arg(long)]
    pub page_size: Option<usize>,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => config::show_config(&config::load_config()?),
        ConfigAction::Init(init) => run_init(init),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let mut cfg = config::read_config_file(&config::config_path()?);
    apply_init(&mut cfg, args)?;
    let path = config::save_config(&cfg)?;
    println!("Configuration written to {}", path.display());
    println!();
    config::show_config(&cfg)
}

/// Apply the flags given to `config init`; unset flags keep current values.
pub fn apply_init(cfg: &mut ClientConfig, args: InitArgs) -> Result<()> {
    if let Some(url) = args.backend_url {
        cfg.backend.url = normalize_base_url(&url)?;
    }
    if let Some(url) = args.store_url {
        cfg.store.url = normalize_base_url(&url)?;
    }
    if let Some(url) = args.auth_url {
        cfg.auth.url = normalize_base_url(&url)?;
    }
    if let Some(key) = args.anon_key {
        cfg.store.anon_key = key.trim().to_string();
    }
    if let Some(size) = args.page_size {
        if size == 0 {
            bail!("page_size must be at least 1");
        }
        cfg.history.page_size = size;
    }
    Ok(())
}

fn normalize_base_url(value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("URL cannot be empty");
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        bail!("URL must start with http:// or https:// (got {trimmed})");
    }
    Ok(trimmed.to_string())
}
