use anyhow::{Context, Result};
use satya_api_client::StoredSession;
use satya_runtime_config::{CONFIG_FILE_NAME, ClientConfig, SESSION_FILE_NAME};
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/satya/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("satya"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn session_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SESSION_FILE_NAME))
}

/// Read the config file alone. A missing or unparsable file yields defaults.
pub fn read_config_file(path: &Path) -> ClientConfig {
    let Ok(content) = std::fs::read_to_string(path) else {
        return ClientConfig::default();
    };
    match ClientConfig::from_toml_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("ignoring unreadable config at {}: {e}", path.display());
            ClientConfig::default()
        }
    }
}

/// Effective config: file, then `SATYA_*` environment overrides.
pub fn load_config() -> Result<ClientConfig> {
    let mut config = read_config_file(&config_path()?);
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

pub fn save_config(config: &ClientConfig) -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config dir at {}", dir.display()))?;
    let content = config.to_toml_string().context("Failed to serialize config")?;
    let path = config_path()?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    Ok(path)
}

/// The persisted identity session, if any. A corrupt file is treated as
/// signed out.
pub fn load_session() -> Result<Option<StoredSession>> {
    let path = session_path()?;
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    match serde_json::from_str(&content) {
        Ok(stored) => Ok(Some(stored)),
        Err(e) => {
            tracing::warn!("discarding unreadable session at {}: {e}", path.display());
            Ok(None)
        }
    }
}

pub fn save_session(stored: &StoredSession) -> Result<()> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config dir at {}", dir.display()))?;
    let path = session_path()?;
    let content = serde_json::to_string_pretty(stored).context("Failed to serialize session")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write session at {}", path.display()))?;
    restrict_permissions(&path);
    Ok(())
}

pub fn clear_session() -> Result<()> {
    let path = session_path()?;
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove session at {}", path.display()))?;
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::warn!("could not restrict {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// Print current config.
pub fn show_config(config: &ClientConfig) -> Result<()> {
    let path = config_path()?;
    println!("Config file: {}", path.display());
    println!();
    println!("[backend]");
    println!("  url          = {}", config.backend.url);
    println!("  timeout_secs = {}", config.backend.timeout_secs);
    println!();
    println!("[store]");
    println!("  url          = {}", or_unset(&config.store.url));
    println!("  anon_key     = {}", masked(&config.store.anon_key));
    println!("  timeout_secs = {}", config.store.timeout_secs);
    println!();
    println!("[auth]");
    println!("  url      = {}", or_unset(config.auth_url()));
    println!("  anon_key = {}", masked(config.auth_anon_key()));
    println!();
    println!("[routes]");
    println!("  public  = {}", config.routes.public.join(", "));
    println!("  sign_in = {}", config.routes.sign_in);
    println!();
    println!("[history]");
    println!("  page_size = {}", config.history.page_size);
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn masked(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}...", key.chars().take(8).collect::<String>())
    }
}
