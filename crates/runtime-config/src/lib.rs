//! Client configuration types.
//!
//! The CLI reads and writes `satya.toml` using these types. File location
//! and I/O live in the CLI crate; this crate only knows the shape, the
//! defaults and the environment overrides.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "satya.toml";

/// Persisted identity session, stored next to the config file.
pub const SESSION_FILE_NAME: &str = "session.json";

pub const ENV_BACKEND_URL: &str = "SATYA_BACKEND_URL";
pub const ENV_STORE_URL: &str = "SATYA_STORE_URL";
pub const ENV_AUTH_URL: &str = "SATYA_AUTH_URL";
pub const ENV_ANON_KEY: &str = "SATYA_ANON_KEY";

/// Top-level client configuration (persisted as `satya.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub routes: RouteSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

/// Verdict service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Remote data store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: default_store_timeout(),
        }
    }
}

/// Identity provider. An empty `url` or `anon_key` falls back to the
/// store's, since both are usually served by the same project.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteSettings {
    /// Routes reachable without a session.
    #[serde(default = "default_public_routes")]
    pub public: Vec<String>,
    #[serde(default = "default_sign_in_route")]
    pub sign_in: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            public: default_public_routes(),
            sign_in: default_sign_in_route(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl ClientConfig {
    /// Parse TOML; unknown keys are ignored and missing keys take defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(raw)?;
        config.apply_fallbacks();
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply `SATYA_*` overrides. `lookup` is `std::env::var` in production.
    /// Returns true when any field changed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut changed = false;
        let mut set = |field: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                if *field != value {
                    *field = value;
                    changed = true;
                }
            }
        };
        set(&mut self.backend.url, ENV_BACKEND_URL);
        set(&mut self.store.url, ENV_STORE_URL);
        set(&mut self.auth.url, ENV_AUTH_URL);
        set(&mut self.store.anon_key, ENV_ANON_KEY);
        changed
    }

    /// Repair values that would make the client unusable.
    /// Returns true when any field was updated.
    pub fn apply_fallbacks(&mut self) -> bool {
        let mut changed = false;
        if self.backend.url.trim().is_empty() {
            self.backend.url = default_backend_url();
            changed = true;
        }
        if self.history.page_size == 0 {
            self.history.page_size = default_page_size();
            changed = true;
        }
        if self.routes.sign_in.trim().is_empty() {
            self.routes.sign_in = default_sign_in_route();
            changed = true;
        }
        changed
    }

    pub fn auth_url(&self) -> &str {
        if self.auth.url.is_empty() {
            &self.store.url
        } else {
            &self.auth.url
        }
    }

    pub fn auth_anon_key(&self) -> &str {
        if self.auth.anon_key.is_empty() {
            &self.store.anon_key
        } else {
            &self.auth.anon_key
        }
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_backend_timeout() -> u64 {
    60
}
fn default_store_timeout() -> u64 {
    15
}
fn default_sign_in_route() -> String {
    "/login".to_string()
}
fn default_page_size() -> usize {
    20
}

pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/", "/landing", "/login", "/signup"];

pub fn default_public_routes() -> Vec<String> {
    DEFAULT_PUBLIC_ROUTES
        .iter()
        .map(|route| (*route).to_string())
        .collect()
}
