//! Wires the HTTP clients into an [`AppContext`] for one command run.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::debug;

use satya_api_client::{ApiClient, AuthClient, StoreClient};
use satya_client::ports::Navigator;
use satya_client::{AppContext, Collaborators, RemoteStore, SessionState};
use satya_core::Session;
use satya_runtime_config::{ClientConfig, ENV_STORE_URL};

use crate::config;

/// The "current page" of a command run. A redirect is recorded, not followed.
pub struct RouteNavigator {
    route: Mutex<String>,
    redirected: Mutex<Option<String>>,
}

impl RouteNavigator {
    pub fn new(route: &str) -> Self {
        Self {
            route: Mutex::new(route.to_string()),
            redirected: Mutex::new(None),
        }
    }

    pub fn redirected_to(&self) -> Option<String> {
        self.redirected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RouteNavigator {
    fn current_route(&self) -> String {
        self.route
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn redirect(&self, route: &str) {
        debug!("redirect to {route}");
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = route.to_string();
        *self
            .redirected
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(route.to_string());
    }
}

pub struct App {
    pub config: ClientConfig,
    pub auth: Arc<AuthClient>,
    pub api: Arc<ApiClient>,
    navigator: Arc<RouteNavigator>,
    route: String,
    pub ctx: AppContext,
}

impl App {
    /// Build the clients from the effective config and restore the
    /// persisted session, as if opening `route`.
    pub fn open(route: &str) -> Result<Self> {
        let config = config::load_config()?;
        let store_timeout = Duration::from_secs(config.store.timeout_secs);

        let auth = Arc::new(AuthClient::new(
            config.auth_url(),
            config.auth_anon_key(),
            store_timeout,
        )?);
        if let Some(stored) = config::load_session()? {
            auth.restore(stored);
        }
        let store = StoreClient::new(&config.store.url, &config.store.anon_key, store_timeout)?;
        let api = Arc::new(ApiClient::new(
            &config.backend.url,
            Duration::from_secs(config.backend.timeout_secs),
        )?);
        let navigator = Arc::new(RouteNavigator::new(route));

        let ctx = AppContext::new(
            Collaborators {
                identity: auth.clone(),
                store: Arc::new(RemoteStore::new(store, Some(auth.clone()))),
                verdicts: api.clone(),
                catalog: api.clone(),
                navigator: navigator.clone(),
            },
            &config,
        );
        Ok(Self {
            config,
            auth,
            api,
            navigator,
            route: route.to_string(),
            ctx,
        })
    }

    /// Run the startup probe. Fails when the route is gated and there is no
    /// session.
    pub async fn start(&self) -> Result<SessionState> {
        let state = self.ctx.init().await;
        self.persist_session()?;
        if let Some(target) = self.navigator.redirected_to() {
            bail!(
                "{} requires a signed-in user (redirected to {target}); run `satya login` first",
                self.route
            );
        }
        Ok(state)
    }

    pub fn session(&self) -> Option<Session> {
        self.ctx.current_session()
    }

    /// Write whatever session the identity client holds now, or remove the
    /// file when signed out.
    pub fn persist_session(&self) -> Result<()> {
        match self.auth.snapshot() {
            Some(stored) => config::save_session(&stored),
            None => config::clear_session(),
        }
    }

    pub fn require_store(&self) -> Result<()> {
        if self.config.store.url.trim().is_empty() {
            bail!(
                "data store URL is not configured; set [store] url in {} or {ENV_STORE_URL}",
                config::config_path()?.display()
            );
        }
        Ok(())
    }

    pub fn require_auth(&self) -> Result<()> {
        if self.config.auth_url().trim().is_empty() {
            bail!(
                "identity provider URL is not configured; set [auth] url or [store] url in {}",
                config::config_path()?.display()
            );
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        self.persist_session()?;
        self.ctx.teardown();
        debug!("command finished");
        Ok(())
    }
}
