//! The application context: explicit owner of the session controller and the
//! shared history, handed to every consuming view. Lives from [`AppContext::init`]
//! to [`AppContext::teardown`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use satya_core::Session;
use satya_runtime_config::ClientConfig;

use crate::catalog::CatalogLoader;
use crate::detail::DetailView;
use crate::error::{ClientError, Result};
use crate::history::HistoryList;
use crate::ports::{ClaimsCatalog, DataStore, IdentityProvider, Navigator, VerdictService};
use crate::session::{RouteGuard, SessionController, SessionState, Visibility};
use crate::verify::ClaimSubmitter;

/// The external collaborators, already bound.
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DataStore>,
    pub verdicts: Arc<dyn VerdictService>,
    pub catalog: Arc<dyn ClaimsCatalog>,
    pub navigator: Arc<dyn Navigator>,
}

pub struct AppContext {
    session: Arc<SessionController>,
    history: Arc<HistoryList>,
    submitter: ClaimSubmitter,
    catalog: CatalogLoader,
    store: Arc<dyn DataStore>,
    session_watch: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    pub fn new(collaborators: Collaborators, config: &ClientConfig) -> Self {
        let Collaborators {
            identity,
            store,
            verdicts,
            catalog,
            navigator,
        } = collaborators;
        Self {
            session: Arc::new(SessionController::new(
                identity,
                navigator,
                RouteGuard::from(&config.routes),
            )),
            history: Arc::new(HistoryList::new(store.clone(), config.history.page_size)),
            submitter: ClaimSubmitter::new(verdicts),
            catalog: CatalogLoader::new(catalog),
            store,
            session_watch: Mutex::new(None),
        }
    }

    /// Start the session controller and clear the history whenever the
    /// signed-in user changes or signs out.
    pub async fn init(&self) -> SessionState {
        {
            let mut watch = self
                .session_watch
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if watch.is_none() {
                *watch = Some(tokio::spawn(reset_history_on_user_change(
                    self.session.subscribe(),
                    self.history.clone(),
                )));
            }
        }
        let state = self.session.init().await;
        info!(
            "client ready ({})",
            match &state {
                SessionState::Authenticated(s) => s.email.as_str(),
                _ => "anonymous",
            }
        );
        state
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.session()
    }

    pub fn history(&self) -> &HistoryList {
        &self.history
    }

    pub fn submitter(&self) -> &ClaimSubmitter {
        &self.submitter
    }

    pub fn catalog(&self) -> &CatalogLoader {
        &self.catalog
    }

    /// A fresh detail view; nothing is cached across navigations.
    pub fn open_detail(&self) -> DetailView {
        DetailView::new(self.store.clone())
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> Option<SessionState> {
        self.session.set_visibility(visibility).await
    }

    /// Newest page of the signed-in user's history.
    pub async fn refresh_history(&self) -> Result<usize> {
        let session = self
            .current_session()
            .ok_or(ClientError::Unauthenticated("view history"))?;
        self.history.refresh(&session.user_id).await
    }

    pub async fn load_more_history(&self) -> Result<usize> {
        let session = self
            .current_session()
            .ok_or(ClientError::Unauthenticated("view history"))?;
        self.history.load_more(&session.user_id).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        let result = self.session.sign_out().await;
        self.history.reset();
        result
    }

    pub fn teardown(&self) {
        self.session.teardown();
        self.history.teardown();
        let watch = self
            .session_watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watch) = watch {
            watch.abort();
            debug!("application context torn down");
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn reset_history_on_user_change(
    mut states: tokio::sync::watch::Receiver<SessionState>,
    history: Arc<HistoryList>,
) {
    let mut last_user: Option<String> = states.borrow().session().map(|s| s.user_id.clone());
    while states.changed().await.is_ok() {
        let user = states
            .borrow_and_update()
            .session()
            .map(|s| s.user_id.clone());
        if last_user.is_some() && user != last_user {
            debug!("signed-in user changed; clearing history");
            history.reset();
        }
        last_user = user;
    }
}
