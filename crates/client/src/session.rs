//! Session lifecycle: who the current user is, and whether the current
//! route may be shown to them.
//!
//! Two writers race to set the state: the session probe (on start and on
//! every hidden→visible transition) and the identity provider's event
//! listener. Both go through [`Shared::apply`], which consults
//! [`should_apply`] and the liveness flag before writing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use satya_core::{AuthEvent, AuthEventKind, Session};
use satya_runtime_config::RouteSettings;

use crate::error::{ClientError, Result};
use crate::liveness::Liveness;
use crate::ports::{IdentityProvider, Navigator, Unsubscribe};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Initializing,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// `None` while nothing has been observed yet.
    fn presence(&self) -> Option<bool> {
        match self {
            Self::Initializing => None,
            Self::Anonymous => Some(false),
            Self::Authenticated(_) => Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// One reading of "is there a session", stamped with when it was taken:
/// the issue time of a probe, or the receipt time of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub session: Option<Session>,
    pub as_of: DateTime<Utc>,
}

/// Whether `incoming` may overwrite `current`, last set at `current_as_of`.
///
/// Readings that agree on presence always apply (last write wins). Readings
/// that disagree apply only when strictly newer.
pub fn should_apply(
    current: &SessionState,
    current_as_of: Option<DateTime<Utc>>,
    incoming: &Observation,
) -> bool {
    let (Some(present), Some(as_of)) = (current.presence(), current_as_of) else {
        return true;
    };
    present == incoming.session.is_some() || incoming.as_of > as_of
}

/// Static public allow-list plus the sign-in route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    public: Vec<String>,
    sign_in: String,
}

impl RouteGuard {
    pub fn new<I, S>(public: I, sign_in: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            public: public
                .into_iter()
                .map(|r| normalize_route(&r.into()).to_string())
                .collect(),
            sign_in: sign_in.to_string(),
        }
    }

    pub fn sign_in(&self) -> &str {
        &self.sign_in
    }

    pub fn is_public(&self, route: &str) -> bool {
        let path = normalize_route(route);
        path == normalize_route(&self.sign_in) || self.public.iter().any(|p| p == path)
    }

    /// Where to send the user, if anywhere. Nothing is decided while the
    /// state is still initializing.
    pub fn redirect_for(&self, route: &str, state: &SessionState) -> Option<&str> {
        match state {
            SessionState::Anonymous if !self.is_public(route) => Some(&self.sign_in),
            _ => None,
        }
    }
}

impl From<&RouteSettings> for RouteGuard {
    fn from(settings: &RouteSettings) -> Self {
        Self::new(settings.public.iter().cloned(), &settings.sign_in)
    }
}

/// Path without query, fragment or trailing slash.
fn normalize_route(route: &str) -> &str {
    let path = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

struct Inner {
    state: SessionState,
    as_of: Option<DateTime<Utc>>,
    visibility: Visibility,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    liveness: Liveness,
    navigator: Arc<dyn Navigator>,
    guard: RouteGuard,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// The only writer of the session state.
    fn apply(&self, observation: Observation, origin: &str) -> bool {
        if !self.liveness.is_alive() {
            debug!("session {origin} arrived after teardown; discarded");
            return false;
        }
        let mut inner = self.lock();
        if !should_apply(&inner.state, inner.as_of, &observation) {
            debug!(
                "stale session {origin} from {} ignored (state from {:?})",
                observation.as_of, inner.as_of
            );
            return false;
        }
        let next = match observation.session {
            Some(session) => SessionState::Authenticated(session),
            None => SessionState::Anonymous,
        };
        inner.as_of = Some(match inner.as_of {
            Some(prev) => prev.max(observation.as_of),
            None => observation.as_of,
        });
        if inner.state == next {
            return true;
        }
        inner.state = next.clone();
        drop(inner);
        self.state_tx.send_replace(next);
        true
    }

    /// Re-evaluated on every call; nothing about the route is cached.
    fn gate(&self) {
        if !self.liveness.is_alive() {
            return;
        }
        let state = self.state();
        let route = self.navigator.current_route();
        if let Some(target) = self.guard.redirect_for(&route, &state) {
            info!("no session on protected route {route}; redirecting to {target}");
            self.navigator.redirect(target);
        }
    }
}

async fn run_probe(shared: &Shared, identity: &dyn IdentityProvider) -> SessionState {
    let as_of = Utc::now();
    let session = match identity.current_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!("session probe failed, continuing signed out: {e:#}");
            None
        }
    };
    shared.apply(Observation { session, as_of }, "probe");
    shared.gate();
    shared.state()
}

async fn listen(
    shared: Arc<Shared>,
    identity: Arc<dyn IdentityProvider>,
    mut events: broadcast::Receiver<AuthEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let as_of = Utc::now();
                debug!("auth event {}", event.kind);
                let session = match event.kind {
                    AuthEventKind::SignedOut => None,
                    AuthEventKind::SignedIn | AuthEventKind::TokenRefreshed => event.session,
                };
                shared.apply(Observation { session, as_of }, "event");
                if event.kind == AuthEventKind::SignedOut {
                    shared.gate();
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("auth listener missed {skipped} events; re-probing");
                run_probe(&shared, identity.as_ref()).await;
            }
            Err(RecvError::Closed) => break,
        }
        if !shared.liveness.is_alive() {
            break;
        }
    }
}

/// Single source of truth for the current user.
pub struct SessionController {
    shared: Arc<Shared>,
    identity: Arc<dyn IdentityProvider>,
    listener: Mutex<Option<JoinHandle<()>>>,
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl SessionController {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        guard: RouteGuard,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Initializing);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: SessionState::Initializing,
                    as_of: None,
                    visibility: Visibility::Visible,
                }),
                state_tx,
                liveness: Liveness::new(),
                navigator,
                guard,
            }),
            identity,
            listener: Mutex::new(None),
            unsubscribe: Mutex::new(None),
        }
    }

    /// Subscribe to auth events, then run the startup probe. Subscribing
    /// first means no event between the two is lost.
    pub async fn init(&self) -> SessionState {
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.is_none() && self.shared.liveness.is_alive() {
            let subscription = self.identity.on_auth_state_change();
            *self.unsubscribe.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(subscription.unsubscribe);
            *listener = Some(tokio::spawn(listen(
                self.shared.clone(),
                self.identity.clone(),
                subscription.events,
            )));
        }
        drop(listener);
        self.probe().await
    }

    /// Re-validate the session against the identity provider and gate the
    /// current route. A failed probe counts as "no session".
    pub async fn probe(&self) -> SessionState {
        run_probe(&self.shared, self.identity.as_ref()).await
    }

    /// Record a visibility change. Regaining visibility re-probes, since the
    /// session may have expired while the tab was in the background.
    pub async fn set_visibility(&self, visibility: Visibility) -> Option<SessionState> {
        if !self.shared.liveness.is_alive() {
            return None;
        }
        let previous = std::mem::replace(&mut self.shared.lock().visibility, visibility);
        if previous == Visibility::Hidden && visibility == Visibility::Visible {
            debug!("visibility regained; re-probing session");
            Some(self.probe().await)
        } else {
            None
        }
    }

    /// Sign out remotely, and locally even if the remote call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let remote = self.identity.sign_out().await;
        self.shared.apply(
            Observation {
                session: None,
                as_of: Utc::now(),
            },
            "sign-out",
        );
        self.shared.gate();
        remote.map_err(|e| {
            warn!("remote sign-out failed: {e:#}");
            ClientError::Session(e.to_string())
        })
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn session(&self) -> Option<Session> {
        self.shared.state().session().cloned()
    }

    pub fn visibility(&self) -> Visibility {
        self.shared.lock().visibility
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.shared.liveness.is_alive()
    }

    /// Stop applying results and release the auth subscription. The
    /// unsubscribe handle runs exactly once however often this is called.
    pub fn teardown(&self) {
        if !self.shared.liveness.kill() {
            return;
        }
        let unsubscribe = self
            .unsubscribe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe.call();
        }
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
        debug!("session controller torn down");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use satya_core::testing::{epoch, session};

    fn obs(present: bool, seconds: i64) -> Observation {
        Observation {
            session: present.then(|| session("u1")),
            as_of: epoch() + TimeDelta::seconds(seconds),
        }
    }

    #[test]
    fn first_observation_always_applies() {
        assert!(should_apply(&SessionState::Initializing, None, &obs(false, 0)));
        assert!(should_apply(&SessionState::Initializing, None, &obs(true, -100)));
    }

    #[test]
    fn agreeing_observations_apply_regardless_of_age() {
        let authed = SessionState::Authenticated(session("u1"));
        let at = Some(epoch() + TimeDelta::seconds(10));
        assert!(should_apply(&authed, at, &obs(true, 5)));
        assert!(should_apply(&SessionState::Anonymous, at, &obs(false, 5)));
    }

    #[test]
    fn disagreement_goes_to_the_newer_reading() {
        let authed = SessionState::Authenticated(session("u1"));
        let at = Some(epoch() + TimeDelta::seconds(10));
        assert!(!should_apply(&authed, at, &obs(false, 9)));
        assert!(!should_apply(&authed, at, &obs(false, 10)));
        assert!(should_apply(&authed, at, &obs(false, 11)));
        assert!(!should_apply(&SessionState::Anonymous, at, &obs(true, 3)));
    }

    #[test]
    fn route_guard_matches_paths_exactly() {
        let guard = RouteGuard::new(["/", "/landing", "/signup"], "/login");
        assert!(guard.is_public("/"));
        assert!(guard.is_public("/landing/"));
        assert!(guard.is_public("/signup?ref=nav"));
        assert!(guard.is_public("/login"));
        assert!(!guard.is_public("/dashboard"));
        assert!(!guard.is_public("/landing/extra"));
    }

    #[test]
    fn redirect_only_when_anonymous_on_protected_route() {
        let guard = RouteGuard::new(["/"], "/login");
        let authed = SessionState::Authenticated(session("u1"));
        assert_eq!(guard.redirect_for("/dashboard", &SessionState::Anonymous), Some("/login"));
        assert_eq!(guard.redirect_for("/", &SessionState::Anonymous), None);
        assert_eq!(guard.redirect_for("/dashboard", &authed), None);
        assert_eq!(guard.redirect_for("/dashboard", &SessionState::Initializing), None);
    }

    #[test]
    fn guard_from_settings_uses_defaults() {
        let guard = RouteGuard::from(&RouteSettings::default());
        assert_eq!(guard.sign_in(), "/login");
        assert!(guard.is_public("/signup"));
        assert!(!guard.is_public("/verify/abc"));
    }
}
