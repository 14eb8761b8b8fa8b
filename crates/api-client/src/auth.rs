use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use satya_api::{PasswordGrant, RefreshGrant, TokenResponse};
use satya_core::{AuthEvent, Session};

use crate::error::{HttpError, check_status, parse_response};
use crate::jwt;

/// Tokens expiring within this window are refreshed before use.
const REFRESH_LEEWAY: TimeDelta = TimeDelta::seconds(30);
const EVENT_CAPACITY: usize = 16;

/// A session plus the tokens that back it. Persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: Session,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    /// Build from a token grant answer. Gaps in the response (user, expiry)
    /// are filled from the access token's own claims.
    pub fn from_token(resp: TokenResponse, now: DateTime<Utc>) -> Result<Self> {
        let claims = jwt::decode_claims(&resp.access_token).unwrap_or_default();
        let user_id = resp
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .or(claims.sub.clone())
            .context("token response carries no user id")?;
        let email = resp
            .user
            .as_ref()
            .and_then(|u| u.email.clone())
            .or(claims.email.clone())
            .unwrap_or_default();
        let expires_at = resp
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| resp.expires_in.map(|secs| now + TimeDelta::seconds(secs)))
            .or_else(|| claims.exp.and_then(|secs| DateTime::from_timestamp(secs, 0)));
        let issued_at = claims
            .iat
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(now);

        Ok(Self {
            session: Session {
                user_id,
                email,
                issued_at,
            },
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at,
        })
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - REFRESH_LEEWAY <= now)
    }
}

/// Client for the identity provider's token endpoints.
///
/// Holds the current session in memory and broadcasts an [`AuthEvent`] on
/// every sign-in, refresh and sign-out.
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    state: Mutex<Option<StoredSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, anon_key))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            state: Mutex::new(None),
            events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: AuthEvent) {
        debug!("auth event {}", event.kind);
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Receive every subsequent auth event. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Adopt a previously persisted session without emitting an event.
    pub fn restore(&self, stored: StoredSession) {
        *self.lock() = Some(stored);
    }

    pub fn snapshot(&self) -> Option<StoredSession> {
        self.lock().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().as_ref().map(|s| s.access_token.clone())
    }

    // ── Grants ────────────────────────────────────────────────────────────

    async fn grant<B: Serialize>(&self, grant_type: &str, body: &B) -> Result<StoredSession> {
        let resp = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await?;
        let token: TokenResponse = parse_response(resp).await?;
        StoredSession::from_token(token, Utc::now())
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let stored = self
            .grant(
                "password",
                &PasswordGrant {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        let session = stored.session.clone();
        *self.lock() = Some(stored);
        info!("signed in as {}", session.email);
        self.publish(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<Session> {
        let refresh_token = self
            .lock()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .context("no refresh token available")?;
        let stored = self
            .grant("refresh_token", &RefreshGrant { refresh_token })
            .await?;
        let session = stored.session.clone();
        *self.lock() = Some(stored);
        self.publish(AuthEvent::token_refreshed(session.clone()));
        Ok(session)
    }

    /// Revoke the session remotely (best effort) and forget it locally.
    pub async fn sign_out(&self) -> Result<()> {
        let token = self.access_token();
        *self.lock() = None;
        if let Some(token) = token {
            let result = self
                .client
                .post(self.url("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(token)
                .send()
                .await;
            match result {
                Ok(resp) => {
                    if let Err(e) = check_status(resp).await {
                        warn!("remote sign-out failed: {e}");
                    }
                }
                Err(e) => warn!("remote sign-out failed: {e}"),
            }
        }
        self.publish(AuthEvent::signed_out());
        Ok(())
    }

    /// The live session, refreshing it first when it is about to expire.
    ///
    /// A refresh the provider rejects ends the session and emits
    /// `SIGNED_OUT`; transport failures are returned as errors.
    pub async fn current_session(&self) -> Result<Option<Session>> {
        let Some(stored) = self.snapshot() else {
            return Ok(None);
        };
        if !stored.needs_refresh(Utc::now()) {
            return Ok(Some(stored.session));
        }
        if stored.refresh_token.is_none() {
            *self.lock() = None;
            self.publish(AuthEvent::signed_out());
            return Ok(None);
        }
        match self.refresh().await {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.downcast_ref::<HttpError>().is_some_and(|h| h.status < 500) => {
                warn!("session refresh rejected: {e}");
                *self.lock() = None;
                self.publish(AuthEvent::signed_out());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
