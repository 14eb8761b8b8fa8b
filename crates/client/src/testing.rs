//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use satya_core::{
    AuthEvent, CastVote, CommentRecord, Evidence, ParentClaim, Session, VerdictResult,
    Verification, VerificationSummary, VoteValue,
};

use crate::context::{AppContext, Collaborators};
use crate::ports::{
    AuthSubscription, ClaimsCatalog, CommentDraft, DataStore, IdentityProvider, Navigator,
    PageRequest, Unsubscribe, VerdictService,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Gate ──────────────────────────────────────────────────────────────────

/// Holds a fake call mid-flight until the test releases it.
pub struct Gate {
    started: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

impl Gate {
    async fn pass(self) {
        let _ = self.started.send(());
        let _ = self.release.await;
    }
}

/// Test side of a [`Gate`]. Dropping it releases the call.
pub struct GateHandle {
    started: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

impl GateHandle {
    /// Resolves once the gated call is parked.
    pub async fn wait_started(&mut self) {
        if let Some(started) = self.started.take() {
            let _ = started.await;
        }
    }

    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

pub fn gate() -> (Gate, GateHandle) {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    (
        Gate {
            started: started_tx,
            release: release_rx,
        },
        GateHandle {
            started: Some(started_rx),
            release: Some(release_tx),
        },
    )
}

// ── Identity ──────────────────────────────────────────────────────────────

pub struct FakeIdentity {
    session: Mutex<Option<Session>>,
    probe_error: Mutex<Option<String>>,
    probe_gate: Mutex<Option<Gate>>,
    events: broadcast::Sender<AuthEvent>,
    probes: AtomicUsize,
    subscriptions: AtomicUsize,
    unsubscribes: Arc<AtomicUsize>,
    sign_outs: AtomicUsize,
}

impl FakeIdentity {
    pub fn new(session: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(session),
            probe_error: Mutex::new(None),
            probe_gate: Mutex::new(None),
            events,
            probes: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
            unsubscribes: Arc::new(AtomicUsize::new(0)),
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// What subsequent probes report.
    pub fn set_session(&self, session: Option<Session>) {
        *lock(&self.session) = session;
    }

    pub fn fail_probes(&self, message: Option<&str>) {
        *lock(&self.probe_error) = message.map(str::to_string);
    }

    /// Park the next probe after it has read the session.
    pub fn pause_next_probe(&self) -> GateHandle {
        let (gate, handle) = gate();
        *lock(&self.probe_gate) = Some(gate);
        handle
    }

    /// Deliver an event without changing what probes report.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Change the session and announce it.
    pub fn sign_in(&self, session: Session) {
        self.set_session(Some(session.clone()));
        self.emit(AuthEvent::signed_in(session));
    }

    /// Expire the session silently, as if it lapsed in the background.
    pub fn expire(&self) {
        self.set_session(None);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_session(&self) -> Result<Option<Session>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let snapshot = lock(&self.session).clone();
        let error = lock(&self.probe_error).clone();
        let gate = lock(&self.probe_gate).take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        match error {
            Some(message) => Err(anyhow!(message)),
            None => Ok(snapshot),
        }
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let counter = self.unsubscribes.clone();
        AuthSubscription {
            events: self.events.subscribe(),
            unsubscribe: Unsubscribe::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.set_session(None);
        self.emit(AuthEvent::signed_out());
        Ok(())
    }
}

// ── Navigator ─────────────────────────────────────────────────────────────

pub struct RecordingNavigator {
    route: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(route: &str) -> Self {
        Self {
            route: Mutex::new(route.to_string()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn set_route(&self, route: &str) {
        *lock(&self.route) = route.to_string();
    }

    pub fn redirects(&self) -> Vec<String> {
        lock(&self.redirects).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        lock(&self.route).clone()
    }

    fn redirect(&self, route: &str) {
        lock(&self.redirects).push(route.to_string());
        self.set_route(route);
    }
}

// ── Data store ────────────────────────────────────────────────────────────

/// Store operations, for failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    History,
    Verification,
    Claim,
    Evidence,
    Comments,
    InsertComment,
    Vote,
}

#[derive(Default)]
struct StoreData {
    history: HashMap<String, Vec<VerificationSummary>>,
    verifications: HashMap<String, Verification>,
    claims: HashMap<String, ParentClaim>,
    evidence: HashMap<String, Vec<Evidence>>,
    comments: HashMap<String, Vec<CommentRecord>>,
    failing: HashSet<StoreOp>,
    calls: Vec<StoreOp>,
    history_pages: Vec<PageRequest>,
    vote_calls: Vec<(String, String, VoteValue)>,
    vote_gate: Option<Gate>,
    history_gate: Option<Gate>,
}

/// In-memory data store with per-operation failure switches.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, StoreData> {
        lock(&self.data)
    }

    /// Stored history for `owner`, kept newest first with ties by id
    /// descending, as the data store orders it.
    pub fn add_history(&self, owner: &str, records: Vec<VerificationSummary>) {
        let mut data = self.data();
        let held = data.history.entry(owner.to_string()).or_default();
        held.extend(records);
        held.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    }

    pub fn add_verification(&self, verification: Verification, claim: ParentClaim) {
        let mut data = self.data();
        data.claims.insert(claim.id.clone(), claim);
        data.verifications
            .insert(verification.id.clone(), verification);
    }

    pub fn add_evidence(&self, verification_id: &str, evidence: Vec<Evidence>) {
        self.data()
            .evidence
            .entry(verification_id.to_string())
            .or_default()
            .extend(evidence);
    }

    pub fn add_comment(&self, verification_id: &str, record: CommentRecord) {
        self.data()
            .comments
            .entry(verification_id.to_string())
            .or_default()
            .push(record);
    }

    pub fn fail(&self, op: StoreOp) {
        self.data().failing.insert(op);
    }

    pub fn recover(&self, op: StoreOp) {
        self.data().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<StoreOp> {
        self.data().calls.clone()
    }

    pub fn history_pages(&self) -> Vec<PageRequest> {
        self.data().history_pages.clone()
    }

    pub fn vote_calls(&self) -> Vec<(String, String, VoteValue)> {
        self.data().vote_calls.clone()
    }

    pub fn pause_next_vote(&self) -> GateHandle {
        let (gate, handle) = gate();
        self.data().vote_gate = Some(gate);
        handle
    }

    pub fn pause_next_history(&self) -> GateHandle {
        let (gate, handle) = gate();
        self.data().history_gate = Some(gate);
        handle
    }

    /// Authoritative sum of a comment's stored votes.
    pub fn vote_total(&self, comment_id: &str) -> i64 {
        self.data()
            .comments
            .values()
            .flatten()
            .filter(|c| c.id == comment_id)
            .flat_map(|c| c.votes.iter())
            .map(|v| v.value.as_i64())
            .sum()
    }

    fn begin(&self, op: StoreOp) -> Result<()> {
        let mut data = self.data();
        data.calls.push(op);
        if data.failing.contains(&op) {
            bail!("{op:?} unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn verification_history(
        &self,
        owner_id: &str,
        page: PageRequest,
    ) -> Result<Vec<VerificationSummary>> {
        let gate = {
            let mut data = self.data();
            data.history_pages.push(page);
            data.history_gate.take()
        };
        let result = self.begin(StoreOp::History).map(|()| {
            self.data()
                .history
                .get(owner_id)
                .map(|records| {
                    records
                        .iter()
                        .filter(|r| page.at_or_before.is_none_or(|cursor| r.created_at <= cursor))
                        .take(page.limit)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        });
        if let Some(gate) = gate {
            gate.pass().await;
        }
        result
    }

    async fn verification(&self, id: &str) -> Result<Verification> {
        self.begin(StoreOp::Verification)?;
        self.data()
            .verifications
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("verification {id} not found"))
    }

    async fn claim(&self, id: &str) -> Result<ParentClaim> {
        self.begin(StoreOp::Claim)?;
        self.data()
            .claims
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("claim {id} not found"))
    }

    async fn evidence(&self, verification_id: &str) -> Result<Vec<Evidence>> {
        self.begin(StoreOp::Evidence)?;
        Ok(self
            .data()
            .evidence
            .get(verification_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn comments(&self, verification_id: &str) -> Result<Vec<CommentRecord>> {
        self.begin(StoreOp::Comments)?;
        Ok(self
            .data()
            .comments
            .get(verification_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_comment(&self, draft: &CommentDraft) -> Result<CommentRecord> {
        self.begin(StoreOp::InsertComment)?;
        let record = CommentRecord {
            id: format!("comment-{}", self.data().calls.len()),
            text: draft.text.clone(),
            author_email: Some(draft.user_email.clone()),
            created_at: Utc::now(),
            votes: Vec::new(),
        };
        self.add_comment(&draft.verification_id, record.clone());
        Ok(record)
    }

    async fn handle_comment_vote(
        &self,
        comment_id: &str,
        user_id: &str,
        value: VoteValue,
    ) -> Result<()> {
        let gate = {
            let mut data = self.data();
            data.vote_calls
                .push((comment_id.to_string(), user_id.to_string(), value));
            data.vote_gate.take()
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.begin(StoreOp::Vote)?;
        let mut data = self.data();
        let record = data
            .comments
            .values_mut()
            .flatten()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| anyhow!("comment {comment_id} not found"))?;
        match record.votes.iter_mut().find(|v| v.user_id == user_id) {
            Some(existing) => existing.value = value,
            None => record.votes.push(CastVote {
                user_id: user_id.to_string(),
                value,
            }),
        }
        Ok(())
    }
}

// ── Verdict service and catalog ───────────────────────────────────────────

pub struct FakeVerdictService {
    outcome: Mutex<std::result::Result<VerdictResult, String>>,
    gate: Mutex<Option<Gate>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeVerdictService {
    pub fn answering(result: VerdictResult) -> Self {
        Self {
            outcome: Mutex::new(Ok(result)),
            gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Mutex::new(Err(message.to_string())),
            gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn pause_next(&self) -> GateHandle {
        let (gate, handle) = gate();
        *lock(&self.gate) = Some(gate);
        handle
    }

    /// `(claim_text, user_id)` of every call.
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl VerdictService for FakeVerdictService {
    async fn verify(&self, claim_text: &str, user_id: &str) -> Result<VerdictResult> {
        lock(&self.calls).push((claim_text.to_string(), user_id.to_string()));
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        lock(&self.outcome).clone().map_err(|message| anyhow!(message))
    }
}

pub struct FakeCatalog {
    body: Mutex<std::result::Result<Value, String>>,
}

impl FakeCatalog {
    pub fn returning(body: Value) -> Self {
        Self {
            body: Mutex::new(Ok(body)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            body: Mutex::new(Err(message.to_string())),
        }
    }
}

#[async_trait]
impl ClaimsCatalog for FakeCatalog {
    async fn list_claims(&self) -> Result<Value> {
        lock(&self.body).clone().map_err(|message| anyhow!(message))
    }
}

// ── Assembled context ─────────────────────────────────────────────────────

/// A context wired to fakes, with handles to each of them.
pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<MemoryStore>,
    pub verdicts: Arc<FakeVerdictService>,
    pub catalog: Arc<FakeCatalog>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(session: Option<Session>, route: &str) -> Self {
        Self {
            identity: Arc::new(FakeIdentity::new(session)),
            store: Arc::new(MemoryStore::new()),
            verdicts: Arc::new(FakeVerdictService::failing("no verdict configured")),
            catalog: Arc::new(FakeCatalog::returning(Value::Array(Vec::new()))),
            navigator: Arc::new(RecordingNavigator::at(route)),
        }
    }

    pub fn context(&self, config: &satya_runtime_config::ClientConfig) -> AppContext {
        AppContext::new(
            Collaborators {
                identity: self.identity.clone(),
                store: self.store.clone(),
                verdicts: self.verdicts.clone(),
                catalog: self.catalog.clone(),
                navigator: self.navigator.clone(),
            },
            config,
        )
    }
}
