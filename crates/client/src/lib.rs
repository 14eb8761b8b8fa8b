//! Client-side session and data-consistency layer.
//!
//! - [`session`]: who the user is, re-validated on visibility regain, and
//!   route gating.
//! - [`history`]: the user's verification history, grown by append-only
//!   union by id.
//! - [`vote`]: optimistic comment votes with rollback.
//! - [`detail`]: the four-read verification detail view.
//!
//! Everything is reached through an explicit [`AppContext`]. Remote
//! collaborators sit behind the traits in [`ports`].

pub mod catalog;
pub mod context;
pub mod detail;
pub mod error;
pub mod history;
pub mod liveness;
pub mod ports;
pub mod remote;
pub mod session;
pub mod verify;
pub mod vote;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{CatalogLoader, CatalogPage};
pub use context::{AppContext, Collaborators};
pub use detail::{DetailAggregator, DetailState, DetailView};
pub use error::{ClientError, Result, Surface};
pub use history::HistoryList;
pub use remote::RemoteStore;
pub use session::{RouteGuard, SessionController, SessionState, Visibility};
pub use verify::ClaimSubmitter;
pub use vote::{CommentThread, VoteCoordinator, VotePhase};
