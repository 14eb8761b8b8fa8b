pub mod auth;
pub mod client;
pub mod error;
pub mod jwt;
pub mod store;

pub use auth::{AuthClient, StoredSession};
pub use client::ApiClient;
pub use error::HttpError;
pub use satya_api;
pub use store::StoreClient;
