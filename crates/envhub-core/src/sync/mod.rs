//! Sync client for the remote bundle store
//!
//! Drives the three store operations over HTTP/JSON.
//!
//! ## Protocol
//!
//! - `POST {api_url}/push` stores a new version and returns its number
//! - `GET {api_url}/pull` returns one version (latest unless `version` is given)
//! - `GET {api_url}/history` lists version metadata
//!
//! Every request carries the credential provider's headers and
//! `Content-Type: application/json`. Only HTTP 200 counts as success.
//!
//! ## Usage
//!
//! ```ignore
//! let client = SyncClient::new(&config.api_url, provider.headers()?)?;
//! let outcome = client.push(&bundle, &variables, "rotate keys")?;
//! ```

mod client;
mod message;

pub use client::{
    HttpRequest, HttpResponse, HttpTransport, Method, PushOutcome, SyncClient, SyncError,
    Transport, TransportError,
};
pub use message::{HistoryResponse, PushRequest, PushResponse};
