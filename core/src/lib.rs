//! Request executor core for the posts board.
//!
//! # Overview
//! A [`RequestExecutor`] is bound to one HTTP method and turns
//! `execute(url, body)` into a single round trip through a [`Transport`],
//! publishing `{ result, error, in_flight }` for observers. A [`BusyMap`]
//! tracks which `(action, item)` pairs have a request outstanding, since one
//! executor is shared by every row of the view.
//!
//! # Design
//! - One generic executor type; the five verbs are constructor choices.
//! - Failures are captured as state and never propagated by `execute`.
//! - State lives in `tokio::sync::watch` channels, so observers can poll a
//!   snapshot or await the next change.
//! - The network is reached only through the `Transport` trait; tests use
//!   scripted doubles and the integration suite uses the mock server.

pub mod busy;
pub mod client;
pub mod error;
pub mod executor;
pub mod http;
pub mod transport;
pub mod types;

pub use busy::{Action, BusyMap, BusyState};
pub use client::{PostsApi, DEFAULT_BASE_URL};
pub use error::FetchError;
pub use executor::{ExecutorState, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{ReqwestTransport, Transport};
pub use types::{NewPost, Post, PostPatch};
