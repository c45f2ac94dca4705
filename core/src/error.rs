//! Error taxonomy for a settled request.
//!
//! # Design
//! Every variant displays as the bare message a user should see, because the
//! executor stores `to_string()` of the error as its `error` state. The
//! status variant is synthesized locally from a non-2xx response and never
//! carries the response body.

use thiserror::Error;

/// Why a request failed to produce a JSON result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network unreachable, DNS failure, aborted connection.
    #[error("{0}")]
    Transport(String),

    /// The server answered outside 200–299. The body was not parsed.
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    /// The response body was not valid JSON.
    #[error("{0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("{0}")]
    Serialization(String),
}
