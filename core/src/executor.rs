//! Method-bound request executor with observable lifecycle state.
//!
//! # Design
//! One generic `RequestExecutor` covers every verb; the method is fixed at
//! construction. Each instance owns a `{ result, error, in_flight }` record
//! that it publishes through a `tokio::sync::watch` channel, so a view can
//! either poll [`RequestExecutor::snapshot`] or await changes on
//! [`RequestExecutor::subscribe`].
//!
//! Failures never escape [`RequestExecutor::execute`]: they are stored as the
//! error message and the call yields `None`. Callers that want the error
//! value itself use [`RequestExecutor::try_execute`], which goes through the
//! same state transitions.
//!
//! Concurrent calls on one instance are not serialized. Each call writes its
//! outcome when it settles, so the state reflects the last response received,
//! not the last request sent, and the first call to settle clears
//! `in_flight` even if another call is still outstanding.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;

/// Observable state of one executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorState {
    /// Parsed body of the most recent successful call.
    pub result: Option<Value>,
    /// Message of the most recent failed call, cleared when a new call starts.
    pub error: Option<String>,
    pub in_flight: bool,
}

pub struct RequestExecutor<T> {
    method: HttpMethod,
    transport: Arc<T>,
    state: Arc<watch::Sender<ExecutorState>>,
}

impl<T> Clone for RequestExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(method: HttpMethod, transport: Arc<T>) -> Self {
        let (state, _) = watch::channel(ExecutorState::default());
        Self {
            method,
            transport,
            state: Arc::new(state),
        }
    }

    pub fn get(transport: Arc<T>) -> Self {
        Self::new(HttpMethod::Get, transport)
    }

    pub fn post(transport: Arc<T>) -> Self {
        Self::new(HttpMethod::Post, transport)
    }

    pub fn put(transport: Arc<T>) -> Self {
        Self::new(HttpMethod::Put, transport)
    }

    pub fn patch(transport: Arc<T>) -> Self {
        Self::new(HttpMethod::Patch, transport)
    }

    pub fn delete(transport: Arc<T>) -> Self {
        Self::new(HttpMethod::Delete, transport)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Current state, cloned out of the channel.
    pub fn snapshot(&self) -> ExecutorState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ExecutorState> {
        self.state.subscribe()
    }

    /// Send one request and return the parsed JSON body, or `None` if the
    /// call failed. The failure message is left in the `error` state.
    ///
    /// A `None` or `Value::Null` body sends no payload. Every other JSON
    /// value, including `false`, `0` and `""`, is sent as is.
    pub async fn execute(&self, url: &str, body: Option<Value>) -> Option<Value> {
        self.try_execute(url, body).await.ok()
    }

    /// Like [`execute`](Self::execute), but also returns the error.
    pub async fn try_execute(&self, url: &str, body: Option<Value>) -> Result<Value, FetchError> {
        let payload = match body {
            None | Some(Value::Null) => Ok(None),
            Some(value) => encode(&value),
        };
        self.run(url, payload).await
    }

    /// Serialize `body` and send it. A serialization failure settles the call
    /// like any other error.
    pub async fn execute_json<B>(&self, url: &str, body: &B) -> Option<Value>
    where
        B: Serialize + ?Sized,
    {
        self.run(url, encode(body)).await.ok()
    }

    async fn run(
        &self,
        url: &str,
        payload: Result<Option<String>, FetchError>,
    ) -> Result<Value, FetchError> {
        let _in_flight = self.begin();

        let outcome = match payload {
            Ok(body) => self.round_trip(url, body).await,
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => debug!(method = %self.method, url, "request settled"),
            Err(e) => warn!(method = %self.method, url, error = %e, "request failed"),
        }
        self.state.send_modify(|state| match &outcome {
            Ok(value) => state.result = Some(value.clone()),
            Err(e) => state.error = Some(e.to_string()),
        });

        outcome
    }

    fn begin(&self) -> InFlight<'_> {
        self.state.send_modify(|state| {
            state.in_flight = true;
            state.error = None;
        });
        InFlight(&self.state)
    }

    async fn round_trip(&self, url: &str, body: Option<String>) -> Result<Value, FetchError> {
        debug!(method = %self.method, url, has_body = body.is_some(), "dispatching request");
        let response = self
            .transport
            .send(HttpRequest::json(self.method, url, body))
            .await?;

        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
            });
        }
        serde_json::from_str(&response.body).map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Option<String>, FetchError> {
    serde_json::to_string(body)
        .map(Some)
        .map_err(|e| FetchError::Serialization(e.to_string()))
}

/// Clears `in_flight` when dropped, whatever way the call ends.
struct InFlight<'a>(&'a watch::Sender<ExecutorState>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|state| state.in_flight = false);
    }
}
