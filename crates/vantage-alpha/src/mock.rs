//! Scripted transport for exercising the fetch path without a network.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use vantage_core::{Result, VantageError};

use crate::transport::{RawResponse, Transport};

/// Throttle notice as sent by Alpha Vantage.
pub const THROTTLE_NOTE: &str = "Thank you for using Alpha Vantage! Our standard API call \
frequency is 5 calls per minute and 500 calls per day.";

/// A [`Transport`] that replays queued responses in order and records every call.
///
/// Once the queue is empty each call fails with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<RawResponse>>>,
    calls: Mutex<Vec<Vec<(String, String)>>>,
}

impl MockTransport {
    /// Create a transport with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with a JSON body.
    pub fn push_json(&self, body: Value) -> &Self {
        self.push_raw(200, body.to_string())
    }

    /// Queue a 200 response carrying the throttle note.
    pub fn push_throttle(&self) -> &Self {
        self.push_json(json!({ "Note": THROTTLE_NOTE }))
    }

    /// Queue a response with an arbitrary status and body.
    pub fn push_raw(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(Ok(RawResponse {
            status,
            body: body.into(),
        }))
    }

    /// Queue a failure to complete the exchange.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.push(Err(VantageError::Transport(message.into())))
    }

    fn push(&self, response: Result<RawResponse>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Query parameters of every call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<(String, String)>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Value of a query parameter in the `index`-th call.
    #[must_use]
    pub fn call_param(&self, index: usize, name: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, query: &[(String, String)]) -> Result<RawResponse> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_vec());
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(VantageError::Transport("no scripted response".to_string())))
    }
}
