//! # Envelope: the unit sent across a frame boundary.
//!
//! One [`FrameBus::emit`](crate::FrameBus::emit) call produces exactly one
//! envelope, encoded once into a transport value and posted to every target.
//!
//! ```text
//! emit(["a", "b"], payload)
//!        └─► Envelope { topics: ["a", "b"], payload }
//!               └─► encode() ──► serde_json::Value ──► Frame::post_message
//!
//! inbound MessageEvent { origin, data: Value }
//!        └─► Envelope::decode(data)
//!               ├─ Ok  ─► dispatch("a"), dispatch("b")   (in order)
//!               └─ Err ─► ignored (debug log)
//! ```
//!
//! Payloads cross the boundary by value: the receiver gets a fresh copy
//! produced by the serde round trip, never a shared reference.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::BusError;

/// Topics plus payload, as transmitted in one send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Topics in dispatch order.
    pub topics: Vec<String>,
    /// Opaque payload.
    pub payload: P,
}

impl<P> Envelope<P> {
    /// Creates an envelope from any list of topic-like strings.
    pub fn new<I, S>(topics: I, payload: P) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            payload,
        }
    }
}

impl<P: Serialize> Envelope<P> {
    /// Converts the envelope into its transport value.
    pub fn encode(&self) -> Result<Value, BusError> {
        serde_json::to_value(self).map_err(BusError::encode)
    }
}

impl<P: DeserializeOwned> Envelope<P> {
    /// Parses a transport value back into an envelope.
    ///
    /// Fails for anything that is not `{ "topics": [string], "payload": P }`.
    pub fn decode(data: Value) -> Result<Self, BusError> {
        serde_json::from_value(data).map_err(BusError::decode)
    }
}
