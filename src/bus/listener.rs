//! # Listener trait
//!
//! `Listener` is the callback side of [`FrameBus::listen`](crate::FrameBus::listen).
//! Any `Fn(&P) + Send + Sync + 'static` closure is a listener; implement the
//! trait directly when a stable [`name`](Listener::name) in logs matters.
//!
//! ## Contract
//! - Called from the receiving frame's pump, never from inside `emit`.
//! - Should return quickly: listeners for one inbound message run in sequence.
//! - A panic is caught, logged with the listener name, and does not affect
//!   other listeners.
//!
//! ## Example
//! ```rust
//! use framebus::Listener;
//!
//! struct Audit;
//!
//! impl Listener<String> for Audit {
//!     fn on_message(&self, payload: &String) {
//!         let _ = payload.len();
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

/// Receiver of payloads published on one or more topics.
pub trait Listener<P>: Send + Sync + 'static {
    /// Handles one delivered payload.
    fn on_message(&self, payload: &P);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<P, F> Listener<P> for F
where
    F: Fn(&P) + Send + Sync + 'static,
{
    #[inline]
    fn on_message(&self, payload: &P) {
        self(payload)
    }
}
