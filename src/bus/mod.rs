//! Topic pub/sub: listener table, subscription handles and the bus façade.
//!
//! ## Contents
//! - [`Listener`] callback contract (any `Fn(&P)` closure qualifies)
//! - [`Registry`], [`SubscriptionId`], [`DispatchReport`] topic → listener table
//! - [`Subscription`] undo handle returned by `listen`
//! - [`FrameBus`] publishes envelopes through a [`Host`](crate::Host) and
//!   dispatches inbound ones
//!
//! ## Quick reference
//! - **Writers of the registry**: `FrameBus::listen*`, `Subscription::unregister`.
//! - **Reader of the registry**: the inbound handler installed by the bus.

mod frame_bus;
mod listener;
mod registry;
mod subscription;

pub use frame_bus::FrameBus;
pub use listener::Listener;
pub use registry::{DispatchReport, Registry, SubscriptionId};
pub use subscription::Subscription;
