//! # framebus
//!
//! **framebus** is a topic-based publish/subscribe bus for a tree of nested
//! execution contexts ("frames"): the current frame, its optional parent and
//! its children.
//!
//! Frames share no memory. A payload emitted in one frame is wrapped into an
//! envelope, copied across the frame boundary by an asynchronous send, and
//! dispatched to the listeners of every receiving frame that subscribed to one
//! of the envelope's topics.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                     ┌───────────────────────────┐
//!                     │  parent frame             │
//!                     │  FrameBus ─► Registry     │
//!                     └─────────────▲─────────────┘
//!                                   │ post_message(Any)
//! ┌─────────────────────────────────┴─────────────────────────────────┐
//! │  current frame                                                    │
//! │                                                                   │
//! │  emit(topics, payload)                                            │
//! │     └─► Envelope::encode ─┬─► current.post_message(Exact(origin)) │
//! │                           ├─► parent.post_message(Any)            │
//! │                           └─► child.post_message(Any) (each)      │
//! │                                                                   │
//! │  inbox ─► pump ─► inbound handler ─► Envelope::decode             │
//! │                                        └─► Registry::dispatch     │
//! │                                              ├─► listener 1       │
//! │                                              └─► listener N       │
//! └──────────────┬───────────────────────────────────┬────────────────┘
//!                ▼ post_message(Any)                 ▼
//!        ┌──────────────┐                    ┌──────────────┐
//!        │ child frame 0│        ...         │ child frame N│
//!        └──────────────┘                    └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! FrameBus::new(host) ──► host.frames() ──► add_message_listener(handler)   [attached]
//!        │
//!        ├─► reload()  ──► host.frames(); remove old handler; add new one   [attached]
//!        └─► dispose() / drop ──► remove_message_listener(handler)           [detached]
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                      |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------|
//! | **Bus**           | listen / emit / reload / dispose                              | [`FrameBus`], [`Subscription`]          |
//! | **Registry**      | topic → listeners, unique ids, per-listener panic isolation   | [`Registry`], [`Listener`]              |
//! | **Host contract** | discovery, boundary send, inbound handler install             | [`Host`], [`Frame`], [`TargetOrigin`]   |
//! | **Reference host**| in-process frame tree driven by tokio tasks                   | [`Window`]                              |
//! | **Errors**        | typed envelope errors                                         | [`BusError`]                            |
//! | **Configuration** | per-direction switches                                        | [`Config`]                              |
//!
//! ## Optional features
//! - `logging`: exports [`logging::init_logging`], a `tracing-subscriber` setup
//!   for binaries and demos.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use serde::{Deserialize, Serialize};
//! use tokio::sync::mpsc;
//! use framebus::{Config, FrameBus, Window};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Greeting { message: String }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let top = Window::top("https://app.example");
//!     let widget = top.embed("https://widget.example");
//!
//!     // One bus per frame.
//!     let top_bus: FrameBus<Greeting> = FrameBus::new(top.clone());
//!     let widget_bus: FrameBus<Greeting> =
//!         FrameBus::with_config(widget.clone(), Config::default().with_child_frames(false));
//!
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     let _sub = widget_bus.listen(["greeting"], move |g: &Greeting| {
//!         let _ = tx.send(g.clone());
//!     });
//!
//!     top_bus.emit(["greeting"], &Greeting { message: "hello".into() })?;
//!
//!     let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await?;
//!     assert_eq!(got.map(|g| g.message).as_deref(), Some("hello"));
//!     Ok(())
//! }
//! ```
mod bus;
mod config;
mod envelope;
mod error;
mod frame;
mod guard;

// ---- Public re-exports ----

pub use bus::{DispatchReport, FrameBus, Listener, Registry, Subscription, SubscriptionId};
pub use config::Config;
pub use envelope::Envelope;
pub use error::BusError;
pub use frame::{
    Frame, FrameRef, Frames, HandlerId, Host, MessageEvent, MessageHandler, TargetOrigin, Window,
};

// Optional: tracing-subscriber setup for binaries and demos.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub mod logging;
