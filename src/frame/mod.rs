//! # Frames: the platform contract the bus depends on.
//!
//! The bus never touches a global environment. Everything it needs from the
//! hosting platform comes through two traits:
//!
//! - [`Frame`]: a handle to some context that can receive a posted message
//!   (boundary send);
//! - [`Host`]: the context the bus lives in. It resolves the reachable frames
//!   (discovery) and owns the single inbound message stream (handler install /
//!   removal).
//!
//! ## Architecture
//! ```text
//!   FrameBus ──► Host::frames() ──► Frames { current, parent?, children[] }
//!      │
//!      ├──► Frame::post_message(data, TargetOrigin, source_origin)   (per target)
//!      │
//!      └──► Host::add_message_listener(handler) ─► HandlerId
//!           Host::remove_message_listener(HandlerId)
//!
//!   inbound: target inbox ─► pump ─► handler(MessageEvent { origin, data })
//! ```
//!
//! ## Rules
//! - `post_message` is fire-and-forget: no error, no acknowledgment.
//! - Delivery is asynchronous, never inside the `post_message` call.
//! - A post whose [`TargetOrigin`] rejects the receiver is dropped silently.
//!
//! [`Window`] is the in-process implementation of both traits.

mod window;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde_json::Value;

pub use window::Window;

/// Global counter for handler identities.
static HANDLER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Origin restriction attached to a boundary send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Deliver only if the receiver's origin equals this value.
    Exact(Arc<str>),
    /// Deliver regardless of the receiver's origin.
    Any,
}

impl TargetOrigin {
    /// Returns true if a receiver with `origin` accepts the message.
    #[inline]
    pub fn admits(&self, origin: &str) -> bool {
        match self {
            TargetOrigin::Exact(expected) => expected.as_ref() == origin,
            TargetOrigin::Any => true,
        }
    }
}

/// One delivery to a frame's inbound stream.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    /// Origin of the sending frame. Not authenticated.
    pub origin: Arc<str>,
    /// Transport value as posted.
    pub data: Value,
}

/// Identity of one installed inbound handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocates a fresh, never reused identity.
    pub fn next() -> Self {
        Self(HANDLER_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// Callback invoked for every inbound delivery.
pub type MessageHandler = Arc<dyn Fn(MessageEvent) + Send + Sync>;

/// Shared handle to a frame.
pub type FrameRef = Arc<dyn Frame>;

/// A context that can be posted to.
pub trait Frame: Send + Sync {
    /// Origin of this frame.
    fn origin(&self) -> &str;

    /// Queues `data` for asynchronous delivery to this frame.
    ///
    /// `source_origin` becomes [`MessageEvent::origin`] on the receiving side.
    /// If `target_origin` does not admit this frame, the message is dropped.
    fn post_message(&self, data: Value, target_origin: &TargetOrigin, source_origin: &str);
}

/// The context a bus is embedded in.
pub trait Host: Send + Sync {
    /// Resolves the current frame, its parent and its present children.
    ///
    /// For an embedded context the parent is the top-level context of the
    /// tree, whatever the nesting depth.
    fn frames(&self) -> Frames;

    /// Installs a handler for every inbound delivery to this context.
    fn add_message_listener(&self, handler: MessageHandler) -> HandlerId;

    /// Removes a previously installed handler. Unknown ids are ignored.
    fn remove_message_listener(&self, id: HandlerId);
}

impl<H: Host + ?Sized> Host for Arc<H> {
    fn frames(&self) -> Frames {
        (**self).frames()
    }

    fn add_message_listener(&self, handler: MessageHandler) -> HandlerId {
        (**self).add_message_listener(handler)
    }

    fn remove_message_listener(&self, id: HandlerId) {
        (**self).remove_message_listener(id)
    }
}

/// Snapshot of the frames reachable from the current context.
#[derive(Clone)]
pub struct Frames {
    /// The context itself.
    pub current: FrameRef,
    /// Top-level context of the tree, `None` for a top-level context.
    pub parent: Option<FrameRef>,
    /// Embedded contexts, in embedding order.
    pub children: Vec<FrameRef>,
}

impl Frames {
    /// Frames of a context with neither parent nor children.
    pub fn standalone(current: FrameRef) -> Self {
        Self {
            current,
            parent: None,
            children: Vec::new(),
        }
    }
}

impl fmt::Debug for Frames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frames")
            .field("current", &self.current.origin())
            .field("parent", &self.parent.as_ref().map(|p| p.origin()))
            .field(
                "children",
                &self.children.iter().map(|c| c.origin()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
