//! # Window: in-process frame tree.
//!
//! [`Window`] models a browsing-context-like tree inside one process. Every
//! window has an origin, an unbounded inbox and a pump task that hands each
//! inbound [`MessageEvent`] to the installed handlers.
//!
//! ## Architecture
//! ```text
//!   Window::top("https://app")
//!      ├── embed("https://a") ──► Window (child 0)
//!      │                            └── embed("https://a") ──► Window
//!      └── embed("https://b") ──► Window (child 1)
//!
//!   post_message(data) ──► [inbox] ──► pump task ──► handler 1
//!                                                 └─► handler N
//! ```
//!
//! ## Rules
//! - Creating a window spawns its pump: a tokio runtime must be running.
//! - Inbox order is FIFO; handlers run in installation order.
//! - A panicking handler is caught and logged; the pump keeps running.
//! - [`Window::close`] detaches the window and its descendants and stops
//!   their pumps; posts to a closed window are dropped.
//! - The pump exits by itself once every handle to the window is dropped.
//! - Discovery reports the top-level ancestor as the parent, so a frame
//!   embedded at any depth talks upward to the root of its tree.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::guard::{lock, panic_message};

use super::{Frame, FrameRef, Frames, HandlerId, Host, MessageEvent, MessageHandler, TargetOrigin};

type HandlerTable = Arc<Mutex<BTreeMap<HandlerId, MessageHandler>>>;

/// Handle to one in-process frame. Cheap to clone.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

struct WindowInner {
    origin: Arc<str>,
    parent: Option<Weak<WindowInner>>,
    children: Mutex<Vec<Window>>,
    inbox: mpsc::UnboundedSender<MessageEvent>,
    handlers: HandlerTable,
    token: CancellationToken,
}

impl Window {
    /// Creates a top-level window.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn top(origin: impl Into<Arc<str>>) -> Self {
        Self::spawn(origin.into(), None)
    }

    /// Creates a child window embedded in this one, appended after the
    /// existing children.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn embed(&self, origin: impl Into<Arc<str>>) -> Window {
        let child = Self::spawn(origin.into(), Some(Arc::downgrade(&self.inner)));
        lock(&self.inner.children).push(child.clone());
        child
    }

    fn spawn(origin: Arc<str>, parent: Option<Weak<WindowInner>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handlers: HandlerTable = Arc::new(Mutex::new(BTreeMap::new()));
        let token = CancellationToken::new();

        spawn_pump(origin.clone(), rx, handlers.clone(), token.clone());

        Self {
            inner: Arc::new(WindowInner {
                origin,
                parent,
                children: Mutex::new(Vec::new()),
                inbox: tx,
                handlers,
                token,
            }),
        }
    }

    /// Origin of this window.
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Embedding window, `None` for a top-level or detached window.
    pub fn parent(&self) -> Option<Window> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Window { inner })
    }

    /// Top-level ancestor, `None` for a top-level or detached window.
    ///
    /// This is the frame [`Host::frames`] reports as `parent`, at any depth.
    pub fn root(&self) -> Option<Window> {
        let mut current = self.parent()?;
        while let Some(up) = current.parent() {
            current = up;
        }
        Some(current)
    }

    /// Currently embedded children, in embedding order.
    pub fn children(&self) -> Vec<Window> {
        lock(&self.inner.children).clone()
    }

    /// Number of installed inbound handlers.
    pub fn handler_count(&self) -> usize {
        lock(&self.inner.handlers).len()
    }

    /// True once [`close`](Self::close) has been called on this window or an ancestor.
    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Removes this window from its parent and stops it and all descendants.
    ///
    /// Idempotent.
    pub fn close(&self) {
        if let Some(parent) = self.parent() {
            lock(&parent.inner.children).retain(|c| !Arc::ptr_eq(&c.inner, &self.inner));
        }
        self.shutdown();
    }

    fn shutdown(&self) {
        let children = std::mem::take(&mut *lock(&self.inner.children));
        for child in children {
            child.shutdown();
        }
        self.inner.token.cancel();
        lock(&self.inner.handlers).clear();
    }

    fn as_frame(&self) -> FrameRef {
        Arc::new(self.clone())
    }
}

impl Frame for Window {
    fn origin(&self) -> &str {
        &self.inner.origin
    }

    fn post_message(&self, data: Value, target_origin: &TargetOrigin, source_origin: &str) {
        if self.is_closed() {
            trace!(receiver = %self.inner.origin, "post to closed window dropped");
            return;
        }
        if !target_origin.admits(&self.inner.origin) {
            trace!(
                receiver = %self.inner.origin,
                expected = ?target_origin,
                "post rejected by target origin"
            );
            return;
        }
        let ev = MessageEvent {
            origin: Arc::from(source_origin),
            data,
        };
        // Receiver only disappears together with the window.
        let _ = self.inner.inbox.send(ev);
    }
}

impl Host for Window {
    fn frames(&self) -> Frames {
        Frames {
            current: self.as_frame(),
            parent: self.root().map(|r| r.as_frame()),
            children: self.children().iter().map(Window::as_frame).collect(),
        }
    }

    fn add_message_listener(&self, handler: MessageHandler) -> HandlerId {
        let id = HandlerId::next();
        lock(&self.inner.handlers).insert(id, handler);
        trace!(origin = %self.inner.origin, handler = %id, "message handler installed");
        id
    }

    fn remove_message_listener(&self, id: HandlerId) {
        if lock(&self.inner.handlers).remove(&id).is_some() {
            trace!(origin = %self.inner.origin, handler = %id, "message handler removed");
        }
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Window {}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("origin", &self.inner.origin)
            .field("children", &lock(&self.inner.children).len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drains the inbox until the window is closed or dropped.
fn spawn_pump(
    origin: Arc<str>,
    mut rx: mpsc::UnboundedReceiver<MessageEvent>,
    handlers: HandlerTable,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(ev) => deliver(&origin, &handlers, ev),
                    None => break,
                }
            }
        }
        trace!(origin = %origin, "window pump stopped");
    });
}

fn deliver(origin: &str, handlers: &HandlerTable, ev: MessageEvent) {
    // Snapshot so handlers may install/remove handlers re-entrantly.
    let snapshot: Vec<(HandlerId, MessageHandler)> = lock(handlers)
        .iter()
        .map(|(id, h)| (*id, Arc::clone(h)))
        .collect();

    for (id, handler) in snapshot {
        let ev = ev.clone();
        if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| handler(ev))) {
            error!(
                origin = %origin,
                handler = %id,
                info = %panic_message(panic_err.as_ref()),
                "message handler panicked"
            );
        }
    }
}
