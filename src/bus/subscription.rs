//! # Subscription handle returned by `listen`.
//!
//! A [`Subscription`] remembers exactly what is needed to undo one `listen`
//! call: its topics, its id, and a weak reference to the registry. Handles
//! share no state with each other.
//!
//! Dropping a handle does **not** unregister; the listener stays until
//! [`Subscription::unregister`] is called or the bus goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::{Registry, SubscriptionId};

/// Undo handle for one `listen` registration.
pub struct Subscription<P: 'static> {
    id: SubscriptionId,
    topics: Vec<String>,
    registry: Weak<Registry<P>>,
    active: AtomicBool,
}

impl<P: 'static> Subscription<P> {
    pub(crate) fn new(id: SubscriptionId, topics: Vec<String>, registry: &Arc<Registry<P>>) -> Self {
        Self {
            id,
            topics,
            registry: Arc::downgrade(registry),
            active: AtomicBool::new(true),
        }
    }

    /// Identity of this registration.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Topics this registration was made under.
    #[inline]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// True until [`unregister`](Self::unregister) is called.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Removes this registration from every topic it was added to.
    ///
    /// Idempotent: later calls are no-ops. Safe after the bus is gone.
    pub fn unregister(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.topics, self.id);
        }
    }

    /// Turns the handle into a plain zero-argument unregister function.
    ///
    /// The returned closure keeps the idempotence of [`unregister`](Self::unregister).
    pub fn into_unregister_fn(self) -> impl Fn() + Send + Sync + 'static {
        move || self.unregister()
    }
}

impl<P: 'static> std::fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topics", &self.topics)
            .field("active", &self.is_active())
            .finish()
    }
}
