//! # Listener registry: topic → subscriptions.
//!
//! The registry maps each topic to the subscriptions registered under it and
//! fans a payload out to them.
//!
//! ## Architecture
//! ```text
//! listen(["a", "b"], f) ──► add() ──► id=7
//!                                     topics["a"] = { 3: g, 7: f }
//!                                     topics["b"] = { 7: f }
//!
//! inbound envelope ──► dispatch("a", p) ──► g(p), f(p)   (id order)
//!                  └─► dispatch("b", p) ──► f(p)
//!
//! unregister ──► remove(["a", "b"], 7) ──► topics["a"] = { 3: g }
//!                                          "b" pruned (no subscribers left)
//! ```
//!
//! ## Rules
//! - A topic key exists iff it has at least one subscriber.
//! - Ids come from a process-wide monotonic counter and are never reused.
//! - `remove` touches every listed topic under one write lock.
//! - `dispatch` snapshots the subscribers and releases the lock before
//!   calling them, so listeners may (un)register re-entrantly.
//! - Listener panics are isolated per listener.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use tracing::{error, trace};

use super::Listener;
use crate::guard::{panic_message, read, write};

/// Global sequence counter for subscription identities.
static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of one `listen` registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(SUBSCRIPTION_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Outcome of one [`Registry::dispatch`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that returned normally.
    pub delivered: usize,
    /// Listeners that panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Total listeners invoked.
    #[inline]
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

type Subscribers<P> = BTreeMap<SubscriptionId, Arc<dyn Listener<P>>>;

/// Thread-safe topic → listener table.
pub struct Registry<P: 'static> {
    topics: RwLock<HashMap<String, Subscribers<P>>>,
}

impl<P: 'static> Registry<P> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `listener` under every topic and returns its fresh identity.
    ///
    /// An empty topic list is accepted; the id is then simply never matched.
    pub fn add(&self, topics: &[String], listener: Arc<dyn Listener<P>>) -> SubscriptionId {
        let id = SubscriptionId::next();
        let mut map = write(&self.topics);
        for topic in topics {
            map.entry(topic.clone())
                .or_default()
                .insert(id, Arc::clone(&listener));
        }
        trace!(subscription = %id, topics = ?topics, listener = listener.name(), "listener added");
        id
    }

    /// Removes `id` from each listed topic and prunes emptied topics.
    ///
    /// Unknown ids or topics are ignored, so repeated calls are harmless.
    pub fn remove(&self, topics: &[String], id: SubscriptionId) {
        let mut map = write(&self.topics);
        for topic in topics {
            if let Some(subs) = map.get_mut(topic.as_str()) {
                subs.remove(&id);
                if subs.is_empty() {
                    map.remove(topic.as_str());
                }
            }
        }
        trace!(subscription = %id, topics = ?topics, "listener removed");
    }

    /// Invokes every listener registered under `topic`, in registration order.
    pub fn dispatch(&self, topic: &str, payload: &P) -> DispatchReport {
        let snapshot: Vec<(SubscriptionId, Arc<dyn Listener<P>>)> = match read(&self.topics).get(topic) {
            Some(subs) => subs.iter().map(|(id, l)| (*id, Arc::clone(l))).collect(),
            None => return DispatchReport::default(),
        };

        let mut report = DispatchReport::default();
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener.on_message(payload))) {
                Ok(()) => report.delivered += 1,
                Err(panic_err) => {
                    report.failed += 1;
                    error!(
                        topic = topic,
                        subscription = %id,
                        listener = listener.name(),
                        info = %panic_message(panic_err.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }
        report
    }

    /// Returns sorted list of topics that currently have subscribers.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = read(&self.topics).keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    /// Number of subscriptions registered under `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        read(&self.topics).get(topic).map_or(0, BTreeMap::len)
    }

    /// Returns true if no topic has a subscriber.
    pub fn is_empty(&self) -> bool {
        read(&self.topics).is_empty()
    }
}

impl<P: 'static> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = read(&self.topics);
        let mut counts: Vec<(&str, usize)> = map.iter().map(|(t, s)| (t.as_str(), s.len())).collect();
        counts.sort_unstable();
        f.debug_struct("Registry").field("topics", &counts).finish()
    }
}
