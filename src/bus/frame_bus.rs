//! # FrameBus: topic pub/sub across a frame tree.
//!
//! [`FrameBus`] owns one [`Registry`] and one inbound handler installed on its
//! [`Host`]. It publishes through the host's frames and demultiplexes inbound
//! envelopes back to local listeners.
//!
//! ## Architecture
//! ```text
//! emit(topics, payload)
//!   ├─► host.frames()                         (refresh: children may have changed)
//!   ├─► Envelope { topics, payload }.encode()
//!   ├─► current.post_message(.., Exact(own origin))   if notify_current_frame
//!   ├─► parent.post_message(.., Any)                  if notify_parent_frame
//!   └─► child.post_message(.., Any)  (each child)     if notify_child_frames
//!
//! inbound MessageEvent ──► handler ──► Envelope::decode
//!                                         ├─ Err ─► ignored (debug)
//!                                         └─ Ok  ─► Registry::dispatch(topic) per topic, in order
//! ```
//!
//! ## Rules
//! - Exactly one handler is installed per bus; `reload` replaces it.
//! - Same-frame delivery goes through the host like any other; `emit` never
//!   calls a listener directly.
//! - `dispose` (and `Drop`) release the handler.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use framebus::{FrameBus, Window};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), framebus::BusError> {
//!     let top = Window::top("https://app.example");
//!     let bus: FrameBus<String> = FrameBus::new(top.clone());
//!
//!     let hits = Arc::new(AtomicUsize::new(0));
//!     let seen = Arc::clone(&hits);
//!     let sub = bus.listen(["greeting"], move |msg: &String| {
//!         assert_eq!(msg, "hello");
//!         seen.fetch_add(1, Ordering::SeqCst);
//!     });
//!
//!     bus.emit(["greeting"], &"hello".to_string())?;
//!     tokio::time::sleep(std::time::Duration::from_millis(20)).await;
//!     assert_eq!(hits.load(Ordering::SeqCst), 1);
//!
//!     sub.unregister();
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, Weak};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use super::{Listener, Registry, Subscription};
use crate::{
    config::Config,
    envelope::Envelope,
    error::BusError,
    frame::{Frames, HandlerId, Host, MessageEvent, MessageHandler, TargetOrigin},
    guard::lock,
};

/// Publish/subscribe façade bound to one host frame.
pub struct FrameBus<P: 'static> {
    cfg: Config,
    host: Arc<dyn Host>,
    registry: Arc<Registry<P>>,
    frames: Mutex<Frames>,
    handler: Mutex<Option<HandlerId>>,
}

impl<P> FrameBus<P>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a bus with every direction enabled.
    pub fn new(host: impl Host + 'static) -> Self {
        Self::with_config(host, Config::default())
    }

    /// Creates a bus with the given direction switches.
    ///
    /// Resolves the frames and installs the inbound handler. Never fails: a
    /// missing parent or no children just means nothing is sent that way.
    pub fn with_config(host: impl Host + 'static, cfg: Config) -> Self {
        let host: Arc<dyn Host> = Arc::new(host);
        let frames = host.frames();
        let bus = Self {
            cfg,
            host,
            registry: Arc::new(Registry::new()),
            frames: Mutex::new(frames),
            handler: Mutex::new(None),
        };
        bus.install_handler();
        bus
    }

    /// Registers `callback` under every topic in `topics`.
    ///
    /// The returned [`Subscription`] removes exactly this registration.
    pub fn listen<I, S, F>(&self, topics: I, callback: F) -> Subscription<P>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.listen_with(topics, callback)
    }

    /// Like [`listen`](Self::listen), for a named [`Listener`] implementation.
    pub fn listen_with<I, S, L>(&self, topics: I, listener: L) -> Subscription<P>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        L: Listener<P>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        let id = self.registry.add(&topics, Arc::new(listener));
        Subscription::new(id, topics, &self.registry)
    }

    /// Publishes `payload` on `topics` toward every enabled direction.
    ///
    /// Returns once the sends are queued; listeners run later on the
    /// receiving frames. Fails only if the payload cannot be encoded, in which
    /// case nothing is sent.
    pub fn emit<I, S>(&self, topics: I, payload: &P) -> Result<(), BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frames = self.host.frames();
        *lock(&self.frames) = frames.clone();

        let envelope = Envelope::new(topics, payload);
        let data = envelope.encode()?;
        let source = frames.current.origin();

        if self.cfg.notify_current_frame {
            let same_origin = TargetOrigin::Exact(Arc::from(source));
            frames.current.post_message(data.clone(), &same_origin, source);
        }
        if self.cfg.notify_parent_frame {
            if let Some(parent) = &frames.parent {
                parent.post_message(data.clone(), &TargetOrigin::Any, source);
            }
        }
        if self.cfg.notify_child_frames {
            for child in &frames.children {
                child.post_message(data.clone(), &TargetOrigin::Any, source);
            }
        }

        trace!(
            origin = source,
            topics = ?envelope.topics,
            parent = frames.parent.is_some(),
            children = frames.children.len(),
            "envelope emitted"
        );
        Ok(())
    }

    /// Re-resolves the frames and replaces the inbound handler.
    ///
    /// The previous handler is removed first, so repeated calls never stack
    /// handlers. Also re-arms a disposed bus.
    pub fn reload(&self) {
        *lock(&self.frames) = self.host.frames();
        self.install_handler();
    }

    fn install_handler(&self) {
        let mut slot = lock(&self.handler);
        if let Some(prev) = slot.take() {
            self.host.remove_message_listener(prev);
        }
        let id = self
            .host
            .add_message_listener(inbound_handler(Arc::downgrade(&self.registry)));
        *slot = Some(id);
    }
}

impl<P: 'static> FrameBus<P> {
    /// Removes the inbound handler. Idempotent; also runs on drop.
    ///
    /// A disposed bus can still emit but no longer receives.
    pub fn dispose(&self) {
        if let Some(id) = lock(&self.handler).take() {
            self.host.remove_message_listener(id);
            debug!(handler = %id, "frame bus disposed");
        }
    }

    /// True while an inbound handler is installed.
    pub fn is_attached(&self) -> bool {
        lock(&self.handler).is_some()
    }

    /// Frames resolved by the last construction, `emit` or `reload`.
    pub fn frames(&self) -> Frames {
        lock(&self.frames).clone()
    }

    /// Direction switches this bus was built with.
    #[inline]
    pub fn config(&self) -> Config {
        self.cfg
    }

    /// Read access to the listener table.
    #[inline]
    pub fn registry(&self) -> &Registry<P> {
        &self.registry
    }
}

impl<P: 'static> Drop for FrameBus<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: 'static> std::fmt::Debug for FrameBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBus")
            .field("config", &self.cfg)
            .field("frames", &*lock(&self.frames))
            .field("handler", &*lock(&self.handler))
            .field("registry", &*self.registry)
            .finish()
    }
}

/// Builds the handler that turns inbound envelopes into registry dispatches.
fn inbound_handler<P>(registry: Weak<Registry<P>>) -> MessageHandler
where
    P: DeserializeOwned + Send + Sync + 'static,
{
    Arc::new(move |ev: MessageEvent| {
        let Some(registry) = registry.upgrade() else {
            return;
        };
        let envelope = match Envelope::<P>::decode(ev.data) {
            Ok(envelope) => envelope,
            Err(err) => {
                debug!(origin = %ev.origin, error = %err, "ignoring non-envelope message");
                return;
            }
        };
        for topic in &envelope.topics {
            let report = registry.dispatch(topic, &envelope.payload);
            trace!(
                origin = %ev.origin,
                topic = topic.as_str(),
                delivered = report.delivered,
                failed = report.failed,
                "envelope dispatched"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Window};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const MARKER: &str = "test/marker";

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Msg {
        message: String,
    }

    fn hello() -> Msg {
        Msg {
            message: "hello".into(),
        }
    }

    /// Waits until a marker emitted now has reached this frame's listeners.
    ///
    /// Inboxes are FIFO, so everything emitted earlier has been dispatched too.
    async fn settle(bus: &FrameBus<Msg>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = bus.listen([MARKER], move |_: &Msg| {
            let _ = tx.send(());
        });
        bus.emit([MARKER], &hello()).unwrap();
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("marker timed out");
        sub.unregister();
    }

    fn exploding(_: &Msg) {
        panic!("listener failure");
    }

    fn counter(bus: &FrameBus<Msg>, topics: &[&str]) -> (Subscription<Msg>, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let sub = bus.listen(topics.iter().copied(), move |_: &Msg| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (sub, hits)
    }

    #[tokio::test]
    async fn two_topics_two_calls_then_none_after_unregister() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = bus.listen(["topic1", "topic2"], move |m: &Msg| {
            let _ = tx.send(m.clone());
        });

        bus.emit(["topic1", "topic2"], &hello()).unwrap();
        settle(&bus).await;

        let mut calls = Vec::new();
        while let Ok(m) = rx.try_recv() {
            calls.push(m);
        }
        assert_eq!(calls, vec![hello(), hello()]);

        sub.unregister();
        bus.emit(["topic1", "topic2"], &hello()).unwrap();
        settle(&bus).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_never_dispatches_synchronously() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let (_sub, hits) = counter(&bus, &["t"]);

        bus.emit(["t"], &hello()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribed_topic_is_isolated() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let (_a, hits_a) = counter(&bus, &["a"]);

        bus.emit(["b"], &hello()).unwrap();
        settle(&bus).await;
        assert_eq!(hits_a.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_listener_on_a_topic_receives() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let (_a, hits_a) = counter(&bus, &["t"]);
        let (_b, hits_b) = counter(&bus, &["t"]);
        let (_c, hits_c) = counter(&bus, &["t", "other"]);

        bus.emit(["t"], &hello()).unwrap();
        settle(&bus).await;
        for hits in [hits_a, hits_b, hits_c] {
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn missing_first_topic_does_not_stop_later_topics() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let (_sub, hits) = counter(&bus, &["second"]);

        bus.emit(["first", "second"], &hello()).unwrap();
        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn topics_dispatch_in_envelope_order() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for topic in ["c", "a", "b"] {
            let order = Arc::clone(&order);
            subs.push(bus.listen([topic], move |_: &Msg| {
                order.lock().unwrap().push(topic);
            }));
        }

        bus.emit(["b", "c", "a"], &hello()).unwrap();
        settle(&bus).await;
        assert_eq!(*order.lock().unwrap(), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_block_siblings() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let _boom = bus.listen(["t"], exploding);
        let (_ok, hits) = counter(&bus, &["t", "u"]);

        bus.emit(["t", "u"], &hello()).unwrap();
        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_inbound_is_ignored() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top.clone());
        let (_sub, hits) = counter(&bus, &["t"]);

        top.post_message(json!({ "kind": "resize" }), &TargetOrigin::Any, "https://stranger");
        top.post_message(json!({ "topics": ["t"], "payload": 7 }), &TargetOrigin::Any, "https://stranger");
        top.post_message(json!("t"), &TargetOrigin::Any, "https://stranger");
        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // Well-formed traffic is accepted from any sender.
        top.post_message(
            json!({ "topics": ["t"], "payload": { "message": "spoofed" } }),
            &TargetOrigin::Any,
            "https://stranger",
        );
        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reload_keeps_a_single_handler() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top.clone());
        let (_sub, hits) = counter(&bus, &["t"]);
        assert_eq!(top.handler_count(), 1);

        bus.reload();
        bus.reload();
        bus.reload();
        assert_eq!(top.handler_count(), 1);

        bus.emit(["t"], &hello()).unwrap();
        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispose_and_drop_release_the_handler() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top.clone());
        let other: FrameBus<Msg> = FrameBus::new(top.clone());
        assert_eq!(top.handler_count(), 2);

        bus.dispose();
        bus.dispose();
        assert!(!bus.is_attached());
        assert_eq!(top.handler_count(), 1);

        bus.reload();
        assert!(bus.is_attached());
        assert_eq!(top.handler_count(), 2);

        drop(other);
        drop(bus);
        assert_eq!(top.handler_count(), 0);
    }

    #[tokio::test]
    async fn disposed_bus_still_emits_but_stops_receiving() {
        let top = Window::top("https://app");
        let sender: FrameBus<Msg> = FrameBus::new(top.clone());
        let receiver: FrameBus<Msg> = FrameBus::new(top.clone());
        let (_mine, mine) = counter(&sender, &["t"]);
        let (_theirs, theirs) = counter(&receiver, &["t"]);

        sender.dispose();
        sender.emit(["t"], &hello()).unwrap();
        settle(&receiver).await;

        assert_eq!(mine.load(Ordering::SeqCst), 0);
        assert_eq!(theirs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn encode_failure_sends_nothing() {
        use std::collections::BTreeMap;

        let top = Window::top("https://app");
        let bus: FrameBus<BTreeMap<(u8, u8), u8>> = FrameBus::new(top.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let _sub = bus.listen(["t"], move |_: &BTreeMap<(u8, u8), u8>| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let mut payload = BTreeMap::new();
        payload.insert((1, 2), 3);
        let err = bus.emit(["t"], &payload).unwrap_err();
        assert!(matches!(err, BusError::Encode { .. }));

        // An empty map encodes fine and is the only thing delivered.
        bus.emit(["t"], &BTreeMap::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn named_listener_receives_payload() {
        struct Tally(Arc<AtomicUsize>);

        impl Listener<Msg> for Tally {
            fn on_message(&self, payload: &Msg) {
                assert_eq!(payload.message, "hello");
                self.0.fetch_add(1, Ordering::SeqCst);
            }

            fn name(&self) -> &'static str {
                "tally"
            }
        }

        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top);
        let hits = Arc::new(AtomicUsize::new(0));
        let sub = bus.listen_with(["t"], Tally(Arc::clone(&hits)));
        assert_eq!(bus.registry().listener_count("t"), 1);

        bus.emit(["t"], &hello()).unwrap();
        settle(&bus).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        sub.unregister();
        assert!(bus.registry().is_empty());
    }

    #[tokio::test]
    async fn frames_snapshot_tracks_emit_and_reload() {
        let top = Window::top("https://app");
        let bus: FrameBus<Msg> = FrameBus::new(top.clone());
        assert!(bus.frames().children.is_empty());
        assert_eq!(bus.frames().current.origin(), "https://app");

        top.embed("https://a");
        assert!(bus.frames().children.is_empty());
        bus.emit(["t"], &hello()).unwrap();
        assert_eq!(bus.frames().children.len(), 1);

        top.embed("https://b");
        bus.reload();
        assert_eq!(bus.frames().children.len(), 2);
        assert_eq!(bus.config(), Config::default());
    }

    type SendLog = Arc<Mutex<Vec<(String, TargetOrigin)>>>;

    struct FakeFrame {
        origin: &'static str,
        log: SendLog,
    }

    impl Frame for FakeFrame {
        fn origin(&self) -> &str {
            self.origin
        }

        fn post_message(&self, _data: serde_json::Value, target: &TargetOrigin, _source: &str) {
            lock(&self.log).push((self.origin.to_string(), target.clone()));
        }
    }

    struct FakeHost {
        frames: Frames,
        installed: Mutex<Vec<HandlerId>>,
        removed: Mutex<Vec<HandlerId>>,
    }

    impl Host for FakeHost {
        fn frames(&self) -> Frames {
            self.frames.clone()
        }

        fn add_message_listener(&self, _handler: MessageHandler) -> HandlerId {
            let id = HandlerId::next();
            lock(&self.installed).push(id);
            id
        }

        fn remove_message_listener(&self, id: HandlerId) {
            lock(&self.removed).push(id);
        }
    }

    fn fake_host(log: &SendLog) -> Arc<FakeHost> {
        let frame = |origin: &'static str| -> crate::frame::FrameRef {
            Arc::new(FakeFrame {
                origin,
                log: Arc::clone(log),
            })
        };
        Arc::new(FakeHost {
            frames: Frames {
                current: frame("https://me"),
                parent: Some(frame("https://parent")),
                children: vec![frame("https://c0"), frame("https://c1")],
            },
            installed: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn emit_targets_each_direction_with_its_origin_rule() {
        let log = SendLog::default();
        let host = fake_host(&log);
        let bus: FrameBus<Msg> = FrameBus::new(Arc::clone(&host));

        bus.emit(["t"], &hello()).unwrap();

        let me = TargetOrigin::Exact(Arc::from("https://me"));
        assert_eq!(
            *lock(&log),
            vec![
                ("https://me".to_string(), me),
                ("https://parent".to_string(), TargetOrigin::Any),
                ("https://c0".to_string(), TargetOrigin::Any),
                ("https://c1".to_string(), TargetOrigin::Any),
            ]
        );
    }

    #[test]
    fn disabled_directions_are_skipped() {
        let log = SendLog::default();
        let host = fake_host(&log);
        let cfg = Config::default().with_current_frame(false).with_child_frames(false);
        let bus: FrameBus<Msg> = FrameBus::with_config(Arc::clone(&host), cfg);

        bus.emit(["t"], &hello()).unwrap();
        assert_eq!(
            *lock(&log),
            vec![("https://parent".to_string(), TargetOrigin::Any)]
        );
    }

    #[test]
    fn handler_is_replaced_then_released() {
        let log = SendLog::default();
        let host = fake_host(&log);
        let bus: FrameBus<Msg> = FrameBus::new(Arc::clone(&host));

        bus.reload();
        bus.dispose();
        drop(bus);

        let installed = lock(&host.installed).clone();
        let removed = lock(&host.removed).clone();
        assert_eq!(installed.len(), 2);
        assert_eq!(removed, installed);
    }
}
