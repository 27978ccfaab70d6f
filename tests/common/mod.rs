//! Shared helpers: a scripted in-memory transport and a callback recorder.

#![allow(dead_code)]

use futures_util::{
    FutureExt,
    future::{self, BoxFuture},
    stream,
};
use parking_lot::Mutex;
use signal_stream::{
    ConnectionConfig, SignalError, SignalMessage,
    transport::{FrameStream, Transport, frame_stream},
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;
use url::Url;

type Link = mpsc::UnboundedSender<Result<String, SignalError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Open {
    Accept,
    Refuse,
    /// The open future never resolves.
    Hang,
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<Open>>,
    links: Mutex<Vec<Link>>,
    opens: AtomicUsize,
}

/// Each `open()` takes the next scripted outcome (accepting once the script
/// runs out). Accepted streams stay open until the test fails them.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(outcomes: impl IntoIterator<Item = Open>) -> Self {
        let transport = Self::new();
        transport.inner.script.lock().extend(outcomes);
        transport
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = Open>) {
        self.inner.script.lock().extend(outcomes);
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    fn latest(&self) -> Link {
        self.inner
            .links
            .lock()
            .last()
            .cloned()
            .expect("no stream has been opened")
    }

    /// Deliver a raw payload on the most recent stream.
    pub fn push(&self, raw: impl Into<String>) {
        let _ = self.latest().send(Ok(raw.into()));
    }

    /// Fail the most recent stream.
    pub fn fail(&self, err: SignalError) {
        let _ = self.latest().send(Err(err));
    }

    /// End the most recent stream cleanly.
    pub fn close(&self) {
        self.inner.links.lock().pop();
    }

    /// Streams whose receiving side the client still holds.
    pub fn live_streams(&self) -> usize {
        self.inner
            .links
            .lock()
            .iter()
            .filter(|link| !link.is_closed())
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, _endpoint: &Url) -> BoxFuture<'static, Result<FrameStream, SignalError>> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        let outcome = self.inner.script.lock().pop_front().unwrap_or(Open::Accept);

        match outcome {
            Open::Refuse => {
                async { Err(SignalError::Transport("connection refused".into())) }.boxed()
            }
            Open::Hang => future::pending().boxed(),
            Open::Accept => {
                let (tx, mut rx) = mpsc::unbounded_channel();
                self.inner.links.lock().push(tx);
                let frames = frame_stream(stream::poll_fn(move |cx| rx.poll_recv(cx)));
                async move { Ok(frames) }.boxed()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Connected,
    Message(SignalMessage),
    ParseError,
    HeartbeatTimeout,
    TransportError(String),
    Disconnected,
}

/// Records every callback invocation in order.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, config: ConnectionConfig) -> ConnectionConfig {
        let on_message = self.clone();
        let on_error = self.clone();
        let on_connected = self.clone();
        let on_disconnected = self.clone();
        config
            .on_message(move |m| on_message.seen.lock().push(Seen::Message(m.clone())))
            .on_error(move |e| {
                let seen = if e.is_parse() {
                    Seen::ParseError
                } else if e.is_heartbeat_timeout() {
                    Seen::HeartbeatTimeout
                } else {
                    Seen::TransportError(e.to_string())
                };
                on_error.seen.lock().push(seen);
            })
            .on_connected(move || on_connected.seen.lock().push(Seen::Connected))
            .on_disconnected(move || on_disconnected.seen.lock().push(Seen::Disconnected))
    }

    pub fn all(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn count(&self, pred: impl Fn(&Seen) -> bool) -> usize {
        self.seen.lock().iter().filter(|s| pred(s)).count()
    }

    pub fn connected(&self) -> usize {
        self.count(|s| matches!(s, Seen::Connected))
    }

    pub fn disconnected(&self) -> usize {
        self.count(|s| matches!(s, Seen::Disconnected))
    }

    pub fn transport_errors(&self) -> usize {
        self.count(|s| matches!(s, Seen::TransportError(_)))
    }

    pub fn heartbeat_timeouts(&self) -> usize {
        self.count(|s| matches!(s, Seen::HeartbeatTimeout))
    }

    pub fn parse_errors(&self) -> usize {
        self.count(|s| matches!(s, Seen::ParseError))
    }

    pub fn messages(&self) -> Vec<SignalMessage> {
        self.seen
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Let spawned tasks run until they block again.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Sleep on the (paused) clock, then let the client react.
pub async fn elapse(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

pub fn config(endpoint: &str) -> ConnectionConfig {
    ConnectionConfig::parse(endpoint).expect("valid endpoint")
}

pub fn heartbeat(id: &str) -> String {
    format!(r#"{{"type":"heartbeat","timestamp":"2026-10-17T09:30:00Z","message_id":"{id}"}}"#)
}

pub fn price(symbol: &str, price: f64, id: &str) -> String {
    format!(
        r#"{{"type":"price_update","symbol":"{symbol}","price":{price},"timestamp":"2026-10-17T09:30:00Z","message_id":"{id}"}}"#
    )
}
