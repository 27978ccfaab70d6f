// file: src/client.rs
// description: self-healing event-stream client: connection lifecycle, liveness deadline and bounded reconnection

use crate::{
    client_state::{ClientState, ConnectionPhase, ConnectionSnapshot, SharedClientState},
    config::{ConnectionConfig, SignalHandlers},
    error::SignalError,
    monitoring,
    transport::{AutoTransport, FrameStream, Transport},
    types::SignalMessage,
};
use futures_util::StreamExt;
use parking_lot::{Mutex, ReentrantMutex};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, sleep, timeout},
};
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

/// Why a connection stopped delivering.
enum SessionEnd {
    /// Transport failure; consumes the retry budget.
    Failed(SignalError),
    /// Nothing arrived within `stale_after`; reconnect at once, budget untouched.
    Stale(Duration),
    /// `disconnect()` or a newer `connect()` owns the state now.
    Superseded,
}

enum FrameOutcome {
    Accepted,
    Dropped,
    Superseded,
}

struct Shared {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    state: SharedClientState,
    snapshot_tx: watch::Sender<ConnectionSnapshot>,
    /// Held from the session check through each callback, and by
    /// `disconnect()`, so no callback runs once `disconnect()` has returned.
    /// Re-entrant so callbacks may call `disconnect()` themselves.
    callbacks: ReentrantMutex<()>,
}

/// One logical subscription to a signal stream.
///
/// `connect()` spawns a supervisor task that opens the transport, relays
/// messages to the configured callbacks and reconnects on its own:
/// transport errors are retried every `reconnect_interval` up to
/// `max_reconnect_attempts` times, silence longer than `stale_after` triggers
/// an immediate reconnect that does not count against that budget.
/// An open that takes longer than `connect_timeout` is a transport error.
/// `disconnect()` aborts the supervisor, which drops the transport and every
/// pending timer with it. It waits for a callback already running on another
/// thread, and no callback starts after it returns.
pub struct SignalStreamClient {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

/// Returned by [`SignalStreamClient::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    channel: String,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn unsubscribe(self) {
        trace!(channel = %self.channel, "unsubscribe is a no-op for server-filtered streams");
    }
}

impl SignalStreamClient {
    /// Client over the scheme-selected transport (SSE or WebSocket).
    pub fn new(config: ConnectionConfig) -> Result<Self, SignalError> {
        Self::with_transport(config, AutoTransport::new()?)
    }

    pub fn with_transport<T: Transport>(
        config: ConnectionConfig,
        transport: T,
    ) -> Result<Self, SignalError> {
        config.validate()?;
        let state = ClientState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                transport: Arc::new(transport),
                state: Arc::new(Mutex::new(state)),
                snapshot_tx,
                callbacks: ReentrantMutex::new(()),
            }),
            supervisor: Mutex::new(None),
        })
    }

    /// Start streaming. Returns immediately; progress is reported through the
    /// callbacks. Does nothing while a session is already running.
    pub fn connect(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("connect() called outside a tokio runtime");
            if let Some(cb) = &self.shared.config.handlers.on_error {
                cb(&SignalError::NoRuntime);
            }
            return;
        };

        let mut supervisor = self.supervisor.lock();
        let session = {
            let mut state = self.shared.state.lock();
            if state.phase.is_live() {
                debug!(phase = ?state.phase, "connect ignored, session already running");
                return;
            }
            state.begin_session()
        };
        self.shared.publish();

        if let Some(previous) = supervisor.take() {
            previous.abort();
        }

        let span = info_span!(
            "signal_session",
            session,
            host = self.shared.config.endpoint.host_str().unwrap_or_default()
        );
        let shared = Arc::clone(&self.shared);
        *supervisor = Some(runtime.spawn(run_session(shared, session).instrument(span)));
    }

    /// Stop streaming and cancel every timer. Safe to call repeatedly or
    /// before `connect()`; `on_disconnected` fires only when a connection was
    /// open.
    pub fn disconnect(&self) {
        let _callbacks = self.shared.callbacks.lock();
        let handle = self.supervisor.lock().take();
        let was_connected = {
            let mut state = self.shared.state.lock();
            if state.phase == ConnectionPhase::Idle {
                return;
            }
            state.end_session()
        };

        if let Some(handle) = handle {
            handle.abort();
        }
        self.shared.publish();

        if was_connected {
            monitoring::set_connected(false);
            info!(endpoint = %self.shared.config.endpoint.host_str().unwrap_or_default(), "disconnected");
            if let Some(cb) = &self.shared.config.handlers.on_disconnected {
                cb();
            }
        }
    }

    /// Kept for parity with channel-based realtime clients. The server decides
    /// what is pushed, so the channel and callback are not used.
    pub fn subscribe<F>(&self, channel: &str, _callback: F) -> Subscription
    where
        F: Fn(&SignalMessage) + Send + Sync + 'static,
    {
        debug!(channel, "channel filtering happens server-side, ignoring subscribe");
        Subscription {
            channel: channel.to_string(),
        }
    }

    pub fn connected(&self) -> bool {
        self.shared.state.lock().is_connected
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.shared.state.lock().phase
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.state.lock().reconnect_attempts
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Receiver that observes every state transition and delivered message.
    pub fn watch(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }
}

impl Drop for SignalStreamClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run_session(shared: Arc<Shared>, session: u64) {
    loop {
        debug!("opening stream");
        let connect_timeout = shared.config.connect_timeout;
        let opened = timeout(connect_timeout, shared.transport.open(&shared.config.endpoint))
            .await
            .unwrap_or(Err(SignalError::ConnectTimeout {
                after: connect_timeout,
            }));
        let end = match opened {
            Ok(frames) => {
                if !shared.on_open(session) {
                    return;
                }
                shared.pump(session, frames).await
            }
            Err(e) => SessionEnd::Failed(e),
        };

        match end {
            SessionEnd::Stale(silent_for) => {
                if !shared.on_stale(session, silent_for) {
                    return;
                }
            }
            SessionEnd::Failed(e) => match shared.on_transport_error(session, e) {
                Some(delay) => sleep(delay).await,
                None => return,
            },
            SessionEnd::Superseded => return,
        }
    }
}

impl Shared {
    fn publish(&self) {
        let snapshot = self.state.lock().snapshot();
        self.snapshot_tx.send_replace(snapshot);
    }

    fn is_current(&self, session: u64) -> bool {
        self.state.lock().is_current(session)
    }

    /// Runs `f` with the callbacks only while `session` still owns the state.
    fn notify(&self, session: u64, f: impl FnOnce(&SignalHandlers)) -> bool {
        let _callbacks = self.callbacks.lock();
        if !self.is_current(session) {
            return false;
        }
        f(&self.config.handlers);
        true
    }

    fn on_open(&self, session: u64) -> bool {
        let connection_id = {
            let mut state = self.state.lock();
            if !state.is_current(session) {
                return false;
            }
            state.reset_connection()
        };

        monitoring::set_connected(true);
        info!(%connection_id, "stream connected");
        self.publish();

        self.notify(session, |handlers| {
            if let Some(cb) = &handlers.on_connected {
                cb();
            }
        });
        true
    }

    async fn pump(&self, session: u64, mut frames: FrameStream) -> SessionEnd {
        let stale_after = self.config.stale_after;
        let deadline = sleep(stale_after);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(raw)) => match self.on_frame(session, &raw) {
                        FrameOutcome::Accepted => {
                            deadline.as_mut().reset(Instant::now() + stale_after);
                        }
                        FrameOutcome::Dropped => {}
                        FrameOutcome::Superseded => return SessionEnd::Superseded,
                    },
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    None => return SessionEnd::Failed(SignalError::ConnectionClosed),
                },
                () = &mut deadline => {
                    let silent_for = self
                        .state
                        .lock()
                        .last_message_at
                        .map(|at| at.elapsed())
                        .unwrap_or(stale_after);
                    return SessionEnd::Stale(silent_for);
                }
            }
        }
    }

    fn on_frame(&self, session: u64, raw: &str) -> FrameOutcome {
        match SignalMessage::parse(raw) {
            Ok(message) => {
                {
                    let mut state = self.state.lock();
                    if !state.is_current(session) {
                        return FrameOutcome::Superseded;
                    }
                    state.record_message(&message);
                }
                monitoring::record_message(&message);
                trace!(kind = %message.kind(), message_id = %message.message_id, "signal received");
                self.publish();

                self.notify(session, |handlers| {
                    if let Some(cb) = &handlers.on_message {
                        cb(&message);
                    }
                });
                FrameOutcome::Accepted
            }
            Err(e) => {
                {
                    let mut state = self.state.lock();
                    if !state.is_current(session) {
                        return FrameOutcome::Superseded;
                    }
                    state.record_parse_error();
                }
                monitoring::record_parse_error();
                warn!(
                    error = %e,
                    payload = %raw.chars().take(100).collect::<String>(),
                    "dropping malformed signal"
                );

                self.notify(session, |handlers| {
                    if let Some(cb) = &handlers.on_error {
                        cb(&e);
                    }
                });
                FrameOutcome::Dropped
            }
        }
    }

    fn on_stale(&self, session: u64, silent_for: Duration) -> bool {
        {
            let mut state = self.state.lock();
            if !state.is_current(session) {
                return false;
            }
            state.tear_down();
            state.record_heartbeat_timeout();
        }
        monitoring::set_connected(false);
        monitoring::record_heartbeat_timeout();
        warn!(
            silent_ms = silent_for.as_millis() as u64,
            "no signal within liveness window, reconnecting"
        );
        self.publish();

        self.notify(session, |handlers| {
            if let Some(cb) = &handlers.on_error {
                cb(&SignalError::HeartbeatTimeout { silent_for });
            }
        }) && self.is_current(session)
    }

    /// Returns the delay before the next attempt, or `None` when the session
    /// is over.
    fn on_transport_error(&self, session: u64, err: SignalError) -> Option<Duration> {
        {
            let mut state = self.state.lock();
            if !state.is_current(session) {
                return None;
            }
            state.tear_down();
        }
        monitoring::set_connected(false);
        error!("Connection error: {}", err);
        self.publish();

        self.notify(session, |handlers| {
            if let Some(cb) = &handlers.on_error {
                cb(&err);
            }
        });

        let max = self.config.max_reconnect_attempts;
        // exhaustion ends the session and reports it under one hold
        let callbacks = self.callbacks.lock();
        let attempt = {
            let mut state = self.state.lock();
            if !state.is_current(session) {
                return None;
            }
            if state.reconnect_attempts < max {
                Some(state.increment_reconnect())
            } else {
                state.end_session();
                None
            }
        };
        self.publish();

        match attempt {
            Some(attempt) => {
                drop(callbacks);
                monitoring::record_reconnect();
                let delay = self.config.next_reconnect_delay();
                warn!(
                    "Reconnecting in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    max
                );
                Some(delay)
            }
            None => {
                error!("Maximum reconnection attempts ({}) reached", max);
                if let Some(cb) = &self.config.handlers.on_disconnected {
                    cb();
                }
                None
            }
        }
    }
}
