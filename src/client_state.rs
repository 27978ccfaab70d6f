/// file: src/client_state.rs
/// description: connection state owned by one client instance
use crate::types::SignalMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;

/// Where a client is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Never connected.
    Idle,
    /// Transport opening; nothing received yet.
    Connecting,
    /// Messages flowing, liveness deadline armed.
    Open,
    /// Waiting out the reconnect delay before attempt `attempt`.
    Reconnecting { attempt: u32 },
    /// Disconnected or out of retries. `connect()` starts over.
    Closed,
}

impl ConnectionPhase {
    /// A supervisor task is running for this phase.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Open | Self::Reconnecting { .. }
        )
    }
}

/// Read-only view published to watchers on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSnapshot {
    pub phase: ConnectionPhase,
    pub is_connected: bool,
    pub reconnect_attempts: u32,
    pub connection_id: Option<String>,
    pub last_message_at: Option<Instant>,
    pub last_message: Option<SignalMessage>,
    /// Count of delivered messages; changes on every delivery, duplicates included.
    pub message_seq: u64,
    pub parse_errors: u64,
    pub heartbeat_timeouts: u64,
}

#[derive(Debug)]
pub struct ClientState {
    /// Bumped by every `connect()`/`disconnect()`; a supervisor only acts
    /// while the session it was started for is current.
    pub session: u64,
    pub phase: ConnectionPhase,
    pub connection_id: Option<String>,
    pub is_connected: bool,
    pub reconnect_attempts: u32,
    pub last_message_at: Option<Instant>,
    pub last_message: Option<SignalMessage>,
    pub total_messages: u64,
    pub parse_errors: u64,
    pub heartbeat_timeouts: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            session: 0,
            phase: ConnectionPhase::Idle,
            connection_id: None,
            is_connected: false,
            reconnect_attempts: 0,
            last_message_at: None,
            last_message: None,
            total_messages: 0,
            parse_errors: 0,
            heartbeat_timeouts: 0,
        }
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its id.
    pub fn begin_session(&mut self) -> u64 {
        self.session += 1;
        self.reconnect_attempts = 0;
        self.phase = ConnectionPhase::Connecting;
        self.session
    }

    /// End the current session. Returns whether a connection was open.
    pub fn end_session(&mut self) -> bool {
        self.session += 1;
        self.phase = ConnectionPhase::Closed;
        self.connection_id = None;
        std::mem::replace(&mut self.is_connected, false)
    }

    pub fn is_current(&self, session: u64) -> bool {
        self.session == session
    }

    pub fn reset_connection(&mut self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.connection_id = Some(id.clone());
        self.phase = ConnectionPhase::Open;
        self.is_connected = true;
        self.reconnect_attempts = 0;
        self.last_message_at = Some(Instant::now());
        id
    }

    /// Drop the transport without touching the retry budget.
    pub fn tear_down(&mut self) {
        self.is_connected = false;
        self.connection_id = None;
        self.phase = ConnectionPhase::Connecting;
    }

    pub fn increment_reconnect(&mut self) -> u32 {
        self.reconnect_attempts += 1;
        self.phase = ConnectionPhase::Reconnecting {
            attempt: self.reconnect_attempts,
        };
        self.reconnect_attempts
    }

    pub fn record_message(&mut self, message: &SignalMessage) {
        self.last_message_at = Some(Instant::now());
        self.last_message = Some(message.clone());
        self.total_messages += 1;
    }

    pub fn record_parse_error(&mut self) {
        self.parse_errors += 1;
    }

    pub fn record_heartbeat_timeout(&mut self) {
        self.heartbeat_timeouts += 1;
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            phase: self.phase,
            is_connected: self.is_connected,
            reconnect_attempts: self.reconnect_attempts,
            connection_id: self.connection_id.clone(),
            last_message_at: self.last_message_at,
            last_message: self.last_message.clone(),
            message_seq: self.total_messages,
            parse_errors: self.parse_errors,
            heartbeat_timeouts: self.heartbeat_timeouts,
        }
    }
}

pub type SharedClientState = Arc<Mutex<ClientState>>;
