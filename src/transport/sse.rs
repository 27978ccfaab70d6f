// file: src/transport/sse.rs
// description: text/event-stream transport: reqwest body streaming and event framing

use super::{FrameStream, Transport};
use crate::error::SignalError;
use bytes::{Buf, Bytes, BytesMut};
use futures_util::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::{self, Stream},
};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
};
use std::{collections::VecDeque, fmt::Display};
use tracing::{debug, info, trace, warn};
use url::Url;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// One dispatched event. Only `data` reaches the client; the other fields are
/// kept for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub id: Option<String>,
    pub retry: Option<u64>,
    pub data: String,
}

/// Incremental event-stream parser. Feed it bytes in whatever pieces the
/// socket delivers; complete events come out of [`SseParser::next_event`].
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: BytesMut,
    pending: SseEvent,
    has_data: bool,
    bom_checked: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn next_event(&mut self) -> Option<SseEvent> {
        if !self.skip_bom() {
            return None;
        }
        while let Some(line) = self.next_line() {
            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    return Some(event);
                }
                continue;
            }
            self.apply_line(&line);
        }
        None
    }

    /// Drops a UTF-8 byte order mark at the very start of the stream, even when
    /// it arrives split across reads. Returns `false` while the first bytes
    /// could still turn out to be one.
    fn skip_bom(&mut self) -> bool {
        if self.bom_checked {
            return true;
        }
        if self.buffer.len() < BOM.len() && BOM.starts_with(&self.buffer) {
            return false;
        }
        if self.buffer.starts_with(BOM) {
            self.buffer.advance(BOM.len());
        }
        self.bom_checked = true;
        true
    }

    /// Returns the next complete line without its terminator. A trailing lone
    /// CR waits for more data in case it is the first half of CRLF.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = memchr::memchr2(CR, LF, &self.buffer)?;
        let skip = match self.buffer[pos] {
            CR if pos + 1 >= self.buffer.len() => return None,
            CR if self.buffer[pos + 1] == LF => 2,
            _ => 1,
        };
        let line = self.buffer.split_to(pos).to_vec();
        self.buffer.advance(skip);
        Some(line)
    }

    fn apply_line(&mut self, line: &[u8]) {
        let (name, value) = match memchr::memchr(b':', line) {
            Some(0) => return,
            Some(colon) => {
                let value = &line[colon + 1..];
                let value = value.strip_prefix(b" ").unwrap_or(value);
                (&line[..colon], value)
            }
            None => (line, &b""[..]),
        };
        let value = String::from_utf8_lossy(value);

        match name {
            b"data" => {
                if self.has_data {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(&value);
                self.has_data = true;
            }
            b"event" => self.pending.event = Some(value.into_owned()),
            b"id" if !value.contains('\0') => self.pending.id = Some(value.into_owned()),
            b"retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.pending.retry = Some(ms);
                }
            }
            _ => trace!("ignoring sse field {}", String::from_utf8_lossy(name)),
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.pending);
        let had_data = std::mem::replace(&mut self.has_data, false);
        had_data.then_some(event)
    }
}

/// Turns a response body into decoded event payloads. Events parsed before a
/// body failure are still delivered; the failure comes last.
struct EventFrames<S> {
    body: S,
    parser: SseParser,
    ready: VecDeque<String>,
    finished: bool,
}

impl<S, E> EventFrames<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<SignalError> + Display,
{
    fn new(body: S) -> Self {
        Self {
            body,
            parser: SseParser::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    async fn next_payload(&mut self) -> Option<Result<String, SignalError>> {
        loop {
            if let Some(data) = self.ready.pop_front() {
                return Some(Ok(data));
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    trace!(bytes = chunk.len(), "sse bytes received");
                    self.parser.feed(&chunk);
                    while let Some(event) = self.parser.next_event() {
                        trace!(event = ?event.event, id = ?event.id, "sse event dispatched");
                        self.ready.push_back(event.data);
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "event stream body failed");
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                None => {
                    debug!("event stream body ended");
                    self.finished = true;
                    return Some(Err(SignalError::ConnectionClosed));
                }
            }
        }
    }
}

fn event_frames<S, E>(body: S) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Into<SignalError> + Display + Send + 'static,
{
    let frames = stream::unfold(EventFrames::new(body), |mut frames| async move {
        let item = frames.next_payload().await?;
        Some((item, frames))
    });
    Box::pin(frames)
}

/// Server-sent events over `reqwest`, with rustls for `https`.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: Client,
}

impl SseTransport {
    pub fn new() -> Result<Self, SignalError> {
        let client = Client::builder()
            .user_agent(concat!("signal-stream/", env!("CARGO_PKG_VERSION")))
            // every reconnect dials a fresh connection
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(client: Client, endpoint: Url) -> Result<FrameStream, SignalError> {
        let response = client
            .get(endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        check_response(status, content_type)?;
        info!(
            endpoint = %endpoint.host_str().unwrap_or_default(),
            status = status.as_u16(),
            "event stream opened"
        );

        Ok(event_frames(Box::pin(response.bytes_stream())))
    }
}

fn check_response(status: StatusCode, content_type: &str) -> Result<(), SignalError> {
    if status != StatusCode::OK {
        warn!(status = status.as_u16(), "event stream rejected");
        return Err(SignalError::HttpStatus {
            status: status.as_u16(),
        });
    }

    if !content_type
        .to_ascii_lowercase()
        .starts_with("text/event-stream")
    {
        return Err(SignalError::UnexpectedContentType(content_type.to_string()));
    }
    Ok(())
}

impl Transport for SseTransport {
    fn open(&self, endpoint: &Url) -> BoxFuture<'static, Result<FrameStream, SignalError>> {
        Self::connect(self.client.clone(), endpoint.clone()).boxed()
    }
}
