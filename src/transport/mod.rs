// file: src/transport/mod.rs
// description: stream-opening primitives the client is parameterized over

use crate::error::SignalError;
use futures_util::{
    FutureExt,
    future::BoxFuture,
    stream::{BoxStream, Stream},
};
use std::future::Future;
use url::Url;

mod net;
/// Server-sent events over HTTP.
pub mod sse;
/// WebSocket text frames.
pub mod ws;

pub use sse::SseTransport;
pub use ws::WsTransport;

/// Raw JSON payloads as they come off the wire, one item per event.
pub type FrameStream = BoxStream<'static, Result<String, SignalError>>;

/// Opens one connection to an endpoint.
///
/// The reconnection and liveness logic in [`crate::client::SignalStreamClient`] is
/// identical for every runtime; only this primitive changes. Any
/// `Fn(Url) -> impl Future<Output = Result<FrameStream, SignalError>>` is a transport.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, endpoint: &Url) -> BoxFuture<'static, Result<FrameStream, SignalError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(Url) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FrameStream, SignalError>> + Send + 'static,
{
    fn open(&self, endpoint: &Url) -> BoxFuture<'static, Result<FrameStream, SignalError>> {
        (self)(endpoint.clone()).boxed()
    }
}

/// Box any payload stream into a [`FrameStream`].
pub fn frame_stream<S>(stream: S) -> FrameStream
where
    S: Stream<Item = Result<String, SignalError>> + Send + 'static,
{
    Box::pin(stream)
}

/// Chooses SSE for `http`/`https` endpoints and WebSocket for `ws`/`wss`.
#[derive(Debug, Clone)]
pub struct AutoTransport {
    sse: SseTransport,
    ws: WsTransport,
}

impl AutoTransport {
    pub fn new() -> Result<Self, SignalError> {
        Ok(Self {
            sse: SseTransport::new()?,
            ws: WsTransport,
        })
    }
}

impl Transport for AutoTransport {
    fn open(&self, endpoint: &Url) -> BoxFuture<'static, Result<FrameStream, SignalError>> {
        match endpoint.scheme() {
            "http" | "https" => self.sse.open(endpoint),
            "ws" | "wss" => self.ws.open(endpoint),
            other => {
                let err = SignalError::UnsupportedScheme(other.to_string());
                async move { Err(err) }.boxed()
            }
        }
    }
}
