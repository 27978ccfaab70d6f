// file: src/transport/net.rs
// description: tcp/tls dialing and upgrade response head reading for the websocket transport

use crate::error::SignalError;
use bytes::BytesMut;
use std::{
    io,
    pin::Pin,
    sync::{Arc, LazyLock},
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::{TlsConnector, client::TlsStream};
use tracing::debug;
use url::Url;

const MAX_HEAD_BYTES: usize = 16 * 1024;

static TLS_CONFIG: LazyLock<Result<Arc<rustls::ClientConfig>, rustls::Error>> =
    LazyLock::new(|| {
        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        })
        .with_no_client_auth();
        Ok(Arc::new(config))
    });

pub(crate) enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Replays bytes read past a response head before reading from the socket.
pub(crate) struct Prefixed<S> {
    prefix: BytesMut,
    inner: S,
}

impl<S> Prefixed<S> {
    pub(crate) fn new(prefix: BytesMut, inner: S) -> Self {
        Self { prefix, inner }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Prefixed<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.prefix.is_empty() {
            let n = this.prefix.len().min(buf.remaining());
            buf.put_slice(&this.prefix.split_to(n));
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Prefixed<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Open a TCP connection to the endpoint, wrapping it in TLS for `https`/`wss`.
pub(crate) async fn dial(url: &Url) -> Result<MaybeTlsStream, SignalError> {
    let host = url
        .host_str()
        .ok_or_else(|| SignalError::Transport(format!("endpoint has no host: {url}")))?;
    let port = url.port_or_known_default().unwrap_or(443);
    let secure = matches!(url.scheme(), "https" | "wss");

    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    debug!(host, port, secure, "tcp connection established");

    if !secure {
        return Ok(MaybeTlsStream::Plain(stream));
    }

    let config = TLS_CONFIG.as_ref().map_err(|e| e.clone())?;
    let connector = TlsConnector::from(Arc::clone(config));
    let domain = rustls::pki_types::ServerName::try_from(host.to_string())
        .map_err(|e| SignalError::InvalidDnsName(e.to_string()))?;
    let tls_stream = connector.connect(domain, stream).await?;
    Ok(MaybeTlsStream::Tls(Box::new(tls_stream)))
}

/// Request target (`/path?query`) for the request line.
pub(crate) fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// `Host` header value, with the port only when it is not the scheme default.
pub(crate) fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn parse(raw: &str) -> Result<Self, SignalError> {
        let mut lines = raw.split("\r\n");
        let status_line = lines
            .next()
            .ok_or_else(|| SignalError::MalformedResponse("empty response".into()))?;

        let mut parts = status_line.split_whitespace();
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/1.") {
            return Err(SignalError::MalformedResponse(format!(
                "bad status line: {status_line}"
            )));
        }
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                SignalError::MalformedResponse(format!("bad status line: {status_line}"))
            })?;

        let headers = lines
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        Ok(Self { status, headers })
    }
}

/// Read bytes until the end of the response head. Whatever follows the head is
/// left in the returned buffer.
pub(crate) async fn read_response_head<S>(
    stream: &mut S,
) -> Result<(ResponseHead, BytesMut), SignalError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        if let Some(end) = memchr::memmem::find(&buf, b"\r\n\r\n") {
            let head = buf.split_to(end + 4);
            let text = std::str::from_utf8(&head[..end])
                .map_err(|e| SignalError::MalformedResponse(e.to_string()))?;
            return Ok((ResponseHead::parse(text)?, buf));
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(SignalError::MalformedResponse(
                "response head too large".into(),
            ));
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(SignalError::ConnectionClosed);
        }
    }
}
