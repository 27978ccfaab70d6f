// file: src/transport/ws.rs
// description: websocket transport for ws/wss endpoints, one text frame per payload

use super::{
    FrameStream, Transport,
    net::{self, MaybeTlsStream, Prefixed},
};
use crate::error::SignalError;
use fastwebsockets::{OpCode, Role, WebSocket};
use futures_util::{FutureExt, future::BoxFuture, stream};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

type WsStream = WebSocket<Prefixed<MaybeTlsStream>>;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub async fn connect(endpoint: Url) -> Result<FrameStream, SignalError> {
        let mut io = net::dial(&endpoint).await?;

        let key = fastwebsockets::handshake::generate_key();
        let handshake_req = format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            net::request_target(&endpoint),
            net::host_header(&endpoint),
            key
        );
        io.write_all(handshake_req.as_bytes()).await?;

        let (head, rest) = net::read_response_head(&mut io).await?;
        if head.status != 101 {
            warn!(status = head.status, "websocket upgrade rejected");
            return Err(SignalError::HttpStatus {
                status: head.status,
            });
        }
        let upgrade = head.header("upgrade").unwrap_or_default();
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(SignalError::MalformedResponse(format!(
                "upgrade header was {upgrade:?}"
            )));
        }
        if !rest.is_empty() {
            debug!(bytes = rest.len(), "frames arrived with the upgrade response");
        }
        info!(
            endpoint = %endpoint.host_str().unwrap_or_default(),
            "websocket stream opened"
        );

        let mut ws = WebSocket::after_handshake(Prefixed::new(rest, io), Role::Client);
        ws.set_writev(true);
        ws.set_auto_close(true);
        ws.set_auto_pong(true);

        Ok(Box::pin(stream::unfold(Some(ws), read_text)))
    }
}

async fn read_text(
    ws: Option<WsStream>,
) -> Option<(Result<String, SignalError>, Option<WsStream>)> {
    let mut ws = ws?;
    loop {
        let frame = match ws.read_frame().await {
            Ok(frame) => frame,
            Err(e) => return Some((Err(SignalError::WebSocketError(e)), None)),
        };

        match frame.opcode {
            OpCode::Text => {
                let text = String::from_utf8_lossy(&frame.payload).into_owned();
                return Some((Ok(text), Some(ws)));
            }
            OpCode::Close => {
                debug!("received close frame");
                return Some((Err(SignalError::ConnectionClosed), None));
            }
            OpCode::Binary => {
                debug!(bytes = frame.payload.len(), "ignoring binary frame");
            }
            _ => {}
        }
    }
}

impl Transport for WsTransport {
    fn open(&self, endpoint: &Url) -> BoxFuture<'static, Result<FrameStream, SignalError>> {
        Self::connect(endpoint.clone()).boxed()
    }
}
