//! Socket transport over tokio-tungstenite.
//!
//! One pump task per socket moves frames between the channel pair in
//! [`SocketLink`] and the wire. Pings from the hub are answered by
//! tungstenite on the next read, which keeps the hub's liveness sweep happy.

use async_trait::async_trait;
use frames::{ClientFrame, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use super::{SocketConnector, SocketLink, TransportError};

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SocketConnector for WsConnector {
    async fn connect(&self) -> Result<SocketLink, TransportError> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::WsConnect(Box::new(e)))?;
        info!(url = %self.url, "ws: connected");

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerFrame>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = out_rx.recv() => {
                        let Some(frame) = frame else {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        };
                        if sink.send(Message::Text(frames::encode_frame(&frame).into())).await.is_err() {
                            break;
                        }
                    }
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => match frames::decode_server_frame(text.as_str()) {
                            Ok(frame) => {
                                if in_tx.send(frame).is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!(error = %e, "ws: ignoring undecodable frame"),
                        },
                        Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                }
            }
            debug!("ws: pump stopped");
        });

        Ok(SocketLink { outbound: out_tx, inbound: in_rx })
    }
}
