use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{error, info, warn};
use weft_common::protocol::{CaptureEvent, RecorderMessage, UiContext};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to bind bridge socket: {0}")]
    Bind(#[from] std::io::Error),
}

/// WebSocket endpoint the browser extension connects to. Inbound text frames
/// are decoded into [`CaptureEvent`]s and forwarded on the event channel;
/// every change on the context channel is pushed to all connected extensions
/// so they can rebuild their menus.
pub struct BridgeServer {
    port: u16,
    events_tx: mpsc::Sender<CaptureEvent>,
    context_rx: watch::Receiver<UiContext>,
}

impl BridgeServer {
    pub fn new(
        port: u16,
        events_tx: mpsc::Sender<CaptureEvent>,
        context_rx: watch::Receiver<UiContext>,
    ) -> Self {
        Self {
            port,
            events_tx,
            context_rx,
        }
    }

    /// Bind the listener and spawn the accept loop. Returns once the socket
    /// is bound; connections are handled on their own tasks.
    pub async fn start(&self) -> Result<SocketAddr, BridgeError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = TcpListener::bind(&addr).await?;
        let local = listener.local_addr()?;
        info!("bridge listening on {local}");

        let events_tx = self.events_tx.clone();
        let context_rx = self.context_rx.clone();
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                info!(%peer, "extension connected");
                tokio::spawn(handle_connection(
                    stream,
                    events_tx.clone(),
                    context_rx.clone(),
                ));
            }
        });

        Ok(local)
    }
}

async fn handle_connection(
    stream: TcpStream,
    events_tx: mpsc::Sender<CaptureEvent>,
    mut context_rx: watch::Receiver<UiContext>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            error!(error = %err, "websocket handshake failed");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // New connections get the current surface immediately; everything after
    // that is change-driven.
    let current = context_rx.borrow_and_update().clone();
    if push_context(&mut ws_sender, &current).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = context_rx.changed() => {
                if changed.is_err() {
                    // recorder gone, nothing left to mirror
                    break;
                }
                let context = context_rx.borrow_and_update().clone();
                if push_context(&mut ws_sender, &context).await.is_err() {
                    break;
                }
            }

            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<CaptureEvent>(&text) {
                            Ok(event) => {
                                if events_tx.send(event).await.is_err() {
                                    // capture task gone, stop serving
                                    break;
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "unparseable frame from extension ignored");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("extension disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!(error = %err, "websocket error");
                        break;
                    }
                }
            }
        }
    }
}

async fn push_context(
    sender: &mut SplitSink<WebSocketStream<TcpStream>, Message>,
    context: &UiContext,
) -> Result<(), ()> {
    let message = RecorderMessage::Context(context.clone());
    let json = match serde_json::to_string(&message) {
        Ok(json) => json,
        Err(err) => {
            error!(error = %err, "context did not serialize");
            return Err(());
        }
    };
    if let Err(err) = sender.send(Message::Text(json)).await {
        error!(error = %err, "failed to push context to extension");
        return Err(());
    }
    Ok(())
}
