//! WebSocket listener for the signaling relay
//!
//! Accepts client connections and runs one task per connection. Inbound
//! frames feed the signaling router; messages routed here from other
//! connections drain out of the peer channel between inbound frames. The
//! registry entry a connection owns is removed when its task ends,
//! whichever way it ends.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::presence::{PeerHandle, PresenceRegistry};
use crate::server::protocol::ServerMessage;
use crate::server::router::SignalingRouter;

/// Listener settings for the signaling relay
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Listen port
    pub port: u16,
}

impl ServerConfig {
    /// Listener settings for the given address and port
    pub fn new(bind: String, port: u16) -> Self {
        Self { bind, port }
    }

    /// The `address:port` string the listener binds
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// WebSocket server hosting the signaling relay
pub struct WebSocketServer {
    config: ServerConfig,
    router: SignalingRouter,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServer {
    /// Create a relay server over the given presence registry
    pub fn new(config: ServerConfig, registry: Arc<PresenceRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            router: SignalingRouter::new(registry),
            shutdown_tx,
        }
    }

    /// Ask the relay and every connection task to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Accept connections until shutdown is requested
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("Signaling relay listening on ws://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!("Accept failed: {}", e);
                            continue;
                        }
                    };

                    let router = self.router.clone();
                    let shutdown = self.shutdown_tx.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, remote, router, shutdown).await {
                            warn!("Connection from {} ended with error: {}", remote, e);
                        }
                    });
                }
                _ = shutdown_rx.recv() => {
                    info!("Stopping signaling relay");
                    break;
                }
            }
        }

        let online = self.router.registry().online_count().await;
        if online > 0 {
            info!("Relay stopped with {} identities still registered", online);
        }

        Ok(())
    }
}

/// Run one client connection from WebSocket upgrade to cleanup
async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    router: SignalingRouter,
    shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let ws = accept_async(stream).await?;

    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, remote = %remote, "Connection opened");

    // Other connections reach this one through clones of this sender, handed
    // out by the registry once the client registers.
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let peer = PeerHandle::new(conn_id, out_tx);

    let result = pump_frames(ws, &router, &peer, out_rx, shutdown_rx).await;

    // Presence entries must not survive the connection that owns them
    router.handle_disconnect(conn_id).await;

    info!(conn_id = %conn_id, remote = %remote, "Connection closed");
    result
}

/// Pump one connection's frames until it closes or the server shuts down
///
/// Inbound frames are processed strictly in arrival order.
async fn pump_frames(
    ws: WebSocketStream<TcpStream>,
    router: &SignalingRouter,
    peer: &PeerHandle,
    mut out_rx: mpsc::UnboundedReceiver<ServerMessage>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let (mut sink, mut frames) = ws.split();

    loop {
        tokio::select! {
            inbound = frames.next() => {
                let Some(frame) = inbound else {
                    debug!(conn_id = %peer.conn_id(), "Peer went away");
                    break;
                };
                match frame? {
                    Message::Text(text) => {
                        if let Some(reply) = router.handle_frame(peer, &text).await {
                            send_json(&mut sink, &reply).await?;
                        }
                    }
                    Message::Ping(data) => {
                        sink.send(Message::Pong(data)).await?;
                    }
                    Message::Close(_) => {
                        debug!(conn_id = %peer.conn_id(), "Close frame received");
                        break;
                    }
                    Message::Binary(data) => {
                        warn!(conn_id = %peer.conn_id(), len = data.len(), "Ignoring binary frame");
                    }
                    Message::Pong(_) | Message::Frame(_) => {}
                }
            }
            routed = out_rx.recv() => {
                // `peer` keeps a sender alive for the whole loop, so recv
                // cannot yield None here
                if let Some(message) = routed {
                    send_json(&mut sink, &message).await?;
                }
            }
            _ = shutdown_rx.recv() => {
                debug!(conn_id = %peer.conn_id(), "Closing for shutdown");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    Ok(())
}

async fn send_json(
    sink: &mut SplitSink<WebSocketStream<TcpStream>, Message>,
    message: &ServerMessage,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(message)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
