use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::channelling::ChannellingApi;
use super::client::{Client, JsonEncoder};
use super::messages::{ClientMessage, ServerMessage};
use super::relay::RelayCredentials;
use super::rooms::Rooms;
use super::session::Session;
use super::token::TokenCodec;
use super::types::{OutboundMessage, generate_session_id};
use crate::config::Config;

pub const DEFAULT_SIGNALING_PORT: u16 = 8086;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SignalingServer {
    api: Arc<ChannellingApi>,
    next_index: AtomicU64,
}

impl SignalingServer {
    pub fn new(config: &Config) -> Self {
        let encoder = Arc::new(JsonEncoder);
        let rooms = Arc::new(Rooms::new(
            encoder.clone(),
            config.max_room_users,
            config.max_broadcasts_per_second,
        ));
        let tokens = Arc::new(TokenCodec::new(
            &config.session_secret,
            &config.encryption_secret,
        ));
        let relay = RelayCredentials::new(
            config.turn_secret.clone(),
            config.turn_ttl,
            config.turn_uris.clone(),
        );

        Self {
            api: Arc::new(ChannellingApi::new(
                config.version.clone(),
                tokens,
                relay,
                rooms,
                encoder,
            )),
            next_index: AtomicU64::new(1),
        }
    }

    pub fn api(&self) -> &Arc<ChannellingApi> {
        &self.api
    }

    pub async fn run(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signaling server listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, addr) = listener.accept().await?;
            let api = self.api.clone();
            let index = self.next_index.fetch_add(1, Ordering::Relaxed);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, api, index).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

/// The transport side of one connection, as seen by the hub.
struct WsClient {
    session: Arc<Session>,
    index: u64,
    tx: mpsc::UnboundedSender<OutboundMessage>,
    ctrl_tx: mpsc::UnboundedSender<Message>,
    closed: Arc<Notify>,
}

impl Client for WsClient {
    fn send(&self, message: OutboundMessage) {
        // Fails only once the writer task is gone.
        let _ = self.tx.send(message);
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn close(&self, graceful: bool) {
        if graceful {
            let _ = self.ctrl_tx.send(Message::Close(None));
        } else {
            self.closed.notify_one();
        }
    }

    fn index(&self) -> u64 {
        self.index
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    api: Arc<ChannellingApi>,
    index: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    info!("WebSocket connection {} from {}", index, addr);

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();
    let closed = Arc::new(Notify::new());

    let session_id = generate_session_id();
    let session = Arc::new(Session::new(
        session_id.clone(),
        api.attestation(&session_id),
    ));
    let client: Arc<dyn Client> = Arc::new(WsClient {
        session,
        index,
        tx,
        ctrl_tx: ctrl_tx.clone(),
        closed: closed.clone(),
    });

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    api.on_connect(client.clone());

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", addr);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + PONG_TIMEOUT);
                debug!("Ping sent to {}", addr);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", addr);
                break;
            }

            _ = closed.notified() => {
                info!("Connection {} closed by server", index);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => handle_text_message(&text, &client, &api),
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", addr);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", addr);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    api.on_disconnect(&client);

    send_task.abort();
    info!("WebSocket disconnected: {}", addr);

    Ok(())
}

fn handle_text_message(text: &str, client: &Arc<dyn Client>, api: &ChannellingApi) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            client.reply(&ServerMessage::Error {
                code: "bad_request".to_string(),
                message: format!("Invalid message: {}", e),
            });
            return;
        }
    };

    if let Err(e) = api.on_incoming(client, message) {
        warn!("Message handling error for {}: {}", client.session().id, e);
        client.reply(&ServerMessage::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::testing::FakeClient;
    use crate::signaling::types::SignalingError;
    use serde_json::{Value, json};
    use tokio_tungstenite::connect_async;

    async fn start() -> (Arc<ChannellingApi>, String) {
        let server = SignalingServer::new(&Config::default());
        let api = server.api().clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });
        (api, url)
    }

    async fn next_json<S>(ws: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn connect_receives_self_then_joins_room() {
        let (api, url) = start().await;
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

        let hello = next_json(&mut ws).await;
        assert_eq!(hello["type"], "self");
        let id = hello["id"].as_str().unwrap().to_string();
        assert!(api.registry().lookup(&id).is_some());

        ws.send(Message::Text(
            json!({"type": "hello", "id": "lobby", "ua": "test"})
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

        let welcome = next_json(&mut ws).await;
        assert_eq!(welcome["type"], "welcome");
        assert_eq!(welcome["room"], "lobby");
    }

    #[tokio::test]
    async fn invalid_message_gets_error_reply() {
        let (_, url) = start().await;
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();
        next_json(&mut ws).await;

        ws.send(Message::Text("not json".into())).await.unwrap();

        let reply = next_json(&mut ws).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["code"], "bad_request");
    }

    #[tokio::test]
    async fn join_is_broadcast_to_room_members() {
        let (_, url) = start().await;
        let (mut first, _) = connect_async(url.as_str()).await.unwrap();
        let (mut second, _) = connect_async(url.as_str()).await.unwrap();
        next_json(&mut first).await;
        let second_id = next_json(&mut second).await["id"].as_str().unwrap().to_string();

        let join = json!({"type": "hello", "id": "lobby"}).to_string();
        first.send(Message::Text(join.clone().into())).await.unwrap();
        assert_eq!(next_json(&mut first).await["type"], "welcome");
        second.send(Message::Text(join.into())).await.unwrap();

        let broadcast = next_json(&mut first).await;
        assert_eq!(broadcast["type"], "envelope");
        assert_eq!(broadcast["from"], second_id.as_str());
        assert_eq!(broadcast["data"]["type"], "session");
    }

    #[test]
    fn default_config_rejects_empty_key_nonces() {
        let server = SignalingServer::new(&Config::default());
        let client: Arc<dyn Client> = FakeClient::new("s1", 0);
        server.api().on_connect(client.clone());

        let forged = TokenCodec::new(b"", b"").user_nonce("admin");
        let err = server
            .api()
            .on_incoming(
                &client,
                ClientMessage::Authenticate {
                    userid: "admin".to_string(),
                    nonce: forged,
                },
            )
            .unwrap_err();

        assert!(matches!(err, SignalingError::AuthenticationFailed { .. }));
        assert!(client.session().userid().is_empty());
    }
}
