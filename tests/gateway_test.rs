//! End-to-end tests: the full router on an ephemeral port with the
//! in-memory store, driven over HTTP and WebSocket.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use mutual_gateway::app_state::AppState;
use mutual_gateway::auth::TokenVerifier;
use mutual_gateway::build_app;
use mutual_gateway::config::GatewayConfig;
use mutual_gateway::domain::{PresenceHub, ServerEvent, UserId};
use mutual_gateway::persistence::{MemoryStore, Store};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestApp {
    addr: SocketAddr,
    hub: Arc<PresenceHub>,
    tokens: Arc<TokenVerifier>,
    http: reqwest::Client,
}

impl TestApp {
    async fn spawn() -> Self {
        let config = GatewayConfig {
            persistence_enabled: false,
            ..GatewayConfig::default()
        };
        let store: Arc<dyn Store> = Arc::new(MemoryStore::with_users(
            [1, 2, 3].into_iter().map(UserId::new),
        ));
        let hub = Arc::new(PresenceHub::new());
        let state = AppState::new(store, Arc::clone(&hub), config);
        let tokens = Arc::clone(&state.tokens);
        let app = build_app(state);

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind should succeed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener should have an address");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            hub,
            tokens,
            http: reqwest::Client::new(),
        }
    }

    fn token(&self, user: i64) -> String {
        let Ok(token) = self
            .tokens
            .issue(UserId::new(user), Duration::from_secs(3600))
        else {
            panic!("token should encode");
        };
        token
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post(&self, user: i64, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self
            .http
            .post(self.url(path))
            .bearer_auth(self.token(user));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let Ok(response) = request.send().await else {
            panic!("POST {path} should reach the server");
        };
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, user: i64, path: &str) -> (u16, Value) {
        let Ok(response) = self
            .http
            .get(self.url(path))
            .bearer_auth(self.token(user))
            .send()
            .await
        else {
            panic!("GET {path} should reach the server");
        };
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn live(&self, user: i64) -> Socket {
        let url = format!("ws://{}/ws?token={}", self.addr, self.token(user));
        let Ok((socket, _)) = connect_async(url).await else {
            panic!("handshake should succeed");
        };
        socket
    }

    /// Makes users 1 and 2 match and returns their chat id.
    async fn matched_chat(&self) -> i64 {
        let _ = self.post(1, "/connections/2/like", None).await;
        let (status, body) = self.post(2, "/connections/1/like", None).await;
        assert_eq!(status, 200);
        let Some(chat_id) = body["chatId"].as_i64() else {
            panic!("match should return a chat id: {body}");
        };
        chat_id
    }
}

/// Reads events until one satisfies `pred`.
async fn expect_event(socket: &mut Socket, pred: impl Fn(&Value) -> bool) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let Ok(Some(Ok(frame))) = tokio::time::timeout_at(deadline, socket.next()).await else {
            panic!("expected event did not arrive");
        };
        if let Message::Text(text) = frame {
            let Ok(event) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("server sent invalid JSON");
            };
            if pred(&event) {
                return event;
            }
        }
    }
}

fn presence(user: i64, online: bool) -> impl Fn(&Value) -> bool {
    move |e| e["type"] == "presence" && e["userId"] == user && e["online"] == online
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::spawn().await;
    let Ok(response) = reqwest::get(app.url("/health")).await else {
        panic!("health should respond");
    };
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap_or(Value::Null);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "up");
}

#[tokio::test]
async fn rest_requires_bearer_token() {
    let app = TestApp::spawn().await;
    let Ok(response) = app.http.get(app.url("/chats")).send().await else {
        panic!("request should reach the server");
    };
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap_or(Value::Null);
    assert_eq!(body["error"]["code"], 4001);
}

#[tokio::test]
async fn ws_rejects_bad_token_before_upgrade() {
    let app = TestApp::spawn().await;
    for url in [
        format!("ws://{}/ws?token=garbage", app.addr),
        format!("ws://{}/ws", app.addr),
    ] {
        let Err(err) = connect_async(url).await else {
            panic!("handshake should fail");
        };
        assert!(matches!(
            err,
            tokio_tungstenite::tungstenite::Error::Http(ref response)
                if response.status().as_u16() == 401
        ));
    }
}

#[tokio::test]
async fn mutual_like_matches_and_creates_one_chat() {
    let app = TestApp::spawn().await;

    let (status, first) = app.post(1, "/connections/2/like", None).await;
    assert_eq!(status, 200);
    assert_eq!(first["matched"], false);
    assert_eq!(first["status"], "LIKED");

    let (_, requests) = app.get(2, "/connections/requests").await;
    assert_eq!(requests["requests"][0]["fromUserId"], 1);

    let (status, second) = app.post(2, "/connections/1/like", None).await;
    assert_eq!(status, 200);
    assert_eq!(second["matched"], true);
    assert_eq!(second["status"], "MATCHED");
    let chat_id = second["chatId"].clone();

    let (_, ensured) = app.post(1, "/chats/with/2", None).await;
    assert_eq!(ensured["chatId"], chat_id);

    let (_, peers) = app.get(1, "/connections").await;
    assert_eq!(peers["connections"], json!([2]));
}

#[tokio::test]
async fn relationship_errors_map_to_status_codes() {
    let app = TestApp::spawn().await;
    let (status, body) = app.post(1, "/connections/1/like", None).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], 1002);

    let (status, _) = app.post(1, "/connections/99/like", None).await;
    assert_eq!(status, 404);

    let (status, _) = app.post(1, "/connections/2/accept", None).await;
    assert_eq!(status, 404);

    let (status, _) = app.post(1, "/connections/3/disconnect", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn messages_are_paged_and_hidden_from_outsiders() {
    let app = TestApp::spawn().await;
    let chat_id = app.matched_chat().await;
    let path = format!("/chats/{chat_id}/messages");

    for body in ["s1", "s2", "s3"] {
        let (status, _) = app.post(1, &path, Some(json!({ "content": body }))).await;
        assert_eq!(status, 201);
    }

    let (_, chats) = app.get(2, "/chats").await;
    assert_eq!(chats["chats"][0]["unreadCount"], 3);
    assert_eq!(chats["chats"][0]["lastMessage"], "s3");

    let (status, page) = app.get(2, &format!("{path}?limit=2")).await;
    assert_eq!(status, 200);
    assert_eq!(page["messages"][0]["content"], "s3");
    assert_eq!(page["messages"][1]["content"], "s2");
    assert_eq!(page["hasMore"], true);

    let (_, chats) = app.get(2, "/chats").await;
    assert_eq!(chats["chats"][0]["unreadCount"], 0);

    let (status, _) = app.get(3, &path).await;
    assert_eq!(status, 404);
    let (status, _) = app.post(3, &path, Some(json!({ "content": "hi" }))).await;
    assert_eq!(status, 404);
    let (status, _) = app.post(1, &path, Some(json!({ "content": "   " }))).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn live_connections_receive_messages_typing_and_presence() {
    let app = TestApp::spawn().await;
    let chat_id = app.matched_chat().await;

    let mut bob = app.live(2).await;
    expect_event(&mut bob, presence(2, true)).await;

    let mut alice = app.live(1).await;
    expect_event(&mut alice, presence(1, true)).await;
    expect_event(&mut bob, presence(1, true)).await;

    let (_, presence_now) = app.get(3, "/presence?userIds=3,1,2").await;
    assert_eq!(
        presence_now["presence"],
        json!([
            { "userId": 3, "online": false },
            { "userId": 1, "online": true },
            { "userId": 2, "online": true },
        ])
    );

    let (status, _) = app
        .post(
            1,
            &format!("/chats/{chat_id}/messages"),
            Some(json!({ "content": "hello bob" })),
        )
        .await;
    assert_eq!(status, 201);
    let pushed = expect_event(&mut bob, |e| e["type"] == "new_message").await;
    assert_eq!(pushed["chatId"], chat_id);
    assert_eq!(pushed["fromUserId"], 1);
    assert_eq!(pushed["message"]["content"], "hello bob");

    let frame = json!({ "type": "typing", "chatId": chat_id, "typing": true }).to_string();
    let Ok(()) = alice.send(Message::text(frame)).await else {
        panic!("typing frame should send");
    };
    let Ok(()) = alice.send(Message::text("{\"type\":\"nonsense\"}")).await else {
        panic!("unknown frame should send");
    };
    let typing = expect_event(&mut bob, |e| e["type"] == "typing").await;
    assert_eq!(typing["fromUserId"], 1);
    assert_eq!(typing["typing"], true);

    let _ = alice.close(None).await;
    expect_event(&mut bob, presence(1, false)).await;

    let (_, after) = app.get(2, "/presence?userIds=1").await;
    assert_eq!(after["presence"][0]["online"], false);
}

#[tokio::test]
async fn injected_hub_serves_presence_and_delivery() {
    let app = TestApp::spawn().await;
    let chat_id = app.matched_chat().await;

    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let _handle = app.hub.join(UserId::new(2), tx).await;
    while rx.try_recv().is_ok() {}

    let (_, online) = app.get(1, "/presence?userIds=2").await;
    assert_eq!(online["presence"][0]["online"], true);

    let (status, _) = app
        .post(
            1,
            &format!("/chats/{chat_id}/messages"),
            Some(json!({ "content": "via the shared hub" })),
        )
        .await;
    assert_eq!(status, 201);
    let Ok(Some(ServerEvent::NewMessage { message, .. })) =
        tokio::time::timeout(Duration::from_secs(1), rx.recv()).await
    else {
        panic!("connection joined on the injected hub should receive the message");
    };
    assert_eq!(message.content, "via the shared hub");
}
