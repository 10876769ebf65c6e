//! End-to-end tests for the WebSocket session endpoint.

#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tabula_server::games::{Game, GameRegistry};
use tabula_server::http::{build_router, AppState, OriginPolicy};
use tabula_server::hub::SessionHub;
use tabula_server::identity::{IdentityService, UserRequest};
use tabula_server::protocol::{Envelope, GameJoinedPayload, MessageType};
use tabula_server::storage::{ActionRecord, GameDatabase};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    ws_url: String,
    registry: GameRegistry,
    identity: IdentityService,
}

async fn spawn_server() -> Harness {
    let db = GameDatabase::open_in_memory().await.unwrap();
    let registry = GameRegistry::new(db.clone());
    let identity = IdentityService::new(db, "http://localhost:8080".to_string());
    let state = AppState {
        identity: identity.clone(),
        registry: registry.clone(),
        hub: Arc::new(SessionHub::new(registry.clone())),
        origins: Arc::new(OriginPolicy::new(vec![])),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    Harness {
        ws_url: format!("ws://{addr}/game/ws"),
        registry,
        identity,
    }
}

impl Harness {
    async fn register(&self, screen_name: &str) -> String {
        self.identity
            .register(&UserRequest {
                email: format!("{screen_name}@example.com"),
                password: "secret".to_string(),
                screen_name: screen_name.to_string(),
                new_password: String::new(),
            })
            .await
            .unwrap()
            .token
    }

    /// A public game between alice (white) and bob (black), both seated.
    async fn seeded_game(&self) -> (Game, String) {
        let alice_token = self.register("alice").await;
        let bob_token = self.register("bob").await;

        let game = self
            .registry
            .create(&Game {
                game_type: "Gipf".to_string(),
                white_player: "alice".to_string(),
                white_token: alice_token,
                public: true,
                ..Game::default()
            })
            .await
            .unwrap();
        let joined = self.registry.join(game.id, &bob_token).await.unwrap();

        (game, joined.black_token)
    }

    async fn connect(&self) -> Socket {
        let (socket, _) = connect_async(self.ws_url.as_str()).await.unwrap();
        socket
    }
}

async fn send(socket: &mut Socket, envelope: &Envelope) {
    let text = serde_json::to_string(envelope).unwrap();
    socket.send(Message::Text(text)).await.unwrap();
}

async fn recv(socket: &mut Socket) -> Envelope {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a session message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn expect_silence(socket: &mut Socket) {
    let result = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    assert!(result.is_err(), "expected no message, got {result:?}");
}

fn client(game_id: i64, token: &str, message_type: MessageType, message: &str) -> Envelope {
    Envelope {
        game_id,
        token: token.to_string(),
        message_type,
        message: message.to_string(),
    }
}

fn action(game_id: i64, token: &str, num: i64, mv: &str) -> Envelope {
    let payload = serde_json::to_string(&ActionRecord {
        action_num: num,
        action: mv.to_string(),
        signature: format!("sig-{num}"),
    })
    .unwrap();
    client(game_id, token, MessageType::Action, &payload)
}

async fn join(socket: &mut Socket, game_id: i64, token: &str) -> GameJoinedPayload {
    send(socket, &client(game_id, token, MessageType::Join, "")).await;
    let reply = recv(socket).await;
    assert_eq!(reply.message_type, MessageType::GameJoined);
    serde_json::from_str(&reply.message).unwrap()
}

#[tokio::test]
async fn two_players_exchange_ordered_actions() {
    let harness = spawn_server().await;
    let (game, black_token) = harness.seeded_game().await;

    let mut white = harness.connect().await;
    let mut black = harness.connect().await;

    let snapshot = join(&mut white, game.id, &game.white_token).await;
    assert_eq!(snapshot.player, "white");
    assert_eq!(snapshot.game_token, game.white_token);
    assert_eq!(snapshot.white_player, "alice");
    assert_eq!(snapshot.black_player, "bob");
    assert!(snapshot.actions.is_empty());

    let snapshot = join(&mut black, game.id, &black_token).await;
    assert_eq!(snapshot.player, "black");

    // White moves; everyone sees it, without the sender's credential.
    send(&mut white, &action(game.id, &game.white_token, 1, "a")).await;
    for socket in [&mut white, &mut black] {
        let broadcast = recv(socket).await;
        assert_eq!(broadcast.message_type, MessageType::Action);
        assert!(broadcast.token.is_empty());
        let payload: ActionRecord = serde_json::from_str(&broadcast.message).unwrap();
        assert_eq!((payload.action_num, payload.action.as_str()), (1, "a"));
    }

    // Black answers.
    send(&mut black, &action(game.id, &black_token, 2, "b")).await;
    for socket in [&mut white, &mut black] {
        let payload: ActionRecord = serde_json::from_str(&recv(socket).await.message).unwrap();
        assert_eq!((payload.action_num, payload.action.as_str()), (2, "b"));
    }

    // The registry reflects the log.
    let fetched = harness.registry.get(game.id).await.unwrap();
    assert_eq!(fetched.num_actions, 2);
    assert_eq!(fetched.game_record, "a b");

    // A late joiner receives the full snapshot.
    let mut viewer = harness.connect().await;
    let snapshot = join(&mut viewer, game.id, &game.white_token).await;
    assert_eq!(snapshot.actions.len(), 2);
    assert_eq!(snapshot.actions[1].action, "b");
}

#[tokio::test]
async fn wrong_action_number_is_rejected_without_broadcast() {
    let harness = spawn_server().await;
    let (game, black_token) = harness.seeded_game().await;

    let mut white = harness.connect().await;
    let mut black = harness.connect().await;
    join(&mut white, game.id, &game.white_token).await;
    join(&mut black, game.id, &black_token).await;

    send(&mut white, &action(game.id, &game.white_token, 3, "x")).await;

    let reply = recv(&mut white).await;
    assert_eq!(reply.message_type, MessageType::Error);
    assert_eq!(reply.message, "invalid action number: got 3, expected 1");

    expect_silence(&mut black).await;
    assert_eq!(harness.registry.get(game.id).await.unwrap().num_actions, 0);
}

#[tokio::test]
async fn reject_action_ends_the_game() {
    let harness = spawn_server().await;
    let (game, black_token) = harness.seeded_game().await;

    let mut white = harness.connect().await;
    let mut black = harness.connect().await;
    join(&mut white, game.id, &game.white_token).await;
    join(&mut black, game.id, &black_token).await;

    send(&mut white, &action(game.id, &game.white_token, 1, "a")).await;
    recv(&mut white).await;
    recv(&mut black).await;

    // Black's client refused white's move: the game is over for everyone.
    send(&mut black, &client(game.id, &black_token, MessageType::RejectAction, "")).await;
    for socket in [&mut white, &mut black] {
        let over = recv(socket).await;
        assert_eq!(over.message_type, MessageType::GameOver);
        assert_eq!(over.message, "Rejected action");
    }

    send(&mut white, &action(game.id, &game.white_token, 2, "b")).await;
    let reply = recv(&mut white).await;
    assert_eq!(reply.message_type, MessageType::Error);
    assert_eq!(reply.message, "game is over");

    let fetched = harness.registry.get(game.id).await.unwrap();
    assert!(fetched.game_over);
    assert_eq!(fetched.game_result, "Rejected action");
}

#[tokio::test]
async fn game_over_broadcasts_client_result() {
    let harness = spawn_server().await;
    let (game, black_token) = harness.seeded_game().await;

    let mut white = harness.connect().await;
    let mut black = harness.connect().await;
    join(&mut white, game.id, &game.white_token).await;
    join(&mut black, game.id, &black_token).await;

    send(
        &mut white,
        &client(game.id, &game.white_token, MessageType::GameOver, "black wins 3-2"),
    )
    .await;
    for socket in [&mut white, &mut black] {
        let over = recv(socket).await;
        assert_eq!(over.message_type, MessageType::GameOver);
        assert_eq!(over.message, "black wins 3-2");
    }

    assert_eq!(
        harness.registry.get(game.id).await.unwrap().game_result,
        "black wins 3-2"
    );
}

#[tokio::test]
async fn unknown_message_type_survives_and_full_game_still_works() {
    let harness = spawn_server().await;
    let (game, _) = harness.seeded_game().await;

    let mut white = harness.connect().await;
    join(&mut white, game.id, &game.white_token).await;
    send(&mut white, &action(game.id, &game.white_token, 1, "a")).await;
    recv(&mut white).await;

    let raw = format!(
        r#"{{"game_id":{},"token":"{}","message_type":"Telepathy","message":""}}"#,
        game.id, game.white_token
    );
    white.send(Message::Text(raw)).await.unwrap();

    let reply = recv(&mut white).await;
    assert_eq!(reply.message_type, MessageType::Error);
    assert_eq!(reply.message, "unknown message type");

    // The connection is still usable.
    send(
        &mut white,
        &client(game.id, &game.white_token, MessageType::SendFullGame, ""),
    )
    .await;
    let reply = recv(&mut white).await;
    assert_eq!(reply.message_type, MessageType::FullGame);
    let actions: Vec<ActionRecord> = serde_json::from_str(&reply.message).unwrap();
    assert_eq!(actions.len(), 1);
}

#[tokio::test]
async fn invalid_token_closes_the_connection_silently() {
    let harness = spawn_server().await;
    let (game, _) = harness.seeded_game().await;

    let mut socket = harness.connect().await;
    send(&mut socket, &client(game.id, "bogus", MessageType::Join, "")).await;

    // No Error envelope; the server just goes away.
    loop {
        match tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for close")
        {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(Message::Text(_))) => panic!("expected silent close, got a message"),
            Some(Ok(_)) => continue,
            Some(Err(_)) => break,
        }
    }
}
