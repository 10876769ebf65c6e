//! The session hub: live fan-out of game messages.
//!
//! Each connected session holds an unbounded outbound queue drained by its
//! own writer task; the hub only ever enqueues. Per-game subscriber lists
//! live under a single membership lock, and broadcasts enqueue to every
//! subscriber while holding it, which totally orders the broadcasts of a
//! game across all surviving subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::games::{resolve_role, GameRegistry, Role};
use crate::protocol::{Envelope, GameJoinedPayload, MessageType};
use crate::storage::ActionRecord;

/// What the transport should do with the connection after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    /// Close without notification (authorization failures, dead peers).
    Terminate,
}

/// A live session connection as the hub sees it: an id and the handle to
/// its outbound queue.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Connection {
    pub fn id(&self) -> u64 {
        self.id
    }
}

pub struct SessionHub {
    registry: GameRegistry,
    subscribers: Mutex<HashMap<i64, Vec<Connection>>>,
    next_conn_id: AtomicU64,
}

impl SessionHub {
    pub fn new(registry: GameRegistry) -> Self {
        Self {
            registry,
            subscribers: Mutex::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Register a new connection. The returned receiver feeds the
    /// connection's writer task; the hub keeps the sending half once the
    /// connection joins a game.
    pub fn connect(&self) -> (Connection, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection {
            id: self.next_conn_id.fetch_add(1, Ordering::Relaxed),
            tx,
        };
        (conn, rx)
    }

    /// Remove a connection from every game it subscribed to.
    pub async fn disconnect(&self, conn_id: u64) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|_, conns| {
            conns.retain(|c| c.id != conn_id);
            !conns.is_empty()
        });
        debug!(conn_id, "Session connection removed");
    }

    /// Dispatch one inbound envelope.
    ///
    /// Every message is authorized independently; a token that does not
    /// resolve to a role of the envelope's game ends the connection
    /// without notification.
    pub async fn handle_message(&self, conn: &Connection, envelope: Envelope) -> Disposition {
        let (role, role_token) = resolve_role(self.registry.db(), envelope.game_id, &envelope.token).await;
        if role == Role::Invalid {
            warn!(
                conn_id = conn.id,
                game_id = envelope.game_id,
                "Unauthorized session message; closing connection"
            );
            return Disposition::Terminate;
        }

        match envelope.message_type {
            MessageType::Join => self.handle_join(conn, envelope.game_id, role, role_token).await,
            MessageType::Action => self.handle_action(conn, envelope).await,
            MessageType::SendFullGame => self.handle_send_full_game(conn, envelope.game_id).await,
            MessageType::RejectAction => {
                self.finish_and_broadcast(envelope.game_id, "Rejected action").await;
                Disposition::Continue
            }
            MessageType::GameOver => {
                self.finish_and_broadcast(envelope.game_id, &envelope.message).await;
                Disposition::Continue
            }
            _ => self.reply(
                conn,
                Envelope::server_text(envelope.game_id, MessageType::Error, "unknown message type"),
            ),
        }
    }

    /// Number of live subscribers of a game.
    pub async fn subscriber_count(&self, game_id: i64) -> usize {
        self.subscribers
            .lock()
            .await
            .get(&game_id)
            .map_or(0, Vec::len)
    }

    async fn handle_join(
        &self,
        conn: &Connection,
        game_id: i64,
        role: Role,
        role_token: String,
    ) -> Disposition {
        let game = match self.registry.get(game_id).await {
            Ok(game) => game,
            Err(err) => return self.reply_error(conn, game_id, &err.to_string()),
        };
        let actions = match self.registry.actions(game_id).await {
            Ok(actions) => actions,
            Err(err) => return self.reply_error(conn, game_id, &err.to_string()),
        };

        self.subscribe(game_id, conn).await;
        info!(conn_id = conn.id, game_id, role = %role, "Session joined game");

        let payload = GameJoinedPayload {
            player: role.to_string(),
            game_token: role_token,
            white_player: game.white_player,
            black_player: game.black_player,
            actions,
        };
        match Envelope::server(game_id, MessageType::GameJoined, &payload) {
            Ok(reply) => self.reply(conn, reply),
            Err(err) => self.reply_error(conn, game_id, &err.to_string()),
        }
    }

    async fn handle_action(&self, conn: &Connection, envelope: Envelope) -> Disposition {
        let game_id = envelope.game_id;
        let action: ActionRecord = match serde_json::from_str(&envelope.message) {
            Ok(action) => action,
            Err(_) => return self.reply_error(conn, game_id, "invalid action payload"),
        };

        if let Err(err) = self.registry.record_action(game_id, &action).await {
            debug!(conn_id = conn.id, game_id, %err, "Action rejected");
            return self.reply_error(conn, game_id, &err.to_string());
        }

        // Re-broadcast the accepted action to every subscriber, with the
        // sender's credential cleared.
        let broadcast = Envelope {
            token: String::new(),
            ..envelope
        };
        self.broadcast(game_id, broadcast).await;
        Disposition::Continue
    }

    async fn handle_send_full_game(&self, conn: &Connection, game_id: i64) -> Disposition {
        match self.registry.actions(game_id).await {
            Ok(actions) => match Envelope::server(game_id, MessageType::FullGame, &actions) {
                Ok(reply) => self.reply(conn, reply),
                Err(err) => self.reply_error(conn, game_id, &err.to_string()),
            },
            Err(err) => self.reply_error(conn, game_id, &err.to_string()),
        }
    }

    /// Mark the game finished, then tell everyone. Finishing first keeps
    /// any racing `Action` from landing after the `GameOver` broadcast.
    async fn finish_and_broadcast(&self, game_id: i64, result: &str) {
        if let Err(err) = self.registry.finish(game_id, result).await {
            warn!(game_id, %err, "Failed to mark game as finished");
        }
        self.broadcast(
            game_id,
            Envelope::server_text(game_id, MessageType::GameOver, result),
        )
        .await;
    }

    async fn subscribe(&self, game_id: i64, conn: &Connection) {
        let mut subscribers = self.subscribers.lock().await;
        let conns = subscribers.entry(game_id).or_default();
        if !conns.iter().any(|c| c.id == conn.id) {
            conns.push(conn.clone());
        }
    }

    /// Enqueue an envelope to every subscriber of a game, dropping
    /// subscribers whose writer has gone away. Empty lists are pruned so
    /// idle games hold no hub memory.
    async fn broadcast(&self, game_id: i64, envelope: Envelope) {
        let mut subscribers = self.subscribers.lock().await;
        if let Some(conns) = subscribers.get_mut(&game_id) {
            conns.retain(|conn| {
                let delivered = conn.tx.send(envelope.clone()).is_ok();
                if !delivered {
                    warn!(conn_id = conn.id, game_id, "Dropping dead session connection");
                }
                delivered
            });
            if conns.is_empty() {
                subscribers.remove(&game_id);
            }
        }
    }

    /// Send to a single connection; a dead queue terminates it.
    fn reply(&self, conn: &Connection, envelope: Envelope) -> Disposition {
        if conn.tx.send(envelope).is_err() {
            return Disposition::Terminate;
        }
        Disposition::Continue
    }

    fn reply_error(&self, conn: &Connection, game_id: i64, message: &str) -> Disposition {
        self.reply(
            conn,
            Envelope::server_text(game_id, MessageType::Error, message),
        )
    }
}
