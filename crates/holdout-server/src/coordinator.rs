//! The coordinator: one task that owns every room and applies commands
//! strictly in arrival order.
//!
//! Socket tasks never touch game state. They feed [`Command`]s into the
//! coordinator's queue and hold the receiving half of a per-connection
//! outbound channel; the coordinator pushes [`ServerEvent`]s back through
//! those channels. Because commands are applied one at a time, two votes
//! racing a `finish-voting` resolve in whatever order they were queued,
//! with no locks and no torn state.
//!
//! Error policy: only failures the user can act on (an unknown room code)
//! go back to the client. Everything else a malformed or stale request
//! can trip — wrong phase, not the host, not a member — is dropped with a
//! debug log, since it is client desync rather than a user mistake.

use std::collections::HashMap;

use holdout_game::Room;
use holdout_protocol::{CardCategory, ClientEvent, ConnectionId, RoomCode, ServerEvent};
use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::directory::SessionDirectory;

/// Outbound half of a connection; the socket's writer task drains the
/// other end.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// What socket tasks and the sweep timer feed into the coordinator.
#[derive(Debug)]
pub enum Command {
    /// A socket finished its handshake and can receive events.
    Attach {
        conn: ConnectionId,
        sender: EventSender,
    },
    /// A decoded client request.
    Event {
        conn: ConnectionId,
        event: ClientEvent,
    },
    /// The socket closed; clean up as if the player left.
    Detach { conn: ConnectionId },
    /// Periodic scan for expired round timers.
    Sweep { now_ms: u64 },
}

/// Milliseconds since the Unix epoch; the timestamp base for deadlines
/// and chat.
pub(crate) fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct Coordinator {
    config: ServerConfig,
    directory: SessionDirectory,
    senders: HashMap<ConnectionId, EventSender>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Coordinator {
    pub fn new(config: ServerConfig, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            config,
            directory: SessionDirectory::new(),
            senders: HashMap::new(),
            commands,
        }
    }

    /// Drains the command queue until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        tracing::info!("coordinator stopped");
    }

    /// Applies one command to completion. Synchronous on purpose: no
    /// command ever observes another's partial effects.
    pub(crate) fn handle(&mut self, command: Command) {
        match command {
            Command::Attach { conn, sender } => self.attach(conn, sender),
            Command::Detach { conn } => self.detach(conn),
            Command::Sweep { now_ms } => self.sweep(now_ms),
            Command::Event { conn, event } => self.client_event(conn, event),
        }
    }

    fn client_event(&mut self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::CreateRoom { name } => self.create_room(conn, name),
            ClientEvent::JoinRoom { room, name } => self.join_room(conn, room, name),
            ClientEvent::RevealAttribute { category } => self.reveal(conn, category),
            ClientEvent::StartRound => self.start_round(conn),
            ClientEvent::AdvanceToVoting => self.advance_to_voting(conn),
            ClientEvent::CastVote { target } => self.cast_vote(conn, target),
            ClientEvent::FinishVoting => self.finish_voting(conn),
            ClientEvent::ChatMessage { text } => self.chat(conn, text),
            ClientEvent::SignalRelay { to, data } => self.signal_relay(conn, to, data),
            ClientEvent::LeaveRoom => self.leave_current_room(conn),
        }
    }

    // -- connection lifecycle --------------------------------------------

    fn attach(&mut self, conn: ConnectionId, sender: EventSender) {
        tracing::debug!(%conn, "connection attached");
        self.senders.insert(conn, sender);
        self.unicast(conn, ServerEvent::Welcome { connection_id: conn });
    }

    fn detach(&mut self, conn: ConnectionId) {
        tracing::debug!(%conn, "connection detached");
        self.leave_current_room(conn);
        self.senders.remove(&conn);
    }

    /// Removes the connection from its room, if any. Empty rooms are
    /// deleted; otherwise the remaining members see the updated roster
    /// (and possibly a new host).
    fn leave_current_room(&mut self, conn: ConnectionId) {
        let Some(code) = self.directory.unbind(conn) else {
            return;
        };
        let Some(room) = self.directory.room_mut(&code) else {
            return;
        };
        room.remove_player(conn);
        if room.is_empty() {
            self.directory.remove_room(&code);
            tracing::info!(room = code.as_str(), "room closed, last member left");
        } else {
            self.broadcast_state(&code);
        }
    }

    // -- room membership --------------------------------------------------

    fn create_room(&mut self, conn: ConnectionId, name: String) {
        if self.directory.room_of(conn).is_some() {
            tracing::debug!(%conn, "create-room while already in a room, dropped");
            return;
        }
        let mut rng = rand::rng();
        let code = self.directory.allocate_code(&mut rng);
        let name = display_name(name, conn);
        tracing::info!(%conn, room = code.as_str(), player = %name, "room created");

        let room = Room::create(code.clone(), conn, name, &mut rng);
        self.directory.insert_room(room);
        self.directory.bind(conn, code.clone());
        self.broadcast_state(&code);
    }

    fn join_room(&mut self, conn: ConnectionId, room: String, name: String) {
        if self.directory.room_of(conn).is_some() {
            tracing::debug!(%conn, "join-room while already in a room, dropped");
            return;
        }
        let code = RoomCode::from_input(&room);
        let name = display_name(name, conn);
        let mut rng = rand::rng();
        match self.directory.room_mut(&code) {
            Some(room) => {
                room.add_player(conn, name, &mut rng);
            }
            None => {
                // The one error a user can actually act on.
                self.unicast(
                    conn,
                    ServerEvent::Error {
                        message: "Room not found".to_string(),
                    },
                );
                return;
            }
        }
        tracing::info!(%conn, room = code.as_str(), "player joined");
        self.directory.bind(conn, code.clone());
        self.broadcast_state(&code);
    }

    // -- game actions ------------------------------------------------------

    fn reveal(&mut self, conn: ConnectionId, category: CardCategory) {
        let Some(room) = self.directory.room_for(conn) else {
            return;
        };
        match room.reveal(conn, category) {
            Ok(()) => {
                let code = room.code().clone();
                self.broadcast_state(&code);
            }
            Err(e) => tracing::debug!(%conn, error = %e, "reveal dropped"),
        }
    }

    fn start_round(&mut self, conn: ConnectionId) {
        let now_ms = epoch_ms();
        let Some(room) = self.host_room(conn) else {
            return;
        };
        match room.start_round(now_ms) {
            Ok(()) => {
                let code = room.code().clone();
                let round = room.round();
                tracing::info!(room = code.as_str(), round, "round started");
                self.broadcast_state(&code);
            }
            Err(e) => tracing::debug!(%conn, error = %e, "start-round dropped"),
        }
    }

    fn advance_to_voting(&mut self, conn: ConnectionId) {
        let Some(room) = self.host_room(conn) else {
            return;
        };
        match room.to_voting() {
            Ok(()) => {
                let code = room.code().clone();
                tracing::info!(room = code.as_str(), "voting opened by host");
                self.broadcast_state(&code);
            }
            Err(e) => tracing::debug!(%conn, error = %e, "advance-to-voting dropped"),
        }
    }

    fn cast_vote(&mut self, conn: ConnectionId, target: ConnectionId) {
        let Some(room) = self.directory.room_for(conn) else {
            return;
        };
        match room.vote(conn, target) {
            Ok(()) => {
                let code = room.code().clone();
                self.broadcast_state(&code);
            }
            Err(e) => tracing::debug!(%conn, error = %e, "vote dropped"),
        }
    }

    fn finish_voting(&mut self, conn: ConnectionId) {
        let Some(room) = self.host_room(conn) else {
            return;
        };
        match room.finish_voting() {
            Ok(resolution) => {
                let code = room.code().clone();
                tracing::info!(
                    room = code.as_str(),
                    eliminated = ?resolution.eliminated,
                    ended = resolution.ended,
                    "voting resolved"
                );
                self.broadcast_state(&code);
            }
            Err(e) => tracing::debug!(%conn, error = %e, "finish-voting dropped"),
        }
    }

    // -- chat and signaling ------------------------------------------------

    fn chat(&mut self, conn: ConnectionId, text: String) {
        let Some(room) = self.directory.room_for(conn) else {
            return;
        };
        let Some(player) = room.player(conn) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        let event = ServerEvent::ChatMessage {
            from: player.name.clone(),
            text: text.chars().take(self.config.chat_max_len).collect(),
            timestamp: epoch_ms(),
        };
        let members = room.member_ids();
        for member in members {
            self.unicast(member, event.clone());
        }
    }

    /// Forwards an opaque signaling payload to one peer in the same room.
    /// The payload is never inspected.
    fn signal_relay(&mut self, conn: ConnectionId, to: ConnectionId, data: serde_json::Value) {
        let Some(room) = self.directory.room_for(conn) else {
            return;
        };
        if !room.is_member(to) {
            tracing::debug!(%conn, %to, "signal-relay to non-member dropped");
            return;
        }
        self.unicast(to, ServerEvent::SignalRelay { from: conn, data });
    }

    // -- sweep -------------------------------------------------------------

    /// Moves every room with an overdue round timer into voting. The
    /// phase guard in `to_voting` makes a repeated tick for the same
    /// expiry a no-op.
    fn sweep(&mut self, now_ms: u64) {
        for code in self.directory.expired_rooms(now_ms) {
            let Some(room) = self.directory.room_mut(&code) else {
                continue;
            };
            if room.to_voting().is_ok() {
                tracing::info!(room = code.as_str(), "round timer expired, voting opened");
                self.broadcast_state(&code);
            }
        }
    }

    // -- helpers -----------------------------------------------------------

    /// The caller's room, but only if the caller is its host.
    fn host_room(&mut self, conn: ConnectionId) -> Option<&mut Room> {
        let room = self.directory.room_for(conn)?;
        if room.host() != Some(conn) {
            tracing::debug!(%conn, "host-only action from non-host dropped");
            return None;
        }
        Some(room)
    }

    /// Fans out a state change: the public projection to every member,
    /// then each member's own secrets to them alone.
    fn broadcast_state(&mut self, code: &RoomCode) {
        let Some(room) = self.directory.room_mut(code) else {
            return;
        };
        let state = room.public_state();
        let privates: Vec<_> = room
            .member_ids()
            .into_iter()
            .map(|member| (member, room.private_state(member)))
            .collect();
        for (member, private) in privates {
            self.unicast(member, ServerEvent::RoomState { state: state.clone() });
            if let Some(private) = private {
                self.unicast(member, ServerEvent::PrivateState { state: private });
            }
        }
    }

    fn unicast(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&conn) {
            // A closed receiver just means the socket is going away; the
            // Detach command will clean up.
            let _ = sender.send(event);
        }
    }
}

fn display_name(name: String, conn: ConnectionId) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("Player {}", conn.0)
    } else {
        trimmed.to_string()
    }
}

// =========================================================================
// Tests
// =========================================================================
