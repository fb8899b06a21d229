//! Core protocol types for Holdout's wire format.
//!
//! Everything here is serialized to JSON and crosses the network. Events
//! use internally tagged representations (`{"type": "create-room", ...}`)
//! so a browser client can switch on a single `type` field.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a client connection.
///
/// Allocated by the transport when a socket is accepted; it is the only
/// identity a player has. `#[serde(transparent)]` makes `ConnectionId(42)`
/// serialize as plain `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A short room code: six uppercase alphanumeric characters.
///
/// Codes are what players type to join a friend's room, so they are kept
/// short and case-insensitive on input. Uniqueness among live rooms is the
/// directory's job, not this type's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of every room code.
    pub const LEN: usize = 6;

    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generates a random code. The caller is responsible for retrying on
    /// collision with an existing room.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..Self::LEN)
            .map(|_| {
                let i = rng.random_range(0..Self::ALPHABET.len());
                Self::ALPHABET[i] as char
            })
            .collect();
        Self(code)
    }

    /// Normalizes raw client input into code form (trimmed, uppercased).
    ///
    /// A code that never matched a room simply won't be found in the
    /// directory, so no validation beyond normalization happens here.
    pub fn from_input(input: &str) -> Self {
        Self(input.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary shared with the wire
// ---------------------------------------------------------------------------

/// The five secret-attribute categories every player holds one card in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Profession,
    Health,
    Hobby,
    Baggage,
    Phobia,
}

impl CardCategory {
    /// All categories, in canonical order.
    pub const ALL: [CardCategory; 5] = [
        CardCategory::Profession,
        CardCategory::Health,
        CardCategory::Hobby,
        CardCategory::Baggage,
        CardCategory::Phobia,
    ];

    /// Number of categories.
    pub const COUNT: usize = 5;

    /// Stable index for array-backed storage.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            CardCategory::Profession => "profession",
            CardCategory::Health => "health",
            CardCategory::Hobby => "hobby",
            CardCategory::Baggage => "baggage",
            CardCategory::Phobia => "phobia",
        }
    }
}

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The per-room phase machine. Transitions are strictly
/// lobby → round → voting → {lobby | ended}; `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Round,
    Voting,
    Ended,
}

impl Phase {
    /// `true` once the game is over; no further mutation is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Ended)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Lobby => "lobby",
            Phase::Round => "round",
            Phase::Voting => "voting",
            Phase::Ended => "ended",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Room settings and scenario
// ---------------------------------------------------------------------------

/// Host-tunable room settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Length of a discussion round in seconds.
    pub round_secs: u64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self { round_secs: 90 }
    }
}

/// The catastrophe flavor text and the bunker capacity — the survival
/// threshold that ends the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub catastrophe: String,
    /// The game ends when the number of alive players drops to this value.
    pub capacity: usize,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            catastrophe: "Global nuclear winter".to_string(),
            capacity: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// State projections
// ---------------------------------------------------------------------------

/// A player as everyone in the room sees them: card values are masked to
/// `null` for every category the player has not revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: ConnectionId,
    pub name: String,
    pub alive: bool,
    pub revealed: BTreeMap<CardCategory, bool>,
    pub cards: BTreeMap<CardCategory, Option<String>>,
}

/// The public projection of a room, broadcast to every member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStateView {
    pub code: RoomCode,
    pub host: Option<ConnectionId>,
    pub phase: Phase,
    pub round: u32,
    /// Absolute round deadline in milliseconds since the Unix epoch, when a
    /// round is running.
    pub deadline: Option<u64>,
    pub settings: RoomSettings,
    pub scenario: Scenario,
    pub players: Vec<PlayerView>,
    /// Current vote tally: target connection id → vote count.
    pub votes: BTreeMap<ConnectionId, u32>,
    /// The most recent log lines (capped for broadcast).
    pub log: Vec<String>,
}

/// A player's own secrets, unicast only to that player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateStateView {
    pub cards: BTreeMap<CardCategory, String>,
    pub revealed: BTreeMap<CardCategory, bool>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Create a room and become its host and first member.
    CreateRoom {
        #[serde(default)]
        name: String,
    },

    /// Join an existing room by code.
    JoinRoom {
        room: String,
        #[serde(default)]
        name: String,
    },

    /// Reveal one of the caller's secret attribute cards (round phase only).
    RevealAttribute { category: CardCategory },

    /// Host only: start the round timer (lobby phase only).
    StartRound,

    /// Host only: cut the round short and open voting.
    AdvanceToVoting,

    /// Vote to eliminate a player (voting phase only; last vote wins).
    CastVote { target: ConnectionId },

    /// Host only: resolve the votes and advance the game.
    FinishVoting,

    /// Room-scoped chat.
    ChatMessage { text: String },

    /// Opaque voice-signaling payload relayed 1:1 to a peer, never
    /// interpreted by the server.
    SignalRelay {
        to: ConnectionId,
        data: serde_json::Value,
    },

    /// Leave the current room without dropping the socket.
    LeaveRoom,
}

/// Everything the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent once when the socket is accepted; tells the client its own id.
    Welcome { connection_id: ConnectionId },

    /// Full public projection, broadcast to every room member.
    RoomState { state: RoomStateView },

    /// The receiving player's own secrets.
    PrivateState { state: PrivateStateView },

    /// A user-actionable error (e.g. unknown room code on join).
    Error { message: String },

    /// Room chat, timestamped by the server.
    ChatMessage {
        from: String,
        text: String,
        timestamp: u64,
    },

    /// Forwarded signaling payload from a peer.
    SignalRelay {
        from: ConnectionId,
        data: serde_json::Value,
    },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire format is consumed by a JavaScript client, so these tests
    //! pin the exact JSON shapes the serde attributes produce.

    use super::*;

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ConnectionId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "conn-7");
    }

    #[test]
    fn test_room_code_generate_has_expected_shape() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), RoomCode::LEN);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_room_code_from_input_normalizes() {
        let code = RoomCode::from_input("  ab12cd ");
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_card_category_serializes_lowercase() {
        let json = serde_json::to_string(&CardCategory::Profession).unwrap();
        assert_eq!(json, "\"profession\"");
        let json = serde_json::to_string(&CardCategory::Phobia).unwrap();
        assert_eq!(json, "\"phobia\"");
    }

    #[test]
    fn test_card_category_all_matches_count() {
        assert_eq!(CardCategory::ALL.len(), CardCategory::COUNT);
        for (i, cat) in CardCategory::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        let json = serde_json::to_string(&Phase::Lobby).unwrap();
        assert_eq!(json, "\"lobby\"");
        let json = serde_json::to_string(&Phase::Ended).unwrap();
        assert_eq!(json, "\"ended\"");
    }

    #[test]
    fn test_phase_terminal() {
        assert!(Phase::Ended.is_terminal());
        assert!(!Phase::Lobby.is_terminal());
        assert!(!Phase::Round.is_terminal());
        assert!(!Phase::Voting.is_terminal());
    }

    #[test]
    fn test_client_event_create_room_json_format() {
        let event = ClientEvent::CreateRoom {
            name: "Ada".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "create-room");
        assert_eq!(json["name"], "Ada");
    }

    #[test]
    fn test_client_event_create_room_name_defaults_when_missing() {
        // The client may omit the name; validation softness turns it into
        // a default display name server-side.
        let event: ClientEvent =
            serde_json::from_str(r#"{"type": "create-room"}"#).unwrap();
        assert_eq!(event, ClientEvent::CreateRoom { name: String::new() });
    }

    #[test]
    fn test_client_event_join_room_json_format() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type": "join-room", "room": "ab12cd", "name": "Grace"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room: "ab12cd".into(),
                name: "Grace".into()
            }
        );
    }

    #[test]
    fn test_client_event_reveal_attribute_round_trip() {
        let event = ClientEvent::RevealAttribute {
            category: CardCategory::Baggage,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("reveal-attribute"));
        assert!(json.contains("baggage"));
        let decoded: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_client_event_unit_variants_tag_only() {
        let json: serde_json::Value =
            serde_json::to_value(&ClientEvent::StartRound).unwrap();
        assert_eq!(json["type"], "start-round");
        let json: serde_json::Value =
            serde_json::to_value(&ClientEvent::FinishVoting).unwrap();
        assert_eq!(json["type"], "finish-voting");
    }

    #[test]
    fn test_client_event_cast_vote_round_trip() {
        let event = ClientEvent::CastVote {
            target: ConnectionId(9),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ClientEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_client_event_signal_relay_payload_is_opaque() {
        // Arbitrary JSON must survive the relay untouched.
        let data = serde_json::json!({"sdp": "offer", "nested": [1, 2, 3]});
        let event = ClientEvent::SignalRelay {
            to: ConnectionId(3),
            data: data.clone(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ClientEvent = serde_json::from_slice(&bytes).unwrap();
        match decoded {
            ClientEvent::SignalRelay { to, data: d } => {
                assert_eq!(to, ConnectionId(3));
                assert_eq!(d, data);
            }
            other => panic!("expected signal-relay, got {other:?}"),
        }
    }

    #[test]
    fn test_server_event_welcome_json_format() {
        let event = ServerEvent::Welcome {
            connection_id: ConnectionId(5),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["connection_id"], 5);
    }

    #[test]
    fn test_server_event_error_json_format() {
        let event = ServerEvent::Error {
            message: "Room not found".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Room not found");
    }

    #[test]
    fn test_room_state_view_round_trip() {
        let view = RoomStateView {
            code: RoomCode::from_input("AB12CD"),
            host: Some(ConnectionId(1)),
            phase: Phase::Round,
            round: 2,
            deadline: Some(1_700_000_000_000),
            settings: RoomSettings::default(),
            scenario: Scenario::default(),
            players: vec![PlayerView {
                id: ConnectionId(1),
                name: "Ada".into(),
                alive: true,
                revealed: CardCategory::ALL
                    .iter()
                    .map(|c| (*c, false))
                    .collect(),
                cards: CardCategory::ALL.iter().map(|c| (*c, None)).collect(),
            }],
            votes: BTreeMap::new(),
            log: vec!["Ada joined".into()],
        };
        let bytes = serde_json::to_vec(&ServerEvent::RoomState {
            state: view.clone(),
        })
        .unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, ServerEvent::RoomState { state: view });
    }

    #[test]
    fn test_masked_card_serializes_as_null() {
        let mut cards: BTreeMap<CardCategory, Option<String>> = BTreeMap::new();
        cards.insert(CardCategory::Profession, Some("Doctor".into()));
        cards.insert(CardCategory::Health, None);
        let json: serde_json::Value = serde_json::to_value(&cards).unwrap();
        assert_eq!(json["profession"], "Doctor");
        assert!(json["health"].is_null());
    }

    #[test]
    fn test_decode_unknown_event_type_returns_error() {
        let unknown = r#"{"type": "fly-to-moon", "speed": 9000}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<ClientEvent, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }
}
