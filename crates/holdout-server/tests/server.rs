//! End-to-end tests over real WebSocket connections: spin up a server on
//! an ephemeral port, connect tungstenite clients, and play.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use holdout_protocol::{
    CardCategory, ClientEvent, ConnectionId, Phase, RoomStateView, ServerEvent,
};
use holdout_server::{Server, ServerConfig};
use tokio_tungstenite::tungstenite::Message;

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start() -> String {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// Connects and consumes the Welcome, returning the assigned id.
async fn connect(addr: &str) -> (Ws, ConnectionId) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    let conn = match recv(&mut ws).await {
        ServerEvent::Welcome { connection_id } => connection_id,
        other => panic!("expected welcome, got {other:?}"),
    };
    (ws, conn)
}

async fn send(ws: &mut Ws, event: &ClientEvent) {
    let text = serde_json::to_string(event).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn recv(ws: &mut Ws) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server event")
            .expect("socket closed")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

/// Skips ahead to the next RoomState broadcast.
async fn recv_state(ws: &mut Ws) -> RoomStateView {
    loop {
        if let ServerEvent::RoomState { state } = recv(ws).await {
            return state;
        }
    }
}

/// Skips RoomState broadcasts until one satisfies the predicate.
async fn state_until(ws: &mut Ws, pred: impl Fn(&RoomStateView) -> bool) -> RoomStateView {
    loop {
        let state = recv_state(ws).await;
        if pred(&state) {
            return state;
        }
    }
}

#[tokio::test]
async fn test_create_room_returns_lobby_state_and_secrets() {
    let addr = start().await;
    let (mut ws, conn) = connect(&addr).await;

    send(&mut ws, &ClientEvent::CreateRoom { name: "Ada".into() }).await;

    let state = recv_state(&mut ws).await;
    assert_eq!(state.phase, Phase::Lobby);
    assert_eq!(state.host, Some(conn));
    assert_eq!(state.round, 1);
    assert_eq!(state.players.len(), 1);
    assert_eq!(state.players[0].name, "Ada");
    assert_eq!(state.code.as_str().len(), 6);

    // The creator's own secrets follow: all five categories, none revealed.
    match recv(&mut ws).await {
        ServerEvent::PrivateState { state } => {
            assert_eq!(state.cards.len(), CardCategory::COUNT);
            assert!(state.revealed.values().all(|&r| !r));
        }
        other => panic!("expected private-state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_with_unknown_code_reports_error() {
    let addr = start().await;
    let (mut ws, _) = connect(&addr).await;

    send(
        &mut ws,
        &ClientEvent::JoinRoom {
            room: "NOPE99".into(),
            name: "Ada".into(),
        },
    )
    .await;

    match recv(&mut ws).await {
        ServerEvent::Error { message } => assert_eq!(message, "Room not found"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_two_players_share_room_and_chat() {
    let addr = start().await;
    let (mut p1, _) = connect(&addr).await;
    let (mut p2, _) = connect(&addr).await;

    send(&mut p1, &ClientEvent::CreateRoom { name: "Ada".into() }).await;
    let code = recv_state(&mut p1).await.code.as_str().to_string();

    // Lowercase on purpose; the server normalizes the code.
    send(
        &mut p2,
        &ClientEvent::JoinRoom {
            room: code.to_lowercase(),
            name: "Grace".into(),
        },
    )
    .await;

    let state = state_until(&mut p1, |s| s.players.len() == 2).await;
    assert!(state.log.iter().any(|line| line == "Grace joined"));
    let state = recv_state(&mut p2).await;
    assert_eq!(state.players.len(), 2);

    send(
        &mut p2,
        &ClientEvent::ChatMessage {
            text: "anyone here?".into(),
        },
    )
    .await;

    for ws in [&mut p1, &mut p2] {
        match recv(ws).await {
            ServerEvent::ChatMessage { from, text, .. } => {
                assert_eq!(from, "Grace");
                assert_eq!(text, "anyone here?");
            }
            other => panic!("expected chat-message, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_reveal_during_round_unmasks_for_everyone() {
    let addr = start().await;
    let (mut p1, _) = connect(&addr).await;
    let (mut p2, conn2) = connect(&addr).await;

    send(&mut p1, &ClientEvent::CreateRoom { name: "Ada".into() }).await;
    let code = recv_state(&mut p1).await.code.as_str().to_string();
    send(
        &mut p2,
        &ClientEvent::JoinRoom {
            room: code,
            name: "Grace".into(),
        },
    )
    .await;
    state_until(&mut p1, |s| s.players.len() == 2).await;

    send(&mut p1, &ClientEvent::StartRound).await;
    let state = state_until(&mut p2, |s| s.phase == Phase::Round).await;
    assert!(state.deadline.is_some());

    send(
        &mut p2,
        &ClientEvent::RevealAttribute {
            category: CardCategory::Hobby,
        },
    )
    .await;

    // p1 sees Grace's hobby and nothing else of hers.
    let state = state_until(&mut p1, |s| {
        s.players
            .iter()
            .any(|p| p.id == conn2 && p.revealed[&CardCategory::Hobby])
    })
    .await;
    let grace = state.players.iter().find(|p| p.id == conn2).unwrap();
    assert!(grace.cards[&CardCategory::Hobby].is_some());
    assert!(grace.cards[&CardCategory::Profession].is_none());
}

#[tokio::test]
async fn test_reveal_in_lobby_is_silently_dropped() {
    let addr = start().await;
    let (mut p1, _) = connect(&addr).await;
    send(&mut p1, &ClientEvent::CreateRoom { name: "Ada".into() }).await;
    recv_state(&mut p1).await;

    send(
        &mut p1,
        &ClientEvent::RevealAttribute {
            category: CardCategory::Phobia,
        },
    )
    .await;

    // No broadcast for the invalid reveal; the next valid action's
    // broadcast is the next RoomState we see, still fully masked.
    send(&mut p1, &ClientEvent::StartRound).await;
    let state = state_until(&mut p1, |s| s.phase == Phase::Round).await;
    assert!(state.players[0].cards.values().all(Option::is_none));
}

#[tokio::test]
async fn test_game_runs_to_elimination_and_end() {
    let addr = start().await;
    let (mut host, _) = connect(&addr).await;
    send(&mut host, &ClientEvent::CreateRoom { name: "P1".into() }).await;
    let code = recv_state(&mut host).await.code.as_str().to_string();

    let mut others = Vec::new();
    let mut ids = Vec::new();
    for i in 2..=4 {
        let (mut ws, conn) = connect(&addr).await;
        send(
            &mut ws,
            &ClientEvent::JoinRoom {
                room: code.clone(),
                name: format!("P{i}"),
            },
        )
        .await;
        others.push(ws);
        ids.push(conn);
    }
    state_until(&mut host, |s| s.players.len() == 4).await;

    send(&mut host, &ClientEvent::StartRound).await;
    send(&mut host, &ClientEvent::AdvanceToVoting).await;
    state_until(&mut host, |s| s.phase == Phase::Voting).await;

    // Host and P2 both vote out P4; a 4-player room with capacity 3 ends
    // after a single elimination.
    let target = ids[2];
    send(&mut host, &ClientEvent::CastVote { target }).await;
    send(&mut others[0], &ClientEvent::CastVote { target }).await;
    send(&mut host, &ClientEvent::FinishVoting).await;

    let state = state_until(&mut host, |s| s.phase == Phase::Ended).await;
    let eliminated = state.players.iter().find(|p| p.id == target).unwrap();
    assert!(!eliminated.alive);
    assert_eq!(
        state.players.iter().filter(|p| p.alive).count(),
        state.scenario.capacity
    );
    assert!(state.log.iter().any(|line| line == "Eliminated: P4"));

    // Every member converges on the same terminal state.
    for ws in &mut others {
        let state = state_until(ws, |s| s.phase == Phase::Ended).await;
        assert_eq!(state.round, 1);
    }
}

#[tokio::test]
async fn test_disconnect_hands_host_to_remaining_player() {
    let addr = start().await;
    let (mut p1, _) = connect(&addr).await;
    let (mut p2, conn2) = connect(&addr).await;

    send(&mut p1, &ClientEvent::CreateRoom { name: "Ada".into() }).await;
    let code = recv_state(&mut p1).await.code.as_str().to_string();
    send(
        &mut p2,
        &ClientEvent::JoinRoom {
            room: code,
            name: "Grace".into(),
        },
    )
    .await;
    state_until(&mut p2, |s| s.players.len() == 2).await;

    drop(p1); // hard disconnect

    let state = state_until(&mut p2, |s| s.players.len() == 1).await;
    assert_eq!(state.host, Some(conn2));
    assert!(state.log.iter().any(|line| line == "New host assigned"));
}
