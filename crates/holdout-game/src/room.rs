//! The room: membership, the phase machine, votes, and state projections.
//!
//! All operations here are pure transitions — validation plus mutation,
//! no I/O and no clocks. Time enters as an explicit `now_ms` argument and
//! randomness as an injected RNG, so identical inputs always produce the
//! identical room.

use std::collections::{BTreeMap, HashMap};

use holdout_protocol::{
    CardCategory, ConnectionId, Phase, PrivateStateView, RoomCode,
    RoomSettings, RoomStateView, Scenario,
};
use rand::Rng;

use crate::{GameError, Player};

/// How many log lines the public projection carries.
const LOG_BROADCAST_LINES: usize = 20;

/// The outcome of resolving a voting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteResolution {
    /// The eliminated player, or `None` on a tie / zero votes.
    pub eliminated: Option<ConnectionId>,
    /// `true` when the alive count reached bunker capacity and the game is
    /// over.
    pub ended: bool,
}

/// One game room and everything it owns.
///
/// Membership is kept in a `BTreeMap` so iteration order — and with it
/// host reassignment and projection order — is the ascending connection
/// id, not an accident of hashing.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    host: Option<ConnectionId>,
    phase: Phase,
    round: u32,
    deadline_ms: Option<u64>,
    players: BTreeMap<ConnectionId, Player>,
    /// voter → target; entries only ever name alive members.
    votes: HashMap<ConnectionId, ConnectionId>,
    log: Vec<String>,
    settings: RoomSettings,
    scenario: Scenario,
}

impl Room {
    /// Creates a room in the lobby phase with the creator registered as
    /// host and first member. A room never exists without its creator.
    pub fn create<R: Rng + ?Sized>(
        code: RoomCode,
        host: ConnectionId,
        host_name: String,
        rng: &mut R,
    ) -> Self {
        let mut room = Self {
            code,
            host: Some(host),
            phase: Phase::Lobby,
            round: 1,
            deadline_ms: None,
            players: BTreeMap::new(),
            votes: HashMap::new(),
            log: Vec::new(),
            settings: RoomSettings::default(),
            scenario: Scenario::default(),
        };
        room.add_player(host, host_name, rng);
        room
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> Option<ConnectionId> {
        self.host
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn is_member(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Member connection ids in ascending order.
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.players.keys().copied().collect()
    }

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// `true` if the room is in a running round whose deadline has passed.
    pub fn round_expired(&self, now_ms: u64) -> bool {
        self.phase == Phase::Round
            && self.deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }

    /// Adds a member with a freshly drawn hand. A duplicate join is an
    /// explicit no-op: the existing player (and their secrets) stay
    /// untouched.
    pub fn add_player<R: Rng + ?Sized>(
        &mut self,
        id: ConnectionId,
        name: String,
        rng: &mut R,
    ) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        let player = Player::new(id, name, rng);
        self.record(format!("{} joined", player.name));
        self.players.insert(id, player);
        true
    }

    /// Removes a member along with their outgoing vote and every vote
    /// targeting them. If the host left, the lowest remaining connection
    /// id becomes the new host, so reassignment is deterministic. No-op
    /// if the id is not a member.
    pub fn remove_player(&mut self, id: ConnectionId) -> bool {
        let Some(player) = self.players.remove(&id) else {
            return false;
        };
        self.votes.remove(&id);
        self.votes.retain(|_, target| *target != id);
        self.record(format!("{} left", player.name));

        if self.host == Some(id) {
            self.host = self.players.keys().next().copied();
            if self.host.is_some() {
                self.record("New host assigned".to_string());
            }
        }
        true
    }

    /// Reveals one of the player's secret categories. Only alive members
    /// may reveal, and only during a round. Revealing an already-revealed
    /// category succeeds without changing anything.
    pub fn reveal(
        &mut self,
        id: ConnectionId,
        category: CardCategory,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Round {
            return Err(GameError::WrongPhase(self.phase));
        }
        let (name, already_revealed) = {
            let player =
                self.players.get_mut(&id).ok_or(GameError::NotMember(id))?;
            if !player.alive {
                return Err(GameError::NotAlive(id));
            }
            let already = player.hand().is_revealed(category);
            player.reveal(category);
            (player.name.clone(), already)
        };
        // Logged once, so repeating a reveal leaves the projection as-is.
        if !already_revealed {
            self.record(format!("{name} revealed {category}"));
        }
        Ok(())
    }

    /// Starts the round timer. Only valid from the lobby.
    pub fn start_round(&mut self, now_ms: u64) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::WrongPhase(self.phase));
        }
        self.phase = Phase::Round;
        self.deadline_ms = Some(now_ms + self.settings.round_secs * 1000);
        self.record(format!(
            "Round {} started ({}s)",
            self.round, self.settings.round_secs
        ));
        Ok(())
    }

    /// Opens voting and clears any stale votes. Only valid from a running
    /// round — both for the host's manual cut and for timer expiry, which
    /// is what makes a repeated sweep tick a no-op.
    pub fn to_voting(&mut self) -> Result<(), GameError> {
        if self.phase != Phase::Round {
            return Err(GameError::WrongPhase(self.phase));
        }
        self.phase = Phase::Voting;
        self.votes.clear();
        self.record("Voting started".to_string());
        Ok(())
    }

    /// Records (or overwrites) a vote: last vote wins. Both ends must be
    /// alive members and self-votes are refused.
    pub fn vote(
        &mut self,
        voter: ConnectionId,
        target: ConnectionId,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Voting {
            return Err(GameError::WrongPhase(self.phase));
        }
        if voter == target {
            return Err(GameError::SelfVote(voter));
        }
        let voting = self.players.get(&voter).ok_or(GameError::NotMember(voter))?;
        if !voting.alive {
            return Err(GameError::NotAlive(voter));
        }
        let voted = self
            .players
            .get(&target)
            .ok_or(GameError::UnknownTarget(target))?;
        if !voted.alive {
            return Err(GameError::UnknownTarget(target));
        }
        self.votes.insert(voter, target);
        Ok(())
    }

    /// Resolves the voting phase. The sole authority for elimination and
    /// game end; deterministic given the current votes map.
    ///
    /// A single strict plurality eliminates its target; a tie or zero
    /// votes eliminates nobody. Afterwards the room either ends (alive
    /// count at or below bunker capacity) or returns to the lobby with
    /// the round counter bumped.
    pub fn finish_voting(&mut self) -> Result<VoteResolution, GameError> {
        if self.phase != Phase::Voting {
            return Err(GameError::WrongPhase(self.phase));
        }

        let tally = self.tally();
        let max = tally.values().copied().max().unwrap_or(0);
        let top: Vec<ConnectionId> = tally
            .iter()
            .filter(|&(_, &count)| count == max)
            .map(|(&target, _)| target)
            .collect();

        let eliminated = if max == 0 || top.len() != 1 {
            self.record("Voting ended: tie/no votes".to_string());
            None
        } else {
            let target = top[0];
            let name = self
                .players
                .get_mut(&target)
                .map(|player| {
                    player.alive = false;
                    player.name.clone()
                })
                .unwrap_or_default();
            self.record(format!("Eliminated: {name}"));
            Some(target)
        };

        // Resolved votes are history; this also keeps the invariant that
        // the votes map never names an eliminated player.
        self.votes.clear();
        self.deadline_ms = None;

        let ended = self.alive_count() <= self.scenario.capacity;
        if ended {
            self.phase = Phase::Ended;
            let survivors: Vec<&str> = self
                .players
                .values()
                .filter(|p| p.alive)
                .map(|p| p.name.as_str())
                .collect();
            self.record(format!("Game ended. Survivors: {}", survivors.join(", ")));
        } else {
            self.round += 1;
            self.phase = Phase::Lobby;
            self.record("Back to lobby for next round".to_string());
        }

        Ok(VoteResolution { eliminated, ended })
    }

    /// Current vote tally: target → count.
    pub fn tally(&self) -> BTreeMap<ConnectionId, u32> {
        let mut tally = BTreeMap::new();
        for target in self.votes.values() {
            *tally.entry(*target).or_insert(0) += 1;
        }
        tally
    }

    /// The public projection broadcast to every member: cards masked,
    /// tally included, log capped to the most recent lines.
    pub fn public_state(&self) -> RoomStateView {
        let log_start = self.log.len().saturating_sub(LOG_BROADCAST_LINES);
        RoomStateView {
            code: self.code.clone(),
            host: self.host,
            phase: self.phase,
            round: self.round,
            deadline: self.deadline_ms,
            settings: self.settings.clone(),
            scenario: self.scenario.clone(),
            players: self.players.values().map(Player::view).collect(),
            votes: self.tally(),
            log: self.log[log_start..].to_vec(),
        }
    }

    /// The acting player's own secrets, or `None` for non-members.
    pub fn private_state(&self, id: ConnectionId) -> Option<PrivateStateView> {
        self.players.get(&id).map(Player::private_view)
    }

    fn record(&mut self, line: String) {
        self.log.push(line);
    }
}

// =========================================================================
// Tests
// =========================================================================
