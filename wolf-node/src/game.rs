//! Deterministic game state machine.
//!
//! The game is a pure function of the decided command sequence: every peer
//! that applies the same commands holds an identical [`Game`] value. All
//! nondeterminism (role shuffling) runs through a fixed-constant generator
//! seeded from the player ids, so peers never need to exchange role
//! information.

use std::collections::{BTreeMap, BTreeSet};

use slot_paxos::NodeId;
use tracing::{debug, warn};
use wolf_core::{Command, VoteKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Lobby,
    Night,
    Day,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Villager,
    Werewolf,
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Faction {
    Villagers,
    Werewolves,
}

/// Ballots and electorate for one elimination round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteSession {
    pub kind: VoteKind,
    pub ballots: BTreeMap<NodeId, NodeId>,
    pub eligible: BTreeSet<NodeId>,
}

/// Externally visible outcomes of applying a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PlayerReady(NodeId),
    /// Every known player is ready; `starter` (the lowest id) must submit
    /// the start command. All other peers wait.
    AllReady { starter: NodeId },
    GameStarted { wolves: usize },
    BallotRecorded { voter: NodeId, kind: VoteKind },
    PlayerEliminated { player: NodeId, role: Role },
    /// The vote tied; nobody is eliminated but the phase still advances.
    TieNoElimination { kind: VoteKind },
    PhaseChanged(Phase),
    GameOver { winner: Faction },
    GameReset,
}

/// Fixed-constant 64-bit linear congruential generator.
///
/// The multiplier/increment pair and the high-word extraction are part of
/// the protocol: every peer must produce the identical key stream for a
/// given seed.
#[derive(Clone, Debug)]
struct GameRng {
    state: u64,
}

impl GameRng {
    const MUL: u64 = 6_364_136_223_846_793_005;
    const INC: u64 = 1_442_695_040_888_963_407;

    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(Self::MUL).wrapping_add(Self::INC);
        #[expect(clippy::cast_possible_truncation)]
        let key = (self.state >> 32) as u32;
        key
    }
}

/// The replicated game state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Game {
    phase: Phase,
    roles: BTreeMap<NodeId, Role>,
    alive: BTreeSet<NodeId>,
    lobby_ready: BTreeSet<NodeId>,
    known_players: BTreeSet<NodeId>,
    session: Option<VoteSession>,
    winner: Option<Faction>,
}

impl Game {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeMap<NodeId, Role> {
        &self.roles
    }

    #[must_use]
    pub fn alive(&self) -> &BTreeSet<NodeId> {
        &self.alive
    }

    #[must_use]
    pub fn lobby_ready(&self) -> &BTreeSet<NodeId> {
        &self.lobby_ready
    }

    #[must_use]
    pub fn session(&self) -> Option<&VoteSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    #[must_use]
    pub fn alive_wolves(&self) -> usize {
        self.alive
            .iter()
            .filter(|id| self.roles.get(id) == Some(&Role::Werewolf))
            .count()
    }

    #[must_use]
    pub fn alive_villagers(&self) -> usize {
        self.alive
            .iter()
            .filter(|id| self.roles.get(id) == Some(&Role::Villager))
            .count()
    }

    /// A player became reachable. Membership only moves in the lobby; once
    /// the game starts, the alive set is governed by consensus alone.
    pub fn player_joined(&mut self, id: NodeId) {
        if self.phase == Phase::Lobby {
            self.known_players.insert(id);
            self.alive.insert(id);
        }
    }

    pub fn player_left(&mut self, id: NodeId) {
        if self.phase == Phase::Lobby {
            self.known_players.remove(&id);
            self.alive.remove(&id);
            self.lobby_ready.remove(&id);
        }
    }

    /// Apply one decided command. Invalid commands are dropped without
    /// mutating state.
    pub fn apply(&mut self, command: &Command) -> Vec<GameEvent> {
        match command {
            Command::VoteStart(id) => self.apply_vote_start(*id),
            Command::StartGame => self.apply_start_game(),
            Command::Vote {
                voter,
                target,
                kind,
            } => self.apply_vote(*voter, *target, *kind),
            Command::ResetGame => self.apply_reset(),
        }
    }

    fn apply_vote_start(&mut self, id: NodeId) -> Vec<GameEvent> {
        if self.phase != Phase::Lobby {
            warn!(%id, "vote-start outside lobby, dropping");
            return Vec::new();
        }
        if !self.known_players.contains(&id) {
            warn!(%id, "vote-start from unknown player, dropping");
            return Vec::new();
        }
        self.lobby_ready.insert(id);
        let mut events = vec![GameEvent::PlayerReady(id)];
        if self.lobby_ready == self.known_players
            && let Some(&starter) = self.known_players.first()
        {
            debug!(%starter, "all players ready");
            events.push(GameEvent::AllReady { starter });
        }
        events
    }

    fn apply_start_game(&mut self) -> Vec<GameEvent> {
        if self.phase != Phase::Lobby {
            warn!("start-game outside lobby, dropping");
            return Vec::new();
        }
        self.alive = self.known_players.clone();
        let wolves = self.assign_roles();
        self.phase = Phase::Night;
        self.open_session(VoteKind::WolfKill);
        debug!(players = self.alive.len(), wolves, "game started");
        vec![
            GameEvent::GameStarted { wolves },
            GameEvent::PhaseChanged(Phase::Night),
        ]
    }

    /// Deterministic role assignment. Returns the wolf count.
    fn assign_roles(&mut self) -> usize {
        let players: Vec<NodeId> = self.alive.iter().copied().collect();
        let wolves = (players.len() / 3).max(1);
        let seed = players
            .iter()
            .fold(0u64, |acc, id| acc.wrapping_add(u64::from(id.0.cast_unsigned())));

        let mut rng = GameRng::new(seed);
        let mut keyed: Vec<(u32, usize, NodeId)> = players
            .iter()
            .enumerate()
            .map(|(index, id)| (rng.next_u32(), index, *id))
            .collect();
        keyed.sort_unstable();

        self.roles = keyed
            .iter()
            .enumerate()
            .map(|(position, (_, _, id))| {
                let role = if position < wolves {
                    Role::Werewolf
                } else {
                    Role::Villager
                };
                (*id, role)
            })
            .collect();
        wolves
    }

    fn apply_vote(&mut self, voter: NodeId, target: NodeId, kind: VoteKind) -> Vec<GameEvent> {
        let Some(session) = &mut self.session else {
            warn!(%voter, "ballot with no active vote session, dropping");
            return Vec::new();
        };
        if session.kind != kind {
            warn!(%voter, %kind, expected = %session.kind, "ballot for wrong session, dropping");
            return Vec::new();
        }
        if !session.eligible.contains(&voter) {
            warn!(%voter, "ballot from ineligible voter, dropping");
            return Vec::new();
        }
        if session.ballots.contains_key(&voter) {
            warn!(%voter, "duplicate ballot, dropping");
            return Vec::new();
        }
        session.ballots.insert(voter, target);
        let mut events = vec![GameEvent::BallotRecorded { voter, kind }];
        if session.ballots.len() >= session.eligible.len() {
            events.extend(self.finalize_session());
        }
        events
    }

    /// Tally, eliminate the unique plurality winner, evaluate wins, and
    /// advance the phase.
    fn finalize_session(&mut self) -> Vec<GameEvent> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let mut tally: BTreeMap<NodeId, usize> = BTreeMap::new();
        for target in session.ballots.values() {
            *tally.entry(*target).or_default() += 1;
        }
        let top = tally.values().copied().max().unwrap_or(0);
        let mut leaders = tally
            .iter()
            .filter(|(_, count)| **count == top)
            .map(|(target, _)| *target);
        let victim = match (leaders.next(), leaders.next()) {
            (Some(victim), None) => Some(victim),
            _ => None,
        };

        let mut events = Vec::new();
        match victim {
            Some(victim) => {
                let role = self.roles.get(&victim).copied().unwrap_or(Role::Villager);
                self.alive.remove(&victim);
                self.roles.insert(victim, Role::Dead);
                debug!(%victim, ?role, "player eliminated");
                events.push(GameEvent::PlayerEliminated {
                    player: victim,
                    role,
                });
                if let Some(winner) = self.evaluate_win() {
                    self.phase = Phase::GameOver;
                    self.winner = Some(winner);
                    debug!(?winner, "game over");
                    events.push(GameEvent::GameOver { winner });
                    events.push(GameEvent::PhaseChanged(Phase::GameOver));
                    return events;
                }
            }
            None => {
                debug!(kind = %session.kind, "vote tied, nobody eliminated");
                events.push(GameEvent::TieNoElimination { kind: session.kind });
            }
        }

        let next = match session.kind {
            VoteKind::WolfKill => (Phase::Day, VoteKind::VillagerLynch),
            VoteKind::VillagerLynch => (Phase::Night, VoteKind::WolfKill),
        };
        self.phase = next.0;
        self.open_session(next.1);
        events.push(GameEvent::PhaseChanged(next.0));
        events
    }

    fn evaluate_win(&self) -> Option<Faction> {
        let wolves = self.alive_wolves();
        if wolves == 0 {
            Some(Faction::Villagers)
        } else if wolves >= self.alive_villagers() {
            Some(Faction::Werewolves)
        } else {
            None
        }
    }

    fn open_session(&mut self, kind: VoteKind) {
        let eligible = match kind {
            VoteKind::WolfKill => self
                .alive
                .iter()
                .filter(|id| self.roles.get(id) == Some(&Role::Werewolf))
                .copied()
                .collect(),
            VoteKind::VillagerLynch => self.alive.clone(),
        };
        self.session = Some(VoteSession {
            kind,
            ballots: BTreeMap::new(),
            eligible,
        });
    }

    fn apply_reset(&mut self) -> Vec<GameEvent> {
        self.phase = Phase::Lobby;
        self.roles.clear();
        self.session = None;
        self.winner = None;
        self.lobby_ready.clear();
        self.alive = self.known_players.clone();
        debug!("game reset to lobby");
        vec![GameEvent::GameReset, GameEvent::PhaseChanged(Phase::Lobby)]
    }
}
