//! One peer of the replicated game: consensus engine, RSM driver, game
//! state, and roster glued together.
//!
//! The node is single-threaded and cooperative. Each call processes to
//! completion: a decision and everything it cascades into (applying
//! commands, auto-submitting the start command, re-proposing a displaced
//! value) runs within the same turn. The embedder drains outbound frames
//! and game events between calls.

use std::collections::VecDeque;
use std::fmt;

use error_stack::Report;
use slot_paxos::{Engine, Frame, Mailbox, MonotonicClock, NodeId, Slot};
use tracing::warn;
use wolf_core::{Command, JoinRejection, OperationContext, PlayerInfo};

use crate::driver::Driver;
use crate::game::{Game, GameEvent, Phase};
use crate::roster::Roster;

/// A local intent was rejected before reaching consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentError {
    NotInLobby,
    AlreadyReady,
    CommandPending,
    NoActiveVote,
    NotEligible,
    AlreadyVoted,
}

impl fmt::Display for IntentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInLobby => f.write_str("the game is not in the lobby"),
            Self::AlreadyReady => f.write_str("already signalled ready"),
            Self::CommandPending => f.write_str("another command is awaiting consensus"),
            Self::NoActiveVote => f.write_str("no vote session is active"),
            Self::NotEligible => f.write_str("not eligible to vote in this session"),
            Self::AlreadyVoted => f.write_str("ballot already cast"),
        }
    }
}

impl std::error::Error for IntentError {}

/// A replicated werewolf peer.
pub struct WolfNode {
    engine: Engine<MonotonicClock, Mailbox>,
    driver: Driver,
    game: Game,
    roster: Roster,
    events: VecDeque<GameEvent>,
}

impl WolfNode {
    /// Create a node with a random process-local identity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(NodeId(rand::random()), name)
    }

    /// Create a node with a fixed identity (tests, simulations).
    #[must_use]
    pub fn with_id(id: NodeId, name: impl Into<String>) -> Self {
        let mut game = Game::new();
        game.player_joined(id);
        Self {
            engine: Engine::new(id, MonotonicClock::new(), Mailbox::default()),
            driver: Driver::new(),
            game,
            roster: Roster::new(id, name.into()),
            events: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.roster.me()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.roster.my_name()
    }

    #[must_use]
    pub fn game(&self) -> &Game {
        &self.game
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The committed command log, by slot.
    #[must_use]
    pub fn log(&self) -> &std::collections::BTreeMap<Slot, String> {
        self.driver.log()
    }

    /// Check a join request against the current roster and phase.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`JoinRejection`].
    pub fn validate_join(&self, key: &str, name: &str) -> Result<(), JoinRejection> {
        self.roster
            .validate_join(key, name, self.game.phase() == Phase::Lobby)
    }

    /// A validated peer connected and sent its player info.
    pub fn peer_connected(&mut self, info: PlayerInfo) {
        self.engine.peer_joined(info.node);
        self.game.player_joined(info.node);
        self.roster.insert(info);
    }

    /// A peer disconnected. Quorum shrinks; after the game has started the
    /// alive set is untouched (it is governed by consensus alone).
    pub fn peer_disconnected(&mut self, id: NodeId) {
        self.engine.peer_left(id);
        self.game.player_left(id);
        self.roster.remove(id);
    }

    /// Signal lobby-ready.
    ///
    /// # Errors
    ///
    /// Rejected outside the lobby, when already ready, or while another
    /// command is in flight.
    pub fn ready(&mut self) -> Result<(), Report<IntentError>> {
        if self.game.phase() != Phase::Lobby {
            return Err(Report::new(IntentError::NotInLobby)
                .attach_printable(OperationContext::SIGNALLING_READY));
        }
        if self.game.lobby_ready().contains(&self.id()) {
            return Err(Report::new(IntentError::AlreadyReady)
                .attach_printable(OperationContext::SIGNALLING_READY));
        }
        self.submit(Command::VoteStart(self.id()), OperationContext::SIGNALLING_READY)
    }

    /// Cast a ballot in the active vote session.
    ///
    /// # Errors
    ///
    /// Rejected when no session is active, this node is not eligible, it
    /// has already voted, or another command is in flight.
    pub fn vote(&mut self, target: NodeId) -> Result<(), Report<IntentError>> {
        let me = self.id();
        let Some(session) = self.game.session() else {
            return Err(Report::new(IntentError::NoActiveVote)
                .attach_printable(OperationContext::CASTING_VOTE));
        };
        if !session.eligible.contains(&me) {
            return Err(Report::new(IntentError::NotEligible)
                .attach_printable(OperationContext::CASTING_VOTE));
        }
        if session.ballots.contains_key(&me) {
            return Err(Report::new(IntentError::AlreadyVoted)
                .attach_printable(OperationContext::CASTING_VOTE));
        }
        let kind = session.kind;
        self.submit(
            Command::Vote {
                voter: me,
                target,
                kind,
            },
            OperationContext::CASTING_VOTE,
        )
    }

    /// Ask every peer to return to the lobby.
    ///
    /// # Errors
    ///
    /// Rejected while another command is in flight.
    pub fn reset(&mut self) -> Result<(), Report<IntentError>> {
        self.submit(Command::ResetGame, OperationContext::RESETTING_GAME)
    }

    /// Ingress for consensus frames received from the transport.
    pub fn handle_frame(&mut self, frame: Frame) {
        self.engine.handle_frame(frame);
        self.pump();
    }

    /// Drain frames awaiting broadcast to the peers.
    pub fn outbound(&mut self) -> impl Iterator<Item = Frame> + '_ {
        self.engine.host_mut().outbound.drain(..)
    }

    /// Drain game events for the embedder to present.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    fn submit(
        &mut self,
        command: Command,
        context: OperationContext,
    ) -> Result<(), Report<IntentError>> {
        let Some((slot, text)) = self.driver.submit(command.to_string()) else {
            return Err(Report::new(IntentError::CommandPending).attach_printable(context));
        };
        self.engine.propose(slot, text);
        self.pump();
        Ok(())
    }

    /// Consume decisions until quiescent. Cascading effects (applying
    /// commands, auto-starting the game, displaced retries) run here, in
    /// the same turn that produced them.
    fn pump(&mut self) {
        while let Some((slot, value)) = self.engine.host_mut().decisions.pop_front() {
            let observed = self.driver.observe_decided(slot, value);
            for (slot, text) in observed.apply {
                match text.parse::<Command>() {
                    Ok(command) => self.apply_command(&command),
                    Err(error) => warn!(slot, %error, "dropping malformed command"),
                }
            }
            if let Some((slot, text)) = observed.retry {
                self.engine.propose(slot, text);
            }
        }
    }

    fn apply_command(&mut self, command: &Command) {
        let events = self.game.apply(command);
        for event in &events {
            if let GameEvent::AllReady { starter } = event {
                // only the distinguished proposer submits the start command
                if *starter == self.id() && self.driver.pending().is_none() {
                    if let Some((slot, text)) =
                        self.driver.submit(Command::StartGame.to_string())
                    {
                        self.engine.propose(slot, text);
                    }
                }
            }
        }
        self.events.extend(events);
    }
}
