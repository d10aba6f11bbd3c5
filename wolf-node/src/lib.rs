//! A replicated werewolf peer.
//!
//! Commands are totally ordered by the [`slot_paxos`] engine; every peer
//! applies the decided log to an identical, deterministic [`Game`]. The
//! node glue holds at most one local command in flight and retries into the
//! next free slot when a competitor takes one.
//!
//! Transport, presentation, and configuration stay outside: embedders feed
//! frames and peer signals in, and drain frames and [`GameEvent`]s out.

#![warn(clippy::pedantic)]

pub mod driver;
pub mod game;
pub mod node;
pub mod roster;
pub mod runner;

pub use driver::{Driver, Observed};
pub use game::{Faction, Game, GameEvent, Phase, Role, VoteSession};
pub use node::{IntentError, WolfNode};
pub use roster::Roster;
pub use runner::{NodeInput, run_node};
