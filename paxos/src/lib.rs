//! Slot-indexed Paxos consensus engine.
//!
//! One independent Paxos instance runs per integer slot of a replicated
//! log. Every peer plays proposer, acceptor, and learner at once; a single
//! frame shape carries all four protocol phases over a broadcast-only
//! transport the host provides.
//!
//! # Architecture
//!
//! - [`SlotState`]: pure per-slot state machine, no I/O
//! - [`Engine`]: lazy slot map, membership view, loopback self-delivery
//! - [`Host`]: the capability set the engine requires (broadcast + decided)
//!
//! # Quick start
//!
//! ```
//! use slot_paxos::{Engine, LogicalClock, Mailbox, NodeId};
//!
//! // A lone node is its own quorum and decides through loopback.
//! let mut engine = Engine::new(NodeId(7), LogicalClock::default(), Mailbox::default());
//! engine.propose(1, "first".to_owned());
//! assert_eq!(engine.decided_value(1), Some("first"));
//! ```

#![warn(clippy::pedantic)]

mod engine;
mod messages;
mod proposal;
mod slot;

pub use engine::{Engine, Host, Mailbox};
pub use messages::{Frame, PaxosPhase};
pub use proposal::{LogicalClock, MonotonicClock, NodeId, ProposalId, Slot, TickSource};
pub use slot::SlotState;
