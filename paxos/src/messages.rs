//! The single frame shape shared by all four protocol phases.

use crate::proposal::{NodeId, ProposalId, Slot};

/// Which of the four protocol steps a frame carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaxosPhase {
    Prepare,
    Promise,
    Accept,
    Accepted,
}

impl PaxosPhase {
    /// Wire discriminant (little-endian `int32` on the wire).
    #[must_use]
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Prepare => 0,
            Self::Promise => 1,
            Self::Accept => 2,
            Self::Accepted => 3,
        }
    }

    #[must_use]
    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Prepare),
            1 => Some(Self::Promise),
            2 => Some(Self::Accept),
            3 => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// One consensus message. Every phase uses the same shape; unused fields
/// stay empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame {
    pub phase: PaxosPhase,
    pub slot: Slot,
    pub sender: NodeId,
    pub proposal_id: ProposalId,
    /// Proposed or accepted value. `None` is the wire's empty string.
    pub value: Option<String>,
    /// Piggybacked on Promise: the acceptor's latest accepted pair.
    pub last_accepted: Option<(ProposalId, String)>,
}

impl Frame {
    #[must_use]
    pub fn prepare(slot: Slot, sender: NodeId, proposal_id: ProposalId) -> Self {
        Self {
            phase: PaxosPhase::Prepare,
            slot,
            sender,
            proposal_id,
            value: None,
            last_accepted: None,
        }
    }

    #[must_use]
    pub fn promise(
        slot: Slot,
        sender: NodeId,
        proposal_id: ProposalId,
        last_accepted: Option<(ProposalId, String)>,
    ) -> Self {
        Self {
            phase: PaxosPhase::Promise,
            slot,
            sender,
            proposal_id,
            value: None,
            last_accepted,
        }
    }

    #[must_use]
    pub fn accept(slot: Slot, sender: NodeId, proposal_id: ProposalId, value: String) -> Self {
        Self {
            phase: PaxosPhase::Accept,
            slot,
            sender,
            proposal_id,
            value: Some(value),
            last_accepted: None,
        }
    }

    #[must_use]
    pub fn accepted(slot: Slot, sender: NodeId, proposal_id: ProposalId, value: String) -> Self {
        Self {
            phase: PaxosPhase::Accepted,
            slot,
            sender,
            proposal_id,
            value: Some(value),
            last_accepted: None,
        }
    }
}
