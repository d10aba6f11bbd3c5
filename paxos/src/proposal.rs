//! Proposal numbering and tick sources.

use std::fmt;

/// Index into the replicated log. One Paxos instance exists per slot.
pub type Slot = i32;

/// Process-local node identity, drawn once at startup.
///
/// Breaks symmetry in proposal numbers and selects the distinguished
/// proposer for the start-game command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub i32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proposal number: `(ticks, node)` packed lexicographically into an `i64`.
///
/// Ticks occupy the high bits, the node tiebreak the low [`Self::NODE_BITS`],
/// so integer order equals `(ticks, node)` order. A proposal number is never
/// reused: ticks are strictly increasing within a proposer and the tiebreak
/// separates concurrent proposers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId(i64);

impl ProposalId {
    const NODE_BITS: u32 = 20;

    #[must_use]
    pub fn mint(ticks: i64, node: NodeId) -> Self {
        let tiebreak = i64::from(node.0.cast_unsigned()) & ((1 << Self::NODE_BITS) - 1);
        Self((ticks << Self::NODE_BITS) | tiebreak)
    }

    /// Raw wire representation. `-1` encodes "no proposal".
    #[must_use]
    pub fn to_wire(self) -> i64 {
        self.0
    }

    /// Decode the wire representation; negative values mean "no proposal".
    #[must_use]
    pub fn from_wire(raw: i64) -> Option<Self> {
        (raw >= 0).then_some(Self(raw))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of proposal ticks. Successive calls must be strictly increasing.
pub trait TickSource {
    fn next_ticks(&mut self) -> i64;
}

/// Millisecond ticks from a monotonic clock, de-duplicated so a burst of
/// proposals within one millisecond still mints increasing numbers.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: std::time::Instant,
    last: i64,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
            last: 0,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn next_ticks(&mut self) -> i64 {
        let now = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// Deterministic counter for tests and model checking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LogicalClock(i64);

impl TickSource for LogicalClock {
    fn next_ticks(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_order_by_ticks_then_node() {
        let a = ProposalId::mint(1, NodeId(900));
        let b = ProposalId::mint(2, NodeId(1));
        assert!(a < b);

        let c = ProposalId::mint(2, NodeId(2));
        assert!(b < c);
    }

    #[test]
    fn test_wire_round_trip() {
        let id = ProposalId::mint(42, NodeId(7));
        assert_eq!(ProposalId::from_wire(id.to_wire()), Some(id));
        assert_eq!(ProposalId::from_wire(-1), None);
    }

    #[test]
    fn test_monotonic_clock_never_repeats() {
        let mut clock = MonotonicClock::new();
        let mut prev = clock.next_ticks();
        for _ in 0..1000 {
            let next = clock.next_ticks();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_logical_clock_increments() {
        let mut clock = LogicalClock::default();
        assert_eq!(clock.next_ticks(), 1);
        assert_eq!(clock.next_ticks(), 2);
    }
}
