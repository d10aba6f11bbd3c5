//! Pure per-slot Paxos state machine. No I/O, no clocks.
//!
//! One [`SlotState`] exists per log slot, created lazily on first touch.
//! Every peer plays all three classical roles against the same state:
//! acceptor (`on_prepare`, `on_accept`), proposer (`start_round`,
//! `on_promise`), and learner (`on_accepted`). Promise and accept tallies
//! are keyed by sender, so duplicated deliveries never inflate a quorum.

use std::collections::{BTreeMap, BTreeSet};

use crate::proposal::{NodeId, ProposalId};

/// Per-slot consensus state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SlotState {
    /// Largest proposal number promised to any preparer.
    highest_promised: Option<ProposalId>,
    /// Latest locally accepted (proposal, value).
    accepted: Option<(ProposalId, String)>,
    /// The round this node is currently driving as a proposer, if any.
    round: Option<ProposerRound>,
    /// Accepted votes per proposal id: which peers confirmed, and the value.
    accepted_votes: BTreeMap<ProposalId, (BTreeSet<NodeId>, String)>,
    /// Decided value, set at most once for the life of the process.
    decision: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ProposerRound {
    proposal_id: ProposalId,
    /// The value this node wants chosen if no acceptor reports a prior accept.
    value: String,
    /// Peers that promised this round.
    promises: BTreeSet<NodeId>,
    /// Highest previously-accepted pair reported by any promise this round.
    best_accepted: Option<(ProposalId, String)>,
    phase2_started: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PrepareOutcome {
    /// Promise this proposal, reporting the latest accepted pair.
    Promise {
        last_accepted: Option<(ProposalId, String)>,
    },
    /// Already promised an equal or higher proposal; stay silent.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PromiseOutcome {
    /// Still collecting promises.
    Pending,
    /// Quorum of promises: broadcast Accept with this value.
    StartAccept { value: String },
    /// Quorum reached but no value to propose; the round is dropped.
    Aborted,
    /// Not our round, wrong proposal, or Phase 2 already started.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum AcceptOutcome {
    /// Accepted: broadcast Accepted with the same pair.
    Accepted,
    /// Promised to a higher proposal; stay silent.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum AcceptedOutcome {
    /// Quorum of accepts: the slot is decided, exactly once.
    Decided(String),
    Pending,
}

impl SlotState {
    /// Begin (or restart) a proposal round with a freshly minted number.
    pub(crate) fn start_round(&mut self, proposal_id: ProposalId, value: String) {
        self.round = Some(ProposerRound {
            proposal_id,
            value,
            promises: BTreeSet::new(),
            best_accepted: None,
            phase2_started: false,
        });
    }

    /// Acceptor: Phase 1a. Promise iff the proposal beats every prior promise.
    pub(crate) fn on_prepare(&mut self, proposal_id: ProposalId) -> PrepareOutcome {
        let dominated = self.highest_promised.is_some_and(|p| p >= proposal_id);
        if dominated {
            return PrepareOutcome::Ignored;
        }
        self.highest_promised = Some(proposal_id);
        PrepareOutcome::Promise {
            last_accepted: self.accepted.clone(),
        }
    }

    /// Proposer: Phase 1b. Tally a promise for our current round.
    ///
    /// Adoption follows the highest `last_accepted_id` reported across all
    /// promises this round; our own value is used only if no acceptor has
    /// accepted anything for this slot.
    pub(crate) fn on_promise(
        &mut self,
        sender: NodeId,
        proposal_id: ProposalId,
        last_accepted: Option<(ProposalId, String)>,
        quorum: usize,
    ) -> PromiseOutcome {
        let Some(round) = &mut self.round else {
            return PromiseOutcome::Ignored;
        };
        if round.proposal_id != proposal_id || round.phase2_started {
            return PromiseOutcome::Ignored;
        }

        round.promises.insert(sender);
        if let Some((id, value)) = last_accepted {
            let better = round.best_accepted.as_ref().is_none_or(|(best, _)| id > *best);
            if better {
                round.best_accepted = Some((id, value));
            }
        }

        if round.promises.len() < quorum {
            return PromiseOutcome::Pending;
        }

        let value = round
            .best_accepted
            .as_ref()
            .map_or_else(|| round.value.clone(), |(_, v)| v.clone());
        if value.is_empty() {
            self.round = None;
            return PromiseOutcome::Aborted;
        }
        round.phase2_started = true;
        PromiseOutcome::StartAccept { value }
    }

    /// Acceptor: Phase 2a. Accept iff no higher proposal has been promised.
    pub(crate) fn on_accept(&mut self, proposal_id: ProposalId, value: &str) -> AcceptOutcome {
        let dominated = self.highest_promised.is_some_and(|p| p > proposal_id);
        if dominated {
            return AcceptOutcome::Ignored;
        }
        self.highest_promised = Some(proposal_id);
        self.accepted = Some((proposal_id, value.to_owned()));
        AcceptOutcome::Accepted
    }

    /// Learner: Phase 2b. Tally an accept; decide at most once.
    pub(crate) fn on_accepted(
        &mut self,
        sender: NodeId,
        proposal_id: ProposalId,
        value: &str,
        quorum: usize,
    ) -> AcceptedOutcome {
        if self.decision.is_some() {
            return AcceptedOutcome::Pending;
        }
        let (voters, chosen) = self
            .accepted_votes
            .entry(proposal_id)
            .or_insert_with(|| (BTreeSet::new(), value.to_owned()));
        voters.insert(sender);
        if voters.len() >= quorum {
            let chosen = chosen.clone();
            self.decision = Some(chosen.clone());
            self.round = None;
            AcceptedOutcome::Decided(chosen)
        } else {
            AcceptedOutcome::Pending
        }
    }

    #[must_use]
    pub fn decided(&self) -> Option<&str> {
        self.decision.as_deref()
    }

    #[must_use]
    pub fn highest_promised(&self) -> Option<ProposalId> {
        self.highest_promised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(ticks: i64) -> ProposalId {
        ProposalId::mint(ticks, NodeId(1))
    }

    #[test]
    fn test_prepare_empty() {
        let mut slot = SlotState::default();
        let outcome = slot.on_prepare(id(1));
        assert_eq!(outcome, PrepareOutcome::Promise { last_accepted: None });
        assert_eq!(slot.highest_promised(), Some(id(1)));
    }

    #[test]
    fn test_prepare_higher_succeeds() {
        let mut slot = SlotState::default();
        slot.on_prepare(id(1));
        let outcome = slot.on_prepare(id(2));
        assert_eq!(outcome, PrepareOutcome::Promise { last_accepted: None });
        assert_eq!(slot.highest_promised(), Some(id(2)));
    }

    #[test]
    fn test_prepare_lower_ignored() {
        let mut slot = SlotState::default();
        slot.on_prepare(id(2));
        assert_eq!(slot.on_prepare(id(1)), PrepareOutcome::Ignored);
        assert_eq!(slot.highest_promised(), Some(id(2)));
    }

    #[test]
    fn test_prepare_reports_accepted_pair() {
        let mut slot = SlotState::default();
        slot.on_prepare(id(1));
        slot.on_accept(id(1), "first");
        let outcome = slot.on_prepare(id(2));
        assert_eq!(
            outcome,
            PrepareOutcome::Promise {
                last_accepted: Some((id(1), "first".to_owned()))
            }
        );
    }

    #[test]
    fn test_accept_dominated_by_promise() {
        let mut slot = SlotState::default();
        slot.on_prepare(id(2));
        assert_eq!(slot.on_accept(id(1), "late"), AcceptOutcome::Ignored);
    }

    #[test]
    fn test_accept_equal_to_promise_succeeds() {
        let mut slot = SlotState::default();
        slot.on_prepare(id(1));
        assert_eq!(slot.on_accept(id(1), "value"), AcceptOutcome::Accepted);
    }

    #[test]
    fn test_promises_counted_per_sender() {
        let mut slot = SlotState::default();
        slot.start_round(id(1), "mine".to_owned());
        // the same peer promising twice is one vote
        assert_eq!(
            slot.on_promise(NodeId(1), id(1), None, 2),
            PromiseOutcome::Pending
        );
        assert_eq!(
            slot.on_promise(NodeId(1), id(1), None, 2),
            PromiseOutcome::Pending
        );
        assert_eq!(
            slot.on_promise(NodeId(2), id(1), None, 2),
            PromiseOutcome::StartAccept {
                value: "mine".to_owned()
            }
        );
    }

    #[test]
    fn test_promise_adopts_highest_accepted() {
        let mut slot = SlotState::default();
        slot.start_round(id(5), "mine".to_owned());
        slot.on_promise(NodeId(1), id(5), Some((id(1), "old".to_owned())), 3);
        slot.on_promise(NodeId(2), id(5), Some((id(3), "newest".to_owned())), 3);
        let outcome = slot.on_promise(NodeId(3), id(5), Some((id(2), "mid".to_owned())), 3);
        assert_eq!(
            outcome,
            PromiseOutcome::StartAccept {
                value: "newest".to_owned()
            }
        );
    }

    #[test]
    fn test_promise_for_stale_round_ignored() {
        let mut slot = SlotState::default();
        slot.start_round(id(2), "mine".to_owned());
        assert_eq!(
            slot.on_promise(NodeId(1), id(1), None, 1),
            PromiseOutcome::Ignored
        );
    }

    #[test]
    fn test_empty_value_aborts_phase2() {
        let mut slot = SlotState::default();
        slot.start_round(id(1), String::new());
        assert_eq!(
            slot.on_promise(NodeId(1), id(1), None, 1),
            PromiseOutcome::Aborted
        );
        // the round is gone; further promises are ignored
        assert_eq!(
            slot.on_promise(NodeId(2), id(1), None, 1),
            PromiseOutcome::Ignored
        );
    }

    #[test]
    fn test_accepted_quorum_decides_once() {
        let mut slot = SlotState::default();
        assert_eq!(
            slot.on_accepted(NodeId(1), id(1), "v", 2),
            AcceptedOutcome::Pending
        );
        assert_eq!(
            slot.on_accepted(NodeId(2), id(1), "v", 2),
            AcceptedOutcome::Decided("v".to_owned())
        );
        // further accepts never re-fire the decision
        assert_eq!(
            slot.on_accepted(NodeId(3), id(1), "v", 2),
            AcceptedOutcome::Pending
        );
        assert_eq!(slot.decided(), Some("v"));
    }

    #[test]
    fn test_duplicate_accepts_do_not_inflate_quorum() {
        let mut slot = SlotState::default();
        for _ in 0..5 {
            assert_eq!(
                slot.on_accepted(NodeId(1), id(1), "v", 2),
                AcceptedOutcome::Pending
            );
        }
        assert_eq!(slot.decided(), None);
    }

    #[test]
    fn test_accepted_tallies_are_per_proposal() {
        let mut slot = SlotState::default();
        assert_eq!(
            slot.on_accepted(NodeId(1), id(1), "a", 2),
            AcceptedOutcome::Pending
        );
        assert_eq!(
            slot.on_accepted(NodeId(2), id(2), "b", 2),
            AcceptedOutcome::Pending
        );
        // mixed proposals never pool into one threshold
        assert_eq!(
            slot.on_accepted(NodeId(3), id(2), "b", 2),
            AcceptedOutcome::Decided("b".to_owned())
        );
    }

    #[test]
    fn test_promises_monotone_under_duplicates() {
        let mut slot = SlotState::default();
        slot.on_prepare(id(3));
        slot.on_prepare(id(3));
        slot.on_prepare(id(1));
        assert_eq!(slot.highest_promised(), Some(id(3)));
    }
}
