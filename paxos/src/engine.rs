//! Multi-slot engine: lazy per-slot instances, membership view, and
//! loopback self-delivery.
//!
//! The engine does no I/O. Its host supplies the two capabilities it needs:
//! delivering a frame to every connected peer and observing decisions.
//! Every outbound frame is handled by this node first, before the host sees
//! it, so a lone node satisfies quorum with itself and the acceptor and
//! proposer code paths stay symmetric.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, trace, warn};

use crate::messages::{Frame, PaxosPhase};
use crate::proposal::{NodeId, ProposalId, Slot, TickSource};
use crate::slot::{AcceptOutcome, AcceptedOutcome, PrepareOutcome, PromiseOutcome, SlotState};

/// Capabilities the engine requires from its host.
pub trait Host {
    /// Deliver a frame to every currently connected peer, best effort.
    fn broadcast(&mut self, frame: Frame);

    /// A slot reached consensus. Fired at most once per slot.
    fn decided(&mut self, slot: Slot, value: String);
}

/// Buffering [`Host`]: queues effects for the caller to drain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mailbox {
    pub outbound: VecDeque<Frame>,
    pub decisions: VecDeque<(Slot, String)>,
}

impl Host for Mailbox {
    fn broadcast(&mut self, frame: Frame) {
        self.outbound.push_back(frame);
    }

    fn decided(&mut self, slot: Slot, value: String) {
        self.decisions.push_back((slot, value));
    }
}

/// Slot-indexed Paxos engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Engine<C, H> {
    node: NodeId,
    clock: C,
    peers: BTreeSet<NodeId>,
    slots: BTreeMap<Slot, SlotState>,
    host: H,
}

impl<C: TickSource, H: Host> Engine<C, H> {
    pub fn new(node: NodeId, clock: C, host: H) -> Self {
        Self {
            node,
            clock,
            peers: BTreeSet::new(),
            slots: BTreeMap::new(),
            host,
        }
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn peer_joined(&mut self, peer: NodeId) {
        if peer != self.node {
            self.peers.insert(peer);
        }
    }

    pub fn peer_left(&mut self, peer: NodeId) {
        self.peers.remove(&peer);
    }

    /// Majority of the current peer set including self, computed fresh at
    /// every tally.
    #[must_use]
    pub fn quorum(&self) -> usize {
        (self.peers.len() + 1) / 2 + 1
    }

    #[must_use]
    pub fn decided_value(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).and_then(SlotState::decided)
    }

    /// Start (or restart) Phase 1 for `slot` with a freshly minted proposal
    /// number. A no-op if the slot is already decided: a decision is
    /// immutable for the life of the process.
    pub fn propose(&mut self, slot: Slot, value: String) {
        if self.decided_value(slot).is_some() {
            debug!(slot, "slot already decided, ignoring propose");
            return;
        }
        let proposal_id = ProposalId::mint(self.clock.next_ticks(), self.node);
        debug!(slot, %proposal_id, "starting proposal round");
        self.slots
            .entry(slot)
            .or_default()
            .start_round(proposal_id, value);
        self.transmit(Frame::prepare(slot, self.node, proposal_id));
    }

    /// Ingress for frames received from remote peers.
    pub fn handle_frame(&mut self, frame: Frame) {
        let mut pending = VecDeque::new();
        self.dispatch(frame, &mut pending);
        self.drain(pending);
    }

    /// Broadcast a frame, delivering it to this node's own handler first.
    fn transmit(&mut self, frame: Frame) {
        self.drain(VecDeque::from([frame]));
    }

    fn drain(&mut self, mut pending: VecDeque<Frame>) {
        while let Some(frame) = pending.pop_front() {
            self.dispatch(frame.clone(), &mut pending);
            self.host.broadcast(frame);
        }
    }

    /// Process one frame against the slot it names. Follow-up frames this
    /// node wants to send go onto `out`.
    fn dispatch(&mut self, frame: Frame, out: &mut VecDeque<Frame>) {
        let quorum = self.quorum();
        let node = self.node;
        let slot = self.slots.entry(frame.slot).or_default();

        match frame.phase {
            PaxosPhase::Prepare => match slot.on_prepare(frame.proposal_id) {
                PrepareOutcome::Promise { last_accepted } => {
                    trace!(slot = frame.slot, id = %frame.proposal_id, "promising");
                    out.push_back(Frame::promise(
                        frame.slot,
                        node,
                        frame.proposal_id,
                        last_accepted,
                    ));
                }
                PrepareOutcome::Ignored => {
                    trace!(slot = frame.slot, id = %frame.proposal_id, "ignoring stale prepare");
                }
            },
            PaxosPhase::Promise => {
                match slot.on_promise(frame.sender, frame.proposal_id, frame.last_accepted, quorum)
                {
                    PromiseOutcome::StartAccept { value } => {
                        debug!(slot = frame.slot, quorum, "promise quorum, sending accepts");
                        out.push_back(Frame::accept(frame.slot, node, frame.proposal_id, value));
                    }
                    PromiseOutcome::Aborted => {
                        debug!(slot = frame.slot, "no value to propose, aborting round");
                    }
                    PromiseOutcome::Pending | PromiseOutcome::Ignored => {}
                }
            }
            PaxosPhase::Accept => {
                let Some(value) = frame.value else {
                    warn!(slot = frame.slot, "accept frame without value, dropping");
                    return;
                };
                match slot.on_accept(frame.proposal_id, &value) {
                    AcceptOutcome::Accepted => {
                        trace!(slot = frame.slot, id = %frame.proposal_id, "accepted");
                        out.push_back(Frame::accepted(frame.slot, node, frame.proposal_id, value));
                    }
                    AcceptOutcome::Ignored => {
                        trace!(slot = frame.slot, "ignoring outdated accept");
                    }
                }
            }
            PaxosPhase::Accepted => {
                let Some(value) = frame.value else {
                    warn!(slot = frame.slot, "accepted frame without value, dropping");
                    return;
                };
                match slot.on_accepted(frame.sender, frame.proposal_id, &value, quorum) {
                    AcceptedOutcome::Decided(chosen) => {
                        debug!(slot = frame.slot, quorum, "consensus reached");
                        self.host.decided(frame.slot, chosen);
                    }
                    AcceptedOutcome::Pending => {}
                }
            }
        }
    }
}
