//! Stateright model checker tests for the slot engine.
//!
//! Every actor is a full peer (proposer + acceptor + learner) running the
//! production [`Engine`] with a deterministic clock. The checker explores
//! message interleavings and asserts the core safety properties: any two
//! peers that decide a slot decide the same value, at most once, and never
//! the empty value.

use std::borrow::Cow;
use std::sync::Arc;

use slot_paxos::{Engine, Frame, LogicalClock, Mailbox, NodeId};
use stateright::actor::{Actor, ActorModel, Id, Network, Out};
use stateright::{Checker, Model};

const SLOT: i32 = 1;

type PeerState = Engine<LogicalClock, Mailbox>;

/// One peer of the group. `proposes` is the value it drives into the slot
/// at startup, if any.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct Peer {
    peers: Vec<Id>,
    proposes: Option<String>,
}

fn node_id(id: Id) -> NodeId {
    NodeId(i32::try_from(usize::from(id)).expect("small actor index"))
}

impl Peer {
    fn flush(&self, engine: &mut PeerState, o: &mut Out<Self>) {
        let frames: Vec<Frame> = engine.host_mut().outbound.drain(..).collect();
        for frame in frames {
            for peer in &self.peers {
                o.send(*peer, frame.clone());
            }
        }
    }
}

impl Actor for Peer {
    type Msg = Frame;
    type State = PeerState;
    type Timer = ();
    type Storage = ();
    type Random = ();

    fn on_start(
        &self,
        id: Id,
        _storage: &Option<Self::Storage>,
        o: &mut Out<Self>,
    ) -> Self::State {
        let mut engine = Engine::new(node_id(id), LogicalClock::default(), Mailbox::default());
        for peer in &self.peers {
            engine.peer_joined(node_id(*peer));
        }
        if let Some(value) = &self.proposes {
            engine.propose(SLOT, value.clone());
        }
        self.flush(&mut engine, o);
        engine
    }

    fn on_msg(
        &self,
        _id: Id,
        state: &mut Cow<Self::State>,
        _src: Id,
        msg: Self::Msg,
        o: &mut Out<Self>,
    ) {
        let engine = state.to_mut();
        engine.handle_frame(msg);
        self.flush(engine, o);
    }
}

/// Build a fully connected group of `n` peers; the first `values.len()`
/// peers each propose one value for the single contested slot.
fn peer_model(n: usize, values: &[&str]) -> ActorModel<Peer, (), ()> {
    let ids: Vec<Id> = (0..n).map(Id::from).collect();

    let mut model = ActorModel::new((), ()).init_network(Network::new_ordered([]));
    for i in 0..n {
        let peers: Vec<Id> = ids.iter().copied().filter(|id| *id != ids[i]).collect();
        model = model.actor(Peer {
            peers,
            proposes: values.get(i).map(|v| (*v).to_owned()),
        });
    }

    model
        .property(stateright::Expectation::Always, "agreement", |_, state| {
            let decided: Vec<&str> = state
                .actor_states
                .iter()
                .filter_map(|s: &Arc<PeerState>| s.decided_value(SLOT))
                .collect();
            decided.windows(2).all(|pair| pair[0] == pair[1])
        })
        .property(stateright::Expectation::Always, "decide once", |_, state| {
            state
                .actor_states
                .iter()
                .all(|s: &Arc<PeerState>| s.host().decisions.len() <= 1)
        })
        .property(
            stateright::Expectation::Always,
            "no empty decision",
            |_, state| {
                state
                    .actor_states
                    .iter()
                    .all(|s: &Arc<PeerState>| s.decided_value(SLOT) != Some(""))
            },
        )
}

#[test]
fn check_single_proposer() {
    let model = peer_model(3, &["alpha"]);
    let checker = model.checker().threads(num_cpus::get()).spawn_bfs().join();
    checker.assert_properties();
    println!(
        "single proposer: {} states explored",
        checker.unique_state_count()
    );
}

#[test]
fn check_duelling_proposers() {
    let model = peer_model(3, &["alpha", "beta"]);
    let checker = model.checker().threads(num_cpus::get()).spawn_bfs().join();
    checker.assert_properties();
    println!(
        "duelling proposers: {} states explored",
        checker.unique_state_count()
    );
}

#[test]
fn check_two_peer_group() {
    let model = peer_model(2, &["alpha", "beta"]);
    let checker = model.checker().threads(num_cpus::get()).spawn_bfs().join();
    checker.assert_properties();
    println!(
        "two peers: {} states explored",
        checker.unique_state_count()
    );
}
