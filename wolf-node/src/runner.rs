//! Tokio runner: drives a node from an input channel.
//!
//! The consensus core is synchronous; this loop is the async edge. It polls
//! one input at a time, lets the node process it to completion, then
//! forwards outbound frames and game events. Transport integrations feed
//! [`NodeInput`] values and ship the forwarded frames however they like.

use slot_paxos::{Frame, NodeId};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use wolf_core::PlayerInfo;

use crate::game::GameEvent;
use crate::node::WolfNode;

/// Everything that can happen to a running node.
#[derive(Clone, Debug)]
pub enum NodeInput {
    /// A consensus frame arrived from a peer.
    Frame(Frame),
    /// A validated peer connected.
    PeerConnected(PlayerInfo),
    PeerDisconnected(NodeId),
    /// Local intent: signal lobby-ready.
    Ready,
    /// Local intent: cast a ballot.
    Vote(NodeId),
    /// Local intent: ask everyone back to the lobby.
    Reset,
}

/// Run a node until its input channel closes, then hand it back.
///
/// Rejected local intents are logged, not fatal. Outbound frames and game
/// events are forwarded on the given senders; a closed event channel is
/// tolerated, a closed frame channel ends the loop (the transport is gone).
#[instrument(skip_all, fields(node = %node.id()))]
pub async fn run_node(
    mut node: WolfNode,
    mut inputs: mpsc::UnboundedReceiver<NodeInput>,
    frames: mpsc::UnboundedSender<Frame>,
    events: mpsc::UnboundedSender<GameEvent>,
) -> WolfNode {
    debug!("node started");
    while let Some(input) = inputs.recv().await {
        match input {
            NodeInput::Frame(frame) => node.handle_frame(frame),
            NodeInput::PeerConnected(info) => node.peer_connected(info),
            NodeInput::PeerDisconnected(id) => node.peer_disconnected(id),
            NodeInput::Ready => {
                if let Err(report) = node.ready() {
                    warn!(%report, "ready rejected");
                }
            }
            NodeInput::Vote(target) => {
                if let Err(report) = node.vote(target) {
                    warn!(%report, "vote rejected");
                }
            }
            NodeInput::Reset => {
                if let Err(report) = node.reset() {
                    warn!(%report, "reset rejected");
                }
            }
        }

        let outbound: Vec<Frame> = node.outbound().collect();
        for frame in outbound {
            if frames.send(frame).is_err() {
                debug!("frame channel closed, stopping");
                return node;
            }
        }
        for event in node.take_events() {
            // the embedder may not care about events
            let _ = events.send(event);
        }
    }
    debug!("input channel closed, node stopping");
    node
}
