//! Drive two nodes through the tokio runner with channel-routed frames.

use std::time::Duration;

use slot_paxos::NodeId;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wolf_core::PlayerInfo;
use wolf_node::{GameEvent, NodeInput, Phase, WolfNode, run_node};

/// Initialize tracing for tests. Call at the start of each test.
/// Uses RUST_LOG env var for filtering (defaults to "debug" for these crates).
fn init_tracing() -> impl Sized {
    use tracing::Dispatch;
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slot_paxos=debug,wolf_node=debug")),
        )
        .with_test_writer()
        .finish();

    let dispatch = Dispatch::new(subscriber);
    tracing::dispatcher::set_default(&dispatch)
}

async fn next_night(mut events: mpsc::UnboundedReceiver<GameEvent>) {
    loop {
        match events.recv().await {
            Some(GameEvent::PhaseChanged(Phase::Night)) => return,
            Some(_) => {}
            None => panic!("event channel closed before the game started"),
        }
    }
}

#[tokio::test]
async fn test_two_runner_nodes_reach_night() {
    let _guard = init_tracing();

    let (a_in_tx, a_in_rx) = mpsc::unbounded_channel();
    let (b_in_tx, b_in_rx) = mpsc::unbounded_channel();
    let (a_frames_tx, mut a_frames_rx) = mpsc::unbounded_channel();
    let (b_frames_tx, mut b_frames_rx) = mpsc::unbounded_channel();
    let (a_events_tx, a_events_rx) = mpsc::unbounded_channel();
    let (b_events_tx, b_events_rx) = mpsc::unbounded_channel();

    let a_task = tokio::spawn(run_node(
        WolfNode::with_id(NodeId(1), "alpha"),
        a_in_rx,
        a_frames_tx,
        a_events_tx,
    ));
    let b_task = tokio::spawn(run_node(
        WolfNode::with_id(NodeId(2), "beta"),
        b_in_rx,
        b_frames_tx,
        b_events_tx,
    ));

    // route each node's outbound frames into the other's input
    let to_b = b_in_tx.clone();
    let route_ab = tokio::spawn(async move {
        while let Some(frame) = a_frames_rx.recv().await {
            if to_b.send(NodeInput::Frame(frame)).is_err() {
                break;
            }
        }
    });
    let to_a = a_in_tx.clone();
    let route_ba = tokio::spawn(async move {
        while let Some(frame) = b_frames_rx.recv().await {
            if to_a.send(NodeInput::Frame(frame)).is_err() {
                break;
            }
        }
    });

    a_in_tx
        .send(NodeInput::PeerConnected(PlayerInfo {
            node: NodeId(2),
            name: "beta".to_owned(),
        }))
        .unwrap();
    b_in_tx
        .send(NodeInput::PeerConnected(PlayerInfo {
            node: NodeId(1),
            name: "alpha".to_owned(),
        }))
        .unwrap();
    a_in_tx.send(NodeInput::Ready).unwrap();
    b_in_tx.send(NodeInput::Ready).unwrap();

    timeout(Duration::from_secs(5), next_night(a_events_rx))
        .await
        .expect("node a should reach night");
    timeout(Duration::from_secs(5), next_night(b_events_rx))
        .await
        .expect("node b should reach night");

    route_ab.abort();
    route_ba.abort();
    drop(a_in_tx);
    drop(b_in_tx);

    let a = a_task.await.unwrap();
    let b = b_task.await.unwrap();
    assert_eq!(a.game().phase(), Phase::Night);
    assert_eq!(a.game(), b.game());
    assert_eq!(a.log(), b.log());
    assert_eq!(a.log()[&3], "START_GAME");
}
