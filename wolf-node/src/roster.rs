//! Peer roster: connected players and their display names.

use std::collections::BTreeMap;

use slot_paxos::NodeId;
use wolf_core::{JoinRejection, PlayerInfo, validate_join};

/// Who this node can currently see, plus itself.
#[derive(Clone, Debug)]
pub struct Roster {
    me: NodeId,
    my_name: String,
    peers: BTreeMap<NodeId, String>,
}

impl Roster {
    #[must_use]
    pub fn new(me: NodeId, my_name: String) -> Self {
        Self {
            me,
            my_name,
            peers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn me(&self) -> NodeId {
        self.me
    }

    #[must_use]
    pub fn my_name(&self) -> &str {
        &self.my_name
    }

    #[must_use]
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        if id == self.me {
            Some(&self.my_name)
        } else {
            self.peers.get(&id).map(String::as_str)
        }
    }

    pub fn insert(&mut self, info: PlayerInfo) {
        if info.node != self.me {
            self.peers.insert(info.node, info.name);
        }
    }

    pub fn remove(&mut self, id: NodeId) {
        self.peers.remove(&id);
    }

    pub fn peer_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.peers.keys().copied()
    }

    /// Apply the join acceptance rules against this roster.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`JoinRejection`].
    pub fn validate_join(
        &self,
        key: &str,
        name: &str,
        in_lobby: bool,
    ) -> Result<(), JoinRejection> {
        validate_join(
            key,
            name,
            &self.my_name,
            self.peers.values().map(String::as_str),
            in_lobby,
        )
    }
}
