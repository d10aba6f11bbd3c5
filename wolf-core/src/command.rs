//! The command grammar of the replicated log.
//!
//! Commands are colon-delimited case-sensitive ASCII. Malformed text is a
//! parse error for the caller to log and drop; it never aborts the state
//! machine.

use std::fmt;
use std::str::FromStr;

use slot_paxos::NodeId;

use crate::error::CommandParseError;

/// Which elimination round a ballot belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoteKind {
    WolfKill,
    VillagerLynch,
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WolfKill => f.write_str("WolfKill"),
            Self::VillagerLynch => f.write_str("VillagerLynch"),
        }
    }
}

impl FromStr for VoteKind {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WolfKill" => Ok(Self::WolfKill),
            "VillagerLynch" => Ok(Self::VillagerLynch),
            other => Err(CommandParseError::InvalidKind(other.to_owned())),
        }
    }
}

/// A replicated command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// `VOTE_START:<id>`: node signals lobby-ready.
    VoteStart(NodeId),
    /// `START_GAME`: freeze membership and assign roles.
    StartGame,
    /// `VOTE:<voter>:<target>:<kind>`: ballot in the active session.
    Vote {
        voter: NodeId,
        target: NodeId,
        kind: VoteKind,
    },
    /// `RESET_GAME`: return every peer to the lobby.
    ResetGame,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VoteStart(id) => write!(f, "VOTE_START:{id}"),
            Self::StartGame => f.write_str("START_GAME"),
            Self::Vote {
                voter,
                target,
                kind,
            } => write!(f, "VOTE:{voter}:{target}:{kind}"),
            Self::ResetGame => f.write_str("RESET_GAME"),
        }
    }
}

fn parse_node_id(field: &str) -> Result<NodeId, CommandParseError> {
    field
        .parse::<i32>()
        .map(NodeId)
        .map_err(|_| CommandParseError::InvalidNodeId(field.to_owned()))
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let prefix = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match (prefix, rest.as_slice()) {
            ("VOTE_START", [id]) => Ok(Self::VoteStart(parse_node_id(id)?)),
            ("START_GAME", []) => Ok(Self::StartGame),
            ("VOTE", [voter, target, kind]) => Ok(Self::Vote {
                voter: parse_node_id(voter)?,
                target: parse_node_id(target)?,
                kind: kind.parse()?,
            }),
            ("RESET_GAME", []) => Ok(Self::ResetGame),
            ("VOTE_START" | "START_GAME" | "VOTE" | "RESET_GAME", _) => {
                Err(CommandParseError::WrongArity(prefix.to_owned()))
            }
            _ => Err(CommandParseError::UnknownPrefix(prefix.to_owned())),
        }
    }
}
