//! Error types and structured `error_stack` context types.

use std::fmt;

/// A replicated command failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    UnknownPrefix(String),
    WrongArity(String),
    InvalidNodeId(String),
    InvalidKind(String),
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPrefix(p) => write!(f, "unknown command prefix: {p}"),
            Self::WrongArity(p) => write!(f, "wrong number of fields for {p}"),
            Self::InvalidNodeId(v) => write!(f, "invalid node id: {v}"),
            Self::InvalidKind(v) => write!(f, "invalid vote kind: {v}"),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// A wire frame failed to encode or decode.
#[derive(Debug)]
pub enum WireError {
    /// Not enough bytes for a complete frame.
    Truncated,
    /// Unknown phase discriminant.
    BadPhase(i32),
    /// A length prefix was negative or exceeded the frame cap.
    BadLength(i64),
    /// A length-prefixed string was not valid UTF-8.
    BadUtf8,
    /// The proposal id field was negative.
    BadProposal(i64),
    /// A discovery probe without the expected magic literal.
    BadMagic(String),
    Io(std::io::Error),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("truncated frame"),
            Self::BadPhase(p) => write!(f, "unknown phase discriminant: {p}"),
            Self::BadLength(n) => write!(f, "invalid length prefix: {n}"),
            Self::BadUtf8 => f.write_str("string field is not valid UTF-8"),
            Self::BadProposal(id) => write!(f, "invalid proposal id: {id}"),
            Self::BadMagic(m) => write!(f, "unexpected magic literal: {m}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WireError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Error context: what operation was in progress.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub operation: &'static str,
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "while {}", self.operation)
    }
}

impl OperationContext {
    pub const SIGNALLING_READY: Self = Self {
        operation: "signalling lobby-ready",
    };
    pub const CASTING_VOTE: Self = Self {
        operation: "casting a vote",
    };
    pub const RESETTING_GAME: Self = Self {
        operation: "resetting the game",
    };
    pub const SUBMITTING_COMMAND: Self = Self {
        operation: "submitting a command for consensus",
    };
    pub const VALIDATING_JOIN: Self = Self {
        operation: "validating a join request",
    };
}
