//! Shared types for the werewolf consensus peers.
//!
//! This crate holds everything both sides of a connection must agree on:
//! the replicated command grammar, the fixed little-endian wire codecs,
//! and the handshake acceptance rules.

#![warn(clippy::pedantic)]

pub mod command;
pub mod error;
pub mod handshake;
pub mod wire;

pub use command::{Command, VoteKind};
pub use error::{CommandParseError, OperationContext, WireError};
pub use handshake::{DISCOVERY_MAGIC, JOIN_KEY, JoinRejection, validate_join};
pub use wire::{Discovery, FrameCodec, Join, PlayerInfo, decode_frame, encode_frame};
