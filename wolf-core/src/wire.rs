//! Fixed-layout little-endian wire codecs.
//!
//! The consensus frame layout, field by field: `phase: i32`, `slot: i32`,
//! `sender: i32`, `proposal_id: i64`, `value` (length-prefixed UTF-8, empty
//! meaning "no value"), `last_accepted_id: i64` (`-1` meaning none),
//! `last_accepted_value` (length-prefixed UTF-8). Length prefixes are
//! `i32` little-endian byte counts.

use bytes::{Buf, BufMut, BytesMut};
use slot_paxos::{Frame, NodeId, PaxosPhase, ProposalId};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;
use crate::handshake::DISCOVERY_MAGIC;

/// Cap on any single length-prefixed string.
const MAX_STRING_LEN: i32 = 64 * 1024;

fn get_i32(buf: &mut impl Buf) -> Result<i32, WireError> {
    if buf.remaining() < 4 {
        return Err(WireError::Truncated);
    }
    Ok(buf.get_i32_le())
}

fn get_i64(buf: &mut impl Buf) -> Result<i64, WireError> {
    if buf.remaining() < 8 {
        return Err(WireError::Truncated);
    }
    Ok(buf.get_i64_le())
}

fn get_string(buf: &mut impl Buf) -> Result<String, WireError> {
    let len = get_i32(buf)?;
    if !(0..=MAX_STRING_LEN).contains(&len) {
        return Err(WireError::BadLength(i64::from(len)));
    }
    let len = usize::try_from(len).map_err(|_| WireError::BadLength(i64::from(len)))?;
    if buf.remaining() < len {
        return Err(WireError::Truncated);
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| WireError::BadUtf8)
}

fn put_string(dst: &mut BytesMut, s: &str) -> Result<(), WireError> {
    let len = i32::try_from(s.len())
        .ok()
        .filter(|len| *len <= MAX_STRING_LEN)
        .ok_or_else(|| WireError::BadLength(i64::try_from(s.len()).unwrap_or(i64::MAX)))?;
    dst.put_i32_le(len);
    dst.put_slice(s.as_bytes());
    Ok(())
}

/// Encode a consensus frame onto `dst`.
///
/// # Errors
///
/// Fails only if a string field exceeds the wire cap.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<(), WireError> {
    dst.put_i32_le(frame.phase.to_wire());
    dst.put_i32_le(frame.slot);
    dst.put_i32_le(frame.sender.0);
    dst.put_i64_le(frame.proposal_id.to_wire());
    put_string(dst, frame.value.as_deref().unwrap_or_default())?;
    let (last_id, last_value) = match &frame.last_accepted {
        Some((id, value)) => (id.to_wire(), value.as_str()),
        None => (-1, ""),
    };
    dst.put_i64_le(last_id);
    put_string(dst, last_value)
}

/// Decode one consensus frame from the front of `buf`.
///
/// # Errors
///
/// [`WireError::Truncated`] if `buf` does not hold a complete frame, other
/// variants if the bytes are corrupt.
pub fn decode_frame(buf: &mut impl Buf) -> Result<Frame, WireError> {
    let raw_phase = get_i32(buf)?;
    let phase = PaxosPhase::from_wire(raw_phase).ok_or(WireError::BadPhase(raw_phase))?;
    let slot = get_i32(buf)?;
    let sender = NodeId(get_i32(buf)?);
    let raw_id = get_i64(buf)?;
    let proposal_id = ProposalId::from_wire(raw_id).ok_or(WireError::BadProposal(raw_id))?;
    let value = get_string(buf)?;
    let raw_last = get_i64(buf)?;
    let last_value = get_string(buf)?;

    let last_accepted = match ProposalId::from_wire(raw_last) {
        Some(id) if !last_value.is_empty() => Some((id, last_value)),
        _ => None,
    };
    Ok(Frame {
        phase,
        slot,
        sender,
        proposal_id,
        value: (!value.is_empty()).then_some(value),
        last_accepted,
    })
}

/// Stream codec for consensus frames. Frames are self-delimiting, so
/// decoding simply retries once more bytes arrive.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, WireError> {
        let mut slice: &[u8] = src.as_ref();
        let before = slice.len();
        match decode_frame(&mut slice) {
            Ok(frame) => {
                let used = before - slice.len();
                src.advance(used);
                Ok(Some(frame))
            }
            Err(WireError::Truncated) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), WireError> {
        encode_frame(&item, dst)
    }
}

/// Lobby metadata sent reliably to each peer on connection, outside the
/// consensus log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    pub node: NodeId,
    pub name: String,
}

impl PlayerInfo {
    /// # Errors
    ///
    /// Fails if the name exceeds the wire cap.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.put_i32_le(self.node.0);
        put_string(dst, &self.name)
    }

    /// # Errors
    ///
    /// See [`decode_frame`].
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        Ok(Self {
            node: NodeId(get_i32(buf)?),
            name: get_string(buf)?,
        })
    }
}

/// The connection handshake: the shared key literal and the joiner's
/// display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub key: String,
    pub name: String,
}

impl Join {
    /// # Errors
    ///
    /// Fails if a field exceeds the wire cap.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        put_string(dst, &self.key)?;
        put_string(dst, &self.name)
    }

    /// # Errors
    ///
    /// See [`decode_frame`].
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        Ok(Self {
            key: get_string(buf)?,
            name: get_string(buf)?,
        })
    }
}

/// Unconnected discovery probe: the magic literal and the originator's
/// listening port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discovery {
    pub port: u16,
}

impl Discovery {
    /// # Errors
    ///
    /// Never fails in practice; the magic literal is short.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        put_string(dst, DISCOVERY_MAGIC)?;
        dst.put_i32_le(i32::from(self.port));
        Ok(())
    }

    /// # Errors
    ///
    /// [`WireError::BadMagic`] if the probe does not start with the
    /// discovery literal.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        let magic = get_string(buf)?;
        if magic != DISCOVERY_MAGIC {
            return Err(WireError::BadMagic(magic));
        }
        let port = get_i32(buf)?;
        let port = u16::try_from(port).map_err(|_| WireError::BadLength(i64::from(port)))?;
        Ok(Self { port })
    }
}
