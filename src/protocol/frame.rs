//! Frame header layout, the receive-side plausibility check, and encode.

use core::fmt;
use core::str::FromStr;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use super::command::Command;
use super::fields::decode_rssi;
use crate::error::{CommandError, FrameError, PayloadError};

/// Bytes from the length byte up to and including the group byte.
pub const HEADER_LEN: usize = 11;

/// Largest payload the gateway builds or accepts (a week-profile day of 13
/// breakpoints plus its weekday byte).
pub const MAX_PAYLOAD: usize = 27;

/// Largest logical frame.
pub const MAX_FRAME: usize = HEADER_LEN + MAX_PAYLOAD;

/// Largest raw frame as delivered by the transceiver (RSSI + LQI appended).
pub const MAX_RAW: usize = MAX_FRAME + 2;

/// Set in `flags` when a frame is addressed to a group.
pub const FLAG_GROUP: u8 = 0x04;

pub type Payload = Vec<u8, MAX_PAYLOAD>;
pub type EncodedFrame = Vec<u8, MAX_FRAME>;

// ═══════════════════════════════════════════════════════════════
//  Address
// ═══════════════════════════════════════════════════════════════

/// Three-byte hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 3]);

impl Address {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    pub const fn bytes(self) -> [u8; 3] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for Address {
    type Err = CommandError;

    /// Exactly six hex digits, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 6 || !s.is_ascii() {
            return Err(CommandError::InvalidAddress);
        }
        let mut out = [0u8; 3];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| CommandError::InvalidAddress)?;
        }
        Ok(Self(out))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Frame
// ═══════════════════════════════════════════════════════════════

/// A logical frame: header fields plus the command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_counter: u8,
    pub flags: u8,
    pub command: Command,
    pub src: Address,
    pub dst: Address,
    pub group: u8,
    pub payload: Payload,
}

impl Frame {
    /// Frame with no flags, group 0 and an empty payload.
    pub fn new(msg_counter: u8, command: Command, src: Address, dst: Address) -> Self {
        Self {
            msg_counter,
            flags: 0,
            command,
            src,
            dst,
            group: 0,
            payload: Payload::new(),
        }
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Result<Self, FrameError> {
        self.payload = Payload::from_slice(payload).map_err(|()| FrameError::TooLong {
            payload: payload.len(),
        })?;
        Ok(self)
    }

    pub fn is_group(&self) -> bool {
        self.flags & FLAG_GROUP != 0
    }

    /// Value of the leading length byte.
    pub fn length_byte(&self) -> u8 {
        (HEADER_LEN - 1 + self.payload.len()) as u8
    }

    /// Number of bytes put on air.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serialise header and payload.
    pub fn encode(&self) -> EncodedFrame {
        let mut out = EncodedFrame::new();
        let [s0, s1, s2] = self.src.0;
        let [d0, d1, d2] = self.dst.0;
        let header = [
            self.length_byte(),
            self.msg_counter,
            self.flags,
            self.command.code(),
            s0,
            s1,
            s2,
            d0,
            d1,
            d2,
            self.group,
        ];
        // Capacity is HEADER_LEN + MAX_PAYLOAD, so neither extend can fail.
        let _ = out.extend_from_slice(&header);
        let _ = out.extend_from_slice(&self.payload);
        out
    }

    /// Read header fields and payload from `bytes`.
    ///
    /// Never fails: positions past the end read as zero and the payload is
    /// clipped to what was received.  Use [`accept`] on raw radio input.
    pub fn decode(bytes: &[u8]) -> Self {
        let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
        let declared_end = usize::from(at(0)) + 1;
        let end = declared_end.min(bytes.len()).min(MAX_FRAME);
        let payload = if end > HEADER_LEN {
            Payload::from_slice(&bytes[HEADER_LEN..end]).unwrap_or_default()
        } else {
            Payload::new()
        };
        Self {
            msg_counter: at(1),
            flags: at(2),
            command: Command::from_code(at(3)),
            src: Address([at(4), at(5), at(6)]),
            dst: Address([at(7), at(8), at(9)]),
            group: at(10),
            payload,
        }
    }

    /// Payload checked to hold at least `needed` bytes.
    pub fn payload_at_least(&self, needed: usize) -> Result<&[u8], PayloadError> {
        if self.payload.len() < needed {
            return Err(PayloadError::TooShort {
                command: self.command,
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(&self.payload)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {} -> {} (group {}, {} payload bytes)",
            self.command,
            self.msg_counter,
            self.src,
            self.dst,
            self.group,
            self.payload.len()
        )
    }
}

// ═══════════════════════════════════════════════════════════════
//  Receive path
// ═══════════════════════════════════════════════════════════════

/// A frame that passed the length check, with its signal quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame: Frame,
    pub rssi_dbm: i16,
    pub link_quality: u8,
}

/// Validate raw transceiver output and decode it.
///
/// The only check is that the length byte equals the received byte count
/// minus the length byte and the two trailing quality bytes.  Real
/// integrity checking is left to the transceiver.
pub fn accept(raw: &[u8]) -> Result<ReceivedFrame, FrameError> {
    if raw.len() < HEADER_LEN + 2 {
        return Err(FrameError::TooShort {
            received: raw.len(),
        });
    }
    let declared = raw[0];
    if usize::from(declared) != raw.len() - 3 {
        return Err(FrameError::LengthMismatch {
            declared,
            received: raw.len(),
        });
    }
    let payload = raw.len() - HEADER_LEN - 2;
    if payload > MAX_PAYLOAD {
        return Err(FrameError::TooLong { payload });
    }
    Ok(ReceivedFrame {
        frame: Frame::decode(&raw[..raw.len() - 2]),
        rssi_dbm: decode_rssi(raw[raw.len() - 2]),
        link_quality: raw[raw.len() - 1],
    })
}
