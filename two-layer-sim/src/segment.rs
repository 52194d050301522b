//! Message and segment definitions.
//!
//! Every value crossing the channel is a [`Segment`].  This module is
//! responsible for:
//! - Defining the fixed 11-bit segment layout.
//! - Computing and checking the even-parity bit.
//! - The application-level [`Message`] and the [`Port`] identities it carries.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Segment layout
//!
//! Bit positions are counted from the LSB.
//!
//! ```text
//!   10    9     8    7 6 5 4 3 2 1 0
//! +-----+-----+-----+-+-+-+-+-+-+-+-+
//! | par | src | dst |    payload    |
//! +-----+-----+-----+-+-+-+-+-+-+-+-+
//! ```
//!
//! The source and destination bits are *relative to the encoding node*: each
//! transport layer only has to tell its own two local processes apart, so one
//! bit per identity is enough (see [`crate::transport`]).

use std::fmt;

/// Width of the application payload in bits.
pub const PAYLOAD_BITS: usize = 8;
/// Total width of a segment on the channel.
pub const SEGMENT_BITS: usize = 11;

/// Bit index of the destination indicator.
pub const DESTINATION_BIT: usize = 8;
/// Bit index of the source indicator.
pub const SOURCE_BIT: usize = 9;
/// Bit index of the parity bit.
pub const PARITY_BIT: usize = 10;

const PAYLOAD_MASK: u16 = (1 << PAYLOAD_BITS) - 1;
const SEGMENT_MASK: u16 = (1 << SEGMENT_BITS) - 1;

// ---------------------------------------------------------------------------
// Node / Port
// ---------------------------------------------------------------------------

/// One of the two simulated hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    One,
    Two,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::One => f.write_str("node1"),
            Node::Two => f.write_str("node2"),
        }
    }
}

/// Port number identifying one simulated process.
///
/// [`Port::CLOSE`] (0) is reserved: a message addressed to it tells the
/// connection driver to shut the connection down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Port(pub u16);

impl Port {
    /// "No destination": closes the connection.
    pub const CLOSE: Port = Port(0);
    pub const NODE1_PROCESS1: Port = Port(5001);
    pub const NODE1_PROCESS2: Port = Port(5002);
    pub const NODE2_PROCESS1: Port = Port(7001);
    pub const NODE2_PROCESS2: Port = Port(7002);

    /// The node hosting this port, or `None` for the close sentinel and any
    /// identity outside the known four.
    pub fn node(self) -> Option<Node> {
        match self {
            Port::NODE1_PROCESS1 | Port::NODE1_PROCESS2 => Some(Node::One),
            Port::NODE2_PROCESS1 | Port::NODE2_PROCESS2 => Some(Node::Two),
            _ => None,
        }
    }

    pub fn is_close(self) -> bool {
        self == Port::CLOSE
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Payload / Message
// ---------------------------------------------------------------------------

/// The 8-bit application data unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Payload(pub u8);

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

/// What an application layer hands to (and receives from) its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub payload: Payload,
    pub source: Port,
    pub destination: Port,
}

impl Message {
    pub fn new(payload: u8, source: Port, destination: Port) -> Self {
        Self {
            payload: Payload(payload),
            source,
            destination,
        }
    }

    /// `true` when this message asks the driver to close the connection.
    pub fn is_close(&self) -> bool {
        self.destination.is_close()
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// An 11-bit frame: payload, two port-indicator bits and an even-parity bit.
///
/// The upper five bits of the backing `u16` are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Segment(u16);

impl Segment {
    /// Build a segment and set its parity bit.
    ///
    /// The parity bit is set iff the ten content bits hold an odd number of
    /// ones, so a freshly encoded segment always has an even population count.
    pub fn encode(payload: Payload, source_bit: bool, destination_bit: bool) -> Self {
        let mut bits = u16::from(payload.0);
        if destination_bit {
            bits |= 1 << DESTINATION_BIT;
        }
        if source_bit {
            bits |= 1 << SOURCE_BIT;
        }
        if bits.count_ones() % 2 == 1 {
            bits |= 1 << PARITY_BIT;
        }
        Segment(bits)
    }

    /// Reinterpret raw bits as a segment, discarding anything above bit 10.
    pub fn from_bits(bits: u16) -> Self {
        Segment(bits & SEGMENT_MASK)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn payload(self) -> Payload {
        Payload((self.0 & PAYLOAD_MASK) as u8)
    }

    pub fn destination_bit(self) -> bool {
        self.bit(DESTINATION_BIT)
    }

    pub fn source_bit(self) -> bool {
        self.bit(SOURCE_BIT)
    }

    pub fn parity_bit(self) -> bool {
        self.bit(PARITY_BIT)
    }

    /// Even-parity check over all 11 bits.
    pub fn is_intact(self) -> bool {
        self.0.count_ones() % 2 == 0
    }

    /// Return a copy with bit `index` toggled.
    ///
    /// Out-of-range indices leave the segment unchanged.
    pub fn flip(self, index: usize) -> Self {
        if index >= SEGMENT_BITS {
            return self;
        }
        Segment(self.0 ^ (1 << index))
    }

    fn bit(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:011b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDICATORS: [(bool, bool); 4] =
        [(false, false), (false, true), (true, false), (true, true)];

    #[test]
    fn encode_places_fields_at_documented_bits() {
        let seg = Segment::encode(Payload(0b1010_0101), true, false);
        assert_eq!(seg.bits() & 0xff, 0b1010_0101);
        assert!(seg.source_bit());
        assert!(!seg.destination_bit());
        // payload has 4 ones, plus the source bit = 5 → parity set
        assert!(seg.parity_bit());
        assert_eq!(seg.bits(), 0b110_1010_0101);
    }

    #[test]
    fn encode_decode_roundtrip_all_payloads() {
        for p in 0..=u8::MAX {
            for (src, dst) in INDICATORS {
                let seg = Segment::encode(Payload(p), src, dst);
                assert_eq!(seg.payload(), Payload(p));
                assert_eq!(seg.source_bit(), src);
                assert_eq!(seg.destination_bit(), dst);
                assert!(seg.is_intact(), "fresh segment {seg} must pass parity");
            }
        }
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        for p in 0..=u8::MAX {
            for (src, dst) in INDICATORS {
                let seg = Segment::encode(Payload(p), src, dst);
                for i in 0..SEGMENT_BITS {
                    let flipped = seg.flip(i);
                    assert_ne!(flipped, seg);
                    assert_ne!(flipped.is_intact(), seg.is_intact(), "bit {i} of {seg}");
                }
            }
        }
    }

    #[test]
    fn flip_out_of_range_is_a_no_op() {
        let seg = Segment::encode(Payload(7), false, true);
        assert_eq!(seg.flip(SEGMENT_BITS), seg);
        assert_eq!(seg.flip(usize::MAX), seg);
    }

    #[test]
    fn from_bits_masks_to_eleven_bits() {
        let seg = Segment::from_bits(0xffff);
        assert_eq!(seg.bits(), 0x07ff);
        assert!(!seg.is_intact()); // 11 ones
    }

    #[test]
    fn display_is_zero_padded_binary() {
        assert_eq!(Segment::encode(Payload(1), false, false).to_string(), "10000000001");
        assert_eq!(Payload(3).to_string(), "00000011");
    }

    #[test]
    fn port_nodes() {
        assert_eq!(Port::NODE1_PROCESS1.node(), Some(Node::One));
        assert_eq!(Port::NODE1_PROCESS2.node(), Some(Node::One));
        assert_eq!(Port::NODE2_PROCESS1.node(), Some(Node::Two));
        assert_eq!(Port::NODE2_PROCESS2.node(), Some(Node::Two));
        assert_eq!(Port::CLOSE.node(), None);
        assert_eq!(Port(1234).node(), None);
        assert!(Message::new(0, Port::NODE1_PROCESS1, Port::CLOSE).is_close());
    }
}
