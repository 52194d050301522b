//! Per-node transport layer.
//!
//! A [`TransportLayer`] turns a [`Message`] into a [`Segment`] for the
//! channel and back again.  Port identities do not fit in a segment, so each
//! node compresses them to one indicator bit each:
//!
//! | node  | source bit 0/1 | destination bit 0/1 |
//! |-------|----------------|---------------------|
//! | node1 | 5001 / 5002    | 7001 / 7002         |
//! | node2 | 7001 / 7002    | 5001 / 5002         |
//!
//! Decoding applies the inverse table: the source bit names one of the
//! *remote* processes, the destination bit one of the *local* ones.
//!
//! Neither direction can fail.  Corruption is reported through
//! [`Delivery::intact`], never as an error.

use crate::segment::{Message, Node, Port, Segment};

/// A decoded message plus the outcome of the parity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub message: Message,
    pub intact: bool,
}

impl Delivery {
    pub fn intact(message: Message) -> Self {
        Self {
            message,
            intact: true,
        }
    }
}

/// Transport layer of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLayer {
    node: Node,
    /// Processes hosted on this node, indexed by indicator bit.
    local: [Port; 2],
    /// Processes hosted on the peer node, indexed by indicator bit.
    remote: [Port; 2],
}

impl TransportLayer {
    pub const fn node1() -> Self {
        Self {
            node: Node::One,
            local: [Port::NODE1_PROCESS1, Port::NODE1_PROCESS2],
            remote: [Port::NODE2_PROCESS1, Port::NODE2_PROCESS2],
        }
    }

    pub const fn node2() -> Self {
        Self {
            node: Node::Two,
            local: [Port::NODE2_PROCESS1, Port::NODE2_PROCESS2],
            remote: [Port::NODE1_PROCESS1, Port::NODE1_PROCESS2],
        }
    }

    pub fn for_node(node: Node) -> Self {
        match node {
            Node::One => Self::node1(),
            Node::Two => Self::node2(),
        }
    }

    pub fn node(&self) -> Node {
        self.node
    }

    /// Encode an outgoing message from one of this node's processes.
    ///
    /// An identity outside the known pair maps to indicator bit 0.
    pub fn to_channel(&self, message: &Message) -> Segment {
        let source_bit = indicator(&self.local, message.source, self.node, "source");
        let destination_bit =
            indicator(&self.remote, message.destination, self.node, "destination");
        Segment::encode(message.payload, source_bit, destination_bit)
    }

    /// Decode a segment arriving from the channel.
    pub fn from_channel(&self, segment: Segment) -> Delivery {
        let message = Message {
            payload: segment.payload(),
            source: self.remote[usize::from(segment.source_bit())],
            destination: self.local[usize::from(segment.destination_bit())],
        };
        let intact = segment.is_intact();
        if !intact {
            log::debug!("{}_transport: parity check failed for {segment}", self.node);
        }
        Delivery { message, intact }
    }
}

fn indicator(known: &[Port; 2], port: Port, node: Node, field: &str) -> bool {
    match known.iter().position(|&p| p == port) {
        Some(i) => i == 1,
        None => {
            log::warn!(
                "{node}_transport: unrecognized {field} port {port}, defaulting to {}",
                known[0]
            );
            false
        }
    }
}
