//! Application-layer processes.
//!
//! Four processes take part in the simulation, two per node.  Their
//! behaviour is entirely table-driven by a [`ProcessSpec`]:
//!
//! - **Initiators** (node 1) walk a five-entry request table.  Once the
//!   counter passes the last index the final code repeats.  A reply equal to
//!   the process's `close_on` value ends the connection.
//! - **Responders** (node 2) map each recognized request to a fixed reply
//!   and answer anything else with an "unrecognized" code.  That code is
//!   exactly what the paired initiator treats as its close signal.
//!
//! Any corrupt delivery makes a process close immediately.

use crate::segment::{Message, Node, Payload, Port};
use crate::state::ProcessState;
use crate::transport::Delivery;

/// Number of entries in an initiator's request table.
pub const REQUEST_TABLE_LEN: usize = 5;

/// How a process chooses its next payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator {
        /// Request sent on the n-th call; index 4 repeats forever.
        requests: [u8; REQUEST_TABLE_LEN],
        /// Reply that makes this process close the connection.
        close_on: u8,
    },
    Responder {
        /// `(request, reply)` pairs.
        replies: &'static [(u8, u8)],
        /// Reply to any request missing from `replies`.
        unrecognized: u8,
    },
}

/// Static description of one simulated process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: &'static str,
    pub port: Port,
    /// Destination stamped on every non-closing message.
    pub peer: Port,
    pub role: Role,
}

pub static NODE1_PROCESS1: ProcessSpec = ProcessSpec {
    name: "node1_process1",
    port: Port::NODE1_PROCESS1,
    peer: Port::NODE2_PROCESS2,
    role: Role::Initiator {
        requests: [0b0000_0000, 0b0000_0001, 0b0000_0010, 0b0000_0011, 0b0000_0111],
        close_on: 0b1001_1111,
    },
};

pub static NODE1_PROCESS2: ProcessSpec = ProcessSpec {
    name: "node1_process2",
    port: Port::NODE1_PROCESS2,
    peer: Port::NODE2_PROCESS1,
    role: Role::Initiator {
        requests: [0b1010_1010, 0b1010_1011, 0b1010_1100, 0b1010_1101, 0b1010_1111],
        close_on: 0b1000_1111,
    },
};

pub static NODE2_PROCESS1: ProcessSpec = ProcessSpec {
    name: "node2_process1",
    port: Port::NODE2_PROCESS1,
    peer: Port::NODE1_PROCESS2,
    role: Role::Responder {
        replies: &[
            (0b1010_1010, 0b0100_0000),
            (0b1010_1011, 0b1000_0001),
            (0b1010_1100, 0b1100_0010),
            (0b1010_1101, 0b1110_0011),
        ],
        unrecognized: 0b1000_1111,
    },
};

pub static NODE2_PROCESS2: ProcessSpec = ProcessSpec {
    name: "node2_process2",
    port: Port::NODE2_PROCESS2,
    peer: Port::NODE1_PROCESS1,
    role: Role::Responder {
        replies: &[
            (0b0000_0000, 0b1001_1000),
            (0b0000_0001, 0b1010_1000),
            (0b0000_0010, 0b1011_1000),
            (0b0000_0011, 0b1111_1000),
        ],
        unrecognized: 0b1001_1111,
    },
};

/// All four processes, node 1 first.
pub static PROCESSES: [&ProcessSpec; 4] =
    [&NODE1_PROCESS1, &NODE1_PROCESS2, &NODE2_PROCESS1, &NODE2_PROCESS2];

impl ProcessSpec {
    /// Find the process listening on `port`.
    pub fn lookup(port: Port) -> Option<&'static ProcessSpec> {
        PROCESSES.iter().copied().find(|spec| spec.port == port)
    }

    /// Node hosting this process.  The four static specs always have one.
    pub fn node(&self) -> Option<Node> {
        self.port.node()
    }

    /// Reply a responder gives to `request`.  Initiators have no table and
    /// return `None`.
    pub fn reply_to(&self, request: u8) -> Option<u8> {
        match self.role {
            Role::Responder {
                replies,
                unrecognized,
            } => Some(lookup_reply(replies, unrecognized, request)),
            Role::Initiator { .. } => None,
        }
    }
}

fn lookup_reply(replies: &[(u8, u8)], unrecognized: u8, request: u8) -> u8 {
    replies
        .iter()
        .find(|(req, _)| *req == request)
        .map_or(unrecognized, |(_, reply)| *reply)
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// A running instance of a [`ProcessSpec`].
///
/// State lives for one connection; a new connection gets a new `Process`.
#[derive(Debug, Clone)]
pub struct Process {
    spec: &'static ProcessSpec,
    state: ProcessState,
    /// Payload of the most recent outgoing message.
    last_sent: Payload,
}

impl Process {
    pub fn new(spec: &'static ProcessSpec) -> Self {
        Self {
            spec,
            state: ProcessState::default(),
            last_sent: Payload::default(),
        }
    }

    pub fn spec(&self) -> &'static ProcessSpec {
        self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn port(&self) -> Port {
        self.spec.port
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// React to one delivery and produce the next outgoing message.
    ///
    /// Returns a close message (destination [`Port::CLOSE`]) when the
    /// delivery is corrupt, when the close condition is met, or when the
    /// process is already closed.
    pub fn step(&mut self, incoming: &Delivery) -> Message {
        let exchanges = match self.state {
            ProcessState::Active { exchanges } => exchanges,
            ProcessState::Closed => return self.close(),
        };

        if !incoming.intact {
            log::debug!("{}: corrupt delivery, closing", self.spec.name);
            return self.close();
        }

        let received = incoming.message.payload.0;
        let next = match self.spec.role {
            Role::Initiator { requests, close_on } => {
                if received == close_on {
                    return self.close();
                }
                requests[exchanges.min(REQUEST_TABLE_LEN - 1)]
            }
            Role::Responder {
                replies,
                unrecognized,
            } => lookup_reply(replies, unrecognized, received),
        };

        self.state = ProcessState::Active {
            exchanges: exchanges + 1,
        };
        self.last_sent = Payload(next);
        Message::new(next, self.spec.port, self.spec.peer)
    }

    fn close(&mut self) -> Message {
        self.state = ProcessState::Closed;
        Message {
            payload: self.last_sent,
            source: self.spec.port,
            destination: Port::CLOSE,
        }
    }
}
