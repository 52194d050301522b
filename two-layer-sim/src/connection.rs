//! Per-connection protocol driver.
//!
//! A [`Connection`] owns everything one logical request/reply session
//! needs:
//! - the two application [`Process`]es (initiator on node 1, responder on
//!   node 2),
//! - both nodes' [`TransportLayer`]s,
//! - a private [`Channel`] with its own RNG,
//! - a [`Pacer`] watching the shutdown signal.
//!
//! One loop iteration is one round trip:
//!
//! ```text
//!  local app ─▶ local transport ─▶ channel ─▶ peer transport ─▶ peer app
//!      ▲                                                          │
//!      └──── local transport ◀── channel ◀── peer transport ◀─────┘
//! ```
//!
//! The loop ends as soon as either application emits a close message, or
//! when shutdown is requested.  Nothing bounds the number of iterations:
//! termination rests on every process table eventually reaching its close
//! condition.

use thiserror::Error;
use tokio::sync::watch;

use crate::application::{
    Process, ProcessSpec, NODE1_PROCESS1, NODE1_PROCESS2, NODE2_PROCESS1, NODE2_PROCESS2,
};
use crate::channel::Channel;
use crate::config::SimConfig;
use crate::delay::{LayerDelays, Pacer};
use crate::segment::{Message, Node, Payload, Port, Segment};
use crate::transcript::{Layer, Transcript};
use crate::transport::{Delivery, TransportLayer};

/// A named pairing of one node-1 process with one node-2 process.
#[derive(Debug, Clone, Copy)]
pub struct Pairing {
    pub label: &'static str,
    pub local: &'static ProcessSpec,
    pub peer: &'static ProcessSpec,
}

/// 5001 ↔ 7002.
pub const CONNECTION1: Pairing = Pairing {
    label: "connection1",
    local: &NODE1_PROCESS1,
    peer: &NODE2_PROCESS2,
};

/// 5002 ↔ 7001.
pub const CONNECTION2: Pairing = Pairing {
    label: "connection2",
    local: &NODE1_PROCESS2,
    peer: &NODE2_PROCESS1,
};

/// The two connections run by default.
pub const DEFAULT_PAIRINGS: [Pairing; 2] = [CONNECTION1, CONNECTION2];

/// Which end of the connection emitted the close message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Peer,
}

/// How a connection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Closed {
        by: Side,
        /// Port of the process that closed.
        process: Port,
        /// Replies that made it back to the local process.
        round_trips: usize,
    },
    Cancelled {
        round_trips: usize,
    },
}

impl Outcome {
    pub fn round_trips(&self) -> usize {
        match *self {
            Outcome::Closed { round_trips, .. } | Outcome::Cancelled { round_trips } => round_trips,
        }
    }
}

/// Errors raised while setting a connection up.
///
/// The protocol loop itself cannot fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("no simulated process listens on port {0}")]
    UnknownProcess(u16),
    #[error("ports {0} and {1} are not one node-1 process and one node-2 process")]
    SameNode(u16, u16),
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One request/reply session between a node-1 and a node-2 process.
pub struct Connection {
    label: String,
    local: Process,
    peer: Process,
    local_transport: TransportLayer,
    peer_transport: TransportLayer,
    channel: Channel,
    delays: LayerDelays,
    pacer: Pacer,
    transcript: Transcript,
}

impl Connection {
    /// Build a connection for `pairing`.
    ///
    /// `index` selects this connection's RNG stream when the config is seeded.
    pub fn new(
        pairing: Pairing,
        index: u64,
        config: &SimConfig,
        transcript: Transcript,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ConnectionError> {
        let (local_node, peer_node) = match (pairing.local.node(), pairing.peer.node()) {
            (Some(l), Some(p)) if l != p => (l, p),
            _ => {
                return Err(ConnectionError::SameNode(
                    pairing.local.port.0,
                    pairing.peer.port.0,
                ))
            }
        };
        Ok(Self {
            label: pairing.label.to_owned(),
            local: Process::new(pairing.local),
            peer: Process::new(pairing.peer),
            local_transport: TransportLayer::for_node(local_node),
            peer_transport: TransportLayer::for_node(peer_node),
            channel: Channel::from_config(config, index),
            delays: config.delays,
            pacer: Pacer::new(shutdown),
            transcript,
        })
    }

    /// Swap in a specific channel, e.g. one with a fixed seed.
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Drive the protocol until one side closes or shutdown is requested.
    pub async fn run(mut self) -> Outcome {
        log::info!(
            "{}: starting {} <-> {}",
            self.label,
            self.local.port(),
            self.peer.port()
        );

        let mut round_trips = 0;
        let mut from_peer = Delivery::intact(Message {
            payload: Payload::default(),
            source: Port::CLOSE,
            destination: self.local.port(),
        });

        loop {
            if self.pacer.is_shutdown() {
                log::info!("{}: cancelled after {round_trips} round trips", self.label);
                return Outcome::Cancelled { round_trips };
            }

            let request = self.application_step(Side::Local, &from_peer).await;
            if request.is_close() {
                return self.finish(Side::Local, round_trips);
            }
            let to_peer = self.carry(Side::Local, &request).await;

            let reply = self.application_step(Side::Peer, &to_peer).await;
            if reply.is_close() {
                return self.finish(Side::Peer, round_trips);
            }
            from_peer = self.carry(Side::Peer, &reply).await;
            round_trips += 1;
        }
    }

    /// Run one application process and log what it saw and sent.
    async fn application_step(&mut self, side: Side, incoming: &Delivery) -> Message {
        let process = match side {
            Side::Local => &mut self.local,
            Side::Peer => &mut self.peer,
        };
        let name = process.name();
        let port = process.port();

        if incoming.intact {
            self.transcript.block(
                Layer::Application,
                &self.label,
                format_args!(
                    "{name} received message: <{}> from source #{}",
                    incoming.message.payload, incoming.message.source
                ),
            );
        } else {
            self.transcript.block(
                Layer::Application,
                &self.label,
                format_args!(
                    "{name} received corrupt message: <{}>",
                    incoming.message.payload
                ),
            );
        }

        let outgoing = process.step(incoming);
        log::debug!("{}: {name} -> {:?}", self.label, process.state());
        self.pacer.pause(self.delays.application(port)).await;

        self.transcript.block(
            Layer::Application,
            &self.label,
            format_args!(
                "{name} is sending message: <{}> to destination #{}",
                outgoing.payload, outgoing.destination
            ),
        );
        outgoing
    }

    /// Move `message` from `from`'s transport across the channel to the
    /// other side's transport.
    async fn carry(&mut self, from: Side, message: &Message) -> Delivery {
        let (tx, rx) = match from {
            Side::Local => (self.local_transport, self.peer_transport),
            Side::Peer => (self.peer_transport, self.local_transport),
        };

        let segment = self.send_down(tx, message).await;
        let segment = self.cross_channel(segment).await;
        self.receive_up(rx, segment).await
    }

    async fn send_down(&mut self, transport: TransportLayer, message: &Message) -> Segment {
        let node = transport.node();
        self.transcript.block(
            Layer::Transport,
            &self.label,
            format_args!(
                "{node}_transport received message: <{}> from source #{}",
                message.payload, message.source
            ),
        );

        let segment = transport.to_channel(message);
        self.pacer
            .pause(self.delays.transport_to_channel(node))
            .await;

        self.transcript.block(
            Layer::Transport,
            &self.label,
            format_args!(
                "{node}_transport is sending segment: <{segment}> to destination #{}",
                message.destination
            ),
        );
        segment
    }

    async fn cross_channel(&mut self, segment: Segment) -> Segment {
        self.transcript.block(
            Layer::Channel,
            &self.label,
            format_args!("channel received: <{segment}>"),
        );

        let segment = self.channel.transmit(segment);
        self.pacer.pause(self.channel.delay()).await;

        self.transcript.block(
            Layer::Channel,
            &self.label,
            format_args!("channel is sending: <{segment}>"),
        );
        segment
    }

    async fn receive_up(&mut self, transport: TransportLayer, segment: Segment) -> Delivery {
        let node = transport.node();
        let delivery = transport.from_channel(segment);
        let message = delivery.message;

        if delivery.intact {
            self.transcript.block(
                Layer::Transport,
                &self.label,
                format_args!(
                    "{node}_transport received segment: <{segment}> from source #{}",
                    message.source
                ),
            );
        } else {
            self.transcript.block(
                Layer::Transport,
                &self.label,
                format_args!("{node}_transport received corrupt segment: <{segment}>"),
            );
        }

        self.pacer
            .pause(self.delays.transport_from_channel(node))
            .await;

        if delivery.intact {
            self.transcript.block(
                Layer::Transport,
                &self.label,
                format_args!(
                    "{node}_transport is sending message: <{}> to destination #{}",
                    message.payload, message.destination
                ),
            );
        } else {
            self.transcript.block(
                Layer::Transport,
                &self.label,
                format_args!(
                    "{node}_transport is sending corrupt message: <{}>",
                    message.payload
                ),
            );
        }
        delivery
    }

    fn finish(&self, by: Side, round_trips: usize) -> Outcome {
        let process = match by {
            Side::Local => &self.local,
            Side::Peer => &self.peer,
        };
        self.transcript.closing(&self.label, process.name());
        log::info!(
            "{}: closed by {} after {round_trips} round trips",
            self.label,
            process.name()
        );
        Outcome::Closed {
            by,
            process: process.port(),
            round_trips,
        }
    }
}

/// Resolve two ports to a pairing.  `local` must be on node 1.
pub fn pairing_for(local: Port, peer: Port) -> Result<Pairing, ConnectionError> {
    let local_spec =
        ProcessSpec::lookup(local).ok_or(ConnectionError::UnknownProcess(local.0))?;
    let peer_spec = ProcessSpec::lookup(peer).ok_or(ConnectionError::UnknownProcess(peer.0))?;
    if local_spec.node() != Some(Node::One) || peer_spec.node() != Some(Node::Two) {
        return Err(ConnectionError::SameNode(local.0, peer.0));
    }
    let label = DEFAULT_PAIRINGS
        .iter()
        .find(|p| p.local.port == local && p.peer.port == peer)
        .map_or("connection", |p| p.label);
    Ok(Pairing {
        label,
        local: local_spec,
        peer: peer_spec,
    })
}

/// Run the connection between `local` (node 1) and `peer` (node 2) to
/// completion.
pub async fn run_connection(
    local: Port,
    peer: Port,
    config: &SimConfig,
    transcript: Transcript,
    shutdown: watch::Receiver<bool>,
) -> Result<Outcome, ConnectionError> {
    let pairing = pairing_for(local, peer)?;
    let index = u64::from(local.0);
    Ok(Connection::new(pairing, index, config, transcript, shutdown)?
        .run()
        .await)
}
