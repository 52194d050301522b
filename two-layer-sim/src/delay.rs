//! Per-layer pacing delays.
//!
//! Each layer of the simulation can be made to "take time" so a human can
//! follow the transcript as it scrolls by.  This module provides:
//! - [`LayerDelays`]: one fixed duration per application process, per
//!   transport direction of each node, and for the channel.
//! - [`Pacer`]: sleeps for those durations on the tokio timer, waking early
//!   when the shutdown signal is raised so Ctrl-C never waits on a long pause.

use std::time::Duration;

use tokio::sync::watch;

use crate::segment::{Node, Port};

/// Fixed delays applied after each layer does its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDelays {
    pub node1_process1: Duration,
    pub node1_process2: Duration,
    pub node2_process1: Duration,
    pub node2_process2: Duration,
    pub node1_transport_to_channel: Duration,
    pub node1_transport_from_channel: Duration,
    pub node2_transport_to_channel: Duration,
    pub node2_transport_from_channel: Duration,
    pub channel: Duration,
}

impl Default for LayerDelays {
    fn default() -> Self {
        Self::none()
    }
}

impl LayerDelays {
    /// Every layer runs without pausing.
    pub const fn none() -> Self {
        Self {
            node1_process1: Duration::ZERO,
            node1_process2: Duration::ZERO,
            node2_process1: Duration::ZERO,
            node2_process2: Duration::ZERO,
            node1_transport_to_channel: Duration::ZERO,
            node1_transport_from_channel: Duration::ZERO,
            node2_transport_to_channel: Duration::ZERO,
            node2_transport_from_channel: Duration::ZERO,
            channel: Duration::ZERO,
        }
    }

    /// The demonstration profile: slightly different latencies per hop.
    pub const fn reference() -> Self {
        Self {
            node1_process1: Duration::from_millis(450),
            node1_process2: Duration::from_millis(500),
            node2_process1: Duration::from_millis(550),
            node2_process2: Duration::from_millis(440),
            node1_transport_to_channel: Duration::from_millis(990),
            node1_transport_from_channel: Duration::from_millis(1110),
            node2_transport_to_channel: Duration::from_millis(1010),
            node2_transport_from_channel: Duration::from_millis(1070),
            channel: Duration::from_millis(1500),
        }
    }

    /// Delay of the application process bound to `port`.
    pub fn application(&self, port: Port) -> Duration {
        match port {
            Port::NODE1_PROCESS1 => self.node1_process1,
            Port::NODE1_PROCESS2 => self.node1_process2,
            Port::NODE2_PROCESS1 => self.node2_process1,
            Port::NODE2_PROCESS2 => self.node2_process2,
            _ => Duration::ZERO,
        }
    }

    pub fn transport_to_channel(&self, node: Node) -> Duration {
        match node {
            Node::One => self.node1_transport_to_channel,
            Node::Two => self.node2_transport_to_channel,
        }
    }

    pub fn transport_from_channel(&self, node: Node) -> Duration {
        match node {
            Node::One => self.node1_transport_from_channel,
            Node::Two => self.node2_transport_from_channel,
        }
    }
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

/// Cancellable sleeper shared by one connection driver.
#[derive(Debug, Clone)]
pub struct Pacer {
    shutdown: watch::Receiver<bool>,
}

impl Pacer {
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        Self { shutdown }
    }

    /// `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleep for `duration`, returning early on shutdown.
    pub async fn pause(&mut self, duration: Duration) {
        if duration.is_zero() || self.is_shutdown() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            // Err means every sender is gone; sleep out the rest instead of spinning.
            changed = self.shutdown.changed() => {
                if changed.is_err() {
                    tokio::time::sleep(duration).await;
                }
            }
        }
    }
}
