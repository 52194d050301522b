//! The lossy channel between the two nodes.
//!
//! Real links corrupt data.  To exercise the parity check, a [`Channel`]
//! can apply a simple fault model to every segment it carries:
//!
//! | Fault            | Description                                        |
//! |------------------|----------------------------------------------------|
//! | Single bit flip  | With probability [`FLIP_PROBABILITY`], toggle one  |
//! |                  | bit chosen uniformly among the 11 segment bits.    |
//!
//! Nothing else is modelled: segments are never dropped, duplicated or
//! reordered, and the channel itself never fails.  Corruption is noticed
//! only downstream, by the receiving transport layer.
//!
//! Each channel owns its own seeded [`StdRng`], so concurrent connections
//! never contend on random state and a fixed seed replays the same faults.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimConfig;
use crate::segment::{Segment, SEGMENT_BITS};

/// Chance that a segment is corrupted when faults are enabled.
pub const FLIP_PROBABILITY: f64 = 0.5;

/// A fault-injecting link carrying segments in both directions.
#[derive(Debug)]
pub struct Channel {
    faults_enabled: bool,
    delay: Duration,
    rng: StdRng,
}

impl Channel {
    pub fn new(faults_enabled: bool, delay: Duration, rng: StdRng) -> Self {
        Self {
            faults_enabled,
            delay,
            rng,
        }
    }

    /// Build the channel for connection number `index`.
    ///
    /// With a configured seed, every connection derives its own stream from
    /// it so two connections never replay the same fault pattern.
    pub fn from_config(config: &SimConfig, index: u64) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index)),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self::new(config.faults_enabled, config.delays.channel, rng)
    }

    /// Propagation delay the driver should wait after each transmission.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Carry one segment across, possibly flipping a single bit.
    pub fn transmit(&mut self, segment: Segment) -> Segment {
        if !self.faults_enabled || !self.rng.random_bool(FLIP_PROBABILITY) {
            return segment;
        }
        let index = self.rng.random_range(0..SEGMENT_BITS);
        let corrupted = segment.flip(index);
        log::debug!("channel: flipped bit {index} ({segment} -> {corrupted})");
        corrupted
    }
}
