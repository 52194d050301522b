//! Simulation configuration.
//!
//! A [`SimConfig`] is built once, before any connection starts, and then
//! handed to each driver by value.  Nothing mutates it afterwards, so the
//! concurrent drivers can read it without synchronisation.

use crate::delay::LayerDelays;

/// Immutable settings shared by every connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimConfig {
    /// Per-layer pauses; all zero when delays are off.
    pub delays: LayerDelays,
    /// Whether the channel may flip a bit in transit.
    pub faults_enabled: bool,
    /// Base seed for the channels' RNGs.  `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl SimConfig {
    /// Fix the RNG seed so fault patterns are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn delays_enabled(&self) -> bool {
        self.delays != LayerDelays::none()
    }
}

/// Build the configuration from the two user-facing toggles.
///
/// With delays on, the reference per-layer profile is used.
pub fn configure(delays_enabled: bool, faults_enabled: bool) -> SimConfig {
    SimConfig {
        delays: if delays_enabled {
            LayerDelays::reference()
        } else {
            LayerDelays::none()
        },
        faults_enabled,
        seed: None,
    }
}
