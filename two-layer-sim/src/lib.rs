//! `two-layer-sim` — two nodes, two layers, one lossy channel.
//!
//! # Architecture
//!
//! ```text
//!        node 1                                       node 2
//!  ┌──────────────────┐                        ┌──────────────────┐
//!  │ process1  (5001) │   request / reply      │ process1  (7001) │
//!  │ process2  (5002) │◀══════════════════════▶│ process2  (7002) │
//!  ├──────────────────┤                        ├──────────────────┤
//!  │    transport     │    11-bit segments     │    transport     │
//!  └────────┬─────────┘                        └────────┬─────────┘
//!           │            ┌──────────────┐               │
//!           └───────────▶│   channel    │◀──────────────┘
//!                        │ (bit flips)  │
//!                        └──────────────┘
//! ```
//!
//! Two connections (5001 ↔ 7002 and 5002 ↔ 7001) run concurrently, each
//! with its own channel instance.
//!
//! Each module has a single responsibility:
//! - [`segment`]      — message and 11-bit segment layout, parity
//! - [`transport`]    — per-node message ↔ segment mapping
//! - [`application`]  — the four table-driven processes
//! - [`state`]        — process finite-state-machine types
//! - [`channel`]      — single-bit fault injection
//! - [`connection`]   — the per-connection protocol loop
//! - [`delay`]        — per-layer pacing and cancellable sleeps
//! - [`config`]       — immutable simulation settings
//! - [`transcript`]   — line-atomic, human-readable output
//! - [`simulation`]   — the default two-connection scenario

pub mod application;
pub mod channel;
pub mod config;
pub mod connection;
pub mod delay;
pub mod segment;
pub mod simulation;
pub mod state;
pub mod transcript;
pub mod transport;

pub use config::{configure, SimConfig};
pub use connection::{run_connection, ConnectionError, Outcome, Side};
pub use segment::{Message, Payload, Port, Segment};
pub use transcript::Transcript;
pub use transport::Delivery;
