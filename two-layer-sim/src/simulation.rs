//! Default two-connection scenario.
//!
//! Spawns one tokio task per entry in [`DEFAULT_PAIRINGS`] and waits for
//! all of them.  The tasks share nothing but a clone of the configuration
//! and the transcript handle.

use tokio::sync::watch;

use crate::config::SimConfig;
use crate::connection::{Connection, Outcome, DEFAULT_PAIRINGS};
use crate::transcript::Transcript;

/// Run both default connections concurrently and return their outcomes in
/// pairing order.
///
/// A task that panics is logged and left out of the result.
pub async fn run(
    config: SimConfig,
    transcript: Transcript,
    shutdown: watch::Receiver<bool>,
) -> Vec<Outcome> {
    transcript.banner("\nConnection simulation started...\n");

    let mut handles = Vec::with_capacity(DEFAULT_PAIRINGS.len());
    for (index, pairing) in DEFAULT_PAIRINGS.into_iter().enumerate() {
        match Connection::new(
            pairing,
            index as u64,
            &config,
            transcript.clone(),
            shutdown.clone(),
        ) {
            Ok(conn) => handles.push(tokio::spawn(conn.run())),
            Err(e) => log::error!("{}: {e}", pairing.label),
        }
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => log::error!("connection task failed: {e}"),
        }
    }

    transcript.banner("Connection simulation finished...\n");
    outcomes
}
