//! Integration tests for the per-connection protocol loop.
//!
//! Each test drives a full connection in-process with delays disabled and
//! inspects both the returned [`Outcome`] and the captured transcript.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;

use two_layer_sim::{
    channel::Channel,
    configure,
    connection::{Connection, CONNECTION1, CONNECTION2},
    run_connection, ConnectionError, Outcome, Port, Side, SimConfig, Transcript,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull `<bits>` values out of every transcript line containing `needle`.
fn values_after(transcript: &str, needle: &str) -> Vec<String> {
    transcript
        .lines()
        .filter(|line| line.contains(needle))
        .filter_map(|line| {
            let start = line.find('<')? + 1;
            let end = line[start..].find('>')? + start;
            Some(line[start..end].to_owned())
        })
        .collect()
}

fn faulty_channel(seed: u64) -> Channel {
    Channel::new(true, Duration::ZERO, StdRng::seed_from_u64(seed))
}

// ---------------------------------------------------------------------------
// Lossless runs
// ---------------------------------------------------------------------------

/// Connection 1 sends 0, 1, 2, 3 then the terminal 0b0000_0111, whose reply
/// is node2_process2's "unrecognized" code, closing the connection.
#[tokio::test]
async fn connection1_runs_five_round_trips_then_initiator_closes() {
    let (transcript, buffer) = Transcript::in_memory();
    let (_tx, rx) = watch::channel(false);

    let outcome = run_connection(
        Port::NODE1_PROCESS1,
        Port::NODE2_PROCESS2,
        &configure(false, false),
        transcript,
        rx,
    )
    .await
    .expect("valid pairing");

    assert_eq!(
        outcome,
        Outcome::Closed {
            by: Side::Local,
            process: Port::NODE1_PROCESS1,
            round_trips: 5,
        }
    );

    let out = buffer.contents();
    assert_eq!(
        values_after(&out, "node1_process1 is sending message"),
        ["00000000", "00000001", "00000010", "00000011", "00000111", "00000111"],
        "last entry is the close message carrying the last payload"
    );
    assert_eq!(
        values_after(&out, "node2_process2 is sending message"),
        ["10011000", "10101000", "10111000", "11111000", "10011111"]
    );
    assert!(out.contains("node1_process1 is sending message: <00000111> to destination #0"));
    assert!(out.contains("closing connection1 by node1_process1..."));
    assert!(!out.contains("corrupt"));
}

#[tokio::test]
async fn connection2_runs_five_round_trips_then_initiator_closes() {
    let (transcript, buffer) = Transcript::in_memory();
    let (_tx, rx) = watch::channel(false);

    let outcome = run_connection(
        Port::NODE1_PROCESS2,
        Port::NODE2_PROCESS1,
        &SimConfig::default(),
        transcript,
        rx,
    )
    .await
    .unwrap();

    assert_eq!(outcome.round_trips(), 5);
    assert!(matches!(
        outcome,
        Outcome::Closed { by: Side::Local, process: Port::NODE1_PROCESS2, .. }
    ));
    assert_eq!(
        values_after(&buffer.contents(), "node2_process1 is sending message"),
        ["01000000", "10000001", "11000010", "11100011", "10001111"]
    );
}

#[tokio::test]
async fn transcript_records_segments_and_ports() {
    let (transcript, buffer) = Transcript::in_memory();
    let (_tx, rx) = watch::channel(false);
    Connection::new(CONNECTION1, 0, &SimConfig::default(), transcript, rx)
        .unwrap()
        .run()
        .await;

    let out = buffer.contents();
    // 0 from 5001 to 7002: source bit 0, destination bit 1, parity 1
    assert!(out.contains("node1_transport is sending segment: <10100000000> to destination #7002"));
    assert!(out.contains("node2_transport received segment: <10100000000> from source #5001"));
    assert!(out.contains("node2_transport is sending message: <00000000> to destination #7002"));
    // reply 0b1001_1000 from 7002 to 5001: source bit 1, destination bit 0, 3 ones + 1 → even
    assert!(out.contains("node2_transport is sending segment: <01010011000> to destination #5001"));
    assert!(out.contains("node1_process1 received message: <10011000> from source #7002"));
    assert!(out.contains("channel received: <10100000000>"));
}

// ---------------------------------------------------------------------------
// Closure symmetry under faults
// ---------------------------------------------------------------------------

/// With a faulty channel either side may close; the transcript must always
/// name the process the outcome reports, and both sides must be seen.
#[tokio::test]
async fn faulty_runs_terminate_and_name_the_closing_side() {
    let mut saw_local = false;
    let mut saw_peer = false;

    for seed in 0..200 {
        for pairing in [CONNECTION1, CONNECTION2] {
            let (transcript, buffer) = Transcript::in_memory();
            let (_tx, rx) = watch::channel(false);
            let conn = Connection::new(pairing, 0, &SimConfig::default(), transcript, rx)
                .unwrap()
                .with_channel(faulty_channel(seed));

            let outcome = tokio::time::timeout(Duration::from_secs(5), conn.run())
                .await
                .expect("connection must terminate");

            let Outcome::Closed { by, process, round_trips } = outcome else {
                panic!("unexpected {outcome:?}");
            };
            assert!(round_trips <= 5);

            let closer = match by {
                Side::Local => {
                    saw_local = true;
                    pairing.local
                }
                Side::Peer => {
                    saw_peer = true;
                    pairing.peer
                }
            };
            assert_eq!(process, closer.port);

            let out = buffer.contents();
            let notice = format!("closing {} by {}...", pairing.label, closer.name);
            assert!(out.contains(&notice), "seed {seed}: missing `{notice}`");
            assert_eq!(out.matches("closing ").count(), 1);
        }
    }

    assert!(saw_local && saw_peer, "local={saw_local} peer={saw_peer}");
}

/// A corrupt delivery is always answered by a close from the receiving side.
#[tokio::test]
async fn corruption_closes_the_receiving_process() {
    for seed in 0..100 {
        let (transcript, buffer) = Transcript::in_memory();
        let (_tx, rx) = watch::channel(false);
        let outcome = Connection::new(CONNECTION2, 0, &SimConfig::default(), transcript, rx)
            .unwrap()
            .with_channel(faulty_channel(seed))
            .run()
            .await;

        let out = buffer.contents();
        if let Some(pos) = out.find("received corrupt message") {
            let line_start = out[..pos].rfind('\n').map_or(0, |i| i + 1);
            let who = &out[line_start..pos];
            match outcome {
                Outcome::Closed { by: Side::Local, .. } => assert!(who.contains("node1_process2")),
                Outcome::Closed { by: Side::Peer, .. } => assert!(who.contains("node2_process1")),
                Outcome::Cancelled { .. } => panic!("never cancelled"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellation and setup errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_before_start_cancels_immediately() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let (transcript, buffer) = Transcript::in_memory();

    let outcome = Connection::new(CONNECTION1, 0, &configure(true, false), transcript, rx)
        .unwrap()
        .run()
        .await;

    assert_eq!(outcome, Outcome::Cancelled { round_trips: 0 });
    assert!(buffer.contents().is_empty());
}

#[tokio::test]
async fn shutdown_interrupts_a_delayed_run() {
    let (tx, rx) = watch::channel(false);
    let conn = Connection::new(CONNECTION2, 0, &configure(true, false), Transcript::sink(), rx)
        .unwrap();
    let task = tokio::spawn(conn.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cancelled run must stop promptly")
        .unwrap();
    assert!(matches!(outcome, Outcome::Cancelled { .. }));
}

#[tokio::test]
async fn run_connection_rejects_unknown_and_same_node_ports() {
    let (_tx, rx) = watch::channel(false);
    let cfg = SimConfig::default();

    let err = run_connection(Port(6000), Port::NODE2_PROCESS1, &cfg, Transcript::sink(), rx.clone())
        .await
        .unwrap_err();
    assert_eq!(err, ConnectionError::UnknownProcess(6000));

    let err = run_connection(
        Port::NODE2_PROCESS1,
        Port::NODE2_PROCESS2,
        &cfg,
        Transcript::sink(),
        rx,
    )
    .await
    .unwrap_err();
    assert_eq!(err, ConnectionError::SameNode(7001, 7002));
}
