mod common;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use common::{batch, seeded_session};
use lore_galaxy::{AnalysisBatch, FetchOutcome, GalaxyError, Session};

const WAIT: Duration = Duration::from_secs(5);

fn poll_until_some(session: &mut Session) -> Vec<FetchOutcome> {
    let deadline = Instant::now() + WAIT;
    loop {
        let outcomes = session.poll_fetches();
        if !outcomes.is_empty() || Instant::now() > deadline {
            return outcomes;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn batches_merge_in_completion_order() {
    let mut session = seeded_session(11);
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let slow = session.spawn_fetch(move || {
        release_rx
            .recv()
            .map_err(|_| GalaxyError::Fetch("released without a batch".to_owned()))?;
        Ok(batch(&[("A", "Frankenstein", 15.0)], &[]).into())
    });
    let fast = session.spawn_fetch(|| Ok(batch(&[("A", "Dracula", 10.0)], &[]).into()));
    assert_ne!(slow, fast);
    assert_eq!(session.pending_fetches(), 2);

    let first = poll_until_some(&mut session);
    assert_eq!(first.len(), 1);
    match &first[0] {
        FetchOutcome::Merged { ticket, report } => {
            assert_eq!(*ticket, fast);
            assert_eq!(report.nodes_added, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(session.store().node("A").unwrap().systems, ["Dracula"]);
    assert_eq!(session.pending_fetches(), 1);

    release_tx.send(()).unwrap();
    let rest = session.wait_for_fetches(WAIT);
    assert!(matches!(&rest[..], [FetchOutcome::Merged { ticket, .. }] if *ticket == slow));

    let node = session.store().node("A").unwrap();
    assert_eq!(node.systems, ["Dracula", "Frankenstein"]);
    assert_eq!(node.weight, 15.0);
    assert_eq!(session.pending_fetches(), 0);
}

#[test]
fn failed_fetch_is_reported_and_others_still_merge() {
    let mut session = seeded_session(12);
    let broken = session.spawn_fetch(|| AnalysisBatch::from_json(r#"{"nodes": 3}"#));
    session.spawn_fetch(|| {
        AnalysisBatch::from_json(r#"{"nodes": [{"id": "Mina", "system": "Dracula"}]}"#)
    });

    let outcomes = session.wait_for_fetches(WAIT);
    assert_eq!(outcomes.len(), 2);

    let failures = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            FetchOutcome::Failed { ticket, error } => Some((*ticket, error)),
            FetchOutcome::Merged { .. } => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, broken);
    assert!(matches!(failures[0].1, GalaxyError::InvalidBatch(_)));

    assert_eq!(session.store().node_count(), 1);
    assert_eq!(session.store().node("Mina").unwrap().weight, 5.0);
}

#[test]
fn poll_with_nothing_in_flight_is_empty() {
    let mut session = seeded_session(13);
    assert!(session.poll_fetches().is_empty());
    assert!(session.wait_for_fetches(Duration::from_millis(10)).is_empty());
}

#[test]
fn shared_session_serializes_mutation_and_ticks() {
    let shared = seeded_session(14).into_shared();

    let writer = {
        let shared = shared.clone();
        thread::spawn(move || {
            for index in 0..20 {
                let id = format!("node-{index}");
                let mut session = shared.lock().unwrap();
                session.merge(&batch(&[(id.as_str(), "Dracula", 4.0)], &[]));
            }
        })
    };

    for _ in 0..50 {
        let mut session = shared.lock().unwrap();
        session.tick();
        assert_eq!(
            session.simulation().bodies().len(),
            session.store().node_count()
        );
    }
    writer.join().unwrap();

    let session = shared.lock().unwrap();
    assert_eq!(session.store().node_count(), 20);
    assert_eq!(session.simulation().bodies().len(), 20);
}
