//! Two novels sharing a character: merge, lay out, prune.

mod common;

use common::{batch, seeded_session};
use lore_galaxy::Edge;

#[test]
fn shared_character_survives_pruning_its_second_system() {
    let mut session = seeded_session(7);

    session.merge(&batch(&[("A", "Dracula", 10.0)], &[]));
    let report = session.merge(&batch(
        &[("A", "Frankenstein", 15.0), ("B", "Frankenstein", 3.0)],
        &[("A", "B", "fights")],
    ));
    assert_eq!(report.nodes_added, 1);
    assert_eq!(report.nodes_updated, 1);
    assert_eq!(report.systems_registered, ["Frankenstein"]);

    let store = session.store();
    let a = store.node("A").unwrap();
    assert_eq!(a.systems, ["Dracula", "Frankenstein"]);
    assert_eq!(a.weight, 15.0);
    assert_eq!(store.node("B").unwrap().systems, ["Frankenstein"]);
    assert_eq!(store.edges(), [Edge::new("A", "B", "fights")]);
    assert_eq!(session.registry().len(), 2);
    assert_eq!(session.shells().len(), 2);

    let prune = session.prune_system("Frankenstein");
    assert_eq!(prune.nodes_detached, 2);
    assert_eq!(prune.nodes_removed, ["B"]);
    assert_eq!(prune.links_removed, 1);

    let store = session.store();
    assert_eq!(store.node("A").unwrap().systems, ["Dracula"]);
    assert_eq!(store.node("A").unwrap().weight, 15.0);
    assert!(store.node("B").is_none());
    assert!(store.edges().is_empty());
    assert_eq!(
        session
            .registry()
            .iter()
            .map(|record| record.name.as_str())
            .collect::<Vec<_>>(),
        ["Dracula"]
    );
    assert!(session.simulation().body("B").is_none());

    let shells = session.shells();
    assert_eq!(shells.len(), 1);
    assert_eq!(shells[0].name, "Dracula");
    assert_eq!(shells[0].members, 1);
}

#[test]
fn layout_cools_and_stays_finite() {
    let mut session = seeded_session(8);
    session.merge(&batch(
        &[
            ("Van Helsing", "Dracula", 8.0),
            ("Mina", "Dracula", 6.0),
            ("Lucy", "Dracula", 5.0),
            ("Van Helsing", "Frankenstein", 8.0),
            ("Victor", "Frankenstein", 9.0),
            ("Creature", "Frankenstein", 12.0),
        ],
        &[
            ("Van Helsing", "Mina", "protects"),
            ("Van Helsing", "Lucy", "treats"),
            ("Victor", "Creature", "creates"),
            ("Creature", "Victor", "hunts"),
        ],
    ));

    let ran = session.run(1_000);
    assert!(ran < 1_000);
    assert!(!session.simulation().is_hot());
    assert_eq!(session.simulation().bodies().len(), 5);
    for body in session.simulation().bodies() {
        assert!(body.position.is_finite(), "{} drifted to {:?}", body.id, body.position);
    }
}

#[test]
fn clusters_separate_toward_their_anchors() {
    let mut session = seeded_session(9);
    let dracula = (0..6)
        .map(|index| format!("dracula-{index}"))
        .collect::<Vec<_>>();
    let frankenstein = (0..6)
        .map(|index| format!("frankenstein-{index}"))
        .collect::<Vec<_>>();
    let nodes = dracula
        .iter()
        .map(|id| (id.as_str(), "Dracula", 5.0))
        .chain(frankenstein.iter().map(|id| (id.as_str(), "Frankenstein", 5.0)))
        .collect::<Vec<_>>();
    session.merge(&batch(&nodes, &[]));
    session.run(1_000);

    let anchor = |name: &str| session.registry().get(name).unwrap().center;
    let mean = |ids: &[String]| {
        let sum = ids.iter().fold(lore_galaxy::Vec3::ZERO, |sum, id| {
            sum + session.simulation().body(id).unwrap().position
        });
        sum / ids.len() as f32
    };

    let dracula_mean = mean(&dracula);
    let frankenstein_mean = mean(&frankenstein);
    assert!(
        (dracula_mean - anchor("Dracula")).length()
            < (dracula_mean - anchor("Frankenstein")).length()
    );
    assert!(
        (frankenstein_mean - anchor("Frankenstein")).length()
            < (frankenstein_mean - anchor("Dracula")).length()
    );
}

#[test]
fn oversized_weight_is_rejected_without_freezing_the_layout() {
    let mut session = seeded_session(10);
    let report = session.merge(&batch(
        &[("A", "Dracula", 5.0), ("B", "Dracula", 5.0), ("Huge", "Dracula", 1e300)],
        &[],
    ));
    assert_eq!(report.rejected.len(), 1);
    assert!(session.store().node("Huge").is_none());

    let before = session.simulation().body("A").unwrap().position;
    for _ in 0..20 {
        session.tick();
    }
    let after = session.simulation().body("A").unwrap().position;
    assert!(after.is_finite());
    assert!((after - before).length() > 0.0);
}
