//! End-to-end state mirroring between hosts wired through an in-memory mesh.

mod common;

use common::{Delivered, Host, Mesh};
use statesync::sync::{
    DropReason, ListenerOutcome, ServiceCall, ServiceError, StateStore, REMOTE_ENTITY_SERVICE,
};

fn outcomes_at(log: &[Delivered], host: &str) -> Vec<ListenerOutcome> {
    log.iter()
        .filter(|d| d.to == host)
        .flat_map(|d| d.outcomes.iter().cloned())
        .collect()
}

// Entity ids such as `input_select.home_state` contain the suffix delimiter,
// so hosts list their peers to keep `state` from reading as a host name.
fn three_hosts() -> Mesh {
    Mesh::new(vec![
        Host::new(
            "haven",
            &["light.porch", "input_select.home_state"],
            &["seattle", "tahoe"],
        ),
        Host::new("seattle", &["light.office"], &["haven", "tahoe"]),
        Host::new("tahoe", &[], &["haven", "seattle"]),
    ])
}

#[test]
fn local_change_is_mirrored_on_every_peer() {
    let mesh = three_hosts();
    mesh.host("haven").set("light.porch", "on");
    let log = mesh.pump();

    assert_eq!(mesh.host("seattle").state("light.porch_haven").as_deref(), Some("on"));
    assert_eq!(mesh.host("tahoe").state("light.porch_haven").as_deref(), Some("on"));
    // the origin never mirrors itself
    assert!(!mesh.host("haven").store.exists("light.porch_haven"));
    assert!(outcomes_at(&log, "haven").is_empty());

    let mirror = mesh.host("seattle").store.get("light.porch_haven").unwrap();
    assert_eq!(mirror.attributes["origin_host"], "haven");
    assert_eq!(mirror.attributes["source_entity"], "light.porch");
}

#[test]
fn unshared_entities_stay_local() {
    let mesh = three_hosts();
    mesh.host("haven").set("light.kitchen", "on");
    assert!(mesh.pump().is_empty());
    assert!(mesh.host("seattle").store.is_empty());
}

#[test]
fn toggle_round_trips_through_origin() {
    let mesh = three_hosts();
    mesh.host("haven").set("light.porch", "on");
    mesh.pump();

    let seattle = mesh.host("seattle");
    seattle
        .wired
        .services
        .call(
            REMOTE_ENTITY_SERVICE,
            &ServiceCall::new("default", "toggle_state").entity("light.porch_haven"),
        )
        .unwrap();
    // nothing changes locally until the origin answers
    assert_eq!(seattle.state("light.porch_haven").as_deref(), Some("on"));

    let log = mesh.pump();
    assert_eq!(mesh.host("haven").state("light.porch").as_deref(), Some("off"));
    assert_eq!(seattle.state("light.porch_haven").as_deref(), Some("off"));
    assert_eq!(mesh.host("tahoe").state("light.porch_haven").as_deref(), Some("off"));

    assert!(outcomes_at(&log, "haven").contains(&ListenerOutcome::Applied {
        entity_id: "light.porch".into()
    }));
    // tahoe sees the directed request but it is not addressed to it
    assert!(outcomes_at(&log, "tahoe").contains(&ListenerOutcome::Ignored));
}

#[test]
fn set_state_carries_arbitrary_values() {
    let mesh = three_hosts();
    mesh.host("haven").set("input_select.home_state", "Home");
    mesh.pump();

    mesh.host("tahoe")
        .wired
        .services
        .call(
            REMOTE_ENTITY_SERVICE,
            &ServiceCall::new("default", "set_state")
                .entity("input_select.home_state_haven")
                .value("Night"),
        )
        .unwrap();
    mesh.pump();
    assert_eq!(
        mesh.host("haven").state("input_select.home_state").as_deref(),
        Some("Night")
    );
    assert_eq!(
        mesh.host("seattle").state("input_select.home_state_haven").as_deref(),
        Some("Night")
    );
}

#[test]
fn toggle_rejects_non_binary_mirror() {
    let mesh = three_hosts();
    mesh.host("haven").set("input_select.home_state", "Away");
    mesh.pump();
    let err = mesh
        .host("seattle")
        .wired
        .services
        .call(
            REMOTE_ENTITY_SERVICE,
            &ServiceCall::new("default", "toggle_state").entity("input_select.home_state_haven"),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotBinary { .. }));
    assert!(mesh.pump().is_empty());
}

#[test]
fn mirror_of_a_mirror_is_never_created() {
    // seattle wrongly shares its mirror of haven's porch light
    let mesh = Mesh::new(vec![
        Host::new("haven", &["light.porch"], &["seattle", "tahoe"]),
        Host::new("seattle", &["light.porch_haven"], &["haven", "tahoe"]),
        Host::new("tahoe", &[], &["haven", "seattle"]),
    ]);
    mesh.host("haven").set("light.porch", "on");
    let log = mesh.pump();

    assert!(!mesh.host("tahoe").store.exists("light.porch_haven_seattle"));
    assert!(outcomes_at(&log, "tahoe")
        .contains(&ListenerOutcome::Dropped(DropReason::AlreadyMirrored)));
    assert!(outcomes_at(&log, "haven")
        .contains(&ListenerOutcome::Dropped(DropReason::AlreadyMirrored)));
}

#[test]
fn ping_is_answered_only_to_sender() {
    let mesh = three_hosts();
    mesh.host("haven").wired.engine.send_ping("n1").unwrap();
    let log = mesh.pump();

    assert!(outcomes_at(&log, "seattle").contains(&ListenerOutcome::Ponged { to: "haven".into() }));
    let haven = outcomes_at(&log, "haven");
    assert!(haven.contains(&ListenerOutcome::PongReceived { from: "seattle".into() }));
    assert!(haven.contains(&ListenerOutcome::PongReceived { from: "tahoe".into() }));
    // pongs addressed to haven are not consumed elsewhere
    assert!(!outcomes_at(&log, "tahoe")
        .iter()
        .any(|o| matches!(o, ListenerOutcome::PongReceived { .. })));
}

#[test]
fn reconnect_announce_converges_late_peer() {
    let haven = Host::new("haven", &["light.porch", "light.garage"], &[]);
    haven.set("light.porch", "on");
    haven.transport.drain();

    let mesh = Mesh::new(vec![haven, Host::new("seattle", &[], &[])]);
    assert_eq!(mesh.host("haven").wired.engine.publish_current_states(), 1);
    mesh.pump();
    assert_eq!(mesh.host("seattle").state("light.porch_haven").as_deref(), Some("on"));
    assert!(!mesh.host("seattle").store.exists("light.garage_haven"));
}

#[test]
fn configured_peers_limit_who_is_mirrored() {
    let mesh = Mesh::new(vec![
        Host::new("haven", &["light.porch"], &["seattle"]),
        Host::new("seattle", &["light.office"], &["haven"]),
        Host::new("stranger", &["light.door"], &[]),
    ]);
    mesh.host("stranger").set("light.door", "on");
    mesh.host("seattle").set("light.office", "on");
    let log = mesh.pump();

    let haven = mesh.host("haven");
    assert_eq!(haven.state("light.office_seattle").as_deref(), Some("on"));
    assert!(!haven.store.exists("light.door_stranger"));
    assert!(outcomes_at(&log, "haven")
        .contains(&ListenerOutcome::Dropped(DropReason::UnknownPeer)));
}
