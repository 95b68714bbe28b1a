//! Topic parsing, pattern matching and dispatch through the public surface.

use statesync::routing::{match_field, Delivery, Dispatcher, Pattern, TopicAddress, TopicError};

fn capture(d: &Delivery<'_>) -> (String, Option<String>, String, Option<String>) {
    (
        d.fromhost.to_string(),
        d.tohost.map(str::to_string),
        d.event_type.to_string(),
        d.entity.map(str::to_string),
    )
}

// =============================================================================
// Pattern scenarios
// =============================================================================

#[test]
fn fromhost_pattern_matches_and_extracts_fields() {
    let mut dispatcher = Dispatcher::new("mqtt_shared");
    dispatcher.add_listener("haven", Pattern::any().fromhost("pi-haven"), capture);

    let out = dispatcher.dispatch("mqtt_shared/pi-haven/state/myentity", "1");
    assert_eq!(
        out,
        vec![(
            "pi-haven".to_string(),
            None,
            "state".to_string(),
            Some("myentity".to_string())
        )]
    );
    assert!(dispatcher
        .dispatch("mqtt_shared/pi-seattle/state/myentity", "1")
        .is_empty());
}

#[test]
fn negated_fromhost_excludes_only_that_host() {
    let pattern = Pattern::any().fromhost("!pi-haven");
    let seattle =
        TopicAddress::parse("mqtt_shared", "mqtt_shared/pi-seattle/state/entity").unwrap();
    let haven = TopicAddress::parse("mqtt_shared", "mqtt_shared/pi-haven/state/entity").unwrap();
    assert!(pattern.matches(&seattle));
    assert!(!pattern.matches(&haven));
}

#[test]
fn host_wildcards_do_not_apply_to_event_or_entity() {
    assert!(match_field(Some("pi-haven"), Some("all"), true));
    assert!(match_field(None, Some("*"), true));
    assert!(!match_field(Some("state"), Some("all"), false));
    assert!(match_field(Some("all"), Some("all"), false));
    assert!(match_field(None, None, false));
    assert!(match_field(None, Some("!pi-haven"), true));
}

#[test]
fn tohost_filter_separates_directed_from_broadcast() {
    let mut dispatcher = Dispatcher::new("mqtt_shared");
    dispatcher.add_listener("for haven", Pattern::any().tohost("haven"), |_| "for haven");
    dispatcher.add_listener("broadcast or other", Pattern::any().tohost("!haven"), |_| "other");

    assert_eq!(
        dispatcher.dispatch("mqtt_shared/seattle/haven/state/light.x", "on"),
        ["for haven"]
    );
    assert_eq!(
        dispatcher.dispatch("mqtt_shared/seattle/state/light.x", "on"),
        ["other"]
    );
    assert_eq!(
        dispatcher.dispatch("mqtt_shared/seattle/tahoe/state/light.x", "on"),
        ["other"]
    );
}

// =============================================================================
// Topic grammar
// =============================================================================

#[test]
fn format_then_parse_preserves_both_forms() {
    for address in [
        TopicAddress::broadcast("haven", "state", "light.porch"),
        TopicAddress::directed("seattle", "haven", "state", "light.porch"),
    ] {
        let topic = address.format("mqtt_shared");
        assert_eq!(TopicAddress::parse("mqtt_shared", &topic), Ok(address));
    }
}

#[test]
fn malformed_topics_are_errors_not_panics() {
    for topic in [
        "",
        "mqtt_shared",
        "mqtt_shared/haven/state",
        "mqtt_shared/a/b/c/d/e",
        "other/haven/state/light.porch",
    ] {
        assert!(TopicAddress::parse("mqtt_shared", topic).is_err(), "{topic:?}");
    }
    assert!(matches!(
        TopicAddress::parse("mqtt_shared", "other/haven/state/x"),
        Err(TopicError::BasePrefix { .. })
    ));
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn catch_all_and_specific_listeners_both_fire() {
    let mut dispatcher = Dispatcher::new("mqtt_shared");
    dispatcher.add_listener("print all", Pattern::any(), |d| format!("log {}", d.payload));
    dispatcher.add_listener(
        "inbound state",
        Pattern::any().fromhost("!haven").event_type("state"),
        |d| format!("state {}", d.payload),
    );
    assert_eq!(
        dispatcher.dispatch("mqtt_shared/seattle/state/light.office", "on"),
        ["log on", "state on"]
    );
    assert_eq!(
        dispatcher.dispatch("mqtt_shared/haven/state/light.porch", "off"),
        ["log off"]
    );
}

#[test]
fn decoded_payload_is_shared_across_listeners() {
    let mut dispatcher = Dispatcher::new("mqtt_shared");
    dispatcher.add_listener("a", Pattern::any(), |d| d.decoded.map(|v| v["level"].clone()));
    dispatcher.add_listener("b", Pattern::any(), |d| d.decoded.map(|v| v["level"].clone()));
    let out = dispatcher.dispatch("mqtt_shared/seattle/state/light.office", r#"{"level": 40}"#);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|v| v.as_ref().and_then(|l| l.as_u64()) == Some(40)));

    let out = dispatcher.dispatch("mqtt_shared/seattle/state/light.office", "on");
    assert_eq!(out, [None, None]);
}
