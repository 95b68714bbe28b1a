//! Common test harness for integration tests.
//!
//! A [`Mesh`] stands in for the broker: every host publishes into its own
//! `MemoryTransport`, and [`Mesh::pump`] delivers each drained message to
//! every host's dispatcher (the sender included, as a real broker would).

// Not all test files use all helpers; silence dead_code warnings for unused exports.
#![allow(dead_code)]

use statesync::core::wiring::{self, Wired};
use statesync::sync::{
    EntityNameCodec, ListenerOutcome, MemoryStateStore, StateStore, StateUpdate, SyncEngine,
    SyncOptions,
};
use statesync::transport::MemoryTransport;
use std::sync::Arc;

pub const BASE: &str = "mqtt_shared";

pub struct Host {
    pub name: String,
    pub store: MemoryStateStore,
    pub transport: MemoryTransport,
    pub wired: Wired,
}

impl Host {
    pub fn new(name: &str, shared: &[&str], peers: &[&str]) -> Self {
        let store = MemoryStateStore::new();
        let transport = MemoryTransport::new();
        let engine = Arc::new(SyncEngine::new(
            SyncOptions {
                my_host: name.to_string(),
                base_topic: BASE.to_string(),
                shared_entities: shared.iter().map(|s| s.to_string()).collect(),
                service_namespace: "default".to_string(),
            },
            EntityNameCodec::with_known_hosts(peers.iter().copied()),
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
        ));
        let wired = wiring::wire(engine, false);
        wiring::subscribe(&transport, BASE).expect("subscribe");
        Self {
            name: name.to_string(),
            store,
            transport,
            wired,
        }
    }

    pub fn set(&self, entity_id: &str, state: &str) {
        self.store.set(entity_id, StateUpdate::new(state));
    }

    pub fn state(&self, entity_id: &str) -> Option<String> {
        self.store.get(entity_id).map(|s| s.state)
    }
}

/// One delivered message and what the receiving host's listeners did with it.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub to: String,
    pub topic: String,
    pub payload: String,
    pub outcomes: Vec<ListenerOutcome>,
}

pub struct Mesh {
    pub hosts: Vec<Host>,
}

impl Mesh {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }

    pub fn host(&self, name: &str) -> &Host {
        self.hosts
            .iter()
            .find(|h| h.name == name)
            .unwrap_or_else(|| panic!("no host {name}"))
    }

    /// Deliver queued messages until no host publishes anything new.
    pub fn pump(&self) -> Vec<Delivered> {
        let mut log = Vec::new();
        for _ in 0..32 {
            let mut outbox = Vec::new();
            for host in &self.hosts {
                outbox.extend(host.transport.drain());
            }
            if outbox.is_empty() {
                return log;
            }
            for message in outbox {
                for host in &self.hosts {
                    let outcomes = host
                        .wired
                        .dispatcher
                        .dispatch(&message.topic, &message.payload);
                    log.push(Delivered {
                        to: host.name.clone(),
                        topic: message.topic.clone(),
                        payload: message.payload.clone(),
                        outcomes,
                    });
                }
            }
        }
        panic!("mesh did not quiesce: messages keep chaining");
    }
}
