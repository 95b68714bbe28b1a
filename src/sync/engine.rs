//! Cross-host entity state mirroring.
//!
//! Every host publishes the state of its shareable entities as broadcasts:
//!
//! ```text
//! <base>/<myhost>/state/<entity>                    "on"
//! ```
//!
//! Other hosts mirror those into `<entity>_<fromhost>`. A mirrored entity is
//! changed by asking its origin host, with a directed request:
//!
//! ```text
//! <base>/<myhost>/<originhost>/state/<entity>       "off"
//! ```
//!
//! The origin applies the request to its local entity, and the resulting
//! change flows back out as an ordinary broadcast. Hosts never listen to
//! their own `fromhost`, and an entity id that already carries a host suffix
//! is never re-mirrored, so no message can chain into a mirror of a mirror.

use crate::routing::{Delivery, TopicAddress};
use crate::sync::naming::{is_valid_host_token, EntityNameCodec};
use crate::sync::service::{BinaryState, ServiceAction, ServiceCall, ServiceError, ServiceHandler};
use crate::sync::store::{StateChange, StateStore, StateUpdate};
use crate::transport::{Transport, TransportError};
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

pub const EVENT_STATE: &str = "state";
pub const EVENT_PING: &str = "ping";
pub const EVENT_PONG: &str = "pong";

pub const ATTR_ORIGIN_HOST: &str = "origin_host";
pub const ATTR_SOURCE_ENTITY: &str = "source_entity";

/// Static settings for one host's engine.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub my_host: String,
    pub base_topic: String,
    pub shared_entities: Vec<String>,
    pub service_namespace: String,
}

/// What a listener did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    Logged,
    /// A remote broadcast was written to a local mirror.
    Mirrored { entity_id: String },
    /// A directed request changed one of our shared entities.
    Applied { entity_id: String },
    Ponged { to: String },
    PongReceived { from: String },
    /// Addressed to another host.
    Ignored,
    Dropped(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Entity id already carries a host suffix.
    AlreadyMirrored,
    MissingEntity,
    /// Sender name cannot be used as a host suffix.
    InvalidHost,
    /// Sender is not in the configured peer table.
    UnknownPeer,
    /// Request targeted an entity this host does not share.
    NotShared,
    PublishFailed,
}

pub struct SyncEngine {
    options: SyncOptions,
    codec: EntityNameCodec,
    shared: BTreeSet<String>,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
}

impl SyncEngine {
    pub fn new(
        options: SyncOptions,
        codec: EntityNameCodec,
        store: Arc<dyn StateStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut codec = codec;
        if codec.known_hosts().next().is_some() {
            // our own suffix marks mirrors that peers made of our entities
            codec.register_host(&options.my_host);
        }
        let shared = options.shared_entities.iter().cloned().collect();
        Self {
            options,
            codec,
            shared,
            store,
            transport,
        }
    }

    pub fn my_host(&self) -> &str {
        &self.options.my_host
    }

    pub fn base_topic(&self) -> &str {
        &self.options.base_topic
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn codec(&self) -> &EntityNameCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn is_shared(&self, entity_id: &str) -> bool {
        self.shared.contains(entity_id)
    }

    // -------------------------------------------------------------------------
    // Outbound
    // -------------------------------------------------------------------------

    /// Install a change watch on every shareable entity. Call once at start-up.
    pub fn watch_shared_entities(self: &Arc<Self>) {
        for entity_id in &self.options.shared_entities {
            let current = self.store.get(entity_id).map(|s| s.state);
            tracing::info!(
                "registered shared entity {entity_id} -- {}",
                current.as_deref().unwrap_or("<unset>")
            );
            let engine: Weak<Self> = Arc::downgrade(self);
            self.store.on_change(
                entity_id,
                Arc::new(move |change: &StateChange| {
                    if let Some(engine) = engine.upgrade() {
                        engine.on_local_change(change);
                    }
                }),
            );
        }
    }

    fn on_local_change(&self, change: &StateChange) {
        tracing::debug!(
            "local change: {} -- {}",
            change.entity_id,
            change.new.state
        );
        if let Err(err) = self.publish_state(&change.entity_id, &change.new.state) {
            tracing::warn!("state publish for {} failed: {err}", change.entity_id);
        }
    }

    /// Broadcast the state of one local entity.
    pub fn publish_state(&self, entity_id: &str, state: &str) -> Result<(), TransportError> {
        let topic = TopicAddress::broadcast(self.my_host(), EVENT_STATE, entity_id)
            .format(self.base_topic());
        self.transport.publish(&topic, state)
    }

    /// Re-announce every shared entity that currently has a state. Used after
    /// (re)connecting so peers converge without waiting for the next change.
    pub fn publish_current_states(&self) -> usize {
        let mut sent = 0;
        for entity_id in &self.options.shared_entities {
            let Some(current) = self.store.get(entity_id) else {
                continue;
            };
            match self.publish_state(entity_id, &current.state) {
                Ok(()) => sent += 1,
                Err(err) => tracing::warn!("state announce for {entity_id} failed: {err}"),
            }
        }
        sent
    }

    pub fn send_ping(&self, nonce: &str) -> Result<(), TransportError> {
        let topic =
            TopicAddress::broadcast(self.my_host(), EVENT_PING, nonce).format(self.base_topic());
        self.transport.publish(&topic, nonce)
    }

    // -------------------------------------------------------------------------
    // Inbound
    // -------------------------------------------------------------------------

    /// Listener for `state` events from other hosts.
    pub fn handle_state(&self, delivery: &Delivery<'_>) -> ListenerOutcome {
        match delivery.tohost {
            None => self.mirror_remote_state(delivery),
            Some(tohost) if tohost == self.my_host() => self.apply_remote_request(delivery),
            Some(tohost) => {
                tracing::debug!(
                    "state request from {} for {tohost} ignored",
                    delivery.fromhost
                );
                ListenerOutcome::Ignored
            }
        }
    }

    fn mirror_remote_state(&self, delivery: &Delivery<'_>) -> ListenerOutcome {
        let Some(entity) = delivery.entity else {
            return ListenerOutcome::Dropped(DropReason::MissingEntity);
        };
        let fromhost = delivery.fromhost;
        let (base_entity, entity_host) = self.codec.split_host(entity);
        if let Some(entity_host) = entity_host {
            tracing::error!(
                "inbound state: ignoring /{fromhost}/state/{entity} -- already mirrored from {entity_host}"
            );
            return ListenerOutcome::Dropped(DropReason::AlreadyMirrored);
        }
        if !is_valid_host_token(fromhost) {
            tracing::error!("inbound state: host {fromhost:?} cannot name a mirror of {entity}");
            return ListenerOutcome::Dropped(DropReason::InvalidHost);
        }
        if self.codec.known_hosts().next().is_some()
            && !self.codec.known_hosts().any(|h| h == fromhost)
        {
            tracing::warn!("inbound state: {fromhost} is not a configured peer; dropping {entity}");
            return ListenerOutcome::Dropped(DropReason::UnknownPeer);
        }

        let mirrored = self.codec.add_host(base_entity, fromhost);
        tracing::info!("inbound state: set_state({mirrored}, state={})", delivery.payload);
        self.store.set(
            &mirrored,
            StateUpdate::new(delivery.payload)
                .with_attribute(ATTR_ORIGIN_HOST, fromhost)
                .with_attribute(ATTR_SOURCE_ENTITY, base_entity),
        );
        ListenerOutcome::Mirrored {
            entity_id: mirrored,
        }
    }

    fn apply_remote_request(&self, delivery: &Delivery<'_>) -> ListenerOutcome {
        let Some(entity) = delivery.entity else {
            return ListenerOutcome::Dropped(DropReason::MissingEntity);
        };
        if self.codec.split_host(entity).1.is_some() {
            tracing::error!(
                "state request from {}: {entity} is a mirror, not a local entity",
                delivery.fromhost
            );
            return ListenerOutcome::Dropped(DropReason::AlreadyMirrored);
        }
        if !self.is_shared(entity) {
            tracing::warn!(
                "state request from {}: {entity} is not shared by this host",
                delivery.fromhost
            );
            return ListenerOutcome::Dropped(DropReason::NotShared);
        }
        tracing::info!(
            "state request from {}: set_state({entity}, state={})",
            delivery.fromhost,
            delivery.payload
        );
        self.store.set(entity, StateUpdate::new(delivery.payload));
        ListenerOutcome::Applied {
            entity_id: entity.to_string(),
        }
    }

    /// Listener for `ping`: answer the sender with a directed `pong`.
    pub fn handle_ping(&self, delivery: &Delivery<'_>) -> ListenerOutcome {
        if delivery.tohost.is_some_and(|to| to != self.my_host()) {
            return ListenerOutcome::Ignored;
        }
        let nonce = delivery.entity.unwrap_or_default();
        let topic = TopicAddress::directed(self.my_host(), delivery.fromhost, EVENT_PONG, nonce)
            .format(self.base_topic());
        tracing::info!("PING/PONG - {topic} - {}", delivery.payload);
        match self.transport.publish(&topic, delivery.payload) {
            Ok(()) => ListenerOutcome::Ponged {
                to: delivery.fromhost.to_string(),
            },
            Err(err) => {
                tracing::warn!("pong to {} failed: {err}", delivery.fromhost);
                ListenerOutcome::Dropped(DropReason::PublishFailed)
            }
        }
    }

    pub fn handle_pong(&self, delivery: &Delivery<'_>) -> ListenerOutcome {
        tracing::info!(
            "pong from {} -- {}",
            delivery.fromhost,
            delivery.payload
        );
        ListenerOutcome::PongReceived {
            from: delivery.fromhost.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Control plane
    // -------------------------------------------------------------------------

    /// Validate a `remote_entity` call and publish the resolved value to the
    /// entity's origin host. The local mirror only changes once the origin
    /// broadcasts its new state.
    pub fn request_change(&self, call: &ServiceCall) -> Result<(), ServiceError> {
        if call.namespace != self.options.service_namespace {
            return Err(ServiceError::WrongNamespace {
                expected: self.options.service_namespace.clone(),
                actual: call.namespace.clone(),
            });
        }
        let action: ServiceAction = call.action.parse()?;
        let entity_id = call
            .entity_id
            .as_deref()
            .ok_or(ServiceError::MissingEntityId)?;

        let value = match action {
            ServiceAction::SetState => call
                .value
                .clone()
                .ok_or(ServiceError::MissingValue(action))?,
            ServiceAction::ToggleState => {
                let current = self
                    .store
                    .get(entity_id)
                    .ok_or_else(|| ServiceError::UnknownEntity(entity_id.to_string()))?;
                let binary =
                    BinaryState::parse(&current.state).ok_or_else(|| ServiceError::NotBinary {
                        entity_id: entity_id.to_string(),
                        state: current.state.clone(),
                    })?;
                binary.toggled().as_str().to_string()
            }
        };

        let (base_entity, remote_host) = self.codec.split_host(entity_id);
        let remote_host =
            remote_host.ok_or_else(|| ServiceError::NotMirrored(entity_id.to_string()))?;

        let topic = TopicAddress::directed(self.my_host(), remote_host, EVENT_STATE, base_entity)
            .format(self.base_topic());
        tracing::info!("{action}: {entity_id} -> {topic} -- {value}");
        self.transport.publish(&topic, &value)?;
        Ok(())
    }
}

impl ServiceHandler for SyncEngine {
    fn call(&self, call: &ServiceCall) -> Result<(), ServiceError> {
        self.request_change(call)
    }
}

/// Catch-all diagnostics listener.
pub fn log_delivery(delivery: &Delivery<'_>) -> ListenerOutcome {
    tracing::info!(
        "message: {}/{}/{}/{} -- {}",
        delivery.fromhost,
        delivery.tohost.unwrap_or("-"),
        delivery.event_type,
        delivery.entity.unwrap_or("-"),
        delivery.payload
    );
    ListenerOutcome::Logged
}
