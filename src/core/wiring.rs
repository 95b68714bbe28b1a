//! Start-up wiring: listeners, watches, services and subscriptions.

use crate::routing::{Dispatcher, Pattern};
use crate::sync::{
    log_delivery, ListenerOutcome, ServiceRegistry, SyncEngine, EVENT_PING, EVENT_PONG,
    EVENT_STATE, REMOTE_ENTITY_SERVICE,
};
use crate::transport::{subscription_filter, Transport, TransportError};
use std::sync::Arc;

pub const LISTENER_PRINT_ALL: &str = "print all";
pub const LISTENER_PING_PONG: &str = "ping/pong";
pub const LISTENER_PONG: &str = "pong";
pub const LISTENER_INBOUND_STATE: &str = "inbound state";

/// Register the engine's listeners. Every pattern excludes our own host so
/// our publishes never echo back into the engine.
pub fn register_listeners(
    dispatcher: &mut Dispatcher<ListenerOutcome>,
    engine: &Arc<SyncEngine>,
    log_all_messages: bool,
) {
    let not_me = format!("!{}", engine.my_host());

    if log_all_messages {
        dispatcher.add_listener(LISTENER_PRINT_ALL, Pattern::any(), log_delivery);
    }

    let pinged = engine.clone();
    dispatcher.add_listener(
        LISTENER_PING_PONG,
        Pattern::any().fromhost(&not_me).event_type(EVENT_PING),
        move |d| pinged.handle_ping(d),
    );

    let ponged = engine.clone();
    dispatcher.add_listener(
        LISTENER_PONG,
        Pattern::any()
            .fromhost(&not_me)
            .tohost(engine.my_host())
            .event_type(EVENT_PONG),
        move |d| ponged.handle_pong(d),
    );

    let inbound = engine.clone();
    dispatcher.add_listener(
        LISTENER_INBOUND_STATE,
        Pattern::any().fromhost(&not_me).event_type(EVENT_STATE),
        move |d| inbound.handle_state(d),
    );
}

pub fn register_services(services: &mut ServiceRegistry, engine: &Arc<SyncEngine>) {
    services.register(REMOTE_ENTITY_SERVICE, engine.clone());
}

/// Subscribe to the whole shared namespace.
pub fn subscribe(transport: &dyn Transport, base_topic: &str) -> Result<(), TransportError> {
    let filter = subscription_filter(base_topic);
    tracing::info!("subscribing to {filter}");
    transport.subscribe(&filter)
}

/// Everything a host needs for steady-state dispatch.
pub struct Wired {
    pub engine: Arc<SyncEngine>,
    pub dispatcher: Dispatcher<ListenerOutcome>,
    pub services: ServiceRegistry,
}

/// Wire one engine: listeners, services and watches. Subscriptions are left
/// to the caller since they must be repeated on every reconnect.
pub fn wire(engine: Arc<SyncEngine>, log_all_messages: bool) -> Wired {
    let mut dispatcher = Dispatcher::new(engine.base_topic());
    register_listeners(&mut dispatcher, &engine, log_all_messages);
    let mut services = ServiceRegistry::new();
    register_services(&mut services, &engine);
    engine.watch_shared_entities();
    Wired {
        engine,
        dispatcher,
        services,
    }
}
