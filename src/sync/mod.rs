//! Entity state synchronization between hosts.
//!
//! - `naming` - Host-suffix codec for mirrored entity ids
//! - `store` - State store seam and in-memory implementation
//! - `engine` - Outbound publishing, inbound mirroring, ping/pong
//! - `service` - `remote_entity` control-plane contract

pub mod engine;
pub mod naming;
pub mod service;
pub mod store;

pub use engine::{
    log_delivery, DropReason, ListenerOutcome, SyncEngine, SyncOptions, EVENT_PING, EVENT_PONG,
    EVENT_STATE,
};
pub use naming::{is_valid_host_token, EntityNameCodec, HOST_DELIMITER};
pub use service::{
    BinaryState, ServiceAction, ServiceCall, ServiceError, ServiceHandler, ServiceRegistry,
    REMOTE_ENTITY_SERVICE,
};
pub use store::{
    ChangeCallback, EntityState, MemoryStateStore, StateChange, StateStore, StateUpdate,
};
