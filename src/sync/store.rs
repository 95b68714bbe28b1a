//! Entity state store seam.
//!
//! The hosting platform owns entity state; this crate only needs `get`,
//! `set`, `exists` and change notification. [`MemoryStateStore`] is the
//! in-process implementation used by the runtime and tests.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

/// Snapshot of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub state: String,
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip)]
    pub last_changed: Option<SystemTime>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: BTreeMap::new(),
            last_changed: None,
        }
    }

    /// Combine a previous snapshot with an update, producing a new snapshot.
    /// Attributes are merged key by key; the update wins on conflicts.
    pub fn merged(previous: Option<&EntityState>, update: &StateUpdate) -> EntityState {
        let mut attributes = previous
            .map(|p| p.attributes.clone())
            .unwrap_or_default();
        attributes.extend(
            update
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let changed = previous.map_or(true, |p| p.state != update.state);
        EntityState {
            state: update.state.clone(),
            attributes,
            last_changed: if changed {
                Some(SystemTime::now())
            } else {
                previous.and_then(|p| p.last_changed)
            },
        }
    }
}

/// Fields written by one `set` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateUpdate {
    pub state: String,
    pub attributes: BTreeMap<String, Value>,
}

impl StateUpdate {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// Notification raised when an entity's state value changes.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub entity_id: String,
    pub old: Option<EntityState>,
    pub new: EntityState,
}

pub type ChangeCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// State storage provided by the hosting platform.
pub trait StateStore: Send + Sync {
    fn get(&self, entity_id: &str) -> Option<EntityState>;

    /// Write `update` over the current snapshot. Watchers fire only when the
    /// state value actually changes.
    fn set(&self, entity_id: &str, update: StateUpdate);

    fn exists(&self, entity_id: &str) -> bool {
        self.get(entity_id).is_some()
    }

    fn on_change(&self, entity_id: &str, callback: ChangeCallback);
}

#[derive(Default)]
struct StoreInner {
    entities: BTreeMap<String, EntityState>,
    watchers: HashMap<String, Vec<ChangeCallback>>,
}

/// In-memory store with synchronous change notification.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, EntityState> {
        self.inner.lock().entities.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.inner.lock().entities.get(entity_id).cloned()
    }

    fn set(&self, entity_id: &str, update: StateUpdate) {
        // Watchers run after the lock is released so they may read the store.
        let (change, watchers) = {
            let mut inner = self.inner.lock();
            let old = inner.entities.get(entity_id).cloned();
            let new = EntityState::merged(old.as_ref(), &update);
            inner.entities.insert(entity_id.to_string(), new.clone());
            if old.as_ref().is_some_and(|o| o.state == new.state) {
                return;
            }
            let watchers = inner.watchers.get(entity_id).cloned().unwrap_or_default();
            (
                StateChange {
                    entity_id: entity_id.to_string(),
                    old,
                    new,
                },
                watchers,
            )
        };
        for watcher in watchers {
            watcher(&change);
        }
    }

    fn on_change(&self, entity_id: &str, callback: ChangeCallback) {
        self.inner
            .lock()
            .watchers
            .entry(entity_id.to_string())
            .or_default()
            .push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn merge_keeps_previous_attributes() {
        let old = EntityState::merged(
            None,
            &StateUpdate::new("on").with_attribute("origin_host", "haven"),
        );
        let update = StateUpdate::new("off").with_attribute("brightness", 10);
        let new = EntityState::merged(Some(&old), &update);
        assert_eq!(new.state, "off");
        assert_eq!(new.attributes["origin_host"], "haven");
        assert_eq!(new.attributes["brightness"], 10);
        // previous snapshot untouched
        assert_eq!(old.state, "on");
        assert!(!old.attributes.contains_key("brightness"));
    }

    #[test]
    fn watchers_fire_only_on_state_change() {
        let store = MemoryStateStore::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        store.on_change(
            "light.porch",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        store.set("light.porch", StateUpdate::new("on"));
        store.set("light.porch", StateUpdate::new("on").with_attribute("x", 1));
        store.set("light.porch", StateUpdate::new("off"));
        store.set("light.other", StateUpdate::new("off"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(store.get("light.porch").unwrap().attributes["x"], 1);
    }

    #[test]
    fn watcher_sees_old_and_new() {
        let store = MemoryStateStore::new();
        store.set("switch.fan", StateUpdate::new("off"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reader = store.clone();
        store.on_change(
            "switch.fan",
            Arc::new(move |change| {
                // reading back inside the callback must not deadlock
                let current = reader.get(&change.entity_id).map(|s| s.state);
                sink.lock().push((
                    change.old.as_ref().map(|s| s.state.clone()),
                    change.new.state.clone(),
                    current,
                ));
            }),
        );
        store.set("switch.fan", StateUpdate::new("on"));
        let seen = seen.lock();
        assert_eq!(
            seen.as_slice(),
            &[(Some("off".to_string()), "on".to_string(), Some("on".to_string()))]
        );
    }

    #[test]
    fn exists_follows_get() {
        let store = MemoryStateStore::new();
        assert!(!store.exists("sensor.x"));
        store.set("sensor.x", StateUpdate::new("1"));
        assert!(store.exists("sensor.x"));
        assert_eq!(store.len(), 1);
    }
}
