#![allow(dead_code, unused_imports)]

use std::sync::Arc;

use readygate::config::ConfigFile;
use readygate::engine::Engine;
use readygate::store::{Entity, MemoryStore};

pub use readygate_test_utils::builders;
pub use readygate_test_utils::{fixed_now, hours_from_now, init_tracing, notification};

pub const PROJECT: &str = "proj-1";

/// Insert each entity as-is.
pub fn seed<T: Entity>(store: &MemoryStore, entities: &[T]) {
    for e in entities {
        store.insert(e).expect("seed entity");
    }
}

/// Engine with default config and a pinned clock.
pub fn engine(store: &MemoryStore) -> Engine<MemoryStore> {
    engine_with(store, ConfigFile::default())
}

pub fn engine_with(store: &MemoryStore, cfg: ConfigFile) -> Engine<MemoryStore> {
    Engine::new(Arc::new(store.clone()), cfg).with_clock(fixed_now)
}
