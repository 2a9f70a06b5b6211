use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::session::KeyValueStore;

/// In-memory KeyValueStore for testing and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    async fn put(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    async fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }
}
