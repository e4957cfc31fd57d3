use std::cell::RefCell;
use std::collections::HashMap;

/// Durable string key-value storage (browser `localStorage` or an in-memory map).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStorage;

#[cfg(target_arch = "wasm32")]
mod browser {
    use gloo_storage::{LocalStorage, Storage};

    use super::KeyValueStore;

    /// `window.localStorage`, holding plain strings rather than JSON-encoded values.
    /// Write failures (quota, private mode) are logged and dropped.
    #[derive(Clone, Copy, Default)]
    pub struct BrowserStorage;

    impl KeyValueStore for BrowserStorage {
        fn get(&self, key: &str) -> Option<String> {
            LocalStorage::raw().get_item(key).ok().flatten()
        }

        fn set(&self, key: &str, value: &str) {
            if let Err(e) = LocalStorage::raw().set_item(key, value) {
                tracing::warn!(key, error = ?e, "localStorage write failed");
            }
        }

        fn remove(&self, key: &str) {
            if let Err(e) = LocalStorage::raw().remove_item(key) {
                tracing::warn!(key, error = ?e, "localStorage remove failed");
            }
        }
    }
}

/// Process-local storage used natively and in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (key, value) in entries {
            store.set(key, value);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}
