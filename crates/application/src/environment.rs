//! The shared environment scripts read and write.
//!
//! [`EnvironmentStore`] is a cheaply clonable handle: every clone sees the same
//! map, so a script's `set` is visible immediately to whoever else holds it.
//! Keys keep the order they were first inserted in, which is also the order
//! placeholders are substituted in by [`EnvironmentStore::resolve_variables`].

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Thread-safe, insertion-ordered string key/value store.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentStore {
    inner: Arc<RwLock<IndexMap<String, String>>>,
}

impl EnvironmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `variables`, in iteration order.
    #[must_use]
    pub fn with_variables<I, K, V>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        store.extend(variables);
        store
    }

    /// Inserts or overwrites `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.write().insert(key.into(), value.into());
    }

    /// Inserts every pair, later pairs overwriting earlier ones.
    pub fn extend<I, K, V>(&self, variables: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = self.inner.write();
        for (key, value) in variables {
            map.insert(key.into(), value.into());
        }
    }

    /// Returns the value of `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    /// Whether `key` is set.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Removes `key`. Does nothing if it is absent.
    pub fn delete(&self, key: &str) {
        self.inner.write().shift_remove(key);
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// A copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.inner.read().clone()
    }

    /// Replaces every `{{key}}` in `text` with the key's value.
    ///
    /// Keys are substituted one after another in insertion order, each pass
    /// working on the output of the previous one. Placeholders with no
    /// matching key are left as they are.
    #[must_use]
    pub fn resolve_variables(&self, text: &str) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }
        let map = self.inner.read();
        map.iter().fold(text.to_string(), |acc, (key, value)| {
            let placeholder = format!("{{{{{key}}}}}");
            if acc.contains(&placeholder) {
                acc.replace(&placeholder, value)
            } else {
                acc
            }
        })
    }

    /// Names of the `{{name}}` placeholders in `text` that are not set.
    #[must_use]
    pub fn unresolved_placeholders(&self, text: &str) -> Vec<String> {
        let map = self.inner.read();
        placeholder_names(text)
            .into_iter()
            .filter(|name| !map.contains_key(name))
            .collect()
    }
}

fn placeholder_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() && !name.contains("{{") && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[end + 2..];
    }
    names
}
