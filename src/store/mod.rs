//! Per-instance message store
//!
//! Maps locale codes to their dictionaries and remembers which namespaces
//! have been merged into each locale. A namespace marked loaded for a
//! locale has always been merged into that locale's dictionary; replacing
//! a loaded locale's dictionary drops its markers with it.
//!
//! A locale counts as loaded only once its own dictionary was seeded or
//! set. Merging a namespace into an unloaded locale creates a dictionary
//! for it without marking the locale loaded.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::messages::{find_by_path, Messages};

/// Locale-keyed dictionaries plus loaded-namespace bookkeeping
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    locales: HashMap<String, Messages>,
    loaded: HashSet<String>,
    namespaces: HashMap<String, HashSet<String>>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with static dictionaries
    pub fn with_messages(messages: HashMap<String, Messages>) -> Self {
        Self {
            loaded: messages.keys().cloned().collect(),
            locales: messages,
            namespaces: HashMap::new(),
        }
    }

    /// Replace a locale's dictionary wholesale
    ///
    /// On the first load of a locale, namespaces merged before it are carried
    /// over into the new dictionary. Later replacements drop them.
    pub fn set_locale(&mut self, locale: &str, mut messages: Messages) {
        let first_load = self.loaded.insert(locale.to_string());
        let previous = self.locales.remove(locale);

        match (first_load, previous) {
            (true, Some(previous)) => {
                for namespace in self.namespaces.get(locale).into_iter().flatten() {
                    if let Some(Value::Object(fragment)) = previous.as_map().get(namespace) {
                        messages.merge_namespace(namespace, Messages::from(fragment.clone()));
                    }
                }
            }
            _ => {
                self.namespaces.remove(locale);
            }
        }

        self.locales.insert(locale.to_string(), messages);
    }

    /// Check if the main dictionary for `locale` has been loaded
    ///
    /// Namespace merges alone do not count.
    pub fn has_locale(&self, locale: &str) -> bool {
        self.loaded.contains(locale)
    }

    /// Dictionary for `locale`
    pub fn get(&self, locale: &str) -> Option<&Messages> {
        self.locales.get(locale)
    }

    /// Merge a namespace fragment into `locale` and mark it loaded
    ///
    /// Creates the locale's dictionary if it does not exist yet, without
    /// marking the locale itself loaded.
    pub fn merge_namespace(&mut self, locale: &str, namespace: &str, fragment: Messages) {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .merge_namespace(namespace, fragment);
        self.namespaces
            .entry(locale.to_string())
            .or_default()
            .insert(namespace.to_string());
    }

    /// Check if `namespace` has been merged into `locale`
    pub fn has_namespace(&self, locale: &str, namespace: &str) -> bool {
        self.namespaces
            .get(locale)
            .is_some_and(|set| set.contains(namespace))
    }

    /// Find `key` in the first locale of `chain` that resolves it
    ///
    /// Returns the matching locale alongside the message.
    pub fn resolve<'a, S: AsRef<str>>(
        &'a self,
        chain: &'a [S],
        key: &str,
    ) -> Option<(&'a str, &'a str)> {
        chain.iter().find_map(|locale| {
            let locale = locale.as_ref();
            self.locales
                .get(locale)
                .and_then(|messages| find_by_path(messages, key))
                .map(|message| (locale, message))
        })
    }

    /// Locales with a dictionary, sorted
    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.locales.keys().cloned().collect();
        locales.sort();
        locales
    }

    /// Clone of every dictionary
    pub fn snapshot(&self) -> HashMap<String, Messages> {
        self.locales.clone()
    }
}
