//! Compile-time catalog of plugin constructors, keyed by manifest name.

use crate::echo::EchoPlugin;
use colloquy_core::Plugin;
use std::collections::BTreeMap;

/// Builds a fresh plugin instance.
pub type PluginFactory = fn() -> Box<dyn Plugin>;

pub struct PluginCatalog {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// The catalog with every built-in plugin.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.add("echo", || Box::new(EchoPlugin));
        catalog
    }

    /// Add a constructor. Replaces any existing entry with the same name.
    pub fn add(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Plugin>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Catalog names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
