//! Runtime feature toggles seeded from configuration.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Default)]
pub struct FeatureToggles {
    toggles: RwLock<HashMap<String, bool>>,
}

impl FeatureToggles {
    pub fn new(initial: HashMap<String, bool>) -> Self {
        Self {
            toggles: RwLock::new(initial),
        }
    }

    /// Unknown toggles are disabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.toggles.read().get(name).copied().unwrap_or(false)
    }

    /// Flip a toggle, returning its previous value
    pub fn set(&self, name: &str, enabled: bool) -> bool {
        let previous = self
            .toggles
            .write()
            .insert(name.to_string(), enabled)
            .unwrap_or(false);
        info!(toggle = name, enabled, previous, "🎚️ Feature toggle updated");
        previous
    }

    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.toggles.read().clone()
    }
}
