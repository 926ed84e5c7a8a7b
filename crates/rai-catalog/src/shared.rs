//! # Shared Catalog Handle
//!
//! Process-wide catalog with explicit reload. Readers take an `Arc`
//! snapshot and never hold the lock; a reload swaps the snapshot without
//! touching any selection already confirmed from an older one.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::StandardsCatalog;
use crate::error::CatalogError;

/// Cloneable handle to the current catalog.
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    current: Arc<RwLock<Arc<StandardsCatalog>>>,
}

impl SharedCatalog {
    pub fn new(catalog: StandardsCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// The catalog as of now. Later reloads do not affect the snapshot.
    pub fn snapshot(&self) -> Arc<StandardsCatalog> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a new catalog.
    pub fn replace(&self, catalog: StandardsCatalog) {
        *self.current.write() = Arc::new(catalog);
    }

    /// Reload from a decision-tree directory. On error the current catalog
    /// stays in place.
    pub fn reload_from(&self, dir: &Path) -> Result<(), CatalogError> {
        let fresh = StandardsCatalog::load_dir(dir)?;
        self.replace(fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSection;

    fn one(name: &str) -> StandardsCatalog {
        StandardsCatalog::from_sections([CatalogSection {
            section: name.to_string(),
            title: String::new(),
            description: String::new(),
            items: Vec::new(),
            file_name: String::new(),
        }])
    }

    #[test]
    fn snapshot_survives_replace() {
        let shared = SharedCatalog::new(one("IAS 1"));
        let before = shared.snapshot();
        shared.replace(one("IAS 2"));
        assert!(before.contains("IAS_1"));
        assert!(shared.snapshot().contains("IAS_2"));
        assert!(!shared.snapshot().contains("IAS_1"));
    }

    #[test]
    fn failed_reload_keeps_current() {
        let shared = SharedCatalog::new(one("IAS 1"));
        assert!(shared.reload_from(Path::new("/nonexistent/catalog")).is_err());
        assert!(shared.snapshot().contains("IAS_1"));
    }

    #[test]
    fn clones_share_state() {
        let a = SharedCatalog::default();
        let b = a.clone();
        a.replace(one("IAS 7"));
        assert!(b.snapshot().contains("IAS_7"));
    }
}
