use crate::traits::VendorStorage;
use skybridge_core::{SkybridgeError, SkybridgeResult, Vendor};
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatch table from vendor to its storage backend
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<Vendor, Arc<dyn VendorStorage>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under the vendor it reports. Replaces any previous entry.
    pub fn register(&mut self, backend: Arc<dyn VendorStorage>) -> &mut Self {
        let vendor = backend.vendor();
        if self.backends.insert(vendor, backend).is_some() {
            tracing::warn!(vendor = %vendor, "Replacing registered storage backend");
        } else {
            tracing::debug!(vendor = %vendor, "Registered storage backend");
        }
        self
    }

    pub fn with(mut self, backend: Arc<dyn VendorStorage>) -> Self {
        self.register(backend);
        self
    }

    pub fn get(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn VendorStorage>> {
        self.backends
            .get(&vendor)
            .cloned()
            .ok_or(SkybridgeError::VendorUnsupported {
                vendor,
                capability: "storage",
            })
    }

    pub fn contains(&self, vendor: Vendor) -> bool {
        self.backends.contains_key(&vendor)
    }

    /// Registered vendors, in `Vendor` order.
    pub fn vendors(&self) -> Vec<Vendor> {
        let mut vendors: Vec<Vendor> = self.backends.keys().copied().collect();
        vendors.sort();
        vendors
    }
}
