use std::sync::Arc;

use anyhow::Context;

use protelab_infra::{InMemoryStore, OrderLifecycleService, SubcontractingService, seed};

pub type SharedStore = Arc<InMemoryStore>;

/// Services shared by every handler.
pub struct AppServices {
    pub orders: OrderLifecycleService<SharedStore>,
    pub subcontracts: SubcontractingService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            orders: OrderLifecycleService::new(Arc::clone(&store)),
            subcontracts: SubcontractingService::new(store),
        }
    }

    /// Fresh in-memory store, optionally loaded with the demo labs.
    pub fn in_memory(seed_demo: bool) -> anyhow::Result<Self> {
        let store: SharedStore = Arc::new(InMemoryStore::new());
        if seed_demo {
            seed::seed_demo(&store).context("failed to seed demo labs")?;
        }
        Ok(Self::new(store))
    }
}
