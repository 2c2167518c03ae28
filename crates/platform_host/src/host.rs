//! Host service bundle injected into the desktop runtime.

use std::rc::Rc;

use crate::{
    AppStateStore, CatalogTable, GenerationService, IdentityService, MemoryAppStateStore,
    MemoryCatalogTable, MemoryIdentityService, MemoryPrefsStore, NoopAppStateStore,
    NoopCatalogTable, NoopGenerationService, NoopIdentityService, NoopPrefsStore, PrefsStore,
};

/// Runtime-selected host service bundle.
///
/// All environment-specific service selection happens before this bundle crosses into
/// `desktop_runtime`, which keeps the runtime and app crates decoupled from adapter details.
#[derive(Clone)]
pub struct HostServices {
    /// Durable versioned app-state store.
    pub app_state: Rc<dyn AppStateStore>,
    /// Lightweight typed preference store.
    pub prefs: Rc<dyn PrefsStore>,
    /// Auth session provider.
    pub identity: Rc<dyn IdentityService>,
    /// Remote app catalog tables.
    pub catalog: Rc<dyn CatalogTable>,
    /// Text-generation backend facade.
    pub generation: Rc<dyn GenerationService>,
}

impl HostServices {
    /// Bundle where every service is a no-op.
    pub fn noop() -> Self {
        Self {
            app_state: Rc::new(NoopAppStateStore),
            prefs: Rc::new(NoopPrefsStore),
            identity: Rc::new(NoopIdentityService),
            catalog: Rc::new(NoopCatalogTable),
            generation: Rc::new(NoopGenerationService),
        }
    }

    /// Bundle backed by fresh in-memory adapters and no generation backend.
    pub fn in_memory() -> Self {
        Self {
            app_state: Rc::new(MemoryAppStateStore::default()),
            prefs: Rc::new(MemoryPrefsStore::default()),
            identity: Rc::new(MemoryIdentityService::default()),
            catalog: Rc::new(MemoryCatalogTable::default()),
            generation: Rc::new(NoopGenerationService),
        }
    }

    /// Replaces the generation backend.
    pub fn with_generation(mut self, generation: Rc<dyn GenerationService>) -> Self {
        self.generation = generation;
        self
    }

    /// Replaces the catalog tables.
    pub fn with_catalog(mut self, catalog: Rc<dyn CatalogTable>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replaces the identity provider.
    pub fn with_identity(mut self, identity: Rc<dyn IdentityService>) -> Self {
        self.identity = identity;
        self
    }

    /// Replaces both storage services.
    pub fn with_storage(
        mut self,
        app_state: Rc<dyn AppStateStore>,
        prefs: Rc<dyn PrefsStore>,
    ) -> Self {
        self.app_state = app_state;
        self.prefs = prefs;
        self
    }
}
