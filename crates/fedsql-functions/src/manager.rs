//! Reloadable function library
//!
//! Readers take a snapshot (`Arc<FunctionLibrary>`) and keep it for a whole
//! resolution pass. Writers rebuild a complete replacement library from the
//! registered sources and publish it with one pointer swap, so a reader never
//! sees a partially built library.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::config::FunctionLibraryConfig;
use crate::library::FunctionLibrary;
use crate::source::FunctionSource;
use crate::system::SystemSource;
use crate::tree::FunctionTree;

/// Owner of the current function library
pub struct FunctionLibraryManager {
    config: FunctionLibraryConfig,
    system: Arc<FunctionTree>,
    current: RwLock<Arc<FunctionLibrary>>,
    /// Guards the user sources and serializes writers
    sources: Mutex<Vec<Arc<dyn FunctionSource>>>,
}

impl FunctionLibraryManager {
    /// Create a manager with the built-in system functions
    pub fn new(config: FunctionLibraryConfig) -> Self {
        Self::with_system_source(&SystemSource::new(), config)
    }

    /// Create a manager around a custom system source
    pub fn with_system_source(system: &dyn FunctionSource, config: FunctionLibraryConfig) -> Self {
        let system = Arc::new(FunctionTree::from_source(system, &config));
        let library = FunctionLibrary::new(system.clone(), Vec::new());
        Self {
            config,
            system,
            current: RwLock::new(Arc::new(library)),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// The library as of now
    pub fn snapshot(&self) -> Arc<FunctionLibrary> {
        self.current.read().clone()
    }

    /// Names of the registered user sources
    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .lock()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Add a user source, replacing any source with the same name
    pub fn add_source(&self, source: Arc<dyn FunctionSource>) {
        let mut sources = self.sources.lock();
        match sources.iter().position(|s| s.name() == source.name()) {
            Some(index) => sources[index] = source,
            None => sources.push(source),
        }
        self.publish(&sources);
    }

    /// Remove a user source by name
    ///
    /// Returns `false` if no such source is registered.
    pub fn remove_source(&self, name: &str) -> bool {
        let mut sources = self.sources.lock();
        let before = sources.len();
        sources.retain(|s| s.name() != name);
        if sources.len() == before {
            return false;
        }
        self.publish(&sources);
        true
    }

    /// Rebuild every user tree from its source
    pub fn reload(&self) {
        let sources = self.sources.lock();
        self.publish(&sources);
    }

    fn publish(&self, sources: &[Arc<dyn FunctionSource>]) {
        let user = sources
            .iter()
            .map(|source| Arc::new(FunctionTree::from_source(source.as_ref(), &self.config)))
            .collect::<Vec<_>>();
        let library = Arc::new(FunctionLibrary::new(self.system.clone(), user));

        log::debug!(
            "Publishing function library with {} user source(s)",
            sources.len()
        );
        *self.current.write() = library;
    }
}

impl Default for FunctionLibraryManager {
    fn default() -> Self {
        Self::new(FunctionLibraryConfig::default())
    }
}
