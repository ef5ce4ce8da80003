//! Live service wiring
//!
//! A wired store service is a chain of layers. Each layer can hand back
//! the layer it wraps (`unwrap_layer`); configured layers also carry the
//! `StoreConfiguration` the service was built from. Eligibility for
//! replay is decided by walking the chain from the outside in.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaDescriptor;

/// How a configured store persists its writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalType {
    #[default]
    None,
    /// One journal file per store
    Single,
    /// Sharded journals; not replayable here
    Multiple,
}

/// Settings a configured store was built from
#[derive(Debug, Clone)]
pub struct StoreConfiguration {
    pub schema: Arc<SchemaDescriptor>,
    pub collection: String,
    /// Journal file, relative paths resolve against the loader's journal directory
    pub journal: PathBuf,
    pub journal_type: JournalType,
    /// Name of an explicitly wrapped inner store, if any
    pub inner_store: Option<String>,
    pub write_only: bool,
    pub read_only: bool,
    pub nullify: bool,
}

impl StoreConfiguration {
    /// Single-journal store with no flags set
    pub fn journaled(
        schema: Arc<SchemaDescriptor>,
        collection: impl Into<String>,
        journal: impl Into<PathBuf>,
    ) -> Self {
        Self {
            schema,
            collection: collection.into(),
            journal: journal.into(),
            journal_type: JournalType::Single,
            inner_store: None,
            write_only: false,
            read_only: false,
            nullify: false,
        }
    }

    /// True when the store's journal can be replayed into a fresh adapter
    pub fn is_replay_eligible(&self) -> bool {
        self.journal_type == JournalType::Single
            && self.inner_store.is_none()
            && !self.write_only
            && !self.read_only
            && !self.nullify
    }
}

/// One layer of a wired store service
pub trait StoreLayer: Send + Sync {
    fn name(&self) -> &str;

    /// Configuration carried by this layer
    fn configuration(&self) -> Option<&StoreConfiguration> {
        None
    }

    /// The wrapped layer; `None` at the end of the chain
    fn unwrap_layer(&self) -> Option<Arc<dyn StoreLayer>> {
        None
    }
}

impl fmt::Debug for dyn StoreLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreLayer({})", self.name())
    }
}

/// Decorator layer with no configuration of its own
pub struct ProxyLayer {
    name: String,
    delegate: Option<Arc<dyn StoreLayer>>,
}

impl ProxyLayer {
    pub fn new(name: impl Into<String>, delegate: Arc<dyn StoreLayer>) -> Self {
        Self {
            name: name.into(),
            delegate: Some(delegate),
        }
    }

    /// A layer that wraps nothing
    pub fn terminal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delegate: None,
        }
    }
}

impl StoreLayer for ProxyLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn unwrap_layer(&self) -> Option<Arc<dyn StoreLayer>> {
        self.delegate.clone()
    }
}

/// Layer built from a `StoreConfiguration`
pub struct ConfiguredLayer {
    name: String,
    config: StoreConfiguration,
    delegate: Option<Arc<dyn StoreLayer>>,
}

impl ConfiguredLayer {
    pub fn new(name: impl Into<String>, config: StoreConfiguration) -> Self {
        Self {
            name: name.into(),
            config,
            delegate: None,
        }
    }

    /// Wrap another layer
    pub fn wrapping(mut self, delegate: Arc<dyn StoreLayer>) -> Self {
        self.delegate = Some(delegate);
        self
    }
}

impl StoreLayer for ConfiguredLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Option<&StoreConfiguration> {
        Some(&self.config)
    }

    fn unwrap_layer(&self) -> Option<Arc<dyn StoreLayer>> {
        self.delegate.clone()
    }
}

/// Walks from `outer` inwards and returns the first configuration that is
/// replay eligible.
pub fn find_eligible(outer: &Arc<dyn StoreLayer>) -> Option<StoreConfiguration> {
    let mut current = Some(Arc::clone(outer));
    while let Some(layer) = current {
        if let Some(config) = layer.configuration() {
            if config.is_replay_eligible() {
                return Some(config.clone());
            }
        }
        current = layer.unwrap_layer();
    }
    None
}

/// A service as wired in the running system
#[derive(Clone)]
pub enum LiveService {
    /// A record store, outermost layer first
    Store(Arc<dyn StoreLayer>),
    /// Anything else; the string names its kind
    Other(String),
}

/// Live services by id
#[derive(Clone, Default)]
pub struct ServiceDirectory {
    services: HashMap<String, LiveService>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, service: LiveService) {
        self.services.insert(id.into(), service);
    }

    pub fn register_store(&mut self, id: impl Into<String>, outer: Arc<dyn StoreLayer>) {
        self.register(id, LiveService::Store(outer));
    }

    pub fn get(&self, id: &str) -> Option<&LiveService> {
        self.services.get(id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Why a candidate is not replayed. Skips are logged, never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoDescriptor,
    PatternMismatch,
    NotWired,
    NotStore,
    NotFound,
    EmptyJournal,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoDescriptor => "no service script",
            SkipReason::PatternMismatch => "not a configured store script",
            SkipReason::NotWired => "service not wired",
            SkipReason::NotStore => "service not a store",
            SkipReason::NotFound => "not found",
            SkipReason::EmptyJournal => "empty journal",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn config() -> StoreConfiguration {
        let schema = SchemaDescriptor::builder("Person")
            .identity("id", FieldType::String)
            .build()
            .unwrap();
        StoreConfiguration::journaled(schema, "people", "people.journal")
    }

    #[test]
    fn test_eligibility_flags() {
        assert!(config().is_replay_eligible());

        let mut c = config();
        c.journal_type = JournalType::Multiple;
        assert!(!c.is_replay_eligible());

        let mut c = config();
        c.inner_store = Some("cache".into());
        assert!(!c.is_replay_eligible());

        for flag in 0..3 {
            let mut c = config();
            match flag {
                0 => c.write_only = true,
                1 => c.read_only = true,
                _ => c.nullify = true,
            }
            assert!(!c.is_replay_eligible());
        }
    }

    #[test]
    fn test_find_eligible_unwraps_proxies() {
        let configured: Arc<dyn StoreLayer> = Arc::new(ConfiguredLayer::new("people", config()));
        let outer: Arc<dyn StoreLayer> = Arc::new(ProxyLayer::new(
            "auth",
            Arc::new(ProxyLayer::new("cache", configured)),
        ));

        let found = find_eligible(&outer).unwrap();
        assert_eq!(found.collection, "people");
    }

    #[test]
    fn test_find_eligible_skips_ineligible_outer_config() {
        let mut read_only = config();
        read_only.read_only = true;
        read_only.collection = "outer".into();

        let inner: Arc<dyn StoreLayer> = Arc::new(ConfiguredLayer::new("inner", config()));
        let outer: Arc<dyn StoreLayer> =
            Arc::new(ConfiguredLayer::new("outer", read_only).wrapping(inner));

        assert_eq!(find_eligible(&outer).unwrap().collection, "people");
    }

    #[test]
    fn test_find_eligible_chain_ends() {
        let outer: Arc<dyn StoreLayer> = Arc::new(ProxyLayer::new(
            "auth",
            Arc::new(ProxyLayer::terminal("storage")),
        ));
        assert!(find_eligible(&outer).is_none());
    }

    #[test]
    fn test_directory() {
        let mut directory = ServiceDirectory::new();
        assert!(directory.is_empty());
        directory.register_store("people", Arc::new(ProxyLayer::terminal("people")));
        directory.register("clock", LiveService::Other("clock".into()));
        assert_eq!(directory.len(), 2);
        assert!(matches!(directory.get("people"), Some(LiveService::Store(_))));
        assert!(matches!(directory.get("clock"), Some(LiveService::Other(_))));
        assert!(directory.get("nothing").is_none());
    }
}
