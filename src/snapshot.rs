//! Remote configuration snapshot
//!
//! A [`ConfigSnapshot`] is the last configuration document fetched from the
//! daemon. It is immutable: a refresh builds a new snapshot and publishes it
//! as a whole, so readers never observe a half-updated document.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::backend::ConfigBackend;
use crate::types::{Parameter, Scope};
use crate::Result;

/// Camera entry from the document's camera list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Display metadata for a parameter category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub display: String,
}

/// The configuration document as served by `GET /0/api/config`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub version: String,
    /// Camera list; keyed by camera number plus a `count` entry
    #[serde(default)]
    pub cameras: HashMap<String, serde_json::Value>,
    /// Parameters keyed by scope name (`default`, `cam1`, `1`, ...); each
    /// entry is decoded on its own when the snapshot is built
    #[serde(default)]
    pub configuration: HashMap<String, HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub categories: HashMap<String, Category>,
}

/// Immutable view of the daemon configuration across all scopes.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    version: String,
    csrf_token: Option<String>,
    defaults: HashMap<String, Parameter>,
    overrides: BTreeMap<u32, HashMap<String, Parameter>>,
    cameras: BTreeMap<u32, CameraInfo>,
    categories: BTreeMap<i64, Category>,
}

impl ConfigSnapshot {
    /// Parse a snapshot from the daemon's JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Build a snapshot from a decoded document.
    ///
    /// Unknown scope keys and parameters that do not decode are logged and
    /// skipped.
    pub fn from_document(document: ConfigDocument) -> Result<Self> {
        let mut defaults = HashMap::new();
        let mut overrides = BTreeMap::new();

        for (key, params) in document.configuration {
            let Ok(scope) = key.parse::<Scope>() else {
                warn!("Skipping configuration for unknown scope key '{}'", key);
                continue;
            };
            let params = decode_parameters(&key, params);
            match scope {
                Scope::Default => defaults = params,
                Scope::Camera(id) => {
                    overrides.insert(id, params);
                }
            }
        }

        let mut cameras = BTreeMap::new();
        for (key, value) in document.cameras {
            if key == "count" {
                continue;
            }
            match serde_json::from_value::<CameraInfo>(value) {
                Ok(info) => {
                    cameras.insert(info.id, info);
                }
                Err(e) => warn!("Skipping camera entry '{}': {}", key, e),
            }
        }

        let mut categories = BTreeMap::new();
        for (key, category) in document.categories {
            match key.parse::<i64>() {
                Ok(index) => {
                    categories.insert(index, category);
                }
                Err(_) => warn!("Skipping category with non-numeric key '{}'", key),
            }
        }

        debug!(
            "Snapshot built: {} default params, {} camera scopes, {} cameras",
            defaults.len(),
            overrides.len(),
            cameras.len()
        );

        Ok(Self {
            version: document.version,
            csrf_token: document.csrf_token,
            defaults,
            overrides,
            cameras,
            categories,
        })
    }

    /// Build a snapshot directly from parameter sets.
    pub fn from_parts(
        defaults: impl IntoIterator<Item = Parameter>,
        overrides: impl IntoIterator<Item = (u32, Vec<Parameter>)>,
    ) -> Self {
        let to_map = |params: Vec<Parameter>| {
            params.into_iter().map(|p| (p.name.clone(), p)).collect::<HashMap<_, _>>()
        };
        Self {
            defaults: to_map(defaults.into_iter().collect()),
            overrides: overrides.into_iter().map(|(id, params)| (id, to_map(params))).collect(),
            ..Self::default()
        }
    }

    /// Daemon version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// CSRF token delivered with this document, if any.
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Cameras known to the daemon, ordered by id.
    pub fn cameras(&self) -> impl Iterator<Item = &CameraInfo> {
        self.cameras.values()
    }

    /// Display metadata for a category index.
    pub fn category(&self, index: i64) -> Option<&Category> {
        self.categories.get(&index)
    }

    /// Every scope this snapshot can resolve: the default plus each camera.
    pub fn scopes(&self) -> Vec<Scope> {
        let mut ids: Vec<u32> = self.cameras.keys().chain(self.overrides.keys()).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        std::iter::once(Scope::Default).chain(ids.into_iter().map(Scope::Camera)).collect()
    }

    /// The default scope's parameters.
    pub fn defaults(&self) -> &HashMap<String, Parameter> {
        &self.defaults
    }

    /// A camera's own parameters, without default fallthrough.
    pub fn overrides(&self, camera: u32) -> Option<&HashMap<String, Parameter>> {
        self.overrides.get(&camera)
    }

    /// Resolve one parameter for a scope (camera override, else default).
    pub fn resolve(&self, scope: Scope, name: &str) -> Option<&Parameter> {
        if let Scope::Camera(id) = scope {
            if let Some(param) = self.overrides.get(&id).and_then(|p| p.get(name)) {
                return Some(param);
            }
        }
        self.defaults.get(name)
    }

    /// Resolve every parameter of a scope.
    pub fn resolved_scope(&self, scope: Scope) -> HashMap<&str, &Parameter> {
        let mut resolved: HashMap<&str, &Parameter> =
            self.defaults.iter().map(|(k, v)| (k.as_str(), v)).collect();
        if let Scope::Camera(id) = scope {
            if let Some(own) = self.overrides.get(&id) {
                resolved.extend(own.iter().map(|(k, v)| (k.as_str(), v)));
            }
        }
        resolved
    }

    /// Number of distinct parameter names resolvable in `scope`.
    pub fn scope_len(&self, scope: Scope) -> usize {
        let own = match scope {
            Scope::Default => None,
            Scope::Camera(id) => self.overrides.get(&id),
        };
        match own {
            None => self.defaults.len(),
            Some(own) => {
                self.defaults.len() + own.keys().filter(|k| !self.defaults.contains_key(*k)).count()
            }
        }
    }
}

/// Holder of the current snapshot, shared by readers and the apply engine.
///
/// Snapshots are published through a watch channel and replaced whole.
/// [`invalidate`](Self::invalidate) marks the current one stale until the
/// next successful refresh.
#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Arc<ConfigSnapshot>>,
    stale: AtomicBool,
}

impl SnapshotStore {
    /// Create a store holding `initial`.
    pub fn new(initial: ConfigSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx, stale: AtomicBool::new(false) }
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.tx.borrow().clone()
    }

    /// Publish a new snapshot, replacing the old one.
    pub fn replace(&self, snapshot: ConfigSnapshot) -> Arc<ConfigSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&snapshot));
        self.stale.store(false, Ordering::Release);
        snapshot
    }

    /// Mark the current snapshot as no longer trustworthy.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Check if the current snapshot has been invalidated since its fetch.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Invalidate, then fetch and publish a fresh snapshot.
    ///
    /// On failure the old snapshot stays published and stays stale.
    pub async fn refresh<B>(&self, backend: &B) -> Result<Arc<ConfigSnapshot>>
    where
        B: ConfigBackend + ?Sized,
    {
        self.invalidate();
        let snapshot = backend.fetch_config().await?;
        info!("Configuration snapshot refreshed (daemon {})", snapshot.version());
        Ok(self.replace(snapshot))
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.tx.subscribe()
    }

    /// Stream of snapshots: the current one first, then each replacement.
    pub fn updates(&self) -> impl Stream<Item = Arc<ConfigSnapshot>> + 'static {
        WatchStream::new(self.tx.subscribe())
    }
}

fn decode_parameters(
    scope: &str,
    params: HashMap<String, serde_json::Value>,
) -> HashMap<String, Parameter> {
    params
        .into_iter()
        .filter_map(|(name, value)| match serde_json::from_value::<Parameter>(value) {
            Ok(mut param) => {
                param.name.clone_from(&name);
                Some((name, param))
            }
            Err(e) => {
                warn!("Skipping parameter '{}' in scope '{}': {}", name, scope, e);
                None
            }
        })
        .collect()
}
