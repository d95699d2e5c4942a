//! Discovery and caching of plugin manifests under a root directory.
//!
//! Each immediate subdirectory of the root that contains a `manifest.json`
//! is a plugin; the directory name is the plugin name. Manifests are read
//! once and cached for the life of the store. Edits on disk are not picked
//! up until the host restarts.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::error::ManifestError;
use crate::manifest::PluginManifest;

/// File name of a plugin manifest inside its directory.
pub const MANIFEST_FILE: &str = "manifest.json";

const STORE_TARGET: &str = "assist_plugins::store";

/// Read-mostly cache of manifests rooted at one plugin directory.
///
/// # Example
///
/// ```no_run
/// use assist_plugins::ManifestStore;
///
/// let store = ManifestStore::new("/opt/assist/plugins");
/// for name in store.discover() {
///     let manifest = store.get_or_load(&name).expect("manifest loads");
///     println!("{name}: {}", manifest.description());
/// }
/// ```
#[derive(Debug)]
pub struct ManifestStore {
    root: PathBuf,
    cache: RwLock<HashMap<String, Arc<PluginManifest>>>,
}

impl ManifestStore {
    /// Creates a store over `root`. The directory need not exist yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the plugin root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists plugin names under the root, sorted and without duplicates.
    ///
    /// A missing or unreadable root yields an empty list and a warning.
    #[must_use]
    pub fn discover(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    target: STORE_TARGET,
                    root = %self.root.display(),
                    %error,
                    "plugin root is not readable"
                );
                return Vec::new();
            }
        };

        let mut names = BTreeSet::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.join(MANIFEST_FILE).is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => {
                    names.insert(name);
                }
                Err(raw) => debug!(
                    target: STORE_TARGET,
                    directory = ?raw,
                    "skipping plugin directory with a non UTF-8 name"
                ),
            }
        }
        debug!(target: STORE_TARGET, count = names.len(), "discovered plugins");
        names.into_iter().collect()
    }

    /// Reads, parses and caches the manifest for `name`.
    ///
    /// A successful load replaces any cached entry.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the name is not a plain directory name,
    /// the file is absent or unreadable, or its contents are malformed.
    pub fn load(&self, name: &str) -> Result<Arc<PluginManifest>, ManifestError> {
        let path = self.manifest_path(name)?;
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ManifestError::NotFound {
                    name: name.to_owned(),
                    path: path.clone(),
                }
            } else {
                ManifestError::Read {
                    name: name.to_owned(),
                    path: path.clone(),
                    source: Arc::new(source),
                }
            }
        })?;

        let parsed =
            PluginManifest::from_json(name, &text).map_err(|source| ManifestError::Malformed {
                name: name.to_owned(),
                path: path.clone(),
                source: Arc::new(source),
            })?;
        parsed.validate()?;

        let manifest = Arc::new(parsed);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), Arc::clone(&manifest));
        debug!(
            target: STORE_TARGET,
            plugin = name,
            functions = manifest.functions().len(),
            "loaded plugin manifest"
        );
        Ok(manifest)
    }

    /// Returns the cached manifest without touching the filesystem.
    #[must_use]
    pub fn get_cached(&self, name: &str) -> Option<Arc<PluginManifest>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns the cached manifest, loading it on first use.
    ///
    /// # Errors
    ///
    /// Propagates [`ManifestStore::load`] failures.
    pub fn get_or_load(&self, name: &str) -> Result<Arc<PluginManifest>, ManifestError> {
        self.get_cached(name).map_or_else(|| self.load(name), Ok)
    }

    /// Returns `<root>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidName`] if `name` is not one plain
    /// path component.
    pub fn plugin_dir(&self, name: &str) -> Result<PathBuf, ManifestError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Returns `<root>/<name>/manifest.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidName`] for unsafe names.
    pub fn manifest_path(&self, name: &str) -> Result<PathBuf, ManifestError> {
        Ok(self.plugin_dir(name)?.join(MANIFEST_FILE))
    }
}

fn validate_name(name: &str) -> Result<(), ManifestError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(ManifestError::InvalidName {
            name: name.to_owned(),
        }),
    }
}
