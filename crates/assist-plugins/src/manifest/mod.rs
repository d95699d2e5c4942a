//! Plugin manifest types describing identity, entry point and functions.
//!
//! A manifest lives at `<root>/<name>/manifest.json`. The plugin's name is
//! the directory name, never a field of the file. Function entries act as an
//! allow-list for invocations; any extra keys they carry (descriptions,
//! parameter schemas) are preserved verbatim for front ends.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ManifestError;

/// A callable function advertised by a plugin.
///
/// # Example
///
/// ```
/// use assist_plugins::FunctionSpec;
///
/// let spec: FunctionSpec = serde_json::from_str(
///     r#"{"name": "forecast", "description": "Weather for a city"}"#,
/// )
/// .expect("valid function entry");
/// assert_eq!(spec.name(), "forecast");
/// assert!(spec.extra().contains_key("description"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    name: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl FunctionSpec {
    /// Creates a function entry with no extra metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// Returns the function name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns every other key of the entry, untouched.
    #[must_use]
    pub const fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Immutable descriptor of a plugin.
///
/// # Example
///
/// ```
/// use assist_plugins::{FunctionSpec, PluginManifest};
///
/// let manifest = PluginManifest::from_json(
///     "weather",
///     r#"{"executable": "weather.exe", "functions": [{"name": "forecast"}]}"#,
/// )
/// .expect("manifest parses");
///
/// assert_eq!(manifest.name(), "weather");
/// assert!(manifest.has_function("forecast"));
/// assert!(!manifest.is_persistent());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(skip)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    executable: Option<PathBuf>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    functions: Vec<FunctionSpec>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    persistent: bool,
}

impl PluginManifest {
    /// Creates a manifest with no functions, tags or description.
    #[must_use]
    pub fn new(name: impl Into<String>, executable: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable,
            description: String::new(),
            functions: Vec::new(),
            tags: BTreeSet::new(),
            persistent: false,
        }
    }

    /// Parses manifest JSON and binds it to `name`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is not a manifest object.
    pub fn from_json(name: impl Into<String>, text: &str) -> Result<Self, serde_json::Error> {
        let mut manifest: Self = serde_json::from_str(text)?;
        manifest.name = name.into();
        Ok(manifest)
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the advertised functions.
    #[must_use]
    pub fn with_functions(mut self, functions: Vec<FunctionSpec>) -> Self {
        self.functions = functions;
        self
    }

    /// Replaces the tag set.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the plugin for start-up with the host.
    #[must_use]
    pub const fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Rejects manifests whose function names collide.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicateFunction`] naming the first repeat.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for function in &self.functions {
            if !seen.insert(function.name()) {
                return Err(ManifestError::DuplicateFunction {
                    name: self.name.clone(),
                    function: function.name().to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the executable path relative to the plugin directory.
    #[must_use]
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the advertised functions in manifest order.
    #[must_use]
    pub fn functions(&self) -> &[FunctionSpec] {
        &self.functions
    }

    /// Returns the tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns whether the plugin starts with the host.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|spec| spec.name() == name)
    }

    /// Returns whether `name` is on the manifest's allow-list.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_some()
    }
}

/// Manifest summary annotated with the plugin's running status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Advertised functions.
    pub functions: Vec<FunctionSpec>,
    /// Tags from the manifest.
    pub tags: BTreeSet<String>,
    /// Whether the plugin starts with the host.
    pub persistent: bool,
    /// Whether a process is currently running.
    pub running: bool,
}

impl PluginInfo {
    /// Builds the summary for `manifest`.
    #[must_use]
    pub fn new(manifest: &PluginManifest, running: bool) -> Self {
        Self {
            name: manifest.name().to_owned(),
            description: manifest.description().to_owned(),
            functions: manifest.functions().to_vec(),
            tags: manifest.tags().clone(),
            persistent: manifest.is_persistent(),
            running,
        }
    }
}
