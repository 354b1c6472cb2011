// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! specview configuration.
//!
//! Configuration is layered, later layers deep-merging over earlier ones:
//!
//! 1. Built-in defaults derived from the command line ([`Invocation`]).
//! 2. The `browser-sync` field of `<root>/package.json` (or `bs.browser-sync`,
//!    or `bs`).
//! 3. A local config file, `<root>/bs-config.json` unless `--config` names
//!    another one. Files ending in `.toml` are read as TOML.
//!
//! A layer that is missing, unreadable, malformed, or that does not fit the
//! schema is skipped. Only the final listen address can be overridden from
//! the command line on top of all layers.
//!
//! # Example `bs-config.json`
//!
//! ```json
//! {
//!   "port": 8080,
//!   "files": ["/home/me/spec/*.css"],
//!   "server": { "baseDir": "/home/me/spec" },
//!   "preview": { "gracePeriodMs": 250, "bikeshed": "/opt/bikeshed/bin/bikeshed" }
//! }
//! ```

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Globs watched for plain reloads when `--watch` is not given.
pub const DEFAULT_WATCH_GLOBS: &[&str] = &["*.html", "*.css", "*.jpg", "*.png", "*.svg"];

/// Local config file looked up in the project root.
pub const LOCAL_CONFIG_FILE: &str = "bs-config.json";

/// Errors from reading a config layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// File that failed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The file is not valid TOML.
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        /// File that failed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },
    /// The file parsed but is not a key/value table.
    #[error("{0} does not contain an object")]
    NotAnObject(PathBuf),
    /// The merged configuration does not fit the schema.
    #[error("invalid configuration: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// What the command line asked for, resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Directory served as `/`.
    pub root_dir: PathBuf,
    /// URL of the file given on the command line, or `/`.
    pub start_url: String,
    /// Absolute watch globs.
    pub watch_globs: Vec<String>,
    /// Local config file to load.
    pub config_path: PathBuf,
}

impl Invocation {
    /// Resolves command-line arguments.
    ///
    /// `root` and the watch globs are relative to the directory of `file`, or
    /// to `cwd` when no file is given.
    pub fn resolve(
        file: Option<&Path>,
        root: Option<&Path>,
        watch: Option<&[String]>,
        config: Option<&Path>,
        cwd: &Path,
    ) -> Self {
        let start_path = file.map(|f| normalize(&cwd.join(f)));
        let base_dir = start_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| normalize(cwd));
        let root_dir = normalize(&base_dir.join(root.unwrap_or(Path::new("."))));

        let start_url = start_path
            .as_deref()
            .and_then(|p| url_for(&root_dir, p))
            .unwrap_or_else(|| "/".to_string());

        let watch_globs = match watch {
            Some(globs) => globs.to_vec(),
            None => DEFAULT_WATCH_GLOBS.iter().map(|g| g.to_string()).collect(),
        };
        let watch_globs = watch_globs
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(|g| normalize(&base_dir.join(g)).to_string_lossy().into_owned())
            .collect();

        let config_path = config
            .map(|c| normalize(&cwd.join(c)))
            .unwrap_or_else(|| root_dir.join(LOCAL_CONFIG_FILE));

        Self {
            root_dir,
            start_url,
            watch_globs,
            config_path,
        }
    }
}

/// Effective server configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listen port (default: 3000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen host (default: "127.0.0.1").
    #[serde(default = "default_host")]
    pub host: String,
    /// Globs that trigger a plain browser reload when matching files change.
    #[serde(default)]
    pub files: Vec<FilesEntry>,
    /// Static file serving.
    #[serde(default)]
    pub server: ServerConfig,
    /// URL printed as the entry point.
    #[serde(default = "default_start_path")]
    pub start_path: String,
    /// Show generation status messages in the browser (default: true).
    #[serde(default = "default_true")]
    pub notify: bool,
    /// Debounce window for file change events (default: 100).
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
    /// Preview generation settings.
    #[serde(default)]
    pub preview: PreviewConfig,
}

/// One entry of the `files` list, in either browser-sync spelling.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilesEntry {
    /// A single glob.
    Glob(String),
    /// `{ "match": [globs] }`.
    Match {
        /// Globs in this group.
        #[serde(rename = "match")]
        patterns: Vec<String>,
    },
}

/// Static file serving settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Directory served as `/`.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

/// Preview generation settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Delay before a newly requested page is generated (default: 500).
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Explicit Bikeshed executable; otherwise a sibling checkout or `PATH`.
    #[serde(default)]
    pub bikeshed: Option<PathBuf>,
    /// Graphviz `dot` executable (default: "dot").
    #[serde(default = "default_dot")]
    pub dot: PathBuf,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_start_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_watch_debounce_ms() -> u64 {
    100
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_grace_period_ms() -> u64 {
    500
}

fn default_dot() -> PathBuf {
    PathBuf::from("dot")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            bikeshed: None,
            dot: default_dot(),
        }
    }
}

impl Config {
    /// Loads the layered configuration for `invocation`.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in defaults themselves are rejected; broken
    /// user layers are skipped with a warning.
    pub fn load(invocation: &Invocation) -> Result<Self, ConfigError> {
        let package = package_config(&invocation.root_dir);
        let local = local_config(&invocation.config_path);
        Self::from_layers(defaults(invocation), [package, local])
    }

    /// Merges `layers` over `base`, skipping layers that fail to load or
    /// would make the result invalid.
    pub fn from_layers(
        base: Value,
        layers: impl IntoIterator<Item = Result<Option<Value>, ConfigError>>,
    ) -> Result<Self, ConfigError> {
        let mut merged = base;
        for layer in layers {
            let layer = match layer {
                Ok(Some(layer)) => layer,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring config layer");
                    continue;
                }
            };
            let mut candidate = merged.clone();
            deep_merge(&mut candidate, layer);
            match serde_json::from_value::<Config>(candidate.clone()) {
                Ok(_) => merged = candidate,
                Err(e) => tracing::warn!(error = %e, "ignoring config layer that does not fit"),
            }
        }
        serde_json::from_value(merged).map_err(ConfigError::Invalid)
    }

    /// Applies command-line overrides of the listen address.
    pub fn with_overrides(mut self, port: Option<u16>, host: Option<String>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(host) = host {
            self.host = host;
        }
        self
    }

    /// All reload globs, flattened.
    pub fn watch_globs(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|entry| match entry {
                FilesEntry::Glob(glob) => vec![glob.clone()],
                FilesEntry::Match { patterns } => patterns.clone(),
            })
            .collect()
    }

    /// Delay before a new page is first generated.
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.preview.grace_period_ms)
    }

    /// Debounce window for file events.
    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }
}

/// Built-in defaults for `invocation`, as a JSON layer.
pub fn defaults(invocation: &Invocation) -> Value {
    json!({
        "files": [{ "match": invocation.watch_globs }],
        "server": {
            "baseDir": invocation.root_dir.to_string_lossy(),
        },
        "startPath": invocation.start_url,
    })
}

/// Reads the config embedded in `<root>/package.json`.
///
/// String values `"true"`/`"false"` are coerced to booleans, as the field is
/// often written by tools that only produce strings.
pub fn package_config(root: &Path) -> Result<Option<Value>, ConfigError> {
    let path = root.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let mut package: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.clone(),
        source,
    })?;
    coerce_bool_strings(&mut package);

    let Value::Object(mut package) = package else {
        return Err(ConfigError::NotAnObject(path));
    };
    if let Some(config) = package.remove("browser-sync") {
        return Ok(Some(config));
    }
    match package.remove("bs") {
        Some(Value::Object(mut bs)) => match bs.remove("browser-sync") {
            Some(config) => Ok(Some(config)),
            None => Ok(Some(Value::Object(bs))),
        },
        Some(other) => Ok(Some(other)),
        None => Ok(None),
    }
}

/// Reads a local config file (`.json`, or `.toml` by extension).
pub fn local_config(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = if path.extension().is_some_and(|ext| ext == "toml") {
        let table: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_value(table).map_err(ConfigError::Invalid)?
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };
    if !value.is_object() {
        return Err(ConfigError::NotAnObject(path.to_path_buf()));
    }
    Ok(Some(value))
}

/// Merges `source` into `target`: objects merge key by key, anything else
/// (arrays included) replaces.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => merge_objects(target, source),
        (target, source) => *target = source,
    }
}

fn merge_objects(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        deep_merge(target.entry(key).or_insert(Value::Null), value);
    }
}

fn coerce_bool_strings(value: &mut Value) {
    match value {
        Value::String(s) => {
            let coerced = match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            };
            if let Some(b) = coerced {
                *value = Value::Bool(b);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(coerce_bool_strings),
        Value::Object(map) => map.values_mut().for_each(coerce_bool_strings),
        _ => {}
    }
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            other => result.push(other),
        }
    }
    result
}

fn url_for(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", segments.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn invocation(root: &Path) -> Invocation {
        Invocation::resolve(None, Some(root), None, None, root)
    }

    #[test]
    fn test_resolve_without_file_uses_cwd() {
        let inv = Invocation::resolve(None, None, None, None, Path::new("/work/spec"));

        assert_eq!(inv.root_dir, PathBuf::from("/work/spec"));
        assert_eq!(inv.start_url, "/");
        assert_eq!(inv.config_path, PathBuf::from("/work/spec/bs-config.json"));
        assert_eq!(inv.watch_globs[0], "/work/spec/*.html");
        assert_eq!(inv.watch_globs.len(), DEFAULT_WATCH_GLOBS.len());
    }

    #[test]
    fn test_resolve_relative_to_file() {
        let watch = vec!["*.md".to_string(), " css/*.css".to_string(), String::new()];
        let inv = Invocation::resolve(
            Some(Path::new("docs/graphs/flow.dot")),
            Some(Path::new("..")),
            Some(watch.as_slice()),
            Some(Path::new("custom.json")),
            Path::new("/work"),
        );

        assert_eq!(inv.root_dir, PathBuf::from("/work/docs"));
        assert_eq!(inv.start_url, "/graphs/flow.dot");
        assert_eq!(
            inv.watch_globs,
            vec!["/work/docs/graphs/*.md", "/work/docs/graphs/css/*.css"]
        );
        assert_eq!(inv.config_path, PathBuf::from("/work/custom.json"));
    }

    #[test]
    fn test_defaults_only() {
        let inv = Invocation::resolve(None, None, None, None, Path::new("/work"));
        let config = Config::from_layers(defaults(&inv), []).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.server.base_dir, PathBuf::from("/work"));
        assert_eq!(config.watch_globs(), inv.watch_globs);
        assert_eq!(config.grace_period(), Duration::from_millis(500));
        assert!(config.notify);
    }

    #[test]
    fn test_later_layers_win_and_merge_deeply() {
        let inv = Invocation::resolve(None, None, None, None, Path::new("/work"));
        let package = json!({ "port": 4000, "preview": { "dot": "/opt/graphviz/bin/dot" } });
        let local = json!({ "port": 5000, "preview": { "gracePeriodMs": 0 } });

        let config =
            Config::from_layers(defaults(&inv), [Ok(Some(package)), Ok(Some(local))]).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.server.base_dir, PathBuf::from("/work"));
        assert_eq!(config.preview.grace_period_ms, 0);
        assert_eq!(config.preview.dot, PathBuf::from("/opt/graphviz/bin/dot"));
    }

    #[test]
    fn test_files_replace_instead_of_merge() {
        let inv = Invocation::resolve(None, None, None, None, Path::new("/work"));
        let local = json!({ "files": ["/work/*.txt"] });

        let config = Config::from_layers(defaults(&inv), [Ok(Some(local))]).unwrap();
        assert_eq!(config.watch_globs(), vec!["/work/*.txt"]);
    }

    #[test]
    fn test_broken_layers_are_skipped() {
        let inv = Invocation::resolve(None, None, None, None, Path::new("/work"));
        let wrong_shape = json!({ "port": "not a port" });
        let failed = Err(ConfigError::NotAnObject(PathBuf::from("bs-config.json")));
        let good = json!({ "host": "0.0.0.0" });

        let config =
            Config::from_layers(defaults(&inv), [Ok(Some(wrong_shape)), failed, Ok(Some(good))])
                .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_overrides() {
        let inv = Invocation::resolve(None, None, None, None, Path::new("/work"));
        let config = Config::from_layers(defaults(&inv), [])
            .unwrap()
            .with_overrides(Some(8080), None);

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_package_config_field_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");

        fs::write(&path, r#"{"browser-sync": {"port": 1}, "bs": {"port": 2}}"#).unwrap();
        assert_eq!(package_config(dir.path()).unwrap(), Some(json!({"port": 1})));

        fs::write(&path, r#"{"bs": {"browser-sync": {"port": 3}, "port": 4}}"#).unwrap();
        assert_eq!(package_config(dir.path()).unwrap(), Some(json!({"port": 3})));

        fs::write(&path, r#"{"bs": {"port": 5}}"#).unwrap();
        assert_eq!(package_config(dir.path()).unwrap(), Some(json!({"port": 5})));

        fs::write(&path, r#"{"name": "spec"}"#).unwrap();
        assert_eq!(package_config(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_package_config_coerces_bool_strings() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"browser-sync": {"notify": "false", "nested": ["true", "x"]}}"#,
        )
        .unwrap();

        assert_eq!(
            package_config(dir.path()).unwrap(),
            Some(json!({"notify": false, "nested": [true, "x"]}))
        );
    }

    #[test]
    fn test_malformed_package_json_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();

        assert!(matches!(
            package_config(dir.path()),
            Err(ConfigError::Json { .. })
        ));
        let config = Config::load(&invocation(dir.path())).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_load_reads_local_json_over_package() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"browser-sync": {"port": 4000, "notify": "false"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join(LOCAL_CONFIG_FILE), r#"{"port": 4100}"#).unwrap();

        let config = Config::load(&invocation(dir.path())).unwrap();
        assert_eq!(config.port, 4100);
        assert!(!config.notify);
    }

    #[test]
    fn test_local_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bs-config.toml");
        fs::write(&path, "port = 4200\n\n[preview]\ndot = \"/usr/local/bin/dot\"\n").unwrap();

        let inv = Invocation::resolve(None, None, None, Some(path.as_path()), dir.path());
        let config = Config::load(&inv).unwrap();

        assert_eq!(config.port, 4200);
        assert_eq!(config.preview.dot, PathBuf::from("/usr/local/bin/dot"));
    }

    #[test]
    fn test_missing_local_config_is_none() {
        let dir = tempdir().unwrap();
        assert!(local_config(&dir.path().join("bs-config.json")).unwrap().is_none());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }
}
