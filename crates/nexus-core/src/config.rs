//! Process-wide configuration, assembled from CLI flags and environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which `Storage` backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process `DashMap`, nothing persisted across restarts. Default
    /// for local runs and tests.
    #[default]
    Memory,
    /// Flat files under a root directory.
    Filesystem,
}

impl StorageBackend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem => "filesystem",
        }
    }
}

/// Runtime configuration for the Nexus gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NexusConfig {
    /// Address the HTTP server binds to, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,

    /// Whether to emit JSON logs (vs. human-readable) from `tracing`.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE), layered under
    /// any `RUST_LOG` the user sets explicitly.
    pub verbosity: u8,

    /// Which storage backend to construct.
    pub storage_backend: StorageBackend,

    /// Root directory for `StorageBackend::Filesystem`. Unused otherwise.
    pub storage_root: Option<String>,

    /// GitHub API token, raises the unauthenticated rate limit on the
    /// `gh` ecosystem's tree/ref lookups. Read from `GITHUB_TOKEN`.
    pub github_token: Option<String>,

    /// registry name -> upstream base URL, for the `/mirror/<name>/...` passthrough.
    pub mirrors: BTreeMap<String, String>,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            json_logs: false,
            verbosity: 0,
            storage_backend: StorageBackend::default(),
            storage_root: None,
            github_token: None,
            mirrors: default_mirrors(),
        }
    }
}

fn default_mirrors() -> BTreeMap<String, String> {
    let mut mirrors = BTreeMap::new();
    mirrors.insert("npm".to_string(), "https://registry.npmjs.org".to_string());
    mirrors.insert("jsr".to_string(), "https://npm.jsr.io".to_string());
    mirrors
}

impl NexusConfig {
    #[must_use]
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    #[must_use]
    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.storage_backend = backend;
        self
    }

    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<String>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    /// Overlay `GITHUB_TOKEN` from the environment if set and not already present.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if self.github_token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                if !token.is_empty() {
                    self.github_token = Some(token);
                }
            }
        }
        self
    }

    /// Resolve a mirror name to its upstream base URL.
    #[must_use]
    pub fn mirror_base(&self, name: &str) -> Option<&str> {
        self.mirrors.get(name).map(String::as_str)
    }
}
