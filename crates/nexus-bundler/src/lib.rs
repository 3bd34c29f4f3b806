//! The `+esm` bundler: walks a package's relative-import
//! graph over files already sitting in the cache and rewrites every bare
//! dependency specifier into another `/cdn/npm/.../+esm` request. Bundling
//! only covers specifier rewriting, not JS-semantic correctness of the
//! concatenated output (module linking, CJS/ESM interop, tree-shaking are
//! all out of scope).

mod scan;
mod version_heuristic;
mod virtual_fs;

use nexus_cache::PackageCache;
use nexus_core::NexusError;
use nexus_resolver::ResolvedPackage;
use scan::{is_bare_specifier, scan_imports};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Wraps a [`PackageCache`] to serve bundled ESM output for a resolved
/// package's entry point.
#[derive(Clone)]
pub struct Bundler {
    cache: PackageCache,
}

impl Bundler {
    #[must_use]
    pub fn new(cache: PackageCache) -> Self {
        Self { cache }
    }

    /// Produce the bundled source for `entry_path` within `resolved`.
    ///
    /// Walks every relative import reachable from `entry_path`, pulling
    /// each file from the cache (hydrating on demand), and rewrites every
    /// bare specifier found anywhere in the visited graph to point at this
    /// gateway's own `+esm` endpoint for that dependency's heuristically
    /// resolved concrete version.
    ///
    /// # Errors
    /// [`NexusError::FileNotFound`] if `entry_path` itself isn't in the
    /// package; upstream fetch failures propagate from the cache.
    pub async fn bundle_esm(
        &self,
        resolved: &ResolvedPackage,
        entry_path: &str,
    ) -> Result<String, NexusError> {
        let dependencies = self.read_dependency_ranges(resolved).await;

        let mut visited: HashSet<String> = HashSet::new();
        let mut modules: Vec<(String, String)> = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(entry_path.trim_start_matches('/').to_string());

        while let Some(path) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let (bytes, _) = self.cache.get_file(resolved, &path).await?;
            let source = String::from_utf8_lossy(&bytes).into_owned();

            for import in scan_imports(&source) {
                if is_bare_specifier(&import.raw) {
                    continue;
                }
                let joined = virtual_fs::join(&path, &import.raw);
                if let Some(found) = self.first_existing(resolved, &joined).await {
                    if !visited.contains(&found) {
                        queue.push_back(found);
                    }
                }
            }

            modules.push((path, source));
        }

        Ok(render_bundle(&modules, &dependencies))
    }

    async fn first_existing(&self, resolved: &ResolvedPackage, joined: &str) -> Option<String> {
        for candidate in virtual_fs::resolution_candidates(joined) {
            if self.cache.get_file(resolved, &candidate).await.is_ok() {
                return Some(candidate);
            }
        }
        None
    }

    /// `dependencies` merged with `peerDependencies` (peer-inclusive: a
    /// peer import should rewrite the same as a regular one, since this
    /// gateway has no notion of a consuming application supplying it).
    async fn read_dependency_ranges(&self, resolved: &ResolvedPackage) -> BTreeMap<String, String> {
        let mut ranges = BTreeMap::new();
        let Ok((bytes, _)) = self.cache.get_file(resolved, "package.json").await else {
            return ranges;
        };
        let Ok(manifest) = serde_json::from_slice::<Value>(&bytes) else {
            return ranges;
        };

        for field in ["dependencies", "peerDependencies"] {
            if let Some(map) = manifest.get(field).and_then(Value::as_object) {
                for (name, range) in map {
                    if let Some(range) = range.as_str() {
                        ranges.insert(name.clone(), range.to_string());
                    }
                }
            }
        }
        ranges
    }
}

/// Rewrite every bare-specifier occurrence in each module's source and
/// concatenate them banner-separated, entry module last.
fn render_bundle(modules: &[(String, String)], dependencies: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (path, source) in modules {
        let rewritten = rewrite_bare_specifiers(source, dependencies);
        out.push_str(&format!("// --- module: {path} ---\n"));
        out.push_str(&rewritten);
        if !rewritten.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn rewrite_bare_specifiers(source: &str, dependencies: &BTreeMap<String, String>) -> String {
    let mut rewritten = source.to_string();
    for import in scan_imports(source) {
        if !is_bare_specifier(&import.raw) {
            continue;
        }
        let target = match dependencies.get(&import.raw) {
            Some(range) => match version_heuristic::resolve_concrete_version(range) {
                Some(version) => format!("/cdn/npm/{}@{version}/+esm", import.raw),
                None => format!("/cdn/npm/{}/+esm", import.raw),
            },
            None => format!("/cdn/npm/{}/+esm", import.raw),
        };
        for quote in ['"', '\'', '`'] {
            let needle = format!("{quote}{}{quote}", import.raw);
            let replacement = format!("{quote}{target}{quote}");
            rewritten = rewritten.replace(&needle, &replacement);
        }
    }
    rewritten
}
