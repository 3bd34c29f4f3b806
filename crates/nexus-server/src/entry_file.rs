//! Per-ecosystem entry-file selection.

use nexus_cache::PackageCache;
use nexus_core::NexusError;
use nexus_resolver::ResolvedPackage;
use serde_json::Value;

/// npm: `browser` -> `main` -> `module` -> `index.js`, read from the
/// resolved version's registry metadata.
#[must_use]
pub fn npm_entry(resolved: &ResolvedPackage) -> String {
    version_field(resolved)
        .and_then(|v| {
            v.get("browser")
                .and_then(Value::as_str)
                .or_else(|| v.get("main").and_then(Value::as_str))
                .or_else(|| v.get("module").and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| "index.js".to_string())
        .trim_start_matches("./")
        .to_string()
}

/// JSR: the `exports` field (string, or the `"."` entry, following nested
/// `default`), falling back to `mod.ts`.
#[must_use]
pub fn jsr_entry(resolved: &ResolvedPackage) -> String {
    version_field(resolved)
        .and_then(|v| v.get("exports"))
        .and_then(resolve_export_entry)
        .unwrap_or_else(|| "mod.ts".to_string())
}

fn resolve_export_entry(exports: &Value) -> Option<String> {
    match exports {
        Value::String(s) => Some(s.trim_start_matches("./").to_string()),
        Value::Object(map) => {
            let entry = map.get(".")?;
            match entry {
                Value::String(s) => Some(s.trim_start_matches("./").to_string()),
                Value::Object(nested) => nested.get("default").and_then(resolve_export_entry),
                _ => None,
            }
        }
        _ => None,
    }
}

/// cdnjs: the library API's `filename` field.
#[must_use]
pub fn cdnjs_entry(resolved: &ResolvedPackage) -> Option<String> {
    resolved
        .metadata
        .as_ref()?
        .get("filename")?
        .as_str()
        .map(str::to_string)
}

/// GitHub: `README.md` if present, else `index.js`, else a 404.
///
/// # Errors
/// [`NexusError::FileNotFound`] if neither file exists at this ref.
pub async fn gh_entry(cache: &PackageCache, resolved: &ResolvedPackage) -> Result<String, NexusError> {
    if cache.get_file(resolved, "README.md").await.is_ok() {
        return Ok("README.md".to_string());
    }
    if cache.get_file(resolved, "index.js").await.is_ok() {
        return Ok("index.js".to_string());
    }
    Err(NexusError::file_not_found(
        &resolved.key.name,
        &resolved.key.version,
        "README.md or index.js",
    ))
}

fn version_field(resolved: &ResolvedPackage) -> Option<&Value> {
    resolved
        .metadata
        .as_ref()?
        .get("versions")?
        .get(&resolved.key.version)
}
