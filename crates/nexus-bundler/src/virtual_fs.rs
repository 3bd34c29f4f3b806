//! Path resolution over a package's already-cached files: joining a
//! relative import specifier against the importing module's directory, with
//! the handful of extension-less resolution candidates ESM loaders try.

/// Join `spec` (a `./` or `../` relative specifier) against the directory
/// containing `from_path`, normalizing `.`/`..` components. Both inputs use
/// `/`-separated archive-style paths (no leading slash).
#[must_use]
pub fn join(from_path: &str, spec: &str) -> String {
    let mut segments: Vec<&str> = from_path
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    for part in spec.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Candidate paths to try, in order, when resolving an extension-less
/// relative import (`./util` -> `./util.js`, `./util/index.js`, ...).
#[must_use]
pub fn resolution_candidates(joined: &str) -> Vec<String> {
    if has_known_extension(joined) {
        return vec![joined.to_string()];
    }
    vec![
        joined.to_string(),
        format!("{joined}.js"),
        format!("{joined}.mjs"),
        format!("{joined}.json"),
        format!("{joined}/index.js"),
        format!("{joined}/index.mjs"),
    ]
}

fn has_known_extension(path: &str) -> bool {
    path.ends_with(".js")
        || path.ends_with(".mjs")
        || path.ends_with(".cjs")
        || path.ends_with(".json")
}
