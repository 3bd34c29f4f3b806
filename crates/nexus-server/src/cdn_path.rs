//! CDN path grammar: splitting the wildcard tail of a
//! `/cdn/<ecosystem>/...` route into `(name, version-spec, relative-path)`.
//!
//! These are pure string-splitting functions, independent of axum, so the
//! grammar can be exercised without spinning up a router.

use nexus_core::NexusError;

/// Split `name[@spec]` into its name and optional spec.
fn split_spec(segment: &str) -> (String, Option<String>) {
    match segment.split_once('@') {
        Some((name, spec)) if !name.is_empty() => (name.to_string(), Some(spec.to_string())),
        _ => (segment.to_string(), None),
    }
}

fn split_first(rest: &str) -> (&str, String) {
    rest.split_once('/')
        .map(|(a, b)| (a, b.to_string()))
        .unwrap_or((rest, String::new()))
}

/// `@scope/name[@spec][/path]` or `name[@spec][/path]`.
#[must_use]
pub fn parse_npm_like(rest: &str) -> (String, Option<String>, String) {
    if let Some(scope_rest) = rest.strip_prefix('@') {
        let Some((pkg_part, remainder)) = scope_rest.split_once('/') else {
            return (format!("@{scope_rest}"), None, String::new());
        };
        let (name_and_spec, path) = split_first(remainder);
        let (name, spec) = split_spec(name_and_spec);
        (format!("@{pkg_part}/{name}"), spec, path)
    } else {
        let (name_and_spec, path) = split_first(rest);
        let (name, spec) = split_spec(name_and_spec);
        (name, spec, path)
    }
}

/// `owner/repo[@spec][/path]`.
///
/// # Errors
/// [`NexusError::BadRequest`] if `rest` doesn't carry at least `owner/repo`.
pub fn parse_gh_path(rest: &str) -> Result<(String, Option<String>, String), NexusError> {
    let mut segments = rest.splitn(3, '/');
    let owner = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NexusError::bad_request("missing GitHub owner segment"))?;
    let repo_and_spec = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NexusError::bad_request("missing GitHub repo segment"))?;
    let path = segments.next().unwrap_or("").to_string();
    let (repo, spec) = split_spec(repo_and_spec);
    Ok((format!("{owner}/{repo}"), spec, path))
}

/// `library[@version][/path]`, the cdnjs form in the route table.
#[must_use]
pub fn parse_cdnjs_path(rest: &str) -> (String, Option<String>, String) {
    let (name_and_spec, path) = split_first(rest);
    let (name, spec) = split_spec(name_and_spec);
    (name, spec, path)
}

/// `plugins/<slug>/(tags/<ver>|trunk)[/path]` or `themes/<slug>/<ver>[/path]`.
///
/// Returns `(name, version, path)` where `name` is `plugins/<slug>` or
/// `themes/<slug>` and `version` is exactly the string
/// [`nexus_resolver::ResolvedPackage`]'s key construction expects (`"trunk"`,
/// `"tags/<v>"`, or a bare theme version).
///
/// # Errors
/// [`NexusError::BadRequest`] for anything not matching the grammar above.
pub fn parse_wp_path(rest: &str) -> Result<(String, String, String), NexusError> {
    let (kind, remainder) = split_first(rest);
    if remainder.is_empty() {
        return Err(NexusError::bad_request("missing WordPress slug segment"));
    }
    let (slug, tail) = split_first(&remainder);
    let slug = slug.to_string();

    match kind {
        "themes" => {
            let (version, path) = split_first(&tail);
            if version.is_empty() {
                return Err(NexusError::bad_request("missing WordPress theme version"));
            }
            Ok((format!("themes/{slug}"), version.to_string(), path))
        }
        "plugins" => {
            if tail == "trunk" || tail.starts_with("trunk/") {
                let path = tail.strip_prefix("trunk").unwrap_or("").trim_start_matches('/');
                Ok((format!("plugins/{slug}"), "trunk".to_string(), path.to_string()))
            } else if let Some(tag_rest) = tail.strip_prefix("tags/") {
                let (version, path) = split_first(tag_rest);
                if version.is_empty() {
                    return Err(NexusError::bad_request("missing WordPress plugin tag version"));
                }
                Ok((format!("plugins/{slug}"), format!("tags/{version}"), path))
            } else {
                Err(NexusError::bad_request(
                    "WordPress plugin path must be trunk or tags/<version>",
                ))
            }
        }
        _ => Err(NexusError::bad_request(
            "WordPress path must start with plugins/ or themes/",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_scoped_with_spec_and_path() {
        assert_eq!(
            parse_npm_like("@babel/core@7.20.0/lib/index.js"),
            ("@babel/core".to_string(), Some("7.20.0".to_string()), "lib/index.js".to_string())
        );
    }

    #[test]
    fn npm_unscoped_no_spec() {
        assert_eq!(
            parse_npm_like("uikit/dist/js/uikit.js"),
            ("uikit".to_string(), None, "dist/js/uikit.js".to_string())
        );
    }

    #[test]
    fn npm_root_with_spec_no_path() {
        assert_eq!(
            parse_npm_like("react@18"),
            ("react".to_string(), Some("18".to_string()), String::new())
        );
    }

    #[test]
    fn npm_scoped_root_no_spec() {
        assert_eq!(
            parse_npm_like("@scope/pkg"),
            ("@scope/pkg".to_string(), None, String::new())
        );
    }

    #[test]
    fn gh_with_spec_and_path() {
        assert_eq!(
            parse_gh_path("vuejs/core@v3.4.0/package.json").unwrap(),
            ("vuejs/core".to_string(), Some("v3.4.0".to_string()), "package.json".to_string())
        );
    }

    #[test]
    fn gh_missing_repo_is_bad_request() {
        assert!(parse_gh_path("vuejs").is_err());
    }

    #[test]
    fn cdnjs_with_spec() {
        assert_eq!(
            parse_cdnjs_path("jquery@3.7.1/jquery.min.js"),
            ("jquery".to_string(), Some("3.7.1".to_string()), "jquery.min.js".to_string())
        );
    }

    #[test]
    fn wp_plugin_trunk() {
        assert_eq!(
            parse_wp_path("plugins/akismet/trunk/readme.txt").unwrap(),
            ("plugins/akismet".to_string(), "trunk".to_string(), "readme.txt".to_string())
        );
    }

    #[test]
    fn wp_plugin_tag() {
        assert_eq!(
            parse_wp_path("plugins/akismet/tags/5.3").unwrap(),
            ("plugins/akismet".to_string(), "tags/5.3".to_string(), String::new())
        );
    }

    #[test]
    fn wp_theme() {
        assert_eq!(
            parse_wp_path("themes/twentytwentyfour/1.2/style.css").unwrap(),
            ("themes/twentytwentyfour".to_string(), "1.2".to_string(), "style.css".to_string())
        );
    }

    #[test]
    fn wp_plugin_missing_tag_shape_is_bad_request() {
        assert!(parse_wp_path("plugins/akismet/5.3").is_err());
    }
}
