//! Semver range matching over a set of published version strings.
//!
//! node-semver and Cargo's `semver::VersionReq` diverge on bare partial
//! specifiers: Cargo treats a bare `1.2` as caret (`>=1.2.0, <2.0.0`) while
//! npm treats it as `>=1.2.0, <1.3.0`. Explicit operators (`^`, `~`, `>=`,
//! comparison chains) already agree closely enough between the two for this
//! gateway's purposes, so only the bare-partial case is translated by hand
//! before handing off to `semver::VersionReq::parse`.

use semver::{Version, VersionReq};

/// Parse a version string that may carry a leading `v` (GitHub tags, cdnjs)
/// into a [`Version`], padding missing minor/patch components with zero so
/// `max_satisfying` can compare versions like `"3"` or `"3.4"`.
#[must_use]
pub fn parse_loose_version(raw: &str) -> Option<Version> {
    let stripped = raw.strip_prefix('v').unwrap_or(raw);
    if let Ok(v) = Version::parse(stripped) {
        return Some(v);
    }
    let parts: Vec<&str> = stripped.splitn(3, '.').collect();
    let padded = match parts.as_slice() {
        [major] => format!("{major}.0.0"),
        [major, minor] => format!("{major}.{minor}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

/// Translate an npm-style range specifier into a [`VersionReq`].
///
/// Returns `None` for specifiers that are not ranges at all (`"latest"`,
/// `"*"`, empty) — callers handle those as the dist-tag / "any" cases
/// separately, per the resolver's version-matching algorithm.
#[must_use]
pub fn parse_range(spec: &str) -> Option<VersionReq> {
    let spec = spec.trim();
    if spec.is_empty() || spec == "latest" || spec == "*" || spec == "x" {
        return None;
    }

    let stripped = spec.strip_prefix('v').unwrap_or(spec);
    let is_bare = stripped
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());

    if is_bare {
        let parts: Vec<&str> = stripped.splitn(3, '.').collect();
        let expanded = match parts.as_slice() {
            [major] => {
                let next = major.parse::<u64>().ok()? + 1;
                format!(">={major}.0.0, <{next}.0.0")
            }
            [major, minor] => {
                let next = minor.parse::<u64>().ok()? + 1;
                format!(">={major}.{minor}.0, <{major}.{next}.0")
            }
            _ => return VersionReq::parse(stripped).ok(),
        };
        return VersionReq::parse(&expanded).ok();
    }

    VersionReq::parse(stripped).ok()
}

/// The highest published version in `versions` that satisfies `spec`, or
/// `None` if no published version matches or `spec` is not a range.
#[must_use]
pub fn max_satisfying<'a>(versions: &'a [String], spec: &str) -> Option<&'a str> {
    let req = parse_range(spec)?;
    versions
        .iter()
        .filter_map(|v| parse_loose_version(v).map(|parsed| (v.as_str(), parsed)))
        .filter(|(_, parsed)| req.matches(parsed))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(raw, _)| raw)
}

/// `versions` sorted by descending semver, skipping entries that don't parse.
#[must_use]
pub fn sort_descending(versions: &[String]) -> Vec<&str> {
    let mut parsed: Vec<(&str, Version)> = versions
        .iter()
        .filter_map(|v| parse_loose_version(v).map(|p| (v.as_str(), p)))
        .collect();
    parsed.sort_by(|(_, a), (_, b)| b.cmp(a));
    parsed.into_iter().map(|(raw, _)| raw).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_major_matches_minor_range() {
        let v = versions(&["17.0.0", "18.0.0", "18.3.1", "18.2.0"]);
        assert_eq!(max_satisfying(&v, "18"), Some("18.3.1"));
    }

    #[test]
    fn caret_range() {
        let v = versions(&["1.1.0", "1.2.5", "1.9.9", "2.0.0"]);
        assert_eq!(max_satisfying(&v, "^1.2"), Some("1.9.9"));
    }

    #[test]
    fn latest_and_star_are_not_ranges() {
        assert!(parse_range("latest").is_none());
        assert!(parse_range("*").is_none());
        assert!(parse_range("").is_none());
    }

    #[test]
    fn leading_v_is_tolerated() {
        let v = versions(&["v3.3.0", "v3.4.0", "v3.5.1"]);
        assert_eq!(max_satisfying(&v, "v3.4.0"), Some("v3.4.0"));
        assert_eq!(max_satisfying(&v, "^3.4"), Some("v3.5.1"));
    }

    #[test]
    fn no_match_returns_none() {
        let v = versions(&["1.0.0"]);
        assert_eq!(max_satisfying(&v, "^99"), None);
    }

    #[test]
    fn sort_descending_orders_correctly() {
        let v = versions(&["1.0.0", "2.0.0", "1.5.0"]);
        assert_eq!(sort_descending(&v), vec!["2.0.0", "1.5.0", "1.0.0"]);
    }
}
