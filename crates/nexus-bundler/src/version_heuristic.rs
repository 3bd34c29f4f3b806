//! Resolves a `package.json` dependency range string to a single concrete
//! version without re-querying the upstream registry.
//!
//! This is a syntactic heuristic, not a registry lookup: the bundler only
//! ever sees files already sitting in the cache, and re-fetching a registry
//! listing per transitive dependency would defeat that. The chosen rule is
//! the declared upper bound of the range, stepped down by one minor/major
//! component, falling back to the range's declared minimum when no upper
//! bound is expressed at all (a bare `>=` or an exact pin).

use nexus_resolver::range::parse_range;
use semver::{Comparator, Op};

/// Resolve `range` (an npm-style semver range as found in `dependencies` /
/// `peerDependencies`) to a single concrete version string, e.g.
/// `"^1.2.3"` has an implied exclusive upper bound of `2.0.0`, which steps
/// down to the concrete version `"1.0.0"`.
///
/// Returns `None` when `range` isn't a resolvable range at all (`"latest"`,
/// `"*"`, a non-semver tag).
#[must_use]
pub fn resolve_concrete_version(range: &str) -> Option<String> {
    let trimmed = range.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Already a plain version (no operators) - use it directly.
    if let Some(v) = nexus_resolver::range::parse_loose_version(trimmed) {
        if trimmed.chars().next().is_some_and(|c| c.is_ascii_digit() || c == 'v') {
            return Some(v.to_string());
        }
    }

    let req = parse_range(trimmed)?;
    if req.comparators.is_empty() {
        return None;
    }

    let mut tightest_exclusive: Option<(u64, u64, u64)> = None;
    let mut tightest_inclusive: Option<(u64, u64, u64)> = None;
    let mut minimum: Option<(u64, u64, u64)> = None;

    for cmp in &req.comparators {
        match cmp.op {
            Op::Caret => update_min(&mut tightest_exclusive, caret_upper(cmp)),
            Op::Tilde => update_min(&mut tightest_exclusive, tilde_upper(cmp)),
            Op::Less => update_min(&mut tightest_exclusive, triple(cmp)),
            Op::LessEq => update_min(&mut tightest_inclusive, triple(cmp)),
            Op::Exact => {
                update_min(&mut tightest_inclusive, triple(cmp));
                update_max(&mut minimum, triple(cmp));
            }
            Op::Greater | Op::GreaterEq => update_max(&mut minimum, triple(cmp)),
            _ => {}
        }
    }

    if let Some(upper) = tightest_exclusive {
        return Some(format_triple(step_down(upper)));
    }
    if let Some(upper) = tightest_inclusive {
        return Some(format_triple(upper));
    }
    minimum.map(format_triple)
}

fn triple(cmp: &Comparator) -> (u64, u64, u64) {
    (cmp.major, cmp.minor.unwrap_or(0), cmp.patch.unwrap_or(0))
}

fn caret_upper(cmp: &Comparator) -> (u64, u64, u64) {
    if cmp.major > 0 {
        return (cmp.major + 1, 0, 0);
    }
    match cmp.minor {
        None => (1, 0, 0),
        Some(0) => match cmp.patch {
            None => (0, 1, 0),
            Some(p) => (0, 0, p + 1),
        },
        Some(m) => (0, m + 1, 0),
    }
}

fn tilde_upper(cmp: &Comparator) -> (u64, u64, u64) {
    match cmp.minor {
        None => (cmp.major + 1, 0, 0),
        Some(m) => (cmp.major, m + 1, 0),
    }
}

fn step_down(upper: (u64, u64, u64)) -> (u64, u64, u64) {
    let (major, minor, patch) = upper;
    if patch > 0 {
        (major, minor, patch - 1)
    } else if minor > 0 {
        (major, minor - 1, 0)
    } else if major > 0 {
        (major - 1, 0, 0)
    } else {
        (0, 0, 0)
    }
}

fn update_min(slot: &mut Option<(u64, u64, u64)>, candidate: (u64, u64, u64)) {
    *slot = Some(match *slot {
        Some(current) if current <= candidate => current,
        _ => candidate,
    });
}

fn update_max(slot: &mut Option<(u64, u64, u64)>, candidate: (u64, u64, u64)) {
    *slot = Some(match *slot {
        Some(current) if current >= candidate => current,
        _ => candidate,
    });
}

fn format_triple((major, minor, patch): (u64, u64, u64)) -> String {
    format!("{major}.{minor}.{patch}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_passes_through() {
        assert_eq!(resolve_concrete_version("1.2.3"), Some("1.2.3".to_string()));
    }

    #[test]
    fn caret_range_steps_down_from_next_major() {
        assert_eq!(resolve_concrete_version("^1.2.3"), Some("1.0.0".to_string()));
    }

    #[test]
    fn caret_major_zero_steps_down_from_next_minor() {
        assert_eq!(resolve_concrete_version("^0.2.3"), Some("0.2.0".to_string()));
    }

    #[test]
    fn tilde_range_steps_down_from_next_minor() {
        assert_eq!(resolve_concrete_version("~1.4.0"), Some("1.3.0".to_string()));
    }

    #[test]
    fn bare_major_minor_expands_then_resolves() {
        // "18" expands (via parse_range) to >=18.0.0, <19.0.0
        assert_eq!(resolve_concrete_version("18"), Some("18.0.0".to_string()));
    }

    #[test]
    fn bare_greater_equal_falls_back_to_minimum() {
        assert_eq!(resolve_concrete_version(">=3.1.0"), Some("3.1.0".to_string()));
    }

    #[test]
    fn non_range_tags_are_unresolvable() {
        assert_eq!(resolve_concrete_version("latest"), None);
        assert_eq!(resolve_concrete_version("*"), None);
        assert_eq!(resolve_concrete_version(""), None);
    }
}
