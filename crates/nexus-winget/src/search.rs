//! `manifestSearch` match-type semantics.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One of the seven match strategies `manifestSearch` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Exact,
    CaseInsensitive,
    StartsWith,
    Substring,
    Wildcard,
    Fuzzy,
    FuzzySubstring,
}

impl Default for MatchType {
    fn default() -> Self {
        Self::CaseInsensitive
    }
}

/// Does `candidate` match `keyword` under `match_type`? Both sides are
/// matched case-insensitively except where the match type says otherwise.
#[must_use]
pub fn matches(candidate: &str, keyword: &str, match_type: MatchType) -> bool {
    let candidate_lower = candidate.to_lowercase();
    let keyword_lower = keyword.to_lowercase();

    match match_type {
        MatchType::Exact => candidate_lower == keyword_lower,
        MatchType::CaseInsensitive | MatchType::Substring => {
            candidate_lower.contains(&keyword_lower)
        }
        MatchType::StartsWith => candidate_lower.starts_with(&keyword_lower),
        MatchType::Wildcard => wildcard_matches(&candidate_lower, &keyword_lower),
        MatchType::Fuzzy => is_subsequence(&keyword_lower, &candidate_lower),
        MatchType::FuzzySubstring => candidate_lower
            .split_whitespace()
            .any(|word| is_subsequence(&keyword_lower, word)),
    }
}

/// `keyword`'s characters appear in order (not necessarily contiguous)
/// somewhere in `haystack`.
fn is_subsequence(keyword: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    keyword
        .chars()
        .all(|needle| chars.any(|hay| hay == needle))
}

fn wildcard_matches(haystack: &str, pattern: &str) -> bool {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    let anchored = format!("^{escaped}$");
    Regex::new(&anchored)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_requires_full_equality() {
        assert!(matches("Microsoft.VisualStudioCode", "microsoft.visualstudiocode", MatchType::Exact));
        assert!(!matches("Microsoft.VisualStudioCode", "vscode", MatchType::Exact));
    }

    #[test]
    fn starts_with_is_prefix_only() {
        assert!(matches("Microsoft.VisualStudioCode", "microsoft", MatchType::StartsWith));
        assert!(!matches("Microsoft.VisualStudioCode", "visualstudio", MatchType::StartsWith));
    }

    #[test]
    fn substring_matches_anywhere() {
        assert!(matches("Microsoft.VisualStudioCode", "studio", MatchType::Substring));
    }

    #[test]
    fn wildcard_anchors_and_expands_star() {
        assert!(matches("Microsoft.VisualStudioCode", "Microsoft.*Code", MatchType::Wildcard));
        assert!(!matches("Microsoft.VisualStudioCode", "Microsoft.*Codex", MatchType::Wildcard));
    }

    #[test]
    fn fuzzy_is_subsequence_not_substring() {
        assert!(matches("Microsoft.VisualStudioCode", "vscode", MatchType::Fuzzy));
    }

    #[test]
    fn fuzzy_substring_requires_one_word_to_match() {
        assert!(matches("Visual Studio Code", "vscode", MatchType::FuzzySubstring));
        assert!(!matches("Visual Studio Code", "vscode", MatchType::Substring));
    }

    #[test]
    fn match_functions_are_stable_under_double_lowercasing() {
        let a = "MICROSOFT.VISUALSTUDIOCODE".to_lowercase().to_lowercase();
        let b = "vscode".to_lowercase().to_lowercase();
        assert!(matches(&a, &b, MatchType::Fuzzy));
    }
}
