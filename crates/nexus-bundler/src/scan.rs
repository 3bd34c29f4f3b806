//! Import/require specifier scanner: line-oriented, comment- and
//! quote-aware, no full AST. Adapted for the bundler's narrower need (just
//! the specifier strings, in first-appearance order) from the line-scanning
//! approach used elsewhere in this workspace's ancestry for import discovery.

use std::collections::HashSet;

/// One `import`/`export ... from`/`require(...)` specifier found in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub raw: String,
}

/// Scan `source` for import/require specifiers, deduplicated by `raw`, in
/// first-appearance order.
#[must_use]
pub fn scan_imports(source: &str) -> Vec<ImportSpec> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut i = 0;

    let mut push = |spec: String, results: &mut Vec<ImportSpec>, seen: &mut HashSet<String>| {
        if !spec.is_empty() && seen.insert(spec.clone()) {
            results.push(ImportSpec { raw: spec });
        }
    };

    while i < len {
        if i + 1 < len && chars[i] == '/' && chars[i + 1] == '/' {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if i + 1 < len && chars[i] == '/' && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }

        if matches_keyword(&chars, i, "import") || matches_keyword(&chars, i, "export") {
            let keyword_len = if chars[i] == 'i' { 6 } else { 6 };
            if let Some((spec, end)) = scan_from_clause(&chars, i + keyword_len) {
                push(spec, &mut results, &mut seen);
                i = end;
                continue;
            }
        }

        if matches_keyword(&chars, i, "require") {
            if let Some((spec, end)) = scan_call_arg(&chars, i + 7) {
                push(spec, &mut results, &mut seen);
                i = end;
                continue;
            }
        }

        i += 1;
    }

    results
}

fn matches_keyword(chars: &[char], pos: usize, keyword: &str) -> bool {
    let kw: Vec<char> = keyword.chars().collect();
    let len = kw.len();
    if pos + len > chars.len() {
        return false;
    }
    if pos > 0 && (chars[pos - 1].is_alphanumeric() || chars[pos - 1] == '_') {
        return false;
    }
    if chars[pos..pos + len] != kw[..] {
        return false;
    }
    if pos + len < chars.len() && (chars[pos + len].is_alphanumeric() || chars[pos + len] == '_') {
        return false;
    }
    true
}

/// `import ... from "spec"`, `import "spec"`, `import("spec")`,
/// `export ... from "spec"`.
fn scan_from_clause(chars: &[char], start: usize) -> Option<(String, usize)> {
    let len = chars.len();
    let mut i = start;

    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    if i < len && chars[i] == '(' {
        return scan_call_arg(chars, start);
    }

    let limit = (start + 1000).min(len);
    while i < limit {
        if matches_keyword(chars, i, "from") {
            return scan_quoted(chars, i + 4);
        }
        if chars[i] == '"' || chars[i] == '\'' || chars[i] == '`' {
            return scan_quoted(chars, i);
        }
        if chars[i] == ';' {
            return None;
        }
        i += 1;
    }
    None
}

/// `require("spec")` / `import("spec")`: the first quoted argument of a call.
fn scan_call_arg(chars: &[char], start: usize) -> Option<(String, usize)> {
    let len = chars.len();
    let mut i = start;
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= len || chars[i] != '(' {
        return None;
    }
    i += 1;
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    scan_quoted(chars, i)
}

fn scan_quoted(chars: &[char], start: usize) -> Option<(String, usize)> {
    let len = chars.len();
    if start >= len {
        return None;
    }
    let quote = chars[start];
    if quote != '"' && quote != '\'' && quote != '`' {
        return None;
    }
    let mut i = start + 1;
    let spec_start = i;
    while i < len && chars[i] != quote {
        if chars[i] == '\\' && i + 1 < len {
            i += 2;
            continue;
        }
        i += 1;
    }
    let spec: String = chars[spec_start..i].iter().collect();
    Some((spec, (i + 1).min(len)))
}

/// A specifier is "bare" if it's neither relative (`./`, `../`) nor absolute
/// (`/`, `http://`, `https://`).
#[must_use]
pub fn is_bare_specifier(spec: &str) -> bool {
    !(spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
        || spec.starts_with("http://")
        || spec.starts_with("https://"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(specs: &[ImportSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.raw.as_str()).collect()
    }

    #[test]
    fn finds_esm_import_from() {
        let imports = scan_imports(r#"import { a } from "./dep";"#);
        assert_eq!(raws(&imports), vec!["./dep"]);
    }

    #[test]
    fn finds_side_effect_import() {
        let imports = scan_imports(r#"import "./polyfill";"#);
        assert_eq!(raws(&imports), vec!["./polyfill"]);
    }

    #[test]
    fn finds_cjs_require() {
        let imports = scan_imports(r#"const x = require("lodash");"#);
        assert_eq!(raws(&imports), vec!["lodash"]);
    }

    #[test]
    fn finds_export_from() {
        let imports = scan_imports(r#"export * from "./reexport";"#);
        assert_eq!(raws(&imports), vec!["./reexport"]);
    }

    #[test]
    fn finds_dynamic_import() {
        let imports = scan_imports(r#"const m = await import("./lazy");"#);
        assert_eq!(raws(&imports), vec!["./lazy"]);
    }

    #[test]
    fn ignores_comments() {
        let source = "// import x from \"commented\"\nimport y from \"./real\";";
        assert_eq!(raws(&scan_imports(source)), vec!["./real"]);
    }

    #[test]
    fn deduplicates_and_preserves_order() {
        let source = r#"
import a from "./x";
import b from "./y";
import c from "./x";
"#;
        assert_eq!(raws(&scan_imports(source)), vec!["./x", "./y"]);
    }

    #[test]
    fn bare_specifier_detection() {
        assert!(is_bare_specifier("react"));
        assert!(is_bare_specifier("@scope/pkg"));
        assert!(!is_bare_specifier("./local"));
        assert!(!is_bare_specifier("../local"));
        assert!(!is_bare_specifier("/abs"));
        assert!(!is_bare_specifier("https://cdn.test/x.js"));
    }
}
