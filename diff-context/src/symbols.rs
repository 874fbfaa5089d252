//! Light, language-agnostic symbol extraction.
//!
//! Deliberately not an AST: a small per-language regex table applied to the
//! lines around a changed region. Good enough to name "what moved" in a
//! prompt; never a symbol graph or embedding index.

use std::collections::BTreeSet;

use regex::Regex;
use std::sync::LazyLock;

/// Language bucket used to pick a symbol regex. Unknown extensions map to
/// `Generic`, which still yields clean-diff/changed-line outputs upstream —
/// only the enhanced-context symbol list is unavailable for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Go,
    JavaScriptOrTypeScript,
    Python,
    Java,
    Rust,
    COrCpp,
    Generic,
}

/// Detects a language bucket from a file path's extension.
pub fn detect_language(path: &str) -> Language {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "go" => Language::Go,
        "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => Language::JavaScriptOrTypeScript,
        "py" => Language::Python,
        "java" => Language::Java,
        "rs" => Language::Rust,
        "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "hh" => Language::COrCpp,
        _ => Language::Generic,
    }
}

static GO_FUNC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)").unwrap());
static JS_TS_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s*\*?\s+(\w+)|^\s*(?:export\s+)?(?:default\s+)?class\s+(\w+)|^\s*const\s+(\w+)\s*=\s*(?:async\s*)?\(")
        .unwrap()
});
static PY_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)|^\s*class\s+(\w+)").unwrap());
static JAVA_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:public|private|protected|static|final|\s)*\b(?:class|interface|enum)\s+(\w+)|^\s*(?:public|private|protected|static|final|synchronized|\s)*[\w<>\[\],\s]+\s+(\w+)\s*\([^;]*\)\s*\{")
        .unwrap()
});
static RUST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)|^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait)\s+(\w+)|^\s*impl(?:<[^>]*>)?\s+(?:\w+\s+for\s+)?(\w+)")
        .unwrap()
});
static C_CPP_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w][\w\s\*&:<>,]*\s+(\w+)\s*\([^;{]*\)\s*\{").unwrap()
});

fn pattern_for(language: Language) -> Option<&'static LazyLock<Regex>> {
    match language {
        Language::Go => Some(&GO_FUNC),
        Language::JavaScriptOrTypeScript => Some(&JS_TS_FUNC),
        Language::Python => Some(&PY_DEF),
        Language::Java => Some(&JAVA_MEMBER),
        Language::Rust => Some(&RUST_ITEM),
        Language::COrCpp => Some(&C_CPP_FUNC),
        Language::Generic => None,
    }
}

/// A symbol name found near a changed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchedSymbol {
    pub name: String,
    pub line: u32,
}

/// Scans `lines` (1-based) for declarations near any line in `changed_lines`
/// (within `radius` lines either side) using the language's regex table.
pub fn find_touched_symbols(
    language: Language,
    lines: &[&str],
    changed_lines: &BTreeSet<u32>,
    radius: u32,
) -> Vec<TouchedSymbol> {
    let Some(regex) = pattern_for(language) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut seen = BTreeSet::new();
    for (idx, text) in lines.iter().enumerate() {
        let line_no = idx as u32 + 1;
        if !changed_lines
            .iter()
            .any(|c| line_no.abs_diff(*c) <= radius)
        {
            continue;
        }
        if let Some(caps) = regex.captures(text) {
            let name = caps
                .iter()
                .skip(1)
                .find_map(|m| m)
                .map(|m| m.as_str().to_string());
            if let Some(name) = name {
                if seen.insert((name.clone(), line_no)) {
                    found.push(TouchedSymbol { name, line: line_no });
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_by_extension() {
        assert_eq!(detect_language("main.go"), Language::Go);
        assert_eq!(detect_language("app.tsx"), Language::JavaScriptOrTypeScript);
        assert_eq!(detect_language("service.rs"), Language::Rust);
        assert_eq!(detect_language("README.md"), Language::Generic);
    }

    #[test]
    fn finds_rust_function_near_changed_line() {
        let src = "struct Foo;\n\nfn touched_one() {\n    let x = 1;\n}\n";
        let lines: Vec<&str> = src.lines().collect();
        let changed: BTreeSet<u32> = [4].into_iter().collect();
        let found = find_touched_symbols(Language::Rust, &lines, &changed, 2);
        assert!(found.iter().any(|s| s.name == "touched_one"));
    }

    #[test]
    fn generic_language_yields_no_symbols() {
        let lines = ["some text", "more text"];
        let changed: BTreeSet<u32> = [1].into_iter().collect();
        assert!(find_touched_symbols(Language::Generic, &lines, &changed, 5).is_empty());
    }

    #[test]
    fn respects_radius_cutoff() {
        let src = "fn far_away() {\n    1\n}\n\n\n\n\n\n\n\nfn unrelated() {}\n";
        let lines: Vec<&str> = src.lines().collect();
        let changed: BTreeSet<u32> = [11].into_iter().collect();
        let found = find_touched_symbols(Language::Rust, &lines, &changed, 1);
        assert!(!found.iter().any(|s| s.name == "far_away"));
        assert!(found.iter().any(|s| s.name == "unrelated"));
    }
}
