//! Parses unified diffs and builds the light, language-agnostic context the
//! agent layer prompts over: a clean diff rendering, the set of new-file
//! lines a comment may anchor to, and (optionally) a handful of touched
//! symbol names plus nearby snippets from the same file.

mod clean_diff;
mod parser;
mod symbols;

use std::collections::BTreeSet;

pub use clean_diff::{CleanDiffLine, changed_line_set, clean_diff as render_clean_lines, render_clean_diff};
pub use parser::{DiffHunk, DiffLine, looks_like_binary_patch, parse_unified_diff};
pub use symbols::{Language, TouchedSymbol, detect_language, find_touched_symbols};

use reviewbot_model::FileDiff;

/// How many lines of symbol search radius and how many related snippets to
/// keep; matches the "up to a handful" framing rather than a full index.
const SYMBOL_SEARCH_RADIUS: u32 = 3;
const MAX_RELATED_SNIPPETS: usize = 3;
const SNIPPET_PAD_LINES: u32 = 4;

/// The three artifacts produced for a single non-binary `FileDiff`.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub hunks: Vec<DiffHunk>,
    pub clean_diff: String,
    pub changed_lines: BTreeSet<u32>,
    pub language: Language,
}

/// A light, best-effort summary of symbols touched near the changed lines
/// and a few related snippets from the same file. Absence never fails a
/// review — callers accept a minimal or missing enhanced context.
#[derive(Debug, Clone, Default)]
pub struct EnhancedContext {
    pub touched_symbols: Vec<TouchedSymbol>,
    pub related_snippets: Vec<String>,
}

/// Builds the clean-diff and changed-line-set artifacts for a file diff.
/// Returns `None` for binary files and for diffs with no parsable hunks.
pub fn build_file_context(file_diff: &FileDiff) -> Option<FileContext> {
    if file_diff.is_binary || looks_like_binary_patch(&file_diff.diff) {
        return None;
    }
    let hunks = parse_unified_diff(&file_diff.diff);
    if hunks.is_empty() {
        return None;
    }
    let lines = render_clean_lines(&hunks);
    let changed_lines = changed_line_set(&hunks);
    let language = detect_language(file_diff.display_path());
    Some(FileContext {
        hunks,
        clean_diff: render_clean_diff(&lines),
        changed_lines,
        language,
    })
}

/// Builds the enhanced context for a file, given its full content at the
/// reviewed SHA. Never fails: languages with no regex table, or files with
/// no nearby declarations, simply yield an empty result.
pub fn build_enhanced_context(
    language: Language,
    full_file_content: &str,
    changed_lines: &BTreeSet<u32>,
) -> EnhancedContext {
    let source_lines: Vec<&str> = full_file_content.lines().collect();
    let touched_symbols =
        find_touched_symbols(language, &source_lines, changed_lines, SYMBOL_SEARCH_RADIUS);

    let related_snippets = touched_symbols
        .iter()
        .take(MAX_RELATED_SNIPPETS)
        .filter_map(|sym| snippet_around(&source_lines, sym.line))
        .collect();

    EnhancedContext {
        touched_symbols,
        related_snippets,
    }
}

fn snippet_around(lines: &[&str], line: u32) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let total = lines.len() as u32;
    let start = line.saturating_sub(SNIPPET_PAD_LINES).max(1);
    let end = (line + SNIPPET_PAD_LINES).min(total);
    Some(
        lines[(start - 1) as usize..end as usize]
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_diff(diff: &str, is_binary: bool) -> FileDiff {
        FileDiff {
            old_path: Some("a.rs".into()),
            new_path: Some("a.rs".into()),
            diff: diff.to_string(),
            is_new: false,
            is_deleted: false,
            is_renamed: false,
            is_binary,
        }
    }

    #[test]
    fn builds_context_for_ordinary_diff() {
        let fd = file_diff("@@ -1,2 +1,3 @@\n context\n-old\n+new one\n+new two\n", false);
        let ctx = build_file_context(&fd).expect("context");
        assert_eq!(ctx.changed_lines, [2, 3].into_iter().collect());
        assert_eq!(ctx.language, Language::Rust);
    }

    #[test]
    fn binary_diff_yields_no_context() {
        let fd = file_diff("Binary files a/x.png and b/x.png differ", true);
        assert!(build_file_context(&fd).is_none());
    }

    #[test]
    fn empty_diff_yields_no_context() {
        let fd = file_diff("", false);
        assert!(build_file_context(&fd).is_none());
    }

    #[test]
    fn enhanced_context_is_empty_but_present_for_generic_language() {
        let changed: BTreeSet<u32> = [1].into_iter().collect();
        let ctx = build_enhanced_context(Language::Generic, "hello\nworld\n", &changed);
        assert!(ctx.touched_symbols.is_empty());
        assert!(ctx.related_snippets.is_empty());
    }
}
