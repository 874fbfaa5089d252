use std::collections::BTreeSet;

use crate::parser::{DiffHunk, DiffLine};

/// One line of a rendered "clean diff": the marker kept for display, the
/// diff-marker character stripped from the content, original line numbers
/// preserved so an inline comment can still anchor to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanDiffLine {
    pub marker: char,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    pub content: String,
}

/// Normalizes hunk content for display: markers are kept as metadata rather
/// than embedded in `content`, and original line numbers survive.
pub fn clean_diff(hunks: &[DiffHunk]) -> Vec<CleanDiffLine> {
    hunks
        .iter()
        .flat_map(|hunk| {
            hunk.lines.iter().map(|line| match line {
                DiffLine::Added { new_line, content } => CleanDiffLine {
                    marker: '+',
                    old_line: None,
                    new_line: Some(*new_line),
                    content: content.clone(),
                },
                DiffLine::Removed { old_line, content } => CleanDiffLine {
                    marker: '-',
                    old_line: Some(*old_line),
                    new_line: None,
                    content: content.clone(),
                },
                DiffLine::Context {
                    old_line,
                    new_line,
                    content,
                } => CleanDiffLine {
                    marker: ' ',
                    old_line: Some(*old_line),
                    new_line: Some(*new_line),
                    content: content.clone(),
                },
            })
        })
        .collect()
}

/// Renders a clean diff as plain text, one line per entry, new-side line
/// numbers first where available (the side a provider can anchor to).
pub fn render_clean_diff(lines: &[CleanDiffLine]) -> String {
    let mut out = String::new();
    for l in lines {
        let line_no = l.new_line.or(l.old_line).unwrap_or(0);
        out.push_str(&format!("{:>5} {} {}\n", line_no, l.marker, l.content));
    }
    out
}

/// The set of new-file line numbers touched by `+` lines — the only lines a
/// provider can legally anchor an inline comment to on the new side.
pub fn changed_line_set(hunks: &[DiffHunk]) -> BTreeSet<u32> {
    hunks
        .iter()
        .flat_map(|h| h.lines.iter())
        .filter_map(|line| match line {
            DiffLine::Added { new_line, .. } => Some(*new_line),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_unified_diff;

    #[test]
    fn strips_markers_and_keeps_line_numbers() {
        let hunks = parse_unified_diff("@@ -1,2 +1,3 @@\n context\n-old\n+new one\n+new two\n");
        let cleaned = clean_diff(&hunks);
        assert_eq!(cleaned[0].marker, ' ');
        assert_eq!(cleaned[1].marker, '-');
        assert_eq!(cleaned[2].content, "new one");
        assert_eq!(cleaned[2].new_line, Some(2));
    }

    #[test]
    fn changed_line_set_only_contains_added_lines() {
        let hunks = parse_unified_diff("@@ -1,2 +1,3 @@\n context\n-old\n+new one\n+new two\n");
        let set = changed_line_set(&hunks);
        assert_eq!(set, [2, 3].into_iter().collect());
    }
}
