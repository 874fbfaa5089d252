//! Unified diff parsing, robust to missing file headers.
//!
//! Only `@@` hunk headers are required; `--- `/`+++ ` file headers and
//! `\ No newline at end of file` markers are tolerated but not needed.

/// One line inside a diff hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context { old_line: u32, new_line: u32, content: String },
}

/// A contiguous changed region within a unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// Parses a unified diff string into hunks/lines.
pub fn parse_unified_diff(s: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    let mut cur = DiffHunk::default();
    let mut old_line = 0u32;
    let mut new_line = 0u32;
    let mut in_hunk = false;

    for line in s.lines() {
        if line.starts_with("@@") {
            if in_hunk && !cur.lines.is_empty() {
                hunks.push(std::mem::take(&mut cur));
            }
            if let Some((left, right)) = line
                .trim_start_matches('@')
                .trim_end_matches('@')
                .trim()
                .split_once('+')
            {
                let (o_start, o_len) = split_nums(left.trim().trim_start_matches('-'));
                let (n_start, n_len) = split_nums(right.trim());
                cur.old_start = o_start;
                cur.old_lines = o_len;
                cur.new_start = n_start;
                cur.new_lines = n_len;
                old_line = o_start;
                new_line = n_start;
                in_hunk = true;
            }
            continue;
        }

        if line.starts_with("\\ ") {
            continue;
        }

        if !in_hunk {
            continue;
        }

        if let Some(rest) = line.strip_prefix('+') {
            cur.lines.push(DiffLine::Added {
                new_line,
                content: rest.to_string(),
            });
            new_line += 1;
        } else if let Some(rest) = line.strip_prefix('-') {
            cur.lines.push(DiffLine::Removed {
                old_line,
                content: rest.to_string(),
            });
            old_line += 1;
        } else {
            let content = line.strip_prefix(' ').unwrap_or(line).to_string();
            cur.lines.push(DiffLine::Context {
                old_line,
                new_line,
                content,
            });
            old_line += 1;
            new_line += 1;
        }
    }

    if in_hunk && !cur.lines.is_empty() {
        hunks.push(cur);
    }
    hunks
}

fn split_nums(s: &str) -> (u32, u32) {
    let s = s.trim();
    if let Some((a, b)) = s.split_once(',') {
        (a.parse().unwrap_or(0), b.parse().unwrap_or(0))
    } else {
        (s.parse().unwrap_or(0), 0)
    }
}

/// Heuristic detection of a binary patch or a provider's "binary file" note.
pub fn looks_like_binary_patch(s: &str) -> bool {
    s.contains("GIT binary patch")
        || s.starts_with("Binary files ")
        || (s.starts_with("Files ") && s.contains(" differ"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_hunk_with_mixed_lines() {
        let diff = "@@ -1,3 +1,4 @@\n context\n-removed\n+added one\n+added two\n";
        let hunks = parse_unified_diff(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 4);
        assert!(matches!(hunks[0].lines[1], DiffLine::Removed { old_line: 2, .. }));
        assert!(matches!(hunks[0].lines[2], DiffLine::Added { new_line: 2, .. }));
    }

    #[test]
    fn ignores_no_newline_marker() {
        let diff = "@@ -1,1 +1,1 @@\n-old\n+new\n\\ No newline at end of file\n";
        let hunks = parse_unified_diff(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 2);
    }

    #[test]
    fn tolerates_missing_file_headers() {
        let diff = "--- a/x\n+++ b/x\n@@ -5,2 +5,2 @@\n-old line\n+new line\n";
        let hunks = parse_unified_diff(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].new_start, 5);
    }

    #[test]
    fn detects_binary_patch_markers() {
        assert!(looks_like_binary_patch("Binary files a/x.png and b/x.png differ"));
        assert!(looks_like_binary_patch("GIT binary patch\ndelta 10\n"));
        assert!(!looks_like_binary_patch("@@ -1,1 +1,1 @@\n-a\n+b\n"));
    }
}
