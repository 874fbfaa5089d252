//! Splits a single combined unified-diff text (as returned by Bitbucket's
//! whole-PR diff endpoint and GitLab's `/raw_diffs` enrichment path) into
//! per-file `FileDiff` entries.

use reviewbot_diff_context::looks_like_binary_patch;
use reviewbot_model::FileDiff;

/// Splits on `diff --git` headers, inferring add/delete/rename from the
/// `---`/`+++` lines the way a plain-text unified diff expresses them.
pub fn split_combined_diff(raw: &str) -> Vec<FileDiff> {
    if !raw.contains("\ndiff --git ") {
        return vec![single_file_diff(raw)];
    }
    raw.split("\ndiff --git ")
        .filter(|part| !part.trim().is_empty())
        .map(file_diff_from_part)
        .collect()
}

fn single_file_diff(raw: &str) -> FileDiff {
    let old_path = find_path(raw, "--- a/");
    let new_path = find_path(raw, "+++ b/");
    FileDiff {
        old_path,
        new_path,
        is_binary: looks_like_binary_patch(raw),
        is_new: false,
        is_deleted: false,
        is_renamed: false,
        diff: raw.to_string(),
    }
}

fn file_diff_from_part(part: &str) -> FileDiff {
    let old_path = find_path(part, "--- a/");
    let new_path = find_path(part, "+++ b/");
    let is_new = part.contains("--- /dev/null");
    let is_deleted = part.contains("+++ /dev/null");
    let is_renamed = match (&old_path, &new_path) {
        (Some(o), Some(n)) => o != n,
        _ => false,
    };
    FileDiff {
        old_path,
        new_path,
        is_binary: looks_like_binary_patch(part),
        is_new,
        is_deleted,
        is_renamed,
        diff: part.to_string(),
    }
}

fn find_path(text: &str, prefix: &str) -> Option<String> {
    text.lines().find_map(|l| l.strip_prefix(prefix)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINED: &str = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1,1 +1,1 @@
-old
+new
diff --git a/b.rs b/b.rs
--- /dev/null
+++ b/b.rs
@@ -0,0 +1,1 @@
+brand new
";

    #[test]
    fn splits_two_files() {
        let files = split_combined_diff(COMBINED);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].new_path.as_deref(), Some("a.rs"));
        assert!(!files[0].is_new);
        assert_eq!(files[1].new_path.as_deref(), Some("b.rs"));
        assert!(files[1].is_new);
    }

    #[test]
    fn single_file_diff_without_git_header() {
        let files = split_combined_diff("@@ -1,1 +1,1 @@\n-old\n+new\n");
        assert_eq!(files.len(), 1);
        assert!(files[0].old_path.is_none());
    }
}
