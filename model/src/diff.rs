use serde::{Deserialize, Serialize};

/// One file's change within an MR, as handed back by a provider.
///
/// `diff` carries the raw unified-diff text for this file; the diff-context
/// crate is responsible for parsing it into hunks and lines. This type only
/// guarantees the provider-level shape and its exactly-one-kind invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub diff: String,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
    pub is_binary: bool,
}

impl FileDiff {
    /// The path a reviewer should anchor comments to: the new path if one
    /// exists, otherwise the old path (a pure deletion).
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("")
    }

    /// `is_new ⊕ is_deleted ⊕ is_renamed ⊕ (old_path = new_path)` — exactly
    /// one of these holds for a well-formed diff entry; an ordinary
    /// modification satisfies the fourth disjunct since its paths coincide.
    pub fn has_exactly_one_change_kind(&self) -> bool {
        let same_path = self.old_path == self.new_path;
        [self.is_new, self.is_deleted, self.is_renamed, same_path]
            .iter()
            .filter(|b| **b)
            .count()
            == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(old: Option<&str>, new: Option<&str>, is_new: bool, is_deleted: bool, is_renamed: bool) -> FileDiff {
        FileDiff {
            old_path: old.map(String::from),
            new_path: new.map(String::from),
            diff: String::new(),
            is_new,
            is_deleted,
            is_renamed,
            is_binary: false,
        }
    }

    #[test]
    fn modification_satisfies_invariant() {
        let d = diff(Some("a.rs"), Some("a.rs"), false, false, false);
        assert!(d.has_exactly_one_change_kind());
    }

    #[test]
    fn new_file_satisfies_invariant() {
        let d = diff(None, Some("a.rs"), true, false, false);
        assert!(d.has_exactly_one_change_kind());
    }

    #[test]
    fn deleted_file_satisfies_invariant() {
        let d = diff(Some("a.rs"), None, false, true, false);
        assert!(d.has_exactly_one_change_kind());
    }

    #[test]
    fn renamed_file_satisfies_invariant() {
        let d = diff(Some("old.rs"), Some("new.rs"), false, false, true);
        assert!(d.has_exactly_one_change_kind());
    }

    #[test]
    fn malformed_entry_violates_invariant() {
        let d = diff(Some("old.rs"), Some("new.rs"), true, true, false);
        assert!(!d.has_exactly_one_change_kind());
    }

    #[test]
    fn display_path_prefers_new_path() {
        let d = diff(Some("old.rs"), Some("new.rs"), false, false, true);
        assert_eq!(d.display_path(), "new.rs");
    }

    #[test]
    fn display_path_falls_back_to_old_path_on_deletion() {
        let d = diff(Some("old.rs"), None, false, true, false);
        assert_eq!(d.display_path(), "old.rs");
    }
}
