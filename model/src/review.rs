use serde::{Deserialize, Serialize};

/// Category of an LLM-produced finding. Unknown labels returned by a model
/// fall through to `Other` rather than failing deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Critical,
    Bug,
    Performance,
    Security,
    Refactor,
    #[serde(other)]
    #[default]
    Other,
}

/// Severity bucket, used to sort and surface findings. Unknown labels fall
/// through to the lowest severity rather than failing deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Backlog,
    Medium,
    High,
    Critical,
}

/// How confident the model is in a given finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

/// One LLM-produced finding for a single file.
///
/// `end_line`, when set, must be `>= line`; callers that violate this treat
/// the finding as malformed and drop it rather than posting a backwards range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAIComment {
    pub file_path: String,
    pub line: u32,
    pub end_line: Option<u32>,
    #[serde(default)]
    pub issue_type: IssueType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub confidence: Confidence,
    pub title: String,
    pub description: String,
    pub suggestion: Option<String>,
    pub code_language: String,
    pub code_snippet: Option<String>,
}

impl ReviewAIComment {
    /// `end_line >= line` when set; otherwise the finding is single-line.
    pub fn has_valid_range(&self) -> bool {
        self.end_line.is_none_or(|end| end >= self.line)
    }

    pub fn is_ranged(&self) -> bool {
        self.end_line.is_some_and(|end| end > self.line)
    }
}

/// The per-file output of a `review_code` agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReviewResult {
    pub file_path: String,
    pub has_issues: bool,
    pub comments: Vec<ReviewAIComment>,
}

/// Category assigned to a changed file by `generate_changes_overview`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeType {
    NewFeature,
    BugFix,
    Refactor,
    Test,
    Deploy,
    Docs,
    Cleanup,
    Style,
    #[serde(other)]
    #[default]
    Other,
}

/// One entry of the changes-overview summary the Agent produces for the
/// first review of an MR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChangeInfo {
    pub file_path: String,
    pub diff: String,
    #[serde(rename = "type")]
    pub kind: FileChangeType,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(line: u32, end_line: Option<u32>) -> ReviewAIComment {
        ReviewAIComment {
            file_path: "a.rs".into(),
            line,
            end_line,
            issue_type: IssueType::Bug,
            priority: Priority::Medium,
            confidence: Confidence::High,
            title: "t".into(),
            description: "d".into(),
            suggestion: None,
            code_language: "rust".into(),
            code_snippet: None,
        }
    }

    #[test]
    fn single_line_comment_has_valid_range() {
        assert!(comment(10, None).has_valid_range());
        assert!(!comment(10, None).is_ranged());
    }

    #[test]
    fn ranged_comment_requires_end_ge_line() {
        assert!(comment(10, Some(15)).has_valid_range());
        assert!(comment(10, Some(15)).is_ranged());
        assert!(!comment(10, Some(5)).has_valid_range());
    }

    #[test]
    fn equal_start_and_end_is_not_ranged() {
        let c = comment(10, Some(10));
        assert!(c.has_valid_range());
        assert!(!c.is_ranged());
    }

    #[test]
    fn unknown_issue_type_falls_back_to_other() {
        let parsed: IssueType = serde_json::from_str("\"flibbertigibbet\"").unwrap();
        assert_eq!(parsed, IssueType::Other);
    }

    #[test]
    fn priority_ordering_ranks_critical_highest() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Backlog);
    }
}
