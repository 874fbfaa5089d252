use crate::locale::locale_table;

/// The four task-level operations the agent exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Description,
    ChangesOverview,
    ArchitectureReview,
    ReviewCode,
}

/// Inputs specific to each operation. Kept as one enum rather than four
/// builder functions so callers go through a single `build` entry point.
#[derive(Debug, Clone)]
pub enum PromptInput<'a> {
    Description { diff: &'a str },
    ChangesOverview { diff: &'a str },
    ArchitectureReview { diff: &'a str },
    ReviewCode {
        filename: &'a str,
        full_file_content: &'a str,
        clean_diff: &'a str,
    },
}

/// A system/user message pair ready to hand to the Agent API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
}

const REVIEW_STYLE: &str = "You are a senior code reviewer.\n\
- Be concise and actionable. Avoid generic advice.\n\
- Prefer specific suggestions and minimal diffs when proposing fixes.\n\
- Respect the project's style; do not reformat unrelated code.\n\
- If the change looks correct, acknowledge briefly and do not invent issues.";

/// Builds a prompt for `operation` in `locale`. Pure: same inputs always
/// produce the same output, and no control-flow branches on locale content.
pub fn build(operation: Operation, locale: &str, input: &PromptInput<'_>) -> RenderedPrompt {
    let table = locale_table(locale);
    match (operation, input) {
        (Operation::Description, PromptInput::Description { diff }) => RenderedPrompt {
            system_prompt: format!("{REVIEW_STYLE}\n{}", table.instruction_line),
            user_prompt: format!(
                "Summarize the following diff for a merge request description.\n\
                 Write under the header `{}`. Be factual; do not speculate about intent you cannot see in the diff.\n\n# Diff\n```diff\n{diff}\n```\n",
                table.description_header
            ),
        },
        (Operation::ChangesOverview, PromptInput::ChangesOverview { diff }) => RenderedPrompt {
            system_prompt: format!("{REVIEW_STYLE}\n{}", table.instruction_line),
            user_prompt: format!(
                "Categorize each changed file in the following diff.\n\
                 Respond with a JSON array under the header `{}`, each element shaped as:\n\
                 {{\"file_path\": string, \"diff\": string, \"type\": one of {:?}, \"description\": string}}\n\
                 Use `other` when no category clearly fits. Respond with JSON only, no prose.\n\n# Diff\n```diff\n{diff}\n```\n",
                table.changes_overview_header,
                ["new_feature", "bug_fix", "refactor", "test", "deploy", "docs", "cleanup", "style", "other"],
            ),
        },
        (Operation::ArchitectureReview, PromptInput::ArchitectureReview { diff }) => RenderedPrompt {
            system_prompt: format!("{REVIEW_STYLE}\n{}", table.instruction_line),
            user_prompt: format!(
                "Review the architectural impact of the following diff: module boundaries, coupling, and any structural risk.\n\
                 Write under the header `{}`. Skip this section's content entirely if nothing architecturally significant changed.\n\n# Diff\n```diff\n{diff}\n```\n",
                table.architecture_review_header
            ),
        },
        (
            Operation::ReviewCode,
            PromptInput::ReviewCode {
                filename,
                full_file_content,
                clean_diff,
            },
        ) => RenderedPrompt {
            system_prompt: format!("{REVIEW_STYLE}\n{}", table.instruction_line),
            user_prompt: format!(
                "Review the changes made to `{filename}`.\n\
                 Only comment on lines touched by this diff; do not re-review unrelated code.\n\
                 Respond with a single JSON object under the header `{}`, shaped as:\n\
                 {{\"file_path\": string, \"has_issues\": bool, \"comments\": [{{\
                 \"file_path\": string, \"line\": number, \"end_line\": number or null, \
                 \"issue_type\": one of {:?}, \"priority\": one of {:?}, \"confidence\": one of {:?}, \
                 \"title\": string, \"description\": string, \"suggestion\": string or null, \
                 \"code_language\": string, \"code_snippet\": string or null}}]}}\n\
                 `line` and `end_line` must fall within the diff's changed lines. Respond with JSON only, no prose.\n\n\
                 # Full file content\n```\n{full_file_content}\n```\n\n# Diff\n```diff\n{clean_diff}\n```\n",
                table.code_review_header,
                table.issue_type_labels,
                table.priority_labels,
                table.confidence_labels,
            ),
        },
        _ => unreachable!("PromptInput variant must match its Operation"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_prompt_embeds_diff_and_header() {
        let rendered = build(
            Operation::Description,
            "en",
            &PromptInput::Description { diff: "+fn x() {}" },
        );
        assert!(rendered.user_prompt.contains("+fn x() {}"));
        assert!(rendered.user_prompt.contains("## Summary"));
    }

    #[test]
    fn review_code_prompt_lists_vocabulary() {
        let rendered = build(
            Operation::ReviewCode,
            "en",
            &PromptInput::ReviewCode {
                filename: "a.rs",
                full_file_content: "fn a() {}",
                clean_diff: "+fn a() {}",
            },
        );
        assert!(rendered.user_prompt.contains("security"));
        assert!(rendered.user_prompt.contains("very_high"));
    }

    #[test]
    fn same_inputs_render_identically() {
        let input = PromptInput::ArchitectureReview { diff: "+x" };
        let a = build(Operation::ArchitectureReview, "en", &input);
        let b = build(Operation::ArchitectureReview, "en", &input);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_locale_does_not_panic() {
        let rendered = build(
            Operation::Description,
            "fr",
            &PromptInput::Description { diff: "+x" },
        );
        assert!(rendered.system_prompt.contains("English"));
    }
}
