//! Localized strings as data. A second locale is a new `Locale` value, never
//! a code change; unknown locale tags fall back to `en`.

/// One locale's set of output-section headers and vocabulary tables.
pub struct Locale {
    pub instruction_line: &'static str,
    pub description_header: &'static str,
    pub changes_overview_header: &'static str,
    pub architecture_review_header: &'static str,
    pub code_review_header: &'static str,
    pub issue_type_labels: &'static [&'static str],
    pub priority_labels: &'static [&'static str],
    pub confidence_labels: &'static [&'static str],
}

const EN: Locale = Locale {
    instruction_line: "Respond in clear, professional English.",
    description_header: "## Summary",
    changes_overview_header: "## Changed Files",
    architecture_review_header: "## Architecture Review",
    code_review_header: "## Findings",
    issue_type_labels: &["critical", "bug", "performance", "security", "refactor", "other"],
    priority_labels: &["critical", "high", "medium", "backlog"],
    confidence_labels: &["very_high", "high", "medium", "low"],
};

/// Looks up a locale by tag, falling back to `en` for anything unrecognized.
pub fn locale_table(tag: &str) -> &'static Locale {
    match tag {
        "en" | "en-focused" => &EN,
        _ => &EN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_locale_falls_back_to_en() {
        let l = locale_table("zz");
        assert_eq!(l.instruction_line, EN.instruction_line);
    }
}
