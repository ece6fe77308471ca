//! Fail-closed interpretation of classifier output.

use std::str::FromStr;

use kbw_core::types::{ModerationCategory, UNVERIFIED_REASON};
use serde::Deserialize;

use crate::TRACING_TARGET;

/// Reason used when the classifier rejects without explaining why.
const DEFAULT_REJECTION_REASON: &str = "This comment does not meet our community guidelines.";

/// A classifier judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub approved: bool,
    pub category: Option<ModerationCategory>,
    pub reason: Option<String>,
}

impl Assessment {
    /// Creates an approval.
    pub fn approve() -> Self {
        Self {
            approved: true,
            category: None,
            reason: None,
        }
    }

    /// Creates a rejection.
    pub fn reject(reason: impl Into<String>, category: ModerationCategory) -> Self {
        Self {
            approved: false,
            category: Some(category),
            reason: Some(reason.into()),
        }
    }

    /// The rejection returned whenever the output cannot be trusted.
    pub fn unverified() -> Self {
        Self::reject(UNVERIFIED_REASON, ModerationCategory::Other)
    }

    /// Returns the rejection reason, falling back to a generic one.
    pub fn rejection_reason(&self) -> &str {
        self.reason.as_deref().unwrap_or(DEFAULT_REJECTION_REASON)
    }

    /// Returns the rejection category, falling back to [`ModerationCategory::Other`].
    pub fn rejection_category(&self) -> ModerationCategory {
        self.category.unwrap_or(ModerationCategory::Other)
    }
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    approved: bool,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl From<RawAssessment> for Assessment {
    fn from(raw: RawAssessment) -> Self {
        let reason = raw.reason.filter(|r| !r.trim().is_empty());
        if raw.approved {
            return Self {
                approved: true,
                category: None,
                reason,
            };
        }

        let category = raw
            .category
            .as_deref()
            .map(|c| ModerationCategory::from_str(c.trim()).unwrap_or(ModerationCategory::Other))
            .unwrap_or(ModerationCategory::Other);

        Self {
            approved: false,
            category: Some(category),
            reason: Some(reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_owned())),
        }
    }
}

/// Parses raw classifier output into an [`Assessment`].
///
/// Accepts a bare JSON object, a markdown-fenced one, or the first balanced
/// object embedded in prose. Anything else becomes [`Assessment::unverified`].
pub fn parse_assessment(raw: &str) -> Assessment {
    let candidates = [
        Some(raw.trim().to_owned()),
        extract_fenced_block(raw),
        extract_json_object(raw),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Ok(parsed) = serde_json::from_str::<RawAssessment>(&candidate) {
            return parsed.into();
        }
    }

    tracing::warn!(
        target: TRACING_TARGET,
        output_len = raw.len(),
        "Classifier output could not be parsed, rejecting"
    );
    Assessment::unverified()
}

/// Returns the body of the first markdown code block.
fn extract_fenced_block(input: &str) -> Option<String> {
    let mut lines = input.lines();
    lines.by_ref().find(|line| line.trim().starts_with("```"))?;

    let mut content = Vec::new();
    for line in lines {
        if line.trim().starts_with("```") {
            return Some(content.join("\n"));
        }
        content.push(line);
    }

    None
}

/// Returns the first balanced `{...}` in `input`, honoring string literals.
pub fn extract_json_object(input: &str) -> Option<String> {
    let start_pos = input.find('{')?;
    let mut brace_count = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in input[start_pos..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => {
                brace_count -= 1;
                if brace_count == 0 {
                    return Some(input[start_pos..=start_pos + i].to_owned());
                }
            }
            _ => {}
        }
    }

    None
}
