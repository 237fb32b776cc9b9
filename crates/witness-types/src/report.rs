//! Validation report types.
//!
//! The wire shape is `{valid, violations: [{rule, field, reason}]}`. The
//! optional `subject`, `marker` and `excerpt` fields are omitted when empty
//! and exist so that rejected input can be logged with enough detail to act
//! on.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::RuleId;

/// Longest excerpt of offending input kept on a violation.
pub const EXCERPT_LIMIT: usize = 80;

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Violation {
    /// The layer that raised the violation.
    pub rule: RuleId,
    /// Path of the offending field, e.g. `facts[0]` or `incident_id`.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
    /// Record the violation belongs to, set by whole-state audits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Machine-readable marker: the matched pattern or a violation code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Offending input, truncated to [`EXCERPT_LIMIT`] characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl Violation {
    /// Create a violation with no subject, marker or excerpt.
    pub fn new(rule: RuleId, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule,
            field: field.into(),
            reason: reason.into(),
            subject: None,
            marker: None,
            excerpt: None,
        }
    }

    /// Attach the matched pattern or violation code.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Attach an excerpt of the offending input.
    #[must_use]
    pub fn with_excerpt(mut self, text: &str) -> Self {
        self.excerpt = Some(excerpt(text));
        self
    }

    /// Attach the record the violation belongs to.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Truncate `text` to [`EXCERPT_LIMIT`] characters on a char boundary.
pub fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_LIMIT).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Result of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ValidationReport {
    /// Whether no violations were found.
    pub valid: bool,
    /// Violations in the order the layers raised them.
    pub violations: Vec<Violation>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    /// An empty, valid report.
    pub const fn new() -> Self {
        Self {
            valid: true,
            violations: Vec::new(),
        }
    }

    /// Record a violation and mark the report invalid.
    pub fn push(&mut self, violation: Violation) {
        self.valid = false;
        self.violations.push(violation);
    }

    /// Record several violations.
    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        for violation in violations {
            self.push(violation);
        }
    }

    /// Append another report's violations to this one.
    pub fn merge(&mut self, other: Self) {
        self.extend(other.violations);
    }

    /// Whether no violations were found.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Violations raised by one layer.
    pub fn by_rule(&self, rule: RuleId) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.rule == rule)
    }

    /// Whether any violation carries `marker`.
    pub fn has_marker(&self, marker: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.marker.as_deref() == Some(marker))
    }
}

impl core::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.valid {
            return f.write_str("valid");
        }
        write!(f, "{} violation(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "; [{}] {}: {}", v.rule, v.field, v.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.violations.is_empty());
    }

    #[test]
    fn push_marks_invalid() {
        let mut report = ValidationReport::new();
        report.push(Violation::new(RuleId::Safety, "facts[0]", "prediction marker"));
        assert!(!report.is_valid());
        assert_eq!(report.by_rule(RuleId::Safety).count(), 1);
        assert_eq!(report.by_rule(RuleId::Integrity).count(), 0);
    }

    #[test]
    fn wire_shape_omits_empty_optionals() {
        let mut report = ValidationReport::new();
        report.push(Violation::new(RuleId::AppendOnly, "operation", "delete rejected"));
        let value = serde_json::to_value(&report).unwrap_or_default();
        assert_eq!(value["valid"], false);
        assert_eq!(value["violations"][0]["rule"], "append_only");
        assert!(value["violations"][0].get("excerpt").is_none());
    }

    #[test]
    fn excerpt_truncates_long_input() {
        let long = "x".repeat(200);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_LIMIT + 3);
        assert_eq!(excerpt("short"), "short");
    }
}
