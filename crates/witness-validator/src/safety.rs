//! Safety layer: rejects prediction, prescription, destiny and agency
//! language in free text.
//!
//! The check is lexical. Every marker is a case-insensitive, word-bounded
//! regular expression, and a match anywhere in a scanned field rejects the
//! record. There is no attempt to interpret context, so "will" in "the will
//! was read aloud" is rejected too. Rewording the record is the remedy.
//!
//! # Scanned fields
//!
//! | Subject    | Fields                                                  |
//! |------------|---------------------------------------------------------|
//! | Incident   | `facts[..]`, `summary`, `outcome`                       |
//! | Meaning    | `definition`, `usage_examples[..]`                      |
//! | Annotation | `meaning.definition`, `meaning.usage_examples[..]`      |
//! | Snapshot   | every embedded incident and meaning, same fields        |
//!
//! # Built-in markers
//!
//! - **prediction**: will, won't, shall, predict*, forecast*, future,
//!   inevitable, "is certain/sure/likely/bound to"
//! - **prescription**: should, shouldn't, must, mustn't, ought to,
//!   supposed to, recommend*, need(s) to, has/have to
//! - **destiny**: destiny, destined, fate, fated, meant to
//! - **agency**: optimi[sz]*, manipulat*, command*, control*, influenc*
//! - **opinion**: best, worst, good, bad, right, wrong. Facts only.
//!
//! The first four families are always on. Deployments add markers through
//! [`SafetyConfig::extra_markers`] and may switch off the opinion check
//! with [`SafetyConfig::opinion_in_facts`].

use regex::Regex;
use serde::{Deserialize, Serialize};

use witness_types::{Incident, MeaningEntry, RuleId, SnapshotBody, Violation};

use crate::config::{ConfigError, SafetyConfig};
use crate::rule::{Rule, Subject};

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Family of language a marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    /// Statements about what is going to happen.
    Prediction,
    /// Statements about what someone ought to do.
    Prescription,
    /// Statements about fate or purpose.
    Destiny,
    /// Statements that direct or steer an entity.
    Agency,
    /// Evaluative wording. Only checked in facts.
    Opinion,
}

impl MarkerCategory {
    /// Every category, in report order.
    pub const ALL: [Self; 5] = [
        Self::Prediction,
        Self::Prescription,
        Self::Destiny,
        Self::Agency,
        Self::Opinion,
    ];

    /// The `snake_case` name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prediction => "prediction",
            Self::Prescription => "prescription",
            Self::Destiny => "destiny",
            Self::Agency => "agency",
            Self::Opinion => "opinion",
        }
    }

    /// Whether markers of this category apply to the field at `path`.
    pub fn applies_to(self, path: &str) -> bool {
        match self {
            Self::Opinion => is_fact_path(path),
            _ => true,
        }
    }

    const fn builtin(self) -> &'static [&'static str] {
        match self {
            Self::Prediction => PREDICTION_MARKERS,
            Self::Prescription => PRESCRIPTION_MARKERS,
            Self::Destiny => DESTINY_MARKERS,
            Self::Agency => AGENCY_MARKERS,
            Self::Opinion => OPINION_MARKERS,
        }
    }
}

impl core::fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_fact_path(path: &str) -> bool {
    path.starts_with("facts[") || path.contains(".facts[")
}

// ---------------------------------------------------------------------------
// Pattern Definitions
// ---------------------------------------------------------------------------

const PREDICTION_MARKERS: &[&str] = &[
    "will",
    "won['\u{2019}]t",
    "shall",
    r"predict\w*",
    r"forecast\w*",
    "future",
    "inevitabl[ey]",
    r"(?:is|are) (?:certain|sure|likely|bound) to",
];

const PRESCRIPTION_MARKERS: &[&str] = &[
    "should",
    "shouldn['\u{2019}]t",
    "must",
    "mustn['\u{2019}]t",
    "ought to",
    "supposed to",
    r"recommend\w*",
    "needs? to",
    "ha(?:s|ve) to",
];

const DESTINY_MARKERS: &[&str] = &["destiny", "destined", "fated?", "meant to"];

const AGENCY_MARKERS: &[&str] = &[
    r"optimi[sz]\w*",
    r"manipulat\w*",
    r"command\w*",
    r"control\w*",
    r"influenc\w*",
];

const OPINION_MARKERS: &[&str] = &["best", "worst", "good", "bad", "right", "wrong"];

// ---------------------------------------------------------------------------
// Compiled markers
// ---------------------------------------------------------------------------

/// One compiled marker.
#[derive(Debug, Clone)]
pub struct Marker {
    /// Category the marker reports under.
    pub category: MarkerCategory,
    /// The pattern as configured, reported as the violation marker.
    pub pattern: String,
    regex: Regex,
}

impl Marker {
    /// Compile `pattern` as a case-insensitive, word-bounded expression.
    pub fn compile(category: MarkerCategory, pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            }
        })?;
        Ok(Self {
            category,
            pattern: pattern.to_owned(),
            regex,
        })
    }

    /// The matched text, if the marker occurs in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// The safety layer.
#[derive(Debug, Clone)]
pub struct SafetyRule {
    markers: Vec<Marker>,
}

impl SafetyRule {
    /// Compile the built-in markers plus any configured extras.
    pub fn new(config: &SafetyConfig) -> Result<Self, ConfigError> {
        let mut markers = Vec::new();
        for category in MarkerCategory::ALL {
            if category == MarkerCategory::Opinion && !config.opinion_in_facts {
                continue;
            }
            for pattern in category.builtin() {
                markers.push(Marker::compile(category, pattern)?);
            }
        }
        for extra in &config.extra_markers {
            markers.push(Marker::compile(extra.category, &extra.pattern)?);
        }
        Ok(Self { markers })
    }

    /// The compiled markers, in check order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Scan one field. Yields one violation per matching marker.
    pub fn scan_text(&self, path: &str, text: &str) -> Vec<Violation> {
        self.markers
            .iter()
            .filter(|m| m.category.applies_to(path))
            .filter_map(|m| {
                m.find(text).map(|found| {
                    Violation::new(
                        RuleId::Safety,
                        path,
                        format!("{} marker `{found}`", m.category),
                    )
                    .with_marker(m.pattern.clone())
                    .with_excerpt(text)
                })
            })
            .collect()
    }

    fn scan_incident(&self, prefix: &str, incident: &Incident, out: &mut Vec<Violation>) {
        for (field, text) in incident.text_fields() {
            out.extend(self.scan_text(&format!("{prefix}{field}"), text));
        }
    }

    fn scan_meaning(&self, prefix: &str, meaning: &MeaningEntry, out: &mut Vec<Violation>) {
        for (field, text) in meaning.text_fields() {
            out.extend(self.scan_text(&format!("{prefix}{field}"), text));
        }
    }
}

impl Rule for SafetyRule {
    fn id(&self) -> RuleId {
        RuleId::Safety
    }

    fn check(&self, subject: &Subject<'_>) -> Vec<Violation> {
        let mut out = Vec::new();
        match subject {
            Subject::Incident { incident, .. } => self.scan_incident("", incident, &mut out),
            Subject::Meaning(meaning) => self.scan_meaning("", meaning, &mut out),
            Subject::Annotation(annotation) => {
                self.scan_meaning("meaning.", &annotation.meaning, &mut out);
            }
            Subject::Snapshot(snapshot) => {
                for (i, incident) in snapshot.body.incidents().into_iter().enumerate() {
                    self.scan_incident(&format!("body.incidents[{i}]."), incident, &mut out);
                }
                match &snapshot.body {
                    SnapshotBody::Identity(identity) => {
                        for (i, annotation) in identity.meanings.iter().enumerate() {
                            let prefix = format!("body.meanings[{i}].meaning.");
                            self.scan_meaning(&prefix, &annotation.meaning, &mut out);
                        }
                    }
                    SnapshotBody::Timeline(timeline) => {
                        for (i, entry) in timeline.entries.iter().enumerate() {
                            for (j, annotation) in entry.annotations.iter().enumerate() {
                                let prefix = format!("body.entries[{i}].annotations[{j}].meaning.");
                                self.scan_meaning(&prefix, &annotation.meaning, &mut out);
                            }
                        }
                    }
                    SnapshotBody::System(_) | SnapshotBody::Relationship(_) | SnapshotBody::Temporal(_) => {}
                }
            }
            Subject::Operation(_) => {}
        }
        out
    }
}
