//! Whole-state audits.
//!
//! [`validate_system_state`] re-runs every layer over a complete dump of the
//! engine's records and, when a journal baseline is supplied, checks that
//! the current store still begins with it unchanged. The audit reports and
//! logs; it never repairs anything.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use witness_types::{
    Annotation, AnnotationId, AnnotationTarget, EntityId, Incident, IncidentId, MeaningEntry, RuleId,
    Snapshot, ValidationReport, Violation,
};

use crate::rule::Subject;
use crate::{ValidationMode, Validator};

/// A complete dump of engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// Incidents in append order.
    #[serde(default)]
    pub incidents: Vec<Incident>,
    /// Meaning entries in insertion order.
    #[serde(default)]
    pub meanings: Vec<MeaningEntry>,
    /// Annotation links in creation order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Cached snapshots.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    /// Incidents as previously journaled, which must be an unchanged prefix
    /// of `incidents`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Vec<Incident>>,
}

/// Audit a complete state dump.
///
/// Every violation carries a `subject` naming the record it belongs to.
pub fn validate_system_state(state: &SystemState, validator: &Validator) -> ValidationReport {
    let mut report = ValidationReport::new();

    let mut seen: BTreeSet<IncidentId> = BTreeSet::new();
    let mut entities: BTreeSet<&EntityId> = BTreeSet::new();
    for incident in &state.incidents {
        let subject = format!("incident:{}", incident.incident_id);
        let found = validator.validate(&Subject::incident(incident, &seen), ValidationMode::Full);
        report.extend(tag(found, &subject));
        seen.insert(incident.incident_id.clone());
        entities.extend(incident.participants.iter());
    }

    for meaning in &state.meanings {
        let subject = format!("meaning:{}", meaning.term);
        let found = validator.validate(&Subject::Meaning(meaning), ValidationMode::Full);
        report.extend(tag(found, &subject));
    }

    let mut links: BTreeSet<AnnotationId> = BTreeSet::new();
    for annotation in &state.annotations {
        let subject = format!("annotation:{}", annotation.annotation_id);
        let found = validator.validate(&Subject::Annotation(annotation), ValidationMode::Full);
        report.extend(tag(found, &subject));

        if !links.insert(annotation.annotation_id) {
            report.push(
                Violation::new(
                    RuleId::Integrity,
                    "annotation_id",
                    format!("annotation {} is stored more than once", annotation.annotation_id),
                )
                .with_marker("duplicate_id")
                .with_subject(subject.clone()),
            );
        }

        let backed = match &annotation.target {
            AnnotationTarget::Incident(id) => seen.contains(id),
            AnnotationTarget::Entity(id) => entities.contains(id),
        };
        if !backed {
            report.push(
                Violation::new(
                    RuleId::Integrity,
                    "target",
                    format!("{} has no backing record", annotation.target),
                )
                .with_marker("unknown_reference")
                .with_subject(subject),
            );
        }
    }

    for snapshot in &state.snapshots {
        let subject = format!("snapshot:{}", snapshot.snapshot_id);
        let found = validator.validate(&Subject::Snapshot(snapshot), ValidationMode::Full);
        report.extend(tag(found, &subject));
    }

    if let Some(baseline) = &state.baseline {
        report.extend(check_baseline(baseline, &state.incidents));
    }

    for v in &report.violations {
        error!(
            rule = %v.rule,
            subject = v.subject.as_deref().unwrap_or("-"),
            field = %v.field,
            marker = v.marker.as_deref().unwrap_or("-"),
            excerpt = v.excerpt.as_deref().unwrap_or(""),
            "audit violation: {}",
            v.reason
        );
    }
    info!(
        incidents = state.incidents.len(),
        meanings = state.meanings.len(),
        annotations = state.annotations.len(),
        snapshots = state.snapshots.len(),
        violations = report.violations.len(),
        "System state audited"
    );

    report
}

fn tag(report: ValidationReport, subject: &str) -> impl Iterator<Item = Violation> + '_ {
    report
        .violations
        .into_iter()
        .map(move |v| v.with_subject(subject))
}

/// Compare a previously journaled sequence with the current one.
///
/// The current sequence may be longer. Anything removed, reordered or
/// rewritten is a violation of append-only history.
pub fn check_baseline(baseline: &[Incident], current: &[Incident]) -> Vec<Violation> {
    let mut out = Vec::new();

    if current.len() < baseline.len() {
        out.push(
            Violation::new(
                RuleId::AppendOnly,
                "incidents",
                format!(
                    "store holds {} incidents but {} were journaled",
                    current.len(),
                    baseline.len()
                ),
            )
            .with_marker("history_truncated"),
        );
    }

    for (position, (before, after)) in baseline.iter().zip(current).enumerate() {
        let subject = format!("incident:{}", before.incident_id);
        if before.incident_id != after.incident_id {
            out.push(
                Violation::new(
                    RuleId::AppendOnly,
                    "incident_id",
                    format!(
                        "position {position} held {} and now holds {}",
                        before.incident_id, after.incident_id
                    ),
                )
                .with_marker("history_reordered")
                .with_subject(subject),
            );
            continue;
        }
        for field in changed_fields(before, after) {
            out.push(
                Violation::new(RuleId::AppendOnly, field, "field changed after commit")
                    .with_marker("history_mutation")
                    .with_subject(subject.clone()),
            );
        }
    }

    out
}

/// Names of the fields that differ between two versions of one incident.
pub fn changed_fields(before: &Incident, after: &Incident) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if before.date != after.date {
        fields.push("date");
    }
    if before.system != after.system {
        fields.push("system");
    }
    if before.incident_type != after.incident_type {
        fields.push("incident_type");
    }
    if before.participants != after.participants {
        fields.push("participants");
    }
    if before.facts != after.facts {
        fields.push("facts");
    }
    if before.context != after.context {
        fields.push("context");
    }
    if before.summary != after.summary {
        fields.push("summary");
    }
    if before.outcome != after.outcome {
        fields.push("outcome");
    }
    if before.metadata != after.metadata {
        fields.push("metadata");
    }
    if before.provenance != after.provenance {
        fields.push("provenance");
    }
    fields
}
