//! Integrity layer: structural validity of records.
//!
//! Checks that a committed record would be usable at all: non-empty keys,
//! at least one participant and one fact, no duplicate incident ids, no
//! dates in the future, meanings from an allowed source, snapshots that say
//! they are not authoritative.
//!
//! [`parse_incident_document`] applies the same discipline one step
//! earlier, to raw JSON documents arriving from outside.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde_json::Value;

use witness_types::{
    EntityId, Incident, IncidentId, IncidentType, MeaningEntry, MeaningSource,
    NON_AUTHORITATIVE_NOTE, Provenance, RuleId, Snapshot, ValidationReport, Violation,
};

use crate::config::ValidatorConfig;
use crate::rule::{KnownIncidents, Rule, Subject};

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// The integrity layer.
#[derive(Debug, Clone)]
pub struct IntegrityRule {
    future_tolerance: TimeDelta,
    allowed_sources: Vec<MeaningSource>,
}

impl IntegrityRule {
    /// Build the rule from configuration.
    pub fn new(config: &ValidatorConfig) -> Self {
        let secs = config.integrity.future_tolerance_secs.max(0);
        Self {
            future_tolerance: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
            allowed_sources: config.meaning.allowed_sources.clone(),
        }
    }

    /// Structural checks on an incident about to be appended.
    pub fn check_incident(&self, incident: &Incident, known: &dyn KnownIncidents) -> Vec<Violation> {
        let mut out = Vec::new();

        if incident.incident_id.is_blank() {
            out.push(empty("incident_id", "incident_id must not be empty"));
        } else if known.contains_incident(&incident.incident_id) {
            out.push(
                Violation::new(
                    RuleId::Integrity,
                    "incident_id",
                    format!("incident {} already exists", incident.incident_id),
                )
                .with_marker("duplicate_id"),
            );
        }

        if incident.system.trim().is_empty() {
            out.push(empty("system", "system must not be empty"));
        }

        if incident.participants.is_empty() {
            out.push(empty("participants", "at least one participant is required"));
        } else if incident.participants.iter().any(EntityId::is_blank) {
            out.push(empty("participants", "participant ids must not be empty"));
        }

        if incident.facts.is_empty() {
            out.push(empty("facts", "at least one fact is required"));
        }
        for (i, fact) in incident.facts.iter().enumerate() {
            if fact.trim().is_empty() {
                out.push(empty(format!("facts[{i}]"), "facts must not be blank"));
            }
        }

        let horizon = Utc::now().checked_add_signed(self.future_tolerance);
        if horizon.is_some_and(|limit| incident.date > limit) {
            out.push(
                Violation::new(
                    RuleId::Integrity,
                    "date",
                    format!("date {} lies in the future", incident.date.to_rfc3339()),
                )
                .with_marker("future_date"),
            );
        }

        out
    }

    /// Structural checks on a meaning entry.
    pub fn check_meaning(&self, prefix: &str, meaning: &MeaningEntry) -> Vec<Violation> {
        let mut out = Vec::new();
        if meaning.term.trim().is_empty() {
            out.push(empty(format!("{prefix}term"), "term must not be empty"));
        }
        if meaning.definition.trim().is_empty() {
            out.push(empty(format!("{prefix}definition"), "definition must not be empty"));
        }
        if !self.allowed_sources.contains(&meaning.source) {
            out.push(
                Violation::new(
                    RuleId::Integrity,
                    format!("{prefix}source"),
                    format!("meaning source `{}` is not allowed", meaning.source),
                )
                .with_marker("source_not_allowed"),
            );
        }
        out
    }

    /// Checks that a snapshot does not pass itself off as authoritative.
    pub fn check_snapshot(snapshot: &Snapshot) -> Vec<Violation> {
        let mut out = Vec::new();
        if snapshot.authoritative {
            out.push(
                Violation::new(RuleId::Integrity, "authoritative", "snapshots are never authoritative")
                    .with_marker("authoritative_snapshot"),
            );
        }
        if snapshot.note != NON_AUTHORITATIVE_NOTE {
            out.push(
                Violation::new(RuleId::Integrity, "note", "snapshot is missing the non-authority notice")
                    .with_marker("missing_notice")
                    .with_excerpt(&snapshot.note),
            );
        }
        out
    }
}

impl Default for IntegrityRule {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}

impl Rule for IntegrityRule {
    fn id(&self) -> RuleId {
        RuleId::Integrity
    }

    fn check(&self, subject: &Subject<'_>) -> Vec<Violation> {
        match subject {
            Subject::Incident { incident, known } => self.check_incident(incident, *known),
            Subject::Meaning(meaning) => self.check_meaning("", meaning),
            Subject::Annotation(annotation) => {
                let mut out = Vec::new();
                if annotation.term.trim().is_empty() {
                    out.push(empty("term", "annotated term must not be empty"));
                }
                out.extend(self.check_meaning("meaning.", &annotation.meaning));
                out
            }
            Subject::Snapshot(snapshot) => Self::check_snapshot(snapshot),
            Subject::Operation(_) => Vec::new(),
        }
    }
}

fn empty(field: impl Into<String>, reason: &str) -> Violation {
    Violation::new(RuleId::Integrity, field, reason).with_marker("empty_field")
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse an incident date.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` or `YYYY-MM-DD HH:MM:SS`
/// taken as UTC, and `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

// ---------------------------------------------------------------------------
// Raw documents
// ---------------------------------------------------------------------------

const REQUIRED_KEYS: [&str; 7] = [
    "incident_id",
    "date",
    "system",
    "participants",
    "facts",
    "summary",
    "outcome",
];

/// Turn a raw JSON document into an [`Incident`].
///
/// Checks that every required key is present and correctly typed and that
/// the date parses. All problems are collected into the report rather than
/// stopping at the first. The result has not been through the other
/// layers; it still has to be appended to be accepted.
pub fn parse_incident_document(doc: &Value) -> Result<Incident, ValidationReport> {
    let mut report = ValidationReport::new();

    let Some(obj) = doc.as_object() else {
        report.push(
            Violation::new(RuleId::Integrity, "$", "incident document must be a JSON object")
                .with_marker("wrong_type"),
        );
        return Err(report);
    };

    for key in REQUIRED_KEYS {
        if !obj.contains_key(key) {
            report.push(
                Violation::new(RuleId::Integrity, key, "missing required field")
                    .with_marker("missing_field"),
            );
        }
    }

    let incident_id = string_field(obj.get("incident_id"), "incident_id", &mut report);
    let system = string_field(obj.get("system"), "system", &mut report);
    let summary = string_field(obj.get("summary"), "summary", &mut report);
    let outcome = string_field(obj.get("outcome"), "outcome", &mut report);
    let participants = string_list(obj.get("participants"), "participants", &mut report);
    let facts = string_list(obj.get("facts"), "facts", &mut report);

    let date = match obj.get("date") {
        Some(Value::String(raw)) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                report.push(
                    Violation::new(RuleId::Integrity, "date", "date is not a valid timestamp")
                        .with_marker("invalid_date")
                        .with_excerpt(raw),
                );
            }
            parsed
        }
        Some(_) => {
            report.push(wrong_type("date", "a string"));
            None
        }
        None => None,
    };

    let context = object_field(obj.get("context"), "context", &mut report);
    let metadata = object_field(obj.get("metadata"), "metadata", &mut report);
    let incident_type: IncidentType = typed_field(obj.get("incident_type"), "incident_type", &mut report);
    let provenance: Provenance = typed_field(obj.get("provenance"), "provenance", &mut report);

    match (report.is_valid(), incident_id, date, system, participants, facts) {
        (true, Some(id), Some(date), Some(system), Some(participants), Some(facts)) => Ok(Incident {
            incident_id: IncidentId::new(id),
            date,
            system,
            incident_type,
            participants: participants.into_iter().map(EntityId::new).collect(),
            facts,
            context,
            summary: summary.unwrap_or_default(),
            outcome: outcome.unwrap_or_default(),
            metadata,
            provenance,
        }),
        _ => Err(report),
    }
}

fn wrong_type(field: &str, expected: &str) -> Violation {
    Violation::new(RuleId::Integrity, field, format!("{field} must be {expected}"))
        .with_marker("wrong_type")
}

fn string_field(value: Option<&Value>, field: &str, report: &mut ValidationReport) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        _ => {
            report.push(wrong_type(field, "a string"));
            None
        }
    }
}

fn string_list(value: Option<&Value>, field: &str, report: &mut ValidationReport) -> Option<Vec<String>> {
    let Value::Array(items) = value? else {
        report.push(wrong_type(field, "an array of strings"));
        return None;
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => out.push(s.clone()),
            _ => report.push(wrong_type(&format!("{field}[{i}]"), "a string")),
        }
    }
    Some(out)
}

fn object_field(value: Option<&Value>, field: &str, report: &mut ValidationReport) -> BTreeMap<String, Value> {
    match value {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(_) => {
            report.push(wrong_type(field, "an object"));
            BTreeMap::new()
        }
    }
}

fn typed_field<T>(value: Option<&Value>, field: &str, report: &mut ValidationReport) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match value {
        None | Some(Value::Null) => T::default(),
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            report.push(
                Violation::new(RuleId::Integrity, field, format!("{field} is malformed: {e}"))
                    .with_marker("wrong_type"),
            );
            T::default()
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;
    use crate::rule::NoKnownIncidents;

    fn doc() -> Value {
        json!({
            "incident_id": "incident_001",
            "date": "2024-03-01T12:00:00Z",
            "system": "mail",
            "participants": ["a", "b"],
            "facts": ["a sent a letter to b"],
            "summary": "a letter",
            "outcome": "delivered"
        })
    }

    fn fields(report: &ValidationReport) -> Vec<&str> {
        report.violations.iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn well_formed_document_parses() {
        let incident = parse_incident_document(&doc()).unwrap();
        assert_eq!(incident.incident_id.as_str(), "incident_001");
        assert_eq!(incident.participants.len(), 2);
        assert_eq!(incident.incident_type, IncidentType::Other);
        assert_eq!(incident.provenance, Provenance::External);
    }

    #[test]
    fn missing_keys_are_all_reported() {
        let report = parse_incident_document(&json!({"incident_id": "x"})).unwrap_err();
        let missing = fields(&report);
        for key in ["date", "system", "participants", "facts", "summary", "outcome"] {
            assert!(missing.contains(&key), "{key}");
        }
        assert!(report.has_marker("missing_field"));
    }

    #[test]
    fn wrong_types_are_reported() {
        let mut bad = doc();
        bad["participants"] = json!("a");
        bad["facts"] = json!(["ok", 3]);
        let report = parse_incident_document(&bad).unwrap_err();
        assert_eq!(fields(&report), vec!["participants", "facts[1]"]);
    }

    #[test]
    fn unparseable_date_is_reported() {
        let mut bad = doc();
        bad["date"] = json!("yesterday");
        let report = parse_incident_document(&bad).unwrap_err();
        assert!(report.has_marker("invalid_date"));
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(parse_incident_document(&json!([1, 2])).is_err());
    }

    #[test]
    fn dates_accept_three_forms() {
        let full = parse_date("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(full.hour(), 10);
        let naive = parse_date("2024-03-01T12:30:00").unwrap();
        assert_eq!(naive.hour(), 12);
        let day = parse_date("2024-03-01").unwrap();
        assert_eq!((day.day(), day.hour()), (1, 0));
        assert!(parse_date("03/01/2024").is_none());
    }

    fn incident() -> Incident {
        parse_incident_document(&doc()).unwrap()
    }

    #[test]
    fn structurally_sound_incident_passes() {
        let rule = IntegrityRule::default();
        assert!(rule.check_incident(&incident(), &NoKnownIncidents).is_empty());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let rule = IntegrityRule::default();
        let known: BTreeSet<IncidentId> = BTreeSet::from([IncidentId::new("incident_001")]);
        let violations = rule.check_incident(&incident(), &known);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].marker.as_deref(), Some("duplicate_id"));
    }

    #[test]
    fn empty_collections_are_rejected() {
        let mut bad = incident();
        bad.participants.clear();
        bad.facts = vec!["  ".to_owned()];
        bad.system = String::new();
        let violations = IntegrityRule::default().check_incident(&bad, &NoKnownIncidents);
        let paths: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(paths, vec!["system", "participants", "facts[0]"]);
    }

    #[test]
    fn future_dates_are_rejected() {
        let mut bad = incident();
        bad.date = Utc::now().checked_add_signed(TimeDelta::days(2)).unwrap();
        let violations = IntegrityRule::default().check_incident(&bad, &NoKnownIncidents);
        assert_eq!(violations[0].marker.as_deref(), Some("future_date"));
    }

    #[test]
    fn meaning_source_must_be_allowed() {
        let rule = IntegrityRule::default();
        let ok = MeaningEntry::new("word", MeaningSource::Etymology, "from Latin");
        assert!(rule.check_meaning("", &ok).is_empty());
        let technical = MeaningEntry::new("word", MeaningSource::Technical, "a unit");
        assert_eq!(rule.check_meaning("", &technical)[0].field, "source");
        let blank = MeaningEntry::new("", MeaningSource::Cultural, " ");
        assert_eq!(rule.check_meaning("", &blank).len(), 2);
    }

    #[test]
    fn authoritative_snapshot_is_rejected() {
        let mut snapshot = Snapshot::new(witness_types::SnapshotBody::Relationship(
            witness_types::RelationshipSnapshot {
                entity1: EntityId::new("a"),
                entity2: EntityId::new("b"),
                interaction_count: 0,
                shared_incidents: Vec::new(),
            },
        ));
        assert!(IntegrityRule::check_snapshot(&snapshot).is_empty());
        snapshot.authoritative = true;
        snapshot.note.clear();
        assert_eq!(IntegrityRule::check_snapshot(&snapshot).len(), 2);
    }
}
