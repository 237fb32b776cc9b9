//! No-agency layer: keeps derived artifacts from re-entering the store.
//!
//! Snapshots and annotations are views. If their content comes back as a
//! new incident, the engine starts feeding on its own output and identity
//! stops being a record of what happened. Two checks apply to incidents:
//!
//! 1. [`Provenance::Derived`] without an attestation naming who separately
//!    observed the content is rejected, and so is [`Provenance::Attested`]
//!    with a blank attester.
//! 2. Text carrying a derived-content marker is rejected whatever the
//!    provenance claims.
//!
//! Meanings and annotations are checked for derived markers too, since a
//! definition lifted from a snapshot is no more descriptive than the
//! snapshot.

use witness_types::{
    Incident, MeaningEntry, NON_AUTHORITATIVE_NOTE, Provenance, RuleId, Violation,
};

use crate::config::ProvenanceConfig;
use crate::rule::{Rule, Subject};

/// The no-agency layer.
#[derive(Debug, Clone)]
pub struct ProvenanceRule {
    markers: Vec<String>,
}

impl ProvenanceRule {
    /// Build the rule from configuration.
    ///
    /// The snapshot notice is always a marker, configured or not.
    pub fn new(config: &ProvenanceConfig) -> Self {
        let mut markers: Vec<String> = config
            .derived_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        let notice = NON_AUTHORITATIVE_NOTE.to_lowercase();
        if !markers.contains(&notice) {
            markers.push(notice);
        }
        Self { markers }
    }

    /// The first derived marker found in `text`, lowercased.
    pub fn find_marker(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.markers
            .iter()
            .find(|m| lowered.contains(m.as_str()))
            .map(String::as_str)
    }

    fn scan(&self, path: &str, text: &str) -> Option<Violation> {
        self.find_marker(text).map(|marker| {
            Violation::new(
                RuleId::NoAgency,
                path,
                format!("content carries derived-artifact marker `{marker}`"),
            )
            .with_marker(marker)
            .with_excerpt(text)
        })
    }

    fn check_incident(&self, incident: &Incident) -> Vec<Violation> {
        let mut out = Vec::new();
        match &incident.provenance {
            Provenance::External => {}
            Provenance::Attested { attested_by } => {
                if attested_by.trim().is_empty() {
                    out.push(
                        Violation::new(RuleId::NoAgency, "provenance.attested_by", "attestation names no one")
                            .with_marker("blank_attester"),
                    );
                }
            }
            Provenance::Derived {
                artifact,
                attestation,
            } => {
                let attested = attestation
                    .as_ref()
                    .is_some_and(|a| !a.attested_by.trim().is_empty());
                if !attested {
                    out.push(
                        Violation::new(
                            RuleId::NoAgency,
                            "provenance",
                            format!(
                                "derived from {} {} without a separate attestation",
                                artifact.kind, artifact.reference
                            ),
                        )
                        .with_marker("unattested_derivation"),
                    );
                }
            }
        }
        for (field, text) in incident.text_fields() {
            out.extend(self.scan(&field, text));
        }
        for (key, value) in &incident.context {
            if let Some(text) = value.as_str() {
                out.extend(self.scan(&format!("context.{key}"), text));
            }
        }
        out
    }

    fn check_meaning(&self, prefix: &str, meaning: &MeaningEntry) -> Vec<Violation> {
        meaning
            .text_fields()
            .filter_map(|(field, text)| self.scan(&format!("{prefix}{field}"), text))
            .collect()
    }
}

impl Default for ProvenanceRule {
    fn default() -> Self {
        Self::new(&ProvenanceConfig::default())
    }
}

impl Rule for ProvenanceRule {
    fn id(&self) -> RuleId {
        RuleId::NoAgency
    }

    fn check(&self, subject: &Subject<'_>) -> Vec<Violation> {
        match subject {
            Subject::Incident { incident, .. } => self.check_incident(incident),
            Subject::Meaning(meaning) => self.check_meaning("", meaning),
            Subject::Annotation(annotation) => self.check_meaning("meaning.", &annotation.meaning),
            Subject::Operation(_) | Subject::Snapshot(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::Utc;
    use witness_types::{ArtifactKind, ArtifactRef, Attestation, EntityId, IncidentId};

    use super::*;
    use crate::rule::NoKnownIncidents;

    fn incident(provenance: Provenance, fact: &str) -> Incident {
        Incident {
            incident_id: IncidentId::new("i1"),
            date: Utc::now(),
            system: "mail".to_owned(),
            incident_type: witness_types::IncidentType::Other,
            participants: BTreeSet::from([EntityId::new("a")]),
            facts: vec![fact.to_owned()],
            context: BTreeMap::new(),
            summary: String::new(),
            outcome: String::new(),
            metadata: BTreeMap::new(),
            provenance,
        }
    }

    fn derived(attestation: Option<Attestation>) -> Provenance {
        Provenance::Derived {
            artifact: ArtifactRef {
                kind: ArtifactKind::Snapshot,
                reference: "0190c3a4".to_owned(),
            },
            attestation,
        }
    }

    fn check(incident: &Incident) -> Vec<Violation> {
        ProvenanceRule::default().check(&Subject::incident(incident, &NoKnownIncidents))
    }

    #[test]
    fn external_incident_passes() {
        assert!(check(&incident(Provenance::External, "a arrived")).is_empty());
    }

    #[test]
    fn unattested_derivation_is_rejected() {
        let violations = check(&incident(derived(None), "a arrived"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "provenance");
        assert_eq!(violations[0].rule, RuleId::NoAgency);
    }

    #[test]
    fn blank_attestation_is_rejected() {
        let attestation = Attestation {
            attested_by: "  ".to_owned(),
            attested_at: Utc::now(),
        };
        assert_eq!(check(&incident(derived(Some(attestation)), "a arrived")).len(), 1);
    }

    #[test]
    fn attested_incident_needs_an_attester() {
        let blank = Provenance::Attested {
            attested_by: " ".to_owned(),
        };
        let violations = check(&incident(blank, "a arrived"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].marker.as_deref(), Some("blank_attester"));

        let named = Provenance::Attested {
            attested_by: "clerk".to_owned(),
        };
        assert!(check(&incident(named, "a arrived")).is_empty());
    }

    #[test]
    fn attested_derivation_passes() {
        let attestation = Attestation {
            attested_by: "clerk".to_owned(),
            attested_at: Utc::now(),
        };
        assert!(check(&incident(derived(Some(attestation)), "a arrived")).is_empty());
    }

    #[test]
    fn snapshot_notice_in_text_is_rejected_regardless_of_provenance() {
        let fact = format!("copied: {NON_AUTHORITATIVE_NOTE}");
        let violations = check(&incident(Provenance::External, &fact));
        assert!(!violations.is_empty());
        assert_eq!(violations[0].field, "facts[0]");
    }

    #[test]
    fn configured_markers_match_case_insensitively() {
        let violations = check(&incident(Provenance::External, "According to the Snapshot, a left"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].marker.as_deref(), Some("according to the snapshot"));
    }

    #[test]
    fn meaning_definitions_are_scanned() {
        let entry = MeaningEntry::new(
            "communication",
            witness_types::MeaningSource::Etymology,
            "see snapshot_id 42",
        );
        let violations = ProvenanceRule::default().check(&Subject::Meaning(&entry));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "definition");
    }
}
