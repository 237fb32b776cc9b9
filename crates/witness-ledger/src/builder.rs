//! Builder for assembling [`Incident`] values.
//!
//! The builder only checks that the fields an incident cannot exist
//! without have been set. Content rules (safety, provenance, integrity) are
//! the validator's business and run when the incident is appended.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use witness_types::{EntityId, Incident, IncidentId, IncidentType, Provenance};

use crate::LedgerError;

/// Builder for [`Incident`] values.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use witness_ledger::IncidentBuilder;
/// use witness_types::IncidentType;
///
/// let incident = IncidentBuilder::new("incident_001", "mail")
///     .date(Utc::now())
///     .incident_type(IncidentType::Communication)
///     .participants(["a", "b"])
///     .fact("a sent a letter to b")
///     .summary("letter")
///     .build();
///
/// assert!(incident.is_ok());
/// ```
#[derive(Debug)]
pub struct IncidentBuilder {
    incident_id: IncidentId,
    system: String,
    date: Option<DateTime<Utc>>,
    incident_type: IncidentType,
    participants: BTreeSet<EntityId>,
    facts: Vec<String>,
    context: BTreeMap<String, Value>,
    summary: String,
    outcome: String,
    metadata: BTreeMap<String, Value>,
    provenance: Provenance,
}

impl IncidentBuilder {
    /// Start an incident with the given id and originating system.
    pub fn new(incident_id: impl Into<IncidentId>, system: impl Into<String>) -> Self {
        Self {
            incident_id: incident_id.into(),
            system: system.into(),
            date: None,
            incident_type: IncidentType::default(),
            participants: BTreeSet::new(),
            facts: Vec::new(),
            context: BTreeMap::new(),
            summary: String::new(),
            outcome: String::new(),
            metadata: BTreeMap::new(),
            provenance: Provenance::default(),
        }
    }

    /// Set when the incident occurred.
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the descriptive classification.
    #[must_use]
    pub const fn incident_type(mut self, incident_type: IncidentType) -> Self {
        self.incident_type = incident_type;
        self
    }

    /// Add one participant.
    #[must_use]
    pub fn participant(mut self, entity: impl Into<EntityId>) -> Self {
        self.participants.insert(entity.into());
        self
    }

    /// Add several participants.
    #[must_use]
    pub fn participants<I, E>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityId>,
    {
        self.participants.extend(entities.into_iter().map(Into::into));
        self
    }

    /// Append one fact.
    #[must_use]
    pub fn fact(mut self, fact: impl Into<String>) -> Self {
        self.facts.push(fact.into());
        self
    }

    /// Set the plain-language summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the outcome.
    #[must_use]
    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = outcome.into();
        self
    }

    /// Add a context entry.
    #[must_use]
    pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set where the content came from.
    #[must_use]
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Produce the [`Incident`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if the date, participants or
    /// facts were never set.
    pub fn build(self) -> Result<Incident, LedgerError> {
        let date = self.date.ok_or(LedgerError::MissingField("date"))?;
        if self.participants.is_empty() {
            return Err(LedgerError::MissingField("participants"));
        }
        if self.facts.is_empty() {
            return Err(LedgerError::MissingField("facts"));
        }
        Ok(Incident {
            incident_id: self.incident_id,
            date,
            system: self.system,
            incident_type: self.incident_type,
            participants: self.participants,
            facts: self.facts,
            context: self.context,
            summary: self.summary,
            outcome: self.outcome,
            metadata: self.metadata,
            provenance: self.provenance,
        })
    }
}
