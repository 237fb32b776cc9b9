//! Point-in-time reads of the meaning overlay.

use std::collections::BTreeMap;
use std::sync::Arc;

use witness_types::{
    Annotation, AnnotationId, AnnotationTarget, EntityId, IncidentId, MeaningEntry, MeaningSource,
};

/// Terms are matched trimmed and case-insensitively.
pub(crate) fn term_key(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Entries and links plus their lookup indexes.
#[derive(Debug, Clone, Default)]
pub(crate) struct OverlayIndex {
    entries: Vec<Arc<MeaningEntry>>,
    by_term: BTreeMap<String, Vec<usize>>,
    annotations: Vec<Arc<Annotation>>,
    by_target: BTreeMap<AnnotationTarget, Vec<usize>>,
    by_id: BTreeMap<AnnotationId, usize>,
}

impl OverlayIndex {
    pub(crate) fn insert_meaning(&mut self, entry: Arc<MeaningEntry>) {
        let position = self.entries.len();
        self.by_term.entry(term_key(&entry.term)).or_default().push(position);
        self.entries.push(entry);
    }

    pub(crate) fn insert_annotation(&mut self, annotation: Arc<Annotation>) {
        let position = self.annotations.len();
        self.by_target
            .entry(annotation.target.clone())
            .or_default()
            .push(position);
        self.by_id.insert(annotation.annotation_id, position);
        self.annotations.push(annotation);
    }
}

/// A consistent, read-only view of the overlay.
#[derive(Debug, Clone)]
pub struct OverlayView {
    index: Arc<OverlayIndex>,
}

impl OverlayView {
    pub(crate) const fn new(index: Arc<OverlayIndex>) -> Self {
        Self { index }
    }

    /// Every meaning entry, in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<MeaningEntry>> + '_ {
        self.index.entries.iter()
    }

    /// Entries for `term` across all sources, in insertion order.
    pub fn meanings_for_term<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a Arc<MeaningEntry>> + use<'a> {
        self.index
            .by_term
            .get(&term_key(term))
            .into_iter()
            .flatten()
            .filter_map(|p| self.index.entries.get(*p))
    }

    /// Entries from one source, in insertion order.
    pub fn entries_for_source(&self, source: MeaningSource) -> impl Iterator<Item = &Arc<MeaningEntry>> + '_ {
        self.entries().filter(move |e| e.source == source)
    }

    /// Distinct terms, normalized, in sorted order.
    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.by_term.keys().map(String::as_str)
    }

    /// Every annotation link, in creation order.
    pub fn annotations(&self) -> impl Iterator<Item = &Arc<Annotation>> + '_ {
        self.index.annotations.iter()
    }

    /// The link with this id.
    pub fn annotation(&self, id: AnnotationId) -> Option<&Arc<Annotation>> {
        self.index
            .by_id
            .get(&id)
            .and_then(|p| self.index.annotations.get(*p))
    }

    /// Links attached to `target`, in creation order.
    pub fn annotations_for<'a>(
        &'a self,
        target: &AnnotationTarget,
    ) -> impl Iterator<Item = &'a Arc<Annotation>> + use<'a> {
        self.index
            .by_target
            .get(target)
            .into_iter()
            .flatten()
            .filter_map(|p| self.index.annotations.get(*p))
    }

    /// Links attached to an incident.
    pub fn annotations_for_incident<'a>(
        &'a self,
        incident_id: &str,
    ) -> impl Iterator<Item = &'a Arc<Annotation>> + use<'a> {
        self.annotations_for(&AnnotationTarget::Incident(IncidentId::new(incident_id)))
    }

    /// Links attached directly to an entity.
    pub fn annotations_for_entity<'a>(
        &'a self,
        entity_id: &str,
    ) -> impl Iterator<Item = &'a Arc<Annotation>> + use<'a> {
        self.annotations_for(&AnnotationTarget::Entity(EntityId::new(entity_id)))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.index.entries.len()
    }

    /// Whether no entry has been stored.
    pub fn is_empty(&self) -> bool {
        self.index.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn view() -> OverlayView {
        let mut index = OverlayIndex::default();
        index.insert_meaning(Arc::new(MeaningEntry::new(
            "Letter",
            MeaningSource::Etymology,
            "from Latin littera",
        )));
        index.insert_meaning(Arc::new(MeaningEntry::new(
            "gift",
            MeaningSource::Cultural,
            "an exchange",
        )));
        index.insert_meaning(Arc::new(MeaningEntry::new(
            " letter ",
            MeaningSource::Narrative,
            "a device that moves news between places",
        )));
        index.insert_annotation(Arc::new(Annotation {
            annotation_id: AnnotationId::new(),
            target: AnnotationTarget::Incident(IncidentId::new("i1")),
            term: "letter".to_owned(),
            meaning: MeaningEntry::new("letter", MeaningSource::Etymology, "from Latin littera"),
            created_at: Utc::now(),
        }));
        OverlayView::new(Arc::new(index))
    }

    #[test]
    fn terms_match_case_and_whitespace_insensitively() {
        let v = view();
        let found: Vec<_> = v.meanings_for_term("LETTER").map(|e| e.source).collect();
        assert_eq!(found, vec![MeaningSource::Etymology, MeaningSource::Narrative]);
        assert_eq!(v.terms().collect::<Vec<_>>(), vec!["gift", "letter"]);
    }

    #[test]
    fn entries_filter_by_source() {
        let v = view();
        assert_eq!(v.entries_for_source(MeaningSource::Cultural).count(), 1);
        assert_eq!(v.entries_for_source(MeaningSource::Technical).count(), 0);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn annotations_are_found_by_target() {
        let v = view();
        assert_eq!(v.annotations_for_incident("i1").count(), 1);
        assert_eq!(v.annotations_for_entity("i1").count(), 0);
        assert_eq!(v.annotations().count(), 1);
    }

    #[test]
    fn annotations_are_found_by_id() {
        let v = view();
        let first = v.annotations().next().unwrap();
        assert_eq!(v.annotation(first.annotation_id), Some(first));
        assert!(v.annotation(AnnotationId::new()).is_none());
    }
}
