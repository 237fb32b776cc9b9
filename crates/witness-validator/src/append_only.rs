//! Append-only layer: rejects requests to alter or remove committed records.
//!
//! The store and overlay have no method that could modify history, so this
//! rule only ever sees [`OperationRequest`]s from layers that speak in
//! operation kinds. Deleting a cached snapshot is fine; touching the
//! incident store or the meaning overlay is not.

use witness_types::{OperationRequest, RuleId, Violation};

use crate::rule::{Rule, Subject};

/// Violation for a request that would alter history, if it would.
pub fn check_request(request: &OperationRequest) -> Option<Violation> {
    if !(request.kind.alters_history() && request.target.is_append_only()) {
        return None;
    }
    let reason = match &request.reference {
        Some(reference) => format!(
            "{} of {reference} rejected: {} is append-only",
            request.kind, request.target
        ),
        None => format!("{} rejected: {} is append-only", request.kind, request.target),
    };
    Some(
        Violation::new(RuleId::AppendOnly, "operation", reason)
            .with_marker("history_mutation")
            .with_excerpt(&request.to_string()),
    )
}

/// The append-only layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOnlyRule;

impl Rule for AppendOnlyRule {
    fn id(&self) -> RuleId {
        RuleId::AppendOnly
    }

    fn check(&self, subject: &Subject<'_>) -> Vec<Violation> {
        match subject {
            Subject::Operation(request) => check_request(request).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}
