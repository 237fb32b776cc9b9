//! Operation requests submitted by external layers.
//!
//! The store and overlay expose no method that alters history. External
//! layers that deal in requested operation kinds describe what they want
//! with an [`OperationRequest`], and the append-only rule decides.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{OperationKind, OperationTarget};

/// A requested operation, classified by kind and target only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OperationRequest {
    /// What the caller asks to do.
    pub kind: OperationKind,
    /// Where the caller asks to do it.
    pub target: OperationTarget,
    /// The record concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl OperationRequest {
    /// Describe an operation with no record reference.
    pub const fn new(kind: OperationKind, target: OperationTarget) -> Self {
        Self {
            kind,
            target,
            reference: None,
        }
    }

    /// Name the record the operation concerns.
    #[must_use]
    pub fn on(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

impl core::fmt::Display for OperationRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{} {} on {}", self.kind, reference, self.target),
            None => write!(f, "{} on {}", self.kind, self.target),
        }
    }
}
