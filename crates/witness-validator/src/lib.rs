//! Rule pipeline for the Witness incident-identity engine.
//!
//! Every record that enters the store or the meaning overlay, and every
//! operation an external layer requests, passes through a [`Validator`]
//! first. The validator is an ordered list of [`Rule`]s, one per layer:
//!
//! 1. [`safety::SafetyRule`] -- prediction, prescription, destiny and agency
//!    language
//! 2. [`append_only::AppendOnlyRule`] -- requests to alter history
//! 3. [`provenance::ProvenanceRule`] -- derived artifacts fed back as
//!    incidents
//! 4. [`integrity::IntegrityRule`] -- structural validity
//!
//! Rules are stateless. Configuration is passed in at construction through
//! [`ValidatorConfig`]; there is no global rule table.
//!
//! The validator itself never logs rejections at warn level. The component
//! that acted on the report does that, usually through [`log_rejection`].

pub mod append_only;
pub mod audit;
pub mod config;
pub mod integrity;
pub mod provenance;
pub mod rule;
pub mod safety;

use tracing::{debug, warn};

use witness_types::{
    Annotation, Incident, MeaningEntry, OperationRequest, RuleId, Snapshot, ValidationReport,
};

pub use audit::{SystemState, validate_system_state};
pub use config::{ConfigError, ValidatorConfig};
pub use integrity::{parse_date, parse_incident_document};
pub use rule::{KnownIncidents, NoKnownIncidents, Rule, Subject};

use append_only::AppendOnlyRule;
use integrity::IntegrityRule;
use provenance::ProvenanceRule;
use safety::SafetyRule;

/// How far a validation pass goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Stop after the first layer that reports a violation.
    FailFast,
    /// Run every layer and collect everything.
    #[default]
    Full,
}

/// Ordered rule pipeline.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
    config: ValidatorConfig,
}

impl core::fmt::Debug for Validator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let ids: Vec<RuleId> = self.rules.iter().map(|r| r.id()).collect();
        f.debug_struct("Validator")
            .field("rules", &ids)
            .field("config", &self.config)
            .finish()
    }
}

impl Validator {
    /// Build the four standard layers from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if a configured safety marker
    /// does not compile.
    pub fn new(config: ValidatorConfig) -> Result<Self, ConfigError> {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(SafetyRule::new(&config.safety)?),
            Box::new(AppendOnlyRule),
            Box::new(ProvenanceRule::new(&config.provenance)),
            Box::new(IntegrityRule::new(&config)),
        ];
        debug!(rules = rules.len(), "Validator built");
        Ok(Self { rules, config })
    }

    /// Add a rule after the standard layers.
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        debug!(rule = %rule.id(), "Rule registered");
        self.rules.push(rule);
    }

    /// The configuration the validator was built with.
    pub const fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Layers in check order.
    pub fn layers(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.rules.iter().map(|r| r.id())
    }

    /// Run the pipeline over `subject`.
    pub fn validate(&self, subject: &Subject<'_>, mode: ValidationMode) -> ValidationReport {
        let mut report = ValidationReport::new();
        for rule in &self.rules {
            report.extend(rule.check(subject));
            if mode == ValidationMode::FailFast && !report.is_valid() {
                break;
            }
        }
        debug!(
            subject = subject.label(),
            valid = report.is_valid(),
            violations = report.violations.len(),
            "Validation pass"
        );
        report
    }

    /// Run only the rules reporting under `layer`.
    pub fn run_layer(&self, layer: RuleId, subject: &Subject<'_>) -> ValidationReport {
        let mut report = ValidationReport::new();
        for rule in self.rules.iter().filter(|r| r.id() == layer) {
            report.extend(rule.check(subject));
        }
        report
    }

    /// Check an incident submitted for append against `known` ids.
    pub fn check_incident(&self, incident: &Incident, known: &dyn KnownIncidents) -> ValidationReport {
        self.validate(&Subject::incident(incident, known), ValidationMode::Full)
    }

    /// Check a meaning entry.
    pub fn check_meaning(&self, meaning: &MeaningEntry) -> ValidationReport {
        self.validate(&Subject::Meaning(meaning), ValidationMode::Full)
    }

    /// Check an annotation link. Reference existence is the overlay's job.
    pub fn check_annotation(&self, annotation: &Annotation) -> ValidationReport {
        self.validate(&Subject::Annotation(annotation), ValidationMode::Full)
    }

    /// Check an operation request.
    pub fn check_operation(&self, request: &OperationRequest) -> ValidationReport {
        self.validate(&Subject::Operation(request), ValidationMode::Full)
    }

    /// Check a generated snapshot.
    pub fn check_snapshot(&self, snapshot: &Snapshot) -> ValidationReport {
        self.validate(&Subject::Snapshot(snapshot), ValidationMode::Full)
    }
}

/// Log every violation of a rejected request at warn level.
///
/// `action` names what was refused, e.g. `"append"` or `"add_meaning"`.
pub fn log_rejection(action: &str, report: &ValidationReport) {
    for v in &report.violations {
        warn!(
            action,
            rule = %v.rule,
            field = %v.field,
            marker = v.marker.as_deref().unwrap_or("-"),
            excerpt = v.excerpt.as_deref().unwrap_or(""),
            "Rejected: {}",
            v.reason
        );
    }
}
