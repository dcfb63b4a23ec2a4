//! Up-front validation of service references.
//!
//! Lets a host surface configuration errors (missing or ambiguous services)
//! before any consumer runs, without creating a single service.

use std::collections::HashSet;
use std::fmt;

use crate::error::{DiError, DiResult};
use crate::reference::ServiceReference;
use crate::registry::ServiceRegistry;
use crate::resolver::Resolved;

/// A reference that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Display form of the failing reference
    pub reference: String,
    pub error: DiError,
}

/// A configuration that resolves but is probably not what was intended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Optional reference with no matching service
    OptionalAbsent { reference: String },
    /// Optional reference whose resolution failed; accessing it yields nothing
    OptionalUnresolved { reference: String, error: DiError },
    /// Registered service that none of the validated references resolve to
    UnusedService { service: String },
}

/// Result of validating a batch of references.
///
/// # Examples
///
/// ```rust
/// use shared_services::{ServiceRegistry, ServiceReference, ServiceType, ValidationWarning};
///
/// struct Cache;
/// struct Metrics;
///
/// let registry = ServiceRegistry::new();
/// registry.register("cache", ServiceType::of::<Cache>(), || Ok::<_, String>(Cache)).unwrap();
/// registry
///     .register("metrics", ServiceType::of::<Metrics>(), || Ok::<_, String>(Metrics))
///     .unwrap();
///
/// let cache = ServiceReference::by_type(ServiceType::of::<Cache>());
/// let missing = ServiceReference::named("db", ServiceType::of::<Cache>());
///
/// let report = registry.validate_all([&cache, &missing]);
/// assert!(!report.is_valid());
/// assert_eq!(report.errors.len(), 1);
/// assert!(report.warnings.contains(&ValidationWarning::UnusedService {
///     service: "metrics".to_string(),
/// }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first error, if any.
    pub fn into_result(self) -> DiResult<()> {
        match self.errors.into_iter().next() {
            Some(issue) => Err(issue.error),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        )?;
        for issue in &self.errors {
            writeln!(f, "  error: {}: {}", issue.reference, issue.error)?;
        }
        for warning in &self.warnings {
            match warning {
                ValidationWarning::OptionalAbsent { reference } => {
                    writeln!(f, "  warning: {} resolves to nothing", reference)?
                }
                ValidationWarning::OptionalUnresolved { reference, error } => {
                    writeln!(f, "  warning: {} resolves to nothing: {}", reference, error)?
                }
                ValidationWarning::UnusedService { service } => {
                    writeln!(f, "  warning: service {} is never referenced", service)?
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_references<'a, I>(
    registry: &ServiceRegistry,
    references: I,
) -> ValidationReport
where
    I: IntoIterator<Item = &'a ServiceReference>,
{
    let mut report = ValidationReport::default();
    let mut used: HashSet<String> = HashSet::new();

    for reference in references {
        match registry.resolve(reference) {
            Ok(Resolved::Service(descriptor)) => {
                used.insert(descriptor.name().to_string());
            }
            Ok(Resolved::Override(handle)) => {
                if handle.descriptor().is_some() {
                    used.insert(handle.name().to_string());
                }
            }
            Ok(Resolved::Absent) => report.warnings.push(ValidationWarning::OptionalAbsent {
                reference: reference.to_string(),
            }),
            Err(error) if reference.is_optional() => {
                report.warnings.push(ValidationWarning::OptionalUnresolved {
                    reference: reference.to_string(),
                    error,
                })
            }
            Err(error) => report.errors.push(ValidationIssue {
                reference: reference.to_string(),
                error,
            }),
        }
    }

    for descriptor in registry.descriptors() {
        if !used.contains(descriptor.name()) {
            report.warnings.push(ValidationWarning::UnusedService {
                service: descriptor.name().to_string(),
            });
        }
    }

    report
}
