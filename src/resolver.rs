//! Binding references to registered services.
//!
//! Resolution is a pure function of the registry's mapping at the moment of
//! the first lookup. It never creates a service.

use std::sync::Arc;

use crate::descriptor::ServiceDescriptor;
use crate::error::DiError;
use crate::handle::ServiceHandle;
use crate::reference::{Resolution, ServiceReference};
use crate::registry::Services;

/// What a reference resolved to.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Bound to a registered service
    Service(Arc<ServiceDescriptor>),
    /// Bound to an explicit override; the registry was not consulted
    Override(ServiceHandle),
    /// Optional reference with no matching service
    Absent,
}

impl Resolved {
    pub fn is_absent(&self) -> bool {
        matches!(self, Resolved::Absent)
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            Resolved::Service(descriptor) => Some(descriptor.name()),
            Resolved::Override(handle) => Some(handle.name()),
            Resolved::Absent => None,
        }
    }
}

/// Resolves `reference` against `services`.
///
/// - With a requested name: look the name up; it must also be assignable to
///   the requested type.
/// - Without: collect every service assignable to the requested type; exactly
///   one match binds, several are ambiguous.
///
/// A missing service is absent for optional references and an error otherwise.
/// Ambiguity is an error either way.
pub(crate) fn resolve(services: &Services, reference: &ServiceReference) -> Resolution {
    let requested_type = reference.requested_type();

    match reference.requested_name() {
        Some(name) => match services.by_name(name) {
            Some(descriptor) if descriptor.declared_type().is_assignable_to(requested_type) => {
                Resolution::bind(descriptor)
            }
            Some(descriptor) => Resolution::Failed(DiError::TypeMismatch {
                service: name.to_string(),
                expected: requested_type.name(),
                actual: descriptor.declared_type().name(),
            }),
            None => not_found(reference),
        },
        None => {
            let matches = services.by_type(requested_type);
            match matches.as_slice() {
                [] => not_found(reference),
                [single] => Resolution::bind(single),
                candidates => Resolution::Failed(DiError::Ambiguous {
                    requested_type: requested_type.name(),
                    candidates: candidates.iter().map(|d| d.candidate()).collect(),
                }),
            }
        }
    }
}

fn not_found(reference: &ServiceReference) -> Resolution {
    if reference.is_optional() {
        Resolution::Absent
    } else {
        Resolution::Failed(DiError::NotFound {
            requested_name: reference.requested_name().map(str::to_string),
            requested_type: reference.requested_type().name(),
        })
    }
}
