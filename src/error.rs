//! Error types for service registration, resolution and lifecycle.

use std::fmt;

/// A registered service that matched a by-type reference.
///
/// Carried by [`DiError::Ambiguous`] so the consumer can pick one by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Registered service name
    pub name: String,
    /// Nominal type the service was registered under
    pub declared_type: &'static str,
    /// Rust type produced by the service factory
    pub concrete_type: &'static str,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.declared_type)
    }
}

/// Service registry errors
///
/// Every failure the registry can report. Errors are `Clone` because a failed
/// resolution is cached on its reference and handed back on every access.
///
/// # Examples
///
/// ```rust
/// use shared_services::{DiError, ServiceRegistry, ServiceReference, ServiceType};
///
/// struct Cache;
///
/// let registry = ServiceRegistry::new();
/// let reference = ServiceReference::named("cache", ServiceType::of::<Cache>());
///
/// match registry.get(&reference) {
///     Err(DiError::NotFound { requested_name, .. }) => {
///         assert_eq!(requested_name.as_deref(), Some("cache"));
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// A service with this name is already registered
    DuplicateName(String),
    /// No registered service matches a mandatory reference
    NotFound {
        requested_name: Option<String>,
        requested_type: &'static str,
    },
    /// Several services match a by-type reference
    Ambiguous {
        requested_type: &'static str,
        candidates: Vec<Candidate>,
    },
    /// The service factory failed; the service stays uncreated
    Factory { service: String, message: String },
    /// Instance or override does not have the expected type
    TypeMismatch {
        service: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// A factory needed a service that is still being created on this thread
    Circular(Vec<String>),
    /// The service (or the whole registry) has already been finalized
    Finalized(String),
    /// The registry owning the bound service has been dropped
    Detached(String),
    /// The reference already carries an explicit override
    OverrideAlreadySet,
    /// Maximum nested instantiation depth exceeded
    DepthExceeded(usize),
    /// Invalid registry or registration configuration
    Config(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::DuplicateName(name) => {
                write!(f, "Service already registered: {}", name)
            }
            DiError::NotFound { requested_name: Some(name), requested_type } => {
                write!(f, "Service not found: {} ({})", name, requested_type)
            }
            DiError::NotFound { requested_name: None, requested_type } => {
                write!(f, "No service registered for type: {}", requested_type)
            }
            DiError::Ambiguous { requested_type, candidates } => {
                let names: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                write!(
                    f,
                    "Ambiguous service reference for {}: candidates are {}",
                    requested_type,
                    names.join(", ")
                )
            }
            DiError::Factory { service, message } => {
                write!(f, "Failed to create service {}: {}", service, message)
            }
            DiError::TypeMismatch { service, expected, actual } => {
                write!(f, "Type mismatch for {}: expected {}, found {}", service, expected, actual)
            }
            DiError::Circular(path) => {
                write!(f, "Circular service creation: {}", path.join(" -> "))
            }
            DiError::Finalized(name) => write!(f, "Service already finalized: {}", name),
            DiError::Detached(name) => write!(f, "Registry for service {} was dropped", name),
            DiError::OverrideAlreadySet => {
                write!(f, "Service reference already has an explicit value")
            }
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for registry operations
pub type DiResult<T> = Result<T, DiError>;
