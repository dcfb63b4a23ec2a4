//! Consumer-side declarations of shared-service dependencies.

use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::descriptor::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::handle::ServiceHandle;
use crate::resolver::Resolved;
use crate::service_type::ServiceType;

/// Cached outcome of resolving a reference against a registry.
#[derive(Clone)]
pub(crate) enum Resolution {
    Bound {
        descriptor: Weak<ServiceDescriptor>,
        name: String,
    },
    Absent,
    Failed(DiError),
}

impl Resolution {
    pub(crate) fn bind(descriptor: &Arc<ServiceDescriptor>) -> Self {
        Resolution::Bound {
            descriptor: Arc::downgrade(descriptor),
            name: descriptor.name().to_string(),
        }
    }

    pub(crate) fn outcome(&self) -> DiResult<Resolved> {
        match self {
            Resolution::Bound { descriptor, name } => descriptor
                .upgrade()
                .map(Resolved::Service)
                .ok_or_else(|| DiError::Detached(name.clone())),
            Resolution::Absent => Ok(Resolved::Absent),
            Resolution::Failed(error) => Err(error.clone()),
        }
    }
}

/// A consumer's declared dependency on a shared service.
///
/// A reference names a service, or leaves the name out to be matched by type,
/// and says whether the service may be missing. It can be declared before or
/// after the service is registered: nothing is looked up until the first
/// access or validation, and the outcome of that first lookup (success,
/// absence or failure) is kept for the life of the reference.
///
/// # Examples
///
/// ```rust
/// use shared_services::{ServiceReference, ServiceType};
///
/// struct Counter;
///
/// let by_name = ServiceReference::named("counter", ServiceType::of::<Counter>());
/// let by_type = ServiceReference::by_type(ServiceType::of::<Counter>()).optional();
///
/// assert_eq!(by_name.requested_name(), Some("counter"));
/// assert!(by_type.requested_name().is_none());
/// assert!(by_type.is_optional());
/// assert!(!by_type.is_resolved());
/// ```
pub struct ServiceReference {
    requested_name: Option<String>,
    requested_type: ServiceType,
    optional: bool,
    resolution: OnceCell<Resolution>,
    explicit: OnceCell<ServiceHandle>,
}

impl ServiceReference {
    pub fn new(
        requested_name: Option<String>,
        requested_type: ServiceType,
        optional: bool,
    ) -> Self {
        Self {
            requested_name,
            requested_type,
            optional,
            resolution: OnceCell::new(),
            explicit: OnceCell::new(),
        }
    }

    /// Reference resolved by name; the service must be assignable to `requested_type`.
    pub fn named(name: impl Into<String>, requested_type: ServiceType) -> Self {
        Self::new(Some(name.into()), requested_type, false)
    }

    /// Reference resolved by type alone.
    pub fn by_type(requested_type: ServiceType) -> Self {
        Self::new(None, requested_type, false)
    }

    /// Marks the reference optional: a missing service resolves to absent
    /// instead of an error.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn requested_name(&self) -> Option<&str> {
        self.requested_name.as_deref()
    }

    pub fn requested_type(&self) -> &ServiceType {
        &self.requested_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the outcome is settled, either by resolution or by an override.
    pub fn is_resolved(&self) -> bool {
        self.resolution.get().is_some() || self.explicit.get().is_some()
    }

    /// Binds this reference to `handle` permanently.
    ///
    /// The registry is never consulted for this reference again, so an
    /// override also settles references that would be ambiguous by type.
    /// The handle's type must be assignable to the requested type, and only
    /// the first override is accepted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shared_services::{ServiceHandle, ServiceReference, ServiceRegistry, ServiceType};
    /// use std::sync::Arc;
    ///
    /// let registry = ServiceRegistry::new();
    /// let reference = ServiceReference::by_type(ServiceType::of::<String>());
    ///
    /// let handle = ServiceHandle::from_instance(
    ///     "greeting",
    ///     ServiceType::of::<String>(),
    ///     Arc::new("hello".to_string()),
    /// );
    /// reference.set_override(handle).unwrap();
    ///
    /// let greeting = registry.get_as::<String>(&reference).unwrap().unwrap();
    /// assert_eq!(greeting.as_str(), "hello");
    /// ```
    pub fn set_override(&self, handle: ServiceHandle) -> DiResult<()> {
        if !handle.declared_type().is_assignable_to(&self.requested_type) {
            return Err(DiError::TypeMismatch {
                service: handle.name().to_string(),
                expected: self.requested_type.name(),
                actual: handle.declared_type().name(),
            });
        }
        self.explicit
            .set(handle)
            .map_err(|_| DiError::OverrideAlreadySet)
    }

    pub fn has_override(&self) -> bool {
        self.explicit.get().is_some()
    }

    pub(crate) fn explicit_override(&self) -> Option<&ServiceHandle> {
        self.explicit.get()
    }

    pub(crate) fn resolution_or_init<F>(&self, resolve: F) -> &Resolution
    where
        F: FnOnce() -> Resolution,
    {
        self.resolution.get_or_init(resolve)
    }
}

impl fmt::Display for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.requested_name {
            Some(name) => write!(f, "\"{}\": {}", name, self.requested_type)?,
            None => write!(f, "<by type>: {}", self.requested_type)?,
        }
        if self.optional {
            f.write_str(" (optional)")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceReference")
            .field("requested_name", &self.requested_name)
            .field("requested_type", &self.requested_type)
            .field("optional", &self.optional)
            .field("resolved", &self.is_resolved())
            .field("overridden", &self.has_override())
            .finish()
    }
}
