//! Service descriptors: one registered shared service and its state.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Candidate, DiError, DiResult};
use crate::handle::ServiceInstance;
use crate::lease::UsageGate;
use crate::lifecycle::Lifecycle;
use crate::service_type::ServiceType;
use crate::traits::Dispose;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

type Closer = Box<dyn FnOnce() + Send>;
type Factory = Box<dyn Fn() -> Result<Created, String> + Send + Sync>;

/// Output of a successful factory call.
pub(crate) struct Created {
    pub(crate) value: AnyArc,
    pub(crate) closer: Option<Closer>,
}

/// Lifecycle state of a registered service.
///
/// Transitions are monotonic: `Uncreated -> Created -> Closed`. A failed
/// factory leaves the service `Uncreated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Registered, factory not yet run
    Uncreated,
    /// Factory ran, instance is live
    Created,
    /// Closed during finalization
    Closed,
}

pub(crate) enum Slot {
    Uncreated,
    Created {
        value: AnyArc,
        closer: Option<Closer>,
        sequence: u64,
    },
    Closed {
        value: AnyArc,
    },
}

impl Slot {
    fn state(&self) -> ServiceState {
        match self {
            Slot::Uncreated => ServiceState::Uncreated,
            Slot::Created { .. } => ServiceState::Created,
            Slot::Closed { .. } => ServiceState::Closed,
        }
    }
}

/// A service waiting to be added to a registry.
///
/// Use this when a registration needs more than a name, a type and a factory,
/// for example a limit on parallel usages.
///
/// # Examples
///
/// ```rust
/// use shared_services::{ServiceRegistration, ServiceRegistry, ServiceType};
///
/// struct Compiler;
///
/// let registry = ServiceRegistry::new();
/// let descriptor = registry
///     .add(
///         ServiceRegistration::new("compiler", ServiceType::of::<Compiler>(), || {
///             Ok::<_, String>(Compiler)
///         })
///         .max_parallel_usages(2),
///     )
///     .unwrap();
///
/// assert_eq!(descriptor.max_parallel_usages(), Some(2));
/// ```
pub struct ServiceRegistration {
    name: String,
    declared_type: ServiceType,
    concrete_type: &'static str,
    factory: Factory,
    max_parallel_usages: Option<usize>,
}

impl ServiceRegistration {
    /// Registration whose factory builds a plain value of type `T`.
    ///
    /// The factory runs at most once, on first access.
    pub fn new<T, F, E>(name: impl Into<String>, declared_type: ServiceType, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let factory: Factory = Box::new(move || {
            let value: AnyArc = Arc::new(factory().map_err(|e| e.to_string())?);
            Ok(Created { value, closer: None })
        });
        Self::from_parts(name.into(), declared_type, type_name::<T>(), factory)
    }

    /// Registration for a service that must be disposed when the run ends.
    pub fn disposable<T, F, E>(
        name: impl Into<String>,
        declared_type: ServiceType,
        factory: F,
    ) -> Self
    where
        T: Dispose,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let factory: Factory = Box::new(move || {
            let service = Arc::new(factory().map_err(|e| e.to_string())?);
            let closing = Arc::clone(&service);
            Ok(Created {
                value: service,
                closer: Some(Box::new(move || closing.dispose())),
            })
        });
        Self::from_parts(name.into(), declared_type, type_name::<T>(), factory)
    }

    fn from_parts(
        name: String,
        declared_type: ServiceType,
        concrete_type: &'static str,
        factory: Factory,
    ) -> Self {
        Self {
            name,
            declared_type,
            concrete_type,
            factory,
            max_parallel_usages: None,
        }
    }

    /// Caps how many [`ServiceLease`](crate::ServiceLease)s may be held at once.
    pub fn max_parallel_usages(mut self, limit: usize) -> Self {
        self.max_parallel_usages = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_descriptor(self, lifecycle: Arc<Lifecycle>) -> DiResult<ServiceDescriptor> {
        if self.name.is_empty() {
            return Err(DiError::Config("service name must not be empty".to_string()));
        }
        if self.max_parallel_usages == Some(0) {
            return Err(DiError::Config(format!(
                "max_parallel_usages for {} must be at least 1",
                self.name
            )));
        }

        Ok(ServiceDescriptor {
            name: Arc::from(self.name),
            declared_type: self.declared_type,
            concrete_type: self.concrete_type,
            factory: self.factory,
            slot: Mutex::new(Slot::Uncreated),
            usage: UsageGate::new(self.max_parallel_usages),
            lifecycle,
        })
    }
}

/// One registered shared service.
///
/// Owned by its [`ServiceRegistry`](crate::ServiceRegistry); references only
/// hold weak links to it. The slot mutex is the per-service guard that makes
/// the factory run at most once.
pub struct ServiceDescriptor {
    name: Arc<str>,
    declared_type: ServiceType,
    concrete_type: &'static str,
    factory: Factory,
    pub(crate) slot: Mutex<Slot>,
    pub(crate) usage: UsageGate,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

impl ServiceDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &ServiceType {
        &self.declared_type
    }

    /// Rust type produced by the factory.
    pub fn concrete_type(&self) -> &'static str {
        self.concrete_type
    }

    pub fn state(&self) -> ServiceState {
        self.slot.lock().state()
    }

    pub fn max_parallel_usages(&self) -> Option<usize> {
        self.usage.limit()
    }

    /// Number of leases currently held on this service.
    pub fn leases_in_use(&self) -> usize {
        self.usage.in_use()
    }

    /// Whether an instance can still be obtained: created, or uncreated in a
    /// registry that has not been finalized.
    pub(crate) fn is_available(&self) -> bool {
        match self.state() {
            ServiceState::Created => true,
            ServiceState::Closed => false,
            ServiceState::Uncreated => !self.lifecycle.is_finalized(),
        }
    }

    pub(crate) fn create(&self) -> Result<Created, String> {
        (self.factory)()
    }

    /// Instantiation order, if the service is currently created.
    pub(crate) fn created_sequence(&self) -> Option<u64> {
        match &*self.slot.lock() {
            Slot::Created { sequence, .. } => Some(*sequence),
            _ => None,
        }
    }

    pub(crate) fn instance(&self, value: AnyArc) -> ServiceInstance {
        ServiceInstance::new(
            Arc::clone(&self.name),
            self.declared_type.clone(),
            self.concrete_type,
            value,
        )
    }

    pub(crate) fn candidate(&self) -> Candidate {
        Candidate {
            name: self.name.to_string(),
            declared_type: self.declared_type.name(),
            concrete_type: self.concrete_type,
        }
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("concrete_type", &self.concrete_type)
            .field("state", &self.state())
            .field("max_parallel_usages", &self.usage.limit())
            .finish()
    }
}
