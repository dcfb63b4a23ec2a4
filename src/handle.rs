//! Handles to shared services and their materialized instances.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{AnyArc, ServiceDescriptor, ServiceState};
use crate::error::{DiError, DiResult};
use crate::lease::ServiceLease;
use crate::service_type::ServiceType;

/// A created shared service.
///
/// Cheap to clone; every clone shares the one instance the factory produced.
#[derive(Clone)]
pub struct ServiceInstance {
    name: Arc<str>,
    declared_type: ServiceType,
    concrete_type: &'static str,
    value: AnyArc,
}

impl ServiceInstance {
    pub(crate) fn new(
        name: Arc<str>,
        declared_type: ServiceType,
        concrete_type: &'static str,
        value: AnyArc,
    ) -> Self {
        Self {
            name,
            declared_type,
            concrete_type,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &ServiceType {
        &self.declared_type
    }

    pub fn concrete_type(&self) -> &'static str {
        self.concrete_type
    }

    /// Whether the instance is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Typed access to the instance.
    ///
    /// Fails with [`DiError::TypeMismatch`] if the factory produced another type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch {
                service: self.name.to_string(),
                expected: type_name::<T>(),
                actual: self.concrete_type,
            })
    }

    /// Whether both instances are the same object.
    pub fn ptr_eq(&self, other: &ServiceInstance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("concrete_type", &self.concrete_type)
            .finish()
    }
}

/// A lazy handle to one specific shared service.
///
/// Handles are what an explicit override binds a reference to. A handle taken
/// from the registry creates its service on first [`get`](Self::get); a handle
/// wrapping an existing value never touches a factory.
///
/// # Examples
///
/// ```rust
/// use shared_services::{ServiceHandle, ServiceRegistry, ServiceType};
/// use std::sync::Arc;
///
/// let registry = ServiceRegistry::new();
/// registry.register("answer", ServiceType::of::<u32>(), || Ok::<_, String>(42u32)).unwrap();
///
/// let lazy = registry.handle("answer").unwrap();
/// assert!(!lazy.is_materialized());
/// assert_eq!(*lazy.get().unwrap().downcast::<u32>().unwrap(), 42);
///
/// let fixed = ServiceHandle::from_instance("fixed", ServiceType::of::<u32>(), Arc::new(7u32));
/// assert!(fixed.is_materialized());
/// ```
#[derive(Clone)]
pub struct ServiceHandle {
    inner: HandleInner,
}

#[derive(Clone)]
enum HandleInner {
    Registered(Arc<ServiceDescriptor>),
    Instance(ServiceInstance),
}

impl ServiceHandle {
    pub(crate) fn registered(descriptor: Arc<ServiceDescriptor>) -> Self {
        Self {
            inner: HandleInner::Registered(descriptor),
        }
    }

    /// Handle around a value that already exists outside any registry.
    pub fn from_instance<T: Send + Sync + 'static>(
        name: impl Into<String>,
        declared_type: ServiceType,
        value: Arc<T>,
    ) -> Self {
        let name: String = name.into();
        Self {
            inner: HandleInner::Instance(ServiceInstance::new(
                Arc::from(name),
                declared_type,
                type_name::<T>(),
                value,
            )),
        }
    }

    pub fn name(&self) -> &str {
        match &self.inner {
            HandleInner::Registered(descriptor) => descriptor.name(),
            HandleInner::Instance(instance) => instance.name(),
        }
    }

    pub fn declared_type(&self) -> &ServiceType {
        match &self.inner {
            HandleInner::Registered(descriptor) => descriptor.declared_type(),
            HandleInner::Instance(instance) => instance.declared_type(),
        }
    }

    /// The registered descriptor behind this handle, if any.
    pub fn descriptor(&self) -> Option<&Arc<ServiceDescriptor>> {
        match &self.inner {
            HandleInner::Registered(descriptor) => Some(descriptor),
            HandleInner::Instance(_) => None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        match &self.inner {
            HandleInner::Registered(descriptor) => descriptor.state() == ServiceState::Created,
            HandleInner::Instance(_) => true,
        }
    }

    /// Whether [`get`](Self::get) can still produce an instance.
    pub fn is_available(&self) -> bool {
        match &self.inner {
            HandleInner::Registered(descriptor) => descriptor.is_available(),
            HandleInner::Instance(_) => true,
        }
    }

    /// The instance, creating it on first use.
    pub fn get(&self) -> DiResult<ServiceInstance> {
        match &self.inner {
            HandleInner::Registered(descriptor) => descriptor.lifecycle.materialize(descriptor),
            HandleInner::Instance(instance) => Ok(instance.clone()),
        }
    }

    /// Typed shorthand for `get()?.downcast::<T>()`.
    pub fn get_as<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get()?.downcast::<T>()
    }

    /// Creates the service if needed and takes a usage slot on it.
    pub fn lease(&self) -> DiResult<ServiceLease> {
        match &self.inner {
            HandleInner::Registered(descriptor) => ServiceLease::acquire(Arc::clone(descriptor)),
            HandleInner::Instance(instance) => Ok(ServiceLease::unbounded(instance.clone())),
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            HandleInner::Registered(descriptor) => {
                f.debug_tuple("ServiceHandle::Registered").field(&descriptor.name()).finish()
            }
            HandleInner::Instance(instance) => {
                f.debug_tuple("ServiceHandle::Instance").field(&instance.name()).finish()
            }
        }
    }
}
