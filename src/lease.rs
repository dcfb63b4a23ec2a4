//! Bounded parallel usage of shared services.
//!
//! A service registered with `max_parallel_usages(n)` admits at most `n`
//! outstanding [`ServiceLease`]s. Plain `get()` ignores the limit; consumers
//! that want to respect it lease instead.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::descriptor::ServiceDescriptor;
use crate::error::DiResult;
use crate::handle::ServiceInstance;

/// Counting gate for a service's usage limit.
pub(crate) struct UsageGate {
    limit: Option<usize>,
    in_use: Mutex<usize>,
    released: Condvar,
}

impl UsageGate {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            in_use: Mutex::new(0),
            released: Condvar::new(),
        }
    }

    pub(crate) fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub(crate) fn in_use(&self) -> usize {
        *self.in_use.lock()
    }

    /// Blocks until a usage slot is free, then takes it.
    fn acquire(&self) {
        let mut in_use = self.in_use.lock();
        if let Some(limit) = self.limit {
            while *in_use >= limit {
                self.released.wait(&mut in_use);
            }
        }
        *in_use += 1;
    }

    fn release(&self) {
        let mut in_use = self.in_use.lock();
        *in_use = in_use.saturating_sub(1);
        drop(in_use);
        self.released.notify_one();
    }
}

/// A usage slot on a shared service, released on drop.
///
/// Derefs to the leased [`ServiceInstance`].
///
/// # Examples
///
/// ```rust
/// use shared_services::{ServiceRegistration, ServiceRegistry, ServiceReference, ServiceType};
///
/// struct Linker;
///
/// let registry = ServiceRegistry::new();
/// let descriptor = registry
///     .add(
///         ServiceRegistration::new("linker", ServiceType::of::<Linker>(), || {
///             Ok::<_, String>(Linker)
///         })
///         .max_parallel_usages(1),
///     )
///     .unwrap();
///
/// let reference = ServiceReference::named("linker", ServiceType::of::<Linker>());
/// {
///     let lease = registry.lease(&reference).unwrap().unwrap();
///     assert_eq!(lease.name(), "linker");
///     assert_eq!(descriptor.leases_in_use(), 1);
/// }
/// assert_eq!(descriptor.leases_in_use(), 0);
/// ```
pub struct ServiceLease {
    instance: ServiceInstance,
    descriptor: Option<Arc<ServiceDescriptor>>,
}

impl ServiceLease {
    /// Creates the service if needed, then waits for a usage slot.
    pub(crate) fn acquire(descriptor: Arc<ServiceDescriptor>) -> DiResult<Self> {
        let instance = descriptor.lifecycle.materialize(&descriptor)?;
        descriptor.usage.acquire();
        trace!(service = %descriptor.name(), in_use = descriptor.usage.in_use(), "Lease acquired");
        Ok(Self {
            instance,
            descriptor: Some(descriptor),
        })
    }

    /// Lease on an instance with no usage limit.
    pub(crate) fn unbounded(instance: ServiceInstance) -> Self {
        Self {
            instance,
            descriptor: None,
        }
    }

    pub fn instance(&self) -> &ServiceInstance {
        &self.instance
    }
}

impl Deref for ServiceLease {
    type Target = ServiceInstance;

    fn deref(&self) -> &ServiceInstance {
        &self.instance
    }
}

impl Drop for ServiceLease {
    fn drop(&mut self) {
        if let Some(descriptor) = &self.descriptor {
            descriptor.usage.release();
            trace!(service = %descriptor.name(), "Lease released");
        }
    }
}

impl fmt::Debug for ServiceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLease")
            .field("service", &self.instance.name())
            .field("bounded", &self.descriptor.is_some())
            .finish()
    }
}
