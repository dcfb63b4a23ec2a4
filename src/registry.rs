//! The service registry: registration, lookup and the access API.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::RegistryOptions;
use crate::descriptor::{ServiceDescriptor, ServiceRegistration, ServiceState};
use crate::error::{DiError, DiResult};
use crate::handle::{ServiceHandle, ServiceInstance};
use crate::lease::ServiceLease;
use crate::lifecycle::Lifecycle;
use crate::observer::ServiceObserver;
use crate::reference::{Resolution, ServiceReference};
use crate::resolver::{self, Resolved};
use crate::service_type::ServiceType;
use crate::traits::Dispose;
use crate::validation::{self, ValidationReport};

/// Name-keyed storage in registration order.
#[derive(Default)]
pub(crate) struct Services {
    ordered: Vec<Arc<ServiceDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl Services {
    fn insert(&mut self, descriptor: Arc<ServiceDescriptor>) -> DiResult<()> {
        if self.by_name.contains_key(descriptor.name()) {
            return Err(DiError::DuplicateName(descriptor.name().to_string()));
        }
        self.by_name.insert(descriptor.name().to_string(), self.ordered.len());
        self.ordered.push(descriptor);
        Ok(())
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.by_name.get(name).map(|&index| &self.ordered[index])
    }

    /// Every service whose declared type is assignable to `ty`, in registration order.
    pub(crate) fn by_type(&self, ty: &ServiceType) -> Vec<Arc<ServiceDescriptor>> {
        self.ordered
            .iter()
            .filter(|d| d.declared_type().is_assignable_to(ty))
            .cloned()
            .collect()
    }

    fn all(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.ordered.clone()
    }
}

/// Registry of shared services for one run.
///
/// Owns every [`ServiceDescriptor`] from configuration until the end of the
/// run. Registration never creates a service; creation happens on the first
/// [`get`](Self::get) through a reference or handle, and
/// [`finalize_all`](Self::finalize_all) closes whatever was created.
///
/// Cloning is cheap and every clone shares the same registry.
///
/// # Thread Safety
///
/// Lookups and access are safe from any number of threads. Registration takes
/// a write lock and is expected to finish before concurrent use begins.
/// `finalize_all` must not race with `get`.
///
/// # Examples
///
/// ```rust
/// use shared_services::{DiError, ServiceRegistry, ServiceReference, ServiceType};
///
/// trait CountingService {}
/// trait SubCountingService: CountingService {}
///
/// struct Counter;
/// struct AltCounter;
///
/// let counting = ServiceType::of::<dyn CountingService>();
/// let sub_counting = ServiceType::of::<dyn SubCountingService>().extends(counting.clone());
///
/// let registry = ServiceRegistry::new();
/// registry.register("counter", counting.clone(), || Ok::<_, String>(Counter)).unwrap();
/// registry.register("altCounter", sub_counting, || Ok::<_, String>(AltCounter)).unwrap();
///
/// // Two services are assignable to CountingService.
/// let by_type = ServiceReference::by_type(counting.clone());
/// assert!(matches!(registry.get(&by_type), Err(DiError::Ambiguous { .. })));
///
/// // A name disambiguates.
/// let by_name = ServiceReference::named("counter", counting.clone());
/// let counter = registry.get(&by_name).unwrap().unwrap();
/// assert!(counter.is::<Counter>());
///
/// // An optional ambiguous reference is simply not present.
/// let optional = ServiceReference::by_type(counting).optional();
/// assert!(!registry.is_present(&optional));
/// assert!(registry.get(&optional).unwrap().is_none());
///
/// assert_eq!(registry.finalize_all(), 1);
/// ```
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    services: RwLock<Services>,
    lifecycle: Arc<Lifecycle>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                services: RwLock::new(Services::default()),
                lifecycle: Arc::new(Lifecycle::new(options)),
            }),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.inner.lifecycle.options
    }

    /// Attaches an observer for lifecycle events.
    pub fn add_observer(&self, observer: Arc<dyn ServiceObserver>) {
        self.inner.lifecycle.observers.add(observer);
    }

    /// Adds a service.
    ///
    /// Fails with [`DiError::DuplicateName`] if the name is taken, and with
    /// [`DiError::Finalized`] once the registry has been finalized.
    pub fn add(&self, registration: ServiceRegistration) -> DiResult<Arc<ServiceDescriptor>> {
        if self.inner.lifecycle.is_finalized() {
            return Err(DiError::Finalized(registration.name().to_string()));
        }

        let descriptor = Arc::new(registration.into_descriptor(Arc::clone(&self.inner.lifecycle))?);
        self.inner.services.write().insert(Arc::clone(&descriptor))?;

        debug!(
            service = %descriptor.name(),
            declared_type = %descriptor.declared_type(),
            concrete_type = descriptor.concrete_type(),
            "Service registered"
        );
        self.inner.lifecycle.observers.registered(&descriptor);
        Ok(descriptor)
    }

    /// Registers a service built by `factory` on first use.
    pub fn register<T, F, E>(
        &self,
        name: impl Into<String>,
        declared_type: ServiceType,
        factory: F,
    ) -> DiResult<Arc<ServiceDescriptor>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.add(ServiceRegistration::new(name, declared_type, factory))
    }

    /// Registers a service whose [`Dispose::dispose`] runs at finalization.
    pub fn register_disposable<T, F, E>(
        &self,
        name: impl Into<String>,
        declared_type: ServiceType,
        factory: F,
    ) -> DiResult<Arc<ServiceDescriptor>>
    where
        T: Dispose,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.add(ServiceRegistration::disposable(name, declared_type, factory))
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<ServiceDescriptor>> {
        self.inner.services.read().by_name(name).cloned()
    }

    /// Services whose declared type is assignable to `ty`.
    pub fn lookup_by_type(&self, ty: &ServiceType) -> Vec<Arc<ServiceDescriptor>> {
        self.inner.services.read().by_type(ty)
    }

    /// All services in registration order.
    pub fn descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.inner.services.read().all()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.services.read().by_name(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.services.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazy handle to the service registered as `name`, suitable as an override.
    pub fn handle(&self, name: &str) -> Option<ServiceHandle> {
        self.lookup_by_name(name).map(ServiceHandle::registered)
    }

    /// Resolves `reference` without creating anything.
    ///
    /// An override short-circuits resolution. Otherwise the first call looks
    /// the reference up and caches the outcome on it; later calls, from any
    /// registry, return that cached outcome.
    pub fn resolve(&self, reference: &ServiceReference) -> DiResult<Resolved> {
        if let Some(handle) = reference.explicit_override() {
            return Ok(Resolved::Override(handle.clone()));
        }

        let mut fresh = false;
        let resolution = reference.resolution_or_init(|| {
            fresh = true;
            resolver::resolve(&self.inner.services.read(), reference)
        });
        if fresh {
            self.report(reference, resolution);
        }
        resolution.outcome()
    }

    fn report(&self, reference: &ServiceReference, resolution: &Resolution) {
        let observers = &self.inner.lifecycle.observers;
        match resolution {
            Resolution::Bound { name, .. } => {
                debug!(reference = %reference, service = %name, "Reference resolved");
                observers.resolved(reference, Some(name));
            }
            Resolution::Absent => {
                debug!(reference = %reference, "Optional reference resolved to absent");
                observers.resolved(reference, None);
            }
            Resolution::Failed(error) => {
                debug!(reference = %reference, error = %error, "Reference failed to resolve");
                observers.resolution_failed(reference, error);
            }
        }
    }

    /// The instance behind `reference`, created on first access.
    ///
    /// Returns `Ok(None)` for an optional reference that resolved to nothing
    /// or failed to resolve; the failure is still available from
    /// [`resolve`](Self::resolve).
    pub fn get(&self, reference: &ServiceReference) -> DiResult<Option<ServiceInstance>> {
        match self.resolve_for_access(reference)? {
            Resolved::Service(descriptor) => {
                descriptor.lifecycle.materialize(&descriptor).map(Some)
            }
            Resolved::Override(handle) => handle.get().map(Some),
            Resolved::Absent => Ok(None),
        }
    }

    // Optional references degrade every resolution failure to absent.
    fn resolve_for_access(&self, reference: &ServiceReference) -> DiResult<Resolved> {
        match self.resolve(reference) {
            Err(_) if reference.is_optional() => Ok(Resolved::Absent),
            other => other,
        }
    }

    /// Typed [`get`](Self::get).
    pub fn get_as<T: Send + Sync + 'static>(
        &self,
        reference: &ServiceReference,
    ) -> DiResult<Option<Arc<T>>> {
        self.get(reference)?.map(|instance| instance.downcast::<T>()).transpose()
    }

    /// Like [`get`](Self::get), but an absent optional service is
    /// [`DiError::NotFound`] and a failed resolution is returned as is.
    pub fn get_required(&self, reference: &ServiceReference) -> DiResult<ServiceInstance> {
        let instance = match self.resolve(reference)? {
            Resolved::Service(descriptor) => Some(descriptor.lifecycle.materialize(&descriptor)?),
            Resolved::Override(handle) => Some(handle.get()?),
            Resolved::Absent => None,
        };
        instance.ok_or_else(|| DiError::NotFound {
            requested_name: reference.requested_name().map(str::to_string),
            requested_type: reference.requested_type().name(),
        })
    }

    /// Whether [`get`](Self::get) would yield an instance.
    ///
    /// Never fails and never creates the service: failed resolutions, absent
    /// optional references and closed services all report `false`.
    pub fn is_present(&self, reference: &ServiceReference) -> bool {
        match self.resolve(reference) {
            Ok(Resolved::Service(descriptor)) => descriptor.is_available(),
            Ok(Resolved::Override(handle)) => handle.is_available(),
            Ok(Resolved::Absent) | Err(_) => false,
        }
    }

    /// Surfaces resolution errors of mandatory references up front without
    /// creating the service.
    ///
    /// Optional references are always valid; use
    /// [`validate_all`](Self::validate_all) to see their failures as warnings.
    pub fn validate(&self, reference: &ServiceReference) -> DiResult<()> {
        self.resolve_for_access(reference).map(|_| ())
    }

    /// Validates a batch of references and reports unused services.
    pub fn validate_all<'a, I>(&self, references: I) -> ValidationReport
    where
        I: IntoIterator<Item = &'a ServiceReference>,
    {
        validation::validate_references(self, references)
    }

    /// Creates the service if needed and takes one of its usage slots,
    /// blocking while the service's `max_parallel_usages` are all leased.
    pub fn lease(&self, reference: &ServiceReference) -> DiResult<Option<ServiceLease>> {
        match self.resolve_for_access(reference)? {
            Resolved::Service(descriptor) => ServiceLease::acquire(descriptor).map(Some),
            Resolved::Override(handle) => handle.lease().map(Some),
            Resolved::Absent => Ok(None),
        }
    }

    /// Closes every created service exactly once, most recent first.
    ///
    /// Services that were never created are left alone. After this call the
    /// registry accepts no registrations and creates no services. Returns the
    /// number of services closed by this call.
    pub fn finalize_all(&self) -> usize {
        let descriptors = self.descriptors();
        self.inner.lifecycle.finalize_all(&descriptors)
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.lifecycle.is_finalized()
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Registry Debug ===\n");
        for descriptor in self.descriptors() {
            s.push_str(&format!(
                "  {}: {} [{}] {:?}",
                descriptor.name(),
                descriptor.declared_type().name(),
                descriptor.concrete_type(),
                descriptor.state()
            ));
            if let Some(limit) = descriptor.max_parallel_usages() {
                s.push_str(&format!(" max_parallel_usages={}", limit));
            }
            s.push('\n');
        }
        s
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ServiceRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.descriptors())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

// Runs once, when the last registry clone releases the shared state.
impl Drop for RegistryInner {
    fn drop(&mut self) {
        if self.lifecycle.is_finalized() {
            return;
        }

        let descriptors = self.services.get_mut().all();
        let options = &self.lifecycle.options;
        if options.finalize_on_drop {
            self.lifecycle.finalize_all(&descriptors);
            return;
        }

        if options.warn_on_unfinalized {
            let pending: Vec<String> = descriptors
                .iter()
                .filter(|d| d.state() == ServiceState::Created)
                .map(|d| d.name().to_string())
                .collect();
            if !pending.is_empty() {
                warn!(
                    services = ?pending,
                    "ServiceRegistry dropped with unfinalized services; call finalize_all() first"
                );
            }
        }
    }
}
