//! Lifecycle observers for registry traceability.
//!
//! Observers receive registration, resolution, creation and close events so a
//! host can correlate service activity with its own run (task names, build
//! ids and so on). The registry also emits `tracing` events on its own; an
//! observer is for callers that want the events as values.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::descriptor::ServiceDescriptor;
use crate::error::DiError;
use crate::reference::ServiceReference;

/// Observer trait for registry lifecycle events.
///
/// Every method has a no-op default, so implementations only override what
/// they care about. Calls are made synchronously on the thread that caused
/// the event; keep them cheap.
///
/// # Examples
///
/// ```
/// use shared_services::{ServiceObserver, ServiceRegistry, ServiceReference, ServiceType};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Created(Mutex<Vec<String>>);
///
/// impl ServiceObserver for Created {
///     fn instantiated(&self, service: &str, _duration: Duration) {
///         self.0.lock().unwrap().push(service.to_string());
///     }
/// }
///
/// let observer = Arc::new(Created::default());
/// let registry = ServiceRegistry::new();
/// registry.add_observer(observer.clone());
/// registry.register("port", ServiceType::of::<u16>(), || Ok::<_, String>(8080u16)).unwrap();
///
/// let reference = ServiceReference::by_type(ServiceType::of::<u16>());
/// registry.get(&reference).unwrap();
/// assert_eq!(*observer.0.lock().unwrap(), vec!["port".to_string()]);
/// ```
pub trait ServiceObserver: Send + Sync {
    /// A service was added to the registry.
    fn registered(&self, _descriptor: &ServiceDescriptor) {}

    /// A reference was resolved for the first time. `service` is `None` when
    /// an optional reference resolved to absent.
    fn resolved(&self, _reference: &ServiceReference, _service: Option<&str>) {}

    /// A reference failed to resolve. Reported once, when the failure is cached.
    fn resolution_failed(&self, _reference: &ServiceReference, _error: &DiError) {}

    /// A service factory completed.
    fn instantiated(&self, _service: &str, _duration: Duration) {}

    /// A service factory failed; the service stays uncreated.
    fn factory_failed(&self, _service: &str, _error: &DiError) {}

    /// A created service was closed during finalization.
    fn closed(&self, _service: &str) {}
}

/// Observer that forwards every event to `tracing`, tagged with a run label.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    run: String,
}

impl LoggingObserver {
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into() }
    }

    pub fn run(&self) -> &str {
        &self.run
    }
}

impl ServiceObserver for LoggingObserver {
    fn registered(&self, descriptor: &ServiceDescriptor) {
        info!(
            run = %self.run,
            service = %descriptor.name(),
            declared_type = %descriptor.declared_type(),
            "Service registered"
        );
    }

    fn resolved(&self, reference: &ServiceReference, service: Option<&str>) {
        info!(run = %self.run, reference = %reference, service = ?service, "Reference resolved");
    }

    fn resolution_failed(&self, reference: &ServiceReference, error: &DiError) {
        warn!(
            run = %self.run,
            reference = %reference,
            error = %error,
            "Reference failed to resolve"
        );
    }

    fn instantiated(&self, service: &str, duration: Duration) {
        info!(run = %self.run, service = %service, elapsed = ?duration, "Service created");
    }

    fn factory_failed(&self, service: &str, error: &DiError) {
        warn!(run = %self.run, service = %service, error = %error, "Service factory failed");
    }

    fn closed(&self, service: &str) {
        info!(run = %self.run, service = %service, "Service closed");
    }
}

/// Container for registered observers.
///
/// Observers may be attached at any time, so the list sits behind a lock;
/// notification takes a snapshot so observers can call back into the registry.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn ServiceObserver>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn ServiceObserver>) {
        self.observers.write().push(observer);
    }

    fn snapshot(&self) -> Vec<Arc<dyn ServiceObserver>> {
        self.observers.read().clone()
    }

    pub(crate) fn registered(&self, descriptor: &ServiceDescriptor) {
        for observer in self.snapshot() {
            observer.registered(descriptor);
        }
    }

    pub(crate) fn resolved(&self, reference: &ServiceReference, service: Option<&str>) {
        for observer in self.snapshot() {
            observer.resolved(reference, service);
        }
    }

    pub(crate) fn resolution_failed(&self, reference: &ServiceReference, error: &DiError) {
        for observer in self.snapshot() {
            observer.resolution_failed(reference, error);
        }
    }

    pub(crate) fn instantiated(&self, service: &str, duration: Duration) {
        for observer in self.snapshot() {
            observer.instantiated(service, duration);
        }
    }

    pub(crate) fn factory_failed(&self, service: &str, error: &DiError) {
        for observer in self.snapshot() {
            observer.factory_failed(service, error);
        }
    }

    pub(crate) fn closed(&self, service: &str) {
        for observer in self.snapshot() {
            observer.closed(service);
        }
    }
}
