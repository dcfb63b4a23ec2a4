//! Close/release procedure for shared services.

/// Trait for services that need structured teardown at the end of a run.
///
/// Services registered through
/// [`ServiceRegistry::register_disposable`](crate::ServiceRegistry::register_disposable)
/// have `dispose` called exactly once by
/// [`finalize_all`](crate::ServiceRegistry::finalize_all), and only if they
/// were actually created.
///
/// # Examples
///
/// ```
/// use shared_services::{Dispose, ServiceRegistry, ServiceReference, ServiceType};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Connection {
///     open: AtomicBool,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.open.store(false, Ordering::SeqCst);
///     }
/// }
///
/// let registry = ServiceRegistry::new();
/// registry
///     .register_disposable("db", ServiceType::of::<Connection>(), || {
///         Ok::<_, String>(Connection { open: AtomicBool::new(true) })
///     })
///     .unwrap();
///
/// let reference = ServiceReference::named("db", ServiceType::of::<Connection>());
/// let conn = registry.get_as::<Connection>(&reference).unwrap().unwrap();
/// assert_eq!(registry.finalize_all(), 1);
/// assert!(!conn.open.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release resources held by the service.
    fn dispose(&self);
}
