//! # shared-services
//!
//! Named and typed references to shared, lazily-created services.
//!
//! A build (or any other run) registers long-lived services up front, consumers
//! declare which service they need by name and/or type, and the registry binds
//! the two together when a consumer first asks.
//!
//! ## Features
//!
//! - **Lazy creation**: a service's factory runs on first access, at most once,
//!   even when many threads ask at the same time
//! - **By-name or by-type references**: by-type lookups honour declared
//!   supertypes and report every candidate when the match is ambiguous
//! - **Optional references**: a missing service is an absent result, not an error
//! - **Explicit overrides**: bind a reference to a known handle and skip resolution
//! - **Once-only finalization**: every created service is closed exactly once at
//!   the end of the run; services that were never created are never built
//!   just to be closed
//! - **Up-front validation**: surface missing and ambiguous references before
//!   anything runs
//!
//! ## Quick Start
//!
//! ```rust
//! use shared_services::{Dispose, ServiceRegistry, ServiceReference, ServiceType};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Counter {
//!     hits: AtomicU64,
//! }
//!
//! impl Dispose for Counter {
//!     fn dispose(&self) {
//!         println!("counted {} hits", self.hits.load(Ordering::SeqCst));
//!     }
//! }
//!
//! // Configuration phase
//! let registry = ServiceRegistry::new();
//! registry
//!     .register_disposable("counter", ServiceType::of::<Counter>(), || {
//!         Ok::<_, String>(Counter { hits: AtomicU64::new(0) })
//!     })
//!     .unwrap();
//!
//! // A consumer declares what it needs
//! let counter_ref = ServiceReference::by_type(ServiceType::of::<Counter>());
//! registry.validate(&counter_ref).unwrap();
//!
//! // Execution phase
//! let counter = registry.get_as::<Counter>(&counter_ref).unwrap().unwrap();
//! counter.hits.fetch_add(1, Ordering::SeqCst);
//!
//! // Teardown
//! assert_eq!(registry.finalize_all(), 1);
//! ```
//!
//! ## Types and subtypes
//!
//! [`ServiceType`] is nominal. Trait objects make convenient markers, and
//! [`ServiceType::extends`] declares which types a service type may stand in for:
//!
//! ```rust
//! use shared_services::{ServiceRegistry, ServiceReference, ServiceType};
//!
//! trait CountingService {}
//! trait SubCountingService: CountingService {}
//! struct AltCounter;
//!
//! let counting = ServiceType::of::<dyn CountingService>();
//! let registry = ServiceRegistry::new();
//! registry
//!     .register(
//!         "altCounter",
//!         ServiceType::of::<dyn SubCountingService>().extends(counting.clone()),
//!         || Ok::<_, String>(AltCounter),
//!     )
//!     .unwrap();
//!
//! let reference = ServiceReference::by_type(counting);
//! let resolved = registry.resolve(&reference).unwrap();
//! assert_eq!(resolved.service_name(), Some("altCounter"));
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod lease;
pub mod observer;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod service_type;
pub mod traits;
pub mod validation;

mod internal;
mod lifecycle;

pub use config::RegistryOptions;
pub use descriptor::{ServiceDescriptor, ServiceRegistration, ServiceState};
pub use error::{Candidate, DiError, DiResult};
pub use handle::{ServiceHandle, ServiceInstance};
pub use lease::ServiceLease;
pub use observer::{LoggingObserver, ServiceObserver};
pub use reference::ServiceReference;
pub use registry::ServiceRegistry;
pub use resolver::Resolved;
pub use service_type::ServiceType;
pub use traits::Dispose;
pub use validation::{ValidationIssue, ValidationReport, ValidationWarning};
