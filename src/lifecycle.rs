//! Lazy creation and once-only finalization of shared services.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::RegistryOptions;
use crate::descriptor::{ServiceDescriptor, Slot};
use crate::error::{DiError, DiResult};
use crate::handle::ServiceInstance;
use crate::internal::CreationGuard;
use crate::observer::Observers;

/// State shared by a registry and every descriptor it owns.
///
/// Descriptors keep an `Arc` to this so a [`ServiceHandle`](crate::ServiceHandle)
/// can create its service without going back through the registry.
pub(crate) struct Lifecycle {
    pub(crate) options: RegistryOptions,
    pub(crate) observers: Observers,
    sequence: AtomicU64,
    finalized: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            observers: Observers::default(),
            sequence: AtomicU64::new(0),
            finalized: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Returns the live instance, running the factory if this is the first access.
    ///
    /// Concurrent first accesses serialize on the descriptor's slot lock, so the
    /// factory runs once. A failing factory leaves the slot `Uncreated` and the
    /// next access retries.
    pub(crate) fn materialize(&self, descriptor: &ServiceDescriptor) -> DiResult<ServiceInstance> {
        if let Some(existing) = Self::existing(descriptor) {
            return existing;
        }

        let _guard = CreationGuard::enter(
            descriptor as *const ServiceDescriptor as usize,
            descriptor.name(),
            self.options.max_instantiation_depth.max(1),
        )?;

        let mut slot = descriptor.slot.lock();
        match &*slot {
            Slot::Created { value, .. } => return Ok(descriptor.instance(Arc::clone(value))),
            Slot::Closed { .. } => return Err(DiError::Finalized(descriptor.name().to_string())),
            Slot::Uncreated => {}
        }
        if self.is_finalized() {
            return Err(DiError::Finalized(descriptor.name().to_string()));
        }

        debug!(service = %descriptor.name(), "Creating service");
        let started = Instant::now();

        match descriptor.create() {
            Ok(created) => {
                let value = Arc::clone(&created.value);
                *slot = Slot::Created {
                    value: created.value,
                    closer: created.closer,
                    sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
                };
                drop(slot);

                let elapsed = started.elapsed();
                debug!(service = %descriptor.name(), elapsed = ?elapsed, "Service created");
                self.observers.instantiated(descriptor.name(), elapsed);
                Ok(descriptor.instance(value))
            }
            Err(message) => {
                drop(slot);

                let error = DiError::Factory {
                    service: descriptor.name().to_string(),
                    message,
                };
                warn!(service = %descriptor.name(), error = %error, "Service factory failed");
                self.observers.factory_failed(descriptor.name(), &error);
                Err(error)
            }
        }
    }

    // try_lock: the slot may be held by a factory further up this thread's stack,
    // which the creation guard has to report instead of deadlocking.
    fn existing(descriptor: &ServiceDescriptor) -> Option<DiResult<ServiceInstance>> {
        let slot = descriptor.slot.try_lock()?;
        match &*slot {
            Slot::Created { value, .. } => Some(Ok(descriptor.instance(Arc::clone(value)))),
            Slot::Closed { .. } => Some(Err(DiError::Finalized(descriptor.name().to_string()))),
            Slot::Uncreated => None,
        }
    }

    /// Moves a created service to `Closed` and runs its close procedure.
    ///
    /// Returns `false` for services that were never created or are already closed.
    pub(crate) fn close(&self, descriptor: &ServiceDescriptor) -> bool {
        let closer = {
            let mut slot = descriptor.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Uncreated) {
                Slot::Created { value, closer, .. } => {
                    *slot = Slot::Closed { value };
                    closer
                }
                other => {
                    *slot = other;
                    return false;
                }
            }
        };

        // Runs outside the slot lock; the state is already Closed.
        if let Some(closer) = closer {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(closer)) {
                warn!(
                    service = %descriptor.name(),
                    panic = %panic_message(&*payload),
                    "Service close procedure panicked"
                );
            }
        }

        debug!(service = %descriptor.name(), "Service closed");
        self.observers.closed(descriptor.name());
        true
    }

    /// Closes every created service, most recently created first.
    pub(crate) fn finalize_all(&self, descriptors: &[Arc<ServiceDescriptor>]) -> usize {
        self.finalized.store(true, Ordering::Release);

        let mut created: Vec<(u64, &Arc<ServiceDescriptor>)> = descriptors
            .iter()
            .filter_map(|d| d.created_sequence().map(|seq| (seq, d)))
            .collect();
        created.sort_by(|a, b| b.0.cmp(&a.0));

        let closed = created
            .into_iter()
            .filter(|(_, descriptor)| self.close(descriptor))
            .count();

        info!(closed, registered = descriptors.len(), "Shared services finalized");
        closed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
