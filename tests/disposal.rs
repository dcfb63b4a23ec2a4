/// Finalization: created services close exactly once, uncreated ones are left alone.

use shared_services::{
    DiError, Dispose, RegistryOptions, ServiceRegistry, ServiceReference, ServiceState, ServiceType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

struct Tracked {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name.to_string());
    }
}

fn register_tracked(registry: &ServiceRegistry, name: &'static str, log: &Arc<Mutex<Vec<String>>>) {
    let log = log.clone();
    registry
        .register_disposable(name, ServiceType::of::<Tracked>(), move || {
            Ok::<_, String>(Tracked { name, log: log.clone() })
        })
        .unwrap();
}

fn get(registry: &ServiceRegistry, name: &str) {
    let reference = ServiceReference::named(name, ServiceType::of::<Tracked>());
    registry.get(&reference).unwrap().unwrap();
}

#[test]
fn test_finalize_closes_in_reverse_creation_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::new();
    register_tracked(&registry, "first", &log);
    register_tracked(&registry, "second", &log);
    register_tracked(&registry, "third", &log);

    // Creation order differs from registration order.
    get(&registry, "second");
    get(&registry, "third");
    get(&registry, "first");

    assert_eq!(registry.finalize_all(), 3);
    assert_eq!(*log.lock().unwrap(), vec!["first", "third", "second"]);
}

#[test]
fn test_finalize_skips_uncreated_services() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let created = Arc::new(AtomicUsize::new(0));
    let registry = ServiceRegistry::new();
    register_tracked(&registry, "used", &log);

    let counter = created.clone();
    let unused = registry
        .register_disposable("unused", ServiceType::of::<Tracked>(), {
            let log = log.clone();
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Tracked { name: "unused", log: log.clone() })
            }
        })
        .unwrap();

    get(&registry, "used");
    assert_eq!(registry.finalize_all(), 1);

    assert_eq!(*log.lock().unwrap(), vec!["used"]);
    assert_eq!(created.load(Ordering::SeqCst), 0);
    assert_eq!(unused.state(), ServiceState::Uncreated);
}

#[test]
fn test_finalize_is_idempotent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::new();
    register_tracked(&registry, "svc", &log);
    get(&registry, "svc");

    assert_eq!(registry.finalize_all(), 1);
    assert_eq!(registry.finalize_all(), 0);
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(
        registry.lookup_by_name("svc").unwrap().state(),
        ServiceState::Closed
    );
}

#[test]
fn test_access_after_finalize_fails() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::new();
    register_tracked(&registry, "created", &log);
    register_tracked(&registry, "never", &log);
    get(&registry, "created");
    registry.finalize_all();

    let created = ServiceReference::named("created", ServiceType::of::<Tracked>());
    let never = ServiceReference::named("never", ServiceType::of::<Tracked>());

    assert_eq!(registry.get(&created).unwrap_err(), DiError::Finalized("created".to_string()));
    assert_eq!(registry.get(&never).unwrap_err(), DiError::Finalized("never".to_string()));
    assert!(!registry.is_present(&created));
    assert!(!registry.is_present(&never));
    assert_eq!(registry.lookup_by_name("never").unwrap().state(), ServiceState::Uncreated);
}

#[test]
fn test_plain_services_are_closed_without_dispose() {
    let registry = ServiceRegistry::new();
    let descriptor = registry
        .register("plain", ServiceType::of::<u32>(), || Ok::<_, String>(5u32))
        .unwrap();
    registry.get(&ServiceReference::by_type(ServiceType::of::<u32>())).unwrap();

    assert_eq!(registry.finalize_all(), 1);
    assert_eq!(descriptor.state(), ServiceState::Closed);
}

#[test]
fn test_panicking_dispose_does_not_stop_finalization() {
    struct Exploding;
    impl Dispose for Exploding {
        fn dispose(&self) {
            panic!("boom");
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::new();
    register_tracked(&registry, "tracked", &log);
    registry
        .register_disposable("exploding", ServiceType::of::<Exploding>(), || {
            Ok::<_, String>(Exploding)
        })
        .unwrap();

    get(&registry, "tracked");
    registry.get(&ServiceReference::by_type(ServiceType::of::<Exploding>())).unwrap();

    assert_eq!(registry.finalize_all(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["tracked"]);
}

#[test]
fn test_finalize_on_drop() {
    let log = Arc::new(Mutex::new(Vec::new()));
    {
        let options = RegistryOptions::default().finalize_on_drop(true);
        let registry = ServiceRegistry::with_options(options);
        register_tracked(&registry, "svc", &log);
        get(&registry, "svc");

        let clone = registry.clone();
        drop(clone);
        assert!(log.lock().unwrap().is_empty());
    }
    assert_eq!(*log.lock().unwrap(), vec!["svc"]);
}

#[test]
fn test_drop_without_finalize_does_not_dispose() {
    let log = Arc::new(Mutex::new(Vec::new()));
    {
        let registry = ServiceRegistry::new();
        register_tracked(&registry, "svc", &log);
        get(&registry, "svc");
    }
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_finalize_on_drop_with_clones_dropped_concurrently() {
    for _ in 0..200 {
        let log = Arc::new(Mutex::new(Vec::new()));
        let options = RegistryOptions::default().finalize_on_drop(true);
        let registry = ServiceRegistry::with_options(options);
        register_tracked(&registry, "svc", &log);
        get(&registry, "svc");

        let barrier = Arc::new(Barrier::new(2));
        let clones = [registry.clone(), registry];
        let threads: Vec<_> = clones
            .into_iter()
            .map(|clone| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    drop(clone);
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(*log.lock().unwrap(), vec!["svc"]);
    }
}
