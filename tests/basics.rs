use shared_services::{
    DiError, ServiceHandle, ServiceRegistry, ServiceReference, ServiceState, ServiceType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Config {
    port: u16,
}

#[test]
fn test_get_by_name_returns_shared_instance() {
    let registry = ServiceRegistry::new();
    registry
        .register("config", ServiceType::of::<Config>(), || Ok::<_, String>(Config { port: 8080 }))
        .unwrap();

    let reference = ServiceReference::named("config", ServiceType::of::<Config>());
    let a = registry.get_as::<Config>(&reference).unwrap().unwrap();
    let b = registry.get_as::<Config>(&reference).unwrap().unwrap();

    assert_eq!(a.port, 8080);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_separate_references_share_instance() {
    let registry = ServiceRegistry::new();
    registry
        .register("config", ServiceType::of::<Config>(), || Ok::<_, String>(Config { port: 1 }))
        .unwrap();

    let by_name = ServiceReference::named("config", ServiceType::of::<Config>());
    let by_type = ServiceReference::by_type(ServiceType::of::<Config>());

    let a = registry.get(&by_name).unwrap().unwrap();
    let b = registry.get(&by_type).unwrap().unwrap();
    assert!(a.ptr_eq(&b));
}

#[test]
fn test_factory_runs_only_on_access() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let registry = ServiceRegistry::new();
    let descriptor = registry
        .register("config", ServiceType::of::<Config>(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(Config { port: 9 })
        })
        .unwrap();

    let reference = ServiceReference::by_type(ServiceType::of::<Config>());
    registry.validate(&reference).unwrap();
    assert!(registry.is_present(&reference));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(descriptor.state(), ServiceState::Uncreated);

    registry.get(&reference).unwrap();
    registry.get(&reference).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(descriptor.state(), ServiceState::Created);
}

#[test]
fn test_reference_declared_before_registration() {
    let registry = ServiceRegistry::new();
    let reference = ServiceReference::named("late", ServiceType::of::<Config>());

    registry
        .register("late", ServiceType::of::<Config>(), || Ok::<_, String>(Config { port: 3 }))
        .unwrap();

    let config = registry.get_as::<Config>(&reference).unwrap().unwrap();
    assert_eq!(config.port, 3);
}

#[test]
fn test_factory_error_leaves_service_uncreated_and_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let registry = ServiceRegistry::new();
    let descriptor = registry
        .register("flaky", ServiceType::of::<Config>(), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("connection refused".to_string())
            } else {
                Ok(Config { port: 5432 })
            }
        })
        .unwrap();

    let reference = ServiceReference::named("flaky", ServiceType::of::<Config>());

    match registry.get(&reference) {
        Err(DiError::Factory { service, message }) => {
            assert_eq!(service, "flaky");
            assert_eq!(message, "connection refused");
        }
        other => panic!("expected factory error, got {:?}", other),
    }
    assert_eq!(descriptor.state(), ServiceState::Uncreated);

    let config = registry.get_as::<Config>(&reference).unwrap().unwrap();
    assert_eq!(config.port, 5432);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_downcast_to_wrong_type() {
    let registry = ServiceRegistry::new();
    registry
        .register("config", ServiceType::of::<Config>(), || Ok::<_, String>(Config { port: 1 }))
        .unwrap();

    let reference = ServiceReference::named("config", ServiceType::of::<Config>());
    match registry.get_as::<String>(&reference) {
        Err(DiError::TypeMismatch { service, expected, actual }) => {
            assert_eq!(service, "config");
            assert!(expected.contains("String"));
            assert!(actual.contains("Config"));
        }
        other => panic!("expected type mismatch, got {:?}", other),
    }
}

#[test]
fn test_get_required_on_absent_optional() {
    let registry = ServiceRegistry::new();
    let reference = ServiceReference::named("missing", ServiceType::of::<Config>()).optional();

    assert!(registry.get(&reference).unwrap().is_none());
    assert!(matches!(registry.get_required(&reference), Err(DiError::NotFound { .. })));
}

#[test]
fn test_handle_is_lazy() {
    let registry = ServiceRegistry::new();
    registry
        .register("config", ServiceType::of::<Config>(), || Ok::<_, String>(Config { port: 77 }))
        .unwrap();

    let handle = registry.handle("config").unwrap();
    assert!(!handle.is_materialized());
    assert!(handle.is_available());
    assert_eq!(handle.get_as::<Config>().unwrap().port, 77);
    assert!(handle.is_materialized());
    assert!(registry.handle("nope").is_none());
}

#[test]
fn test_instance_handle_needs_no_registry() {
    let config = Arc::new(Config { port: 1 });
    let handle = ServiceHandle::from_instance("fixed", ServiceType::of::<Config>(), config);
    assert!(handle.descriptor().is_none());
    assert_eq!(handle.get().unwrap().name(), "fixed");
    assert!(handle.get().unwrap().concrete_type().contains("Config"));
}

#[test]
fn test_descriptors_in_registration_order() {
    let registry = ServiceRegistry::new();
    registry.register("b", ServiceType::of::<u8>(), || Ok::<_, String>(1u8)).unwrap();
    registry.register("a", ServiceType::of::<u16>(), || Ok::<_, String>(1u16)).unwrap();

    let names: Vec<String> = registry.descriptors().iter().map(|d| d.name().to_string()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert!(registry.contains("a"));
    assert_eq!(registry.len(), 2);
}
