/// Display and trait tests for DiError and DiResult

use shared_services::{Candidate, DiError, DiResult};
use std::error::Error;

#[test]
fn test_error_display_duplicate_name() {
    let error = DiError::DuplicateName("counter".to_string());
    assert_eq!(error.to_string(), "Service already registered: counter");
}

#[test]
fn test_error_display_not_found_by_name() {
    let error = DiError::NotFound {
        requested_name: Some("counter".to_string()),
        requested_type: "app::Counter",
    };
    assert_eq!(error.to_string(), "Service not found: counter (app::Counter)");
}

#[test]
fn test_error_display_not_found_by_type() {
    let error = DiError::NotFound {
        requested_name: None,
        requested_type: "app::Counter",
    };
    assert_eq!(error.to_string(), "No service registered for type: app::Counter");
}

#[test]
fn test_error_display_ambiguous_lists_candidates() {
    let error = DiError::Ambiguous {
        requested_type: "dyn app::CountingService",
        candidates: vec![
            Candidate {
                name: "counter".to_string(),
                declared_type: "dyn app::CountingService",
                concrete_type: "app::Counter",
            },
            Candidate {
                name: "altCounter".to_string(),
                declared_type: "dyn app::SubCountingService",
                concrete_type: "app::AltCounter",
            },
        ],
    };
    assert_eq!(
        error.to_string(),
        "Ambiguous service reference for dyn app::CountingService: candidates are \
         counter (dyn app::CountingService), altCounter (dyn app::SubCountingService)"
    );
}

#[test]
fn test_error_display_factory() {
    let error = DiError::Factory {
        service: "db".to_string(),
        message: "timeout".to_string(),
    };
    assert_eq!(error.to_string(), "Failed to create service db: timeout");
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch {
        service: "db".to_string(),
        expected: "u32",
        actual: "alloc::string::String",
    };
    assert_eq!(
        error.to_string(),
        "Type mismatch for db: expected u32, found alloc::string::String"
    );
}

#[test]
fn test_error_display_circular() {
    let error = DiError::Circular(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
    assert_eq!(error.to_string(), "Circular service creation: a -> b -> a");
}

#[test]
fn test_error_display_misc() {
    assert_eq!(DiError::Finalized("x".to_string()).to_string(), "Service already finalized: x");
    assert_eq!(
        DiError::Detached("x".to_string()).to_string(),
        "Registry for service x was dropped"
    );
    assert_eq!(
        DiError::OverrideAlreadySet.to_string(),
        "Service reference already has an explicit value"
    );
    assert_eq!(DiError::DepthExceeded(100).to_string(), "Max depth 100 exceeded");
    assert_eq!(DiError::Config("bad".to_string()).to_string(), "Configuration error: bad");
}

#[test]
fn test_diresult_err() {
    let result: DiResult<String> = Err(DiError::DuplicateName("svc".to_string()));
    match result {
        Err(DiError::DuplicateName(name)) => assert_eq!(name, "svc"),
        _ => panic!("Expected DuplicateName error"),
    }
}

#[test]
fn test_error_clone_and_eq() {
    let error = DiError::Finalized("svc".to_string());
    assert_eq!(error.clone(), error);
}

#[test]
fn test_error_as_std_error() {
    let error = DiError::OverrideAlreadySet;
    let _: &dyn std::error::Error = &error;
    assert!(error.source().is_none());
}
