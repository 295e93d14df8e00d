//! Admission control and replica budget tests

use std::sync::Arc;
use std::thread;

use treegen_core::budget::{BudgetGuard, MemoryBudget};
use treegen_core::config::GeneratorConfig;
use treegen_core::error::Error;
use treegen_exec::TreeGenerator;
use treegen_mem::sys::GIB;
use treegen_mem::{admit, estimate_bytes, Admission, ReplicaBudget, SystemResources};

#[test]
fn test_ceiling_rejects_before_any_work() {
    let mut tg = TreeGenerator::new().with_resources(SystemResources::fixed(8, None, None));
    let mut called = false;
    let err = tg.generate(31, 3, |_| called = true, true).unwrap_err();

    assert!(!called, "callback must not run for a rejected request");
    assert!(err.is_rejection());
    match err {
        Error::Rejected { n, m, reason } => {
            assert_eq!((n, m), (31, 3));
            assert!(reason.contains("too large"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_memory_model_rejects_when_estimate_exceeds_available() {
    let cfg = GeneratorConfig::default();
    // 2^(27/3) MiB = 512 MiB needed
    let tight = SystemResources::fixed(4, Some(GIB), Some(256 * 1024 * 1024));
    assert!(admit(&cfg, 27, 4, &tight).unwrap_err().is_rejection());

    // Warn above half of available, but proceed
    let roomy = SystemResources::fixed(4, Some(GIB), Some(768 * 1024 * 1024));
    match admit(&cfg, 27, 4, &roomy).unwrap() {
        Admission::Warned {
            estimated_bytes,
            available_bytes,
        } => {
            assert_eq!(estimated_bytes, estimate_bytes(27));
            assert_eq!(available_bytes, 768 * 1024 * 1024);
        }
        other => panic!("expected a warning, got {:?}", other),
    }
}

#[test]
fn test_small_requests_skip_the_memory_model() {
    let cfg = GeneratorConfig::default();
    let starved = SystemResources::fixed(1, Some(GIB), Some(1));
    assert_eq!(admit(&cfg, 24, 24, &starved).unwrap(), Admission::Admitted);

    // Unknown memory admits anything under the ceiling
    let unknown = SystemResources::fixed(1, None, None);
    assert_eq!(admit(&cfg, 30, 2, &unknown).unwrap(), Admission::Admitted);
}

#[test]
fn test_configured_ceiling() {
    let cfg = GeneratorConfig {
        max_nodes: 8,
        ..GeneratorConfig::default()
    };
    let mut tg = TreeGenerator::with_config(cfg).with_resources(SystemResources::fixed(2, None, None));
    assert_eq!(tg.generate(8, 8, |_| {}, false).unwrap(), 115);
    assert!(tg.generate(9, 9, |_| {}, false).unwrap_err().is_rejection());
}

#[test]
fn test_invalid_config_is_reported() {
    let cfg = GeneratorConfig {
        thread_cap: 0,
        ..GeneratorConfig::default()
    };
    let mut tg = TreeGenerator::with_config(cfg);
    let err = tg.generate(5, 5, |_| {}, true).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_replica_budget_limits_worker_count() {
    let budget = ReplicaBudget::new(10 * 1024);
    let guards = budget.reserve_workers(8, 3 * 1024);
    assert_eq!(guards.len(), 3);
    assert_eq!(budget.used_bytes(), 9 * 1024);

    drop(guards);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_replica_budget_always_grants_one_worker() {
    let budget = ReplicaBudget::new(1024);
    let guards = budget.reserve_workers(4, 4096);
    assert_eq!(guards.len(), 1);
    assert_eq!(guards[0].bytes(), 0);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_replica_budget_concurrent_reservations() {
    let budget = Arc::new(ReplicaBudget::new(64 * 1024));
    let mut handles = vec![];

    for _ in 0..8 {
        let budget = Arc::clone(&budget);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                if let Some(guard) = budget.try_acquire(8 * 1024, "replica") {
                    assert!(budget.used_bytes() <= budget.capacity_bytes());
                    drop(guard);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(budget.used_bytes(), 0);
}
