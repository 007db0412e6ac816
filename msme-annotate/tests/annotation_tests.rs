//! Integration tests for record annotation
//!
//! Properties of the fixpoint annotator over whole job sequences:
//! idempotence, monotonicity, pass bound and order invariance.

mod helpers;

use helpers::{permutations, TableService};
use msme_annotate::services::ServiceRegistry;
use msme_annotate::{Annotator, DiagnosticKind, Job, Record};
use serde_json::json;
use std::sync::Arc;

const CHAIN: &[(&str, &str)] = &[
    ("name", "inchi"),
    ("inchi", "inchikey"),
    ("inchikey", "smiles"),
    ("smiles", "formula"),
];

fn chain_setup() -> (Annotator, Vec<Job>, Arc<TableService>) {
    let service = Arc::new(TableService::new("Table", CHAIN));
    let mut registry = ServiceRegistry::new();
    registry.register("Table", service.clone());

    let jobs = CHAIN
        .iter()
        .map(|(s, t)| Job::new(*s, *t, "Table"))
        .collect();

    (Annotator::new(registry), jobs, service)
}

fn caffeine() -> Record {
    [
        ("name", json!("caffeine")),
        ("precursor_mz", json!(195.0877)),
        ("ionmode", json!("positive")),
    ]
    .into_iter()
    .collect()
}

// ============================================================================
// Fixpoint properties
// ============================================================================

#[tokio::test]
async fn test_annotation_is_idempotent() {
    let (annotator, jobs, _) = chain_setup();

    let once = annotator.annotate(caffeine(), &jobs, true).await;
    let twice = annotator.annotate(once.record.clone(), &jobs, true).await;

    assert_eq!(twice.record, once.record);
    assert_eq!(twice.diagnostics.total_conversions(), 0);
    assert_eq!(twice.passes, 1);
}

#[tokio::test]
async fn test_annotation_only_adds_attributes() {
    let (annotator, jobs, _) = chain_setup();
    let original = caffeine();

    let out = annotator.annotate(original.clone(), &jobs, true).await;

    for (key, value) in original.iter() {
        assert_eq!(out.record.get(key), Some(value), "attribute {} changed", key);
    }
    assert_eq!(out.record.len(), original.len() + CHAIN.len());

    // Original attributes keep their leading positions
    let keys: Vec<&str> = out.record.keys().take(3).collect();
    assert_eq!(keys, vec!["name", "precursor_mz", "ionmode"]);
}

#[tokio::test]
async fn test_pass_count_bounded_for_every_ordering() {
    let (annotator, jobs, _) = chain_setup();

    for ordering in permutations(&jobs) {
        let out = annotator.annotate(caffeine(), &ordering, true).await;
        assert!(
            out.passes <= ordering.len() + 1,
            "{} passes for {} jobs",
            out.passes,
            ordering.len()
        );
    }
}

#[tokio::test]
async fn test_acyclic_chain_result_independent_of_order() {
    let (annotator, jobs, _) = chain_setup();
    let reference = annotator.annotate(caffeine(), &jobs, true).await.record;

    assert_eq!(
        reference.get("formula"),
        Some(&json!("formula(smiles(inchikey(inchi(caffeine))))"))
    );

    for ordering in permutations(&jobs) {
        let out = annotator.annotate(caffeine(), &ordering, true).await;
        for (_, target) in CHAIN {
            assert_eq!(out.record.get(target), reference.get(target));
        }
    }
}

#[tokio::test]
async fn test_reverse_order_needs_repeat() {
    let (annotator, mut jobs, _) = chain_setup();
    jobs.reverse();

    let single = annotator.annotate(caffeine(), &jobs, false).await;
    assert!(single.record.contains("inchi"));
    assert!(!single.record.contains("formula"));

    let repeated = annotator.annotate(caffeine(), &jobs, true).await;
    assert!(repeated.record.contains("formula"));
    assert_eq!(repeated.passes, jobs.len() + 1);
}

// ============================================================================
// Failure containment
// ============================================================================

#[tokio::test]
async fn test_failed_lookup_leaves_record_unchanged() {
    let service = Arc::new(TableService::new("Table", CHAIN).failing_on("caffeine"));
    let mut registry = ServiceRegistry::new();
    registry.register("Table", service.clone());
    let annotator = Annotator::new(registry);
    let jobs = vec![Job::new("name", "inchi", "Table")];

    let out = annotator.annotate(caffeine(), &jobs, true).await;

    assert_eq!(out.record, caffeine());
    assert_eq!(out.diagnostics.count(&jobs[0], DiagnosticKind::FetchFailed), 1);
    assert_eq!(out.passes, 1);
}

#[tokio::test]
async fn test_first_writer_wins_between_services() {
    let first = Arc::new(TableService::new("First", &[("name", "inchi")]));
    let second = Arc::new(TableService::new("Second", &[("name", "inchi")]));
    let mut registry = ServiceRegistry::new();
    registry.register("First", first.clone());
    registry.register("Second", second.clone());
    let annotator = Annotator::new(registry);

    let jobs = vec![
        Job::new("name", "inchi", "First"),
        Job::new("name", "inchi", "Second"),
    ];

    let out = annotator.annotate(caffeine(), &jobs, false).await;

    assert_eq!(out.record.get("inchi"), Some(&json!("inchi(caffeine)")));
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
    assert_eq!(out.diagnostics.count(&jobs[1], DiagnosticKind::AlreadyPresent), 1);
}
