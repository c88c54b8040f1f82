// tests/isolated_runner.rs

use std::sync::Arc;
use std::time::Duration;

use featuredag::dag::{FeatureValue, KnownValues};
use featuredag::errors::{ErrorKind, FeaturedagError};
use featuredag::isolate::IsolatedRunner;
use featuredag_test_utils::builders::{sample_known, RegistryBuilder, ScriptBuilder};
use featuredag_test_utils::fake_backend::{FakeBackend, FakeBehaviour};
use featuredag_test_utils::{init_tracing, with_timeout};

fn avg_script() -> ScriptBuilder {
    ScriptBuilder::new().unit("avg", &["t", "m"], &["avg"])
}

fn runner(backend: &FakeBackend, root: &std::path::Path, timeout: Duration) -> IsolatedRunner {
    IsolatedRunner::new(Arc::new(backend.clone()), Some(root.to_path_buf()), timeout)
}

/// Staging root must be empty again after every run.
fn assert_no_staging_left(root: &std::path::Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root).unwrap().collect();
    assert!(leftovers.is_empty(), "staging leftovers: {leftovers:?}");
}

#[tokio::test]
async fn successful_run_returns_result_and_cleans_up() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(
        FakeBehaviour::RunStaged,
        RegistryBuilder::new().mean("avg", "m", "avg").build(),
    );

    let result = with_timeout(
        runner(&backend, root.path(), Duration::from_secs(5))
            .run(script.path(), &sample_known()),
    )
    .await
    .unwrap();

    let avg = result.get("avg").and_then(FeatureValue::as_scalar).unwrap();
    assert!((avg - 8.667).abs() < 1e-3);

    let log = backend.log();
    assert_eq!(log.staged.len(), 1);
    assert!(log.staged[0].starts_with(root.path()));
    assert_eq!(log.removed, log.started);
    assert!(log.detached.is_empty());
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn non_finite_values_cross_the_staging_boundary() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = ScriptBuilder::new()
        .unit("avg", &["m"], &["avg"])
        .unit("peak", &["e"], &["peak"])
        .write_temp();
    let backend = FakeBackend::new(
        FakeBehaviour::RunStaged,
        RegistryBuilder::new()
            .mean("avg", "m", "avg")
            .mean("peak", "e", "peak")
            .build(),
    );
    let known = KnownValues::new()
        .with("m", vec![1.0, f64::NAN, 3.0])
        .with("e", vec![1.0, f64::INFINITY]);

    let result = with_timeout(
        runner(&backend, root.path(), Duration::from_secs(5)).run(script.path(), &known),
    )
    .await
    .unwrap();

    assert!(result.get("avg").and_then(FeatureValue::as_scalar).unwrap().is_nan());
    assert_eq!(result.get("peak"), Some(&FeatureValue::Scalar(f64::INFINITY)));
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn crash_after_staging_is_an_isolated_execution_error() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::Crash { code: 139 }, Default::default());

    let err = with_timeout(
        runner(&backend, root.path(), Duration::from_secs(5))
            .run(script.path(), &sample_known()),
    )
    .await
    .unwrap_err();

    match &err {
        FeaturedagError::IsolatedExecution(msg) => {
            assert!(msg.contains("139"), "{msg}");
            assert!(msg.contains("Segmentation fault"), "{msg}");
        }
        other => panic!("expected an isolated execution error, got {other:?}"),
    }
    let log = backend.log();
    assert!(!log.staged[0].exists());
    assert_eq!(log.removed.len(), 1);
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn timeout_removes_instance_and_staging() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::Hang, Default::default());

    let err = with_timeout(
        runner(&backend, root.path(), Duration::from_millis(50))
            .run(script.path(), &sample_known()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IsolatedExecution);
    assert!(err.to_string().contains("timed out"));
    assert_eq!(backend.log().removed.len(), 1);
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn corrupt_result_file_is_an_isolated_execution_error() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::CorruptResult, Default::default());

    let err = runner(&backend, root.path(), Duration::from_secs(5))
        .run(script.path(), &sample_known())
        .await
        .unwrap_err();

    assert!(matches!(err, FeaturedagError::IsolatedExecution(ref msg) if msg.contains("corrupt")));
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn failure_to_create_still_removes_staging() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::FailCreate, Default::default());

    let err = runner(&backend, root.path(), Duration::from_secs(5))
        .run(script.path(), &sample_known())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IsolatedExecution);
    let log = backend.log();
    assert!(log.created.is_empty());
    assert!(log.removed.is_empty());
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn created_instance_is_removed_when_start_fails() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::FailStart, Default::default());

    let err = runner(&backend, root.path(), Duration::from_secs(5))
        .run(script.path(), &sample_known())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IsolatedExecution);
    let log = backend.log();
    assert_eq!(log.created.len(), 1);
    assert!(log.started.is_empty());
    assert_eq!(log.removed, log.created);
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn hanging_start_is_covered_by_the_timeout() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::HangStart, Default::default());

    let err = with_timeout(
        runner(&backend, root.path(), Duration::from_millis(50))
            .run(script.path(), &sample_known()),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("timed out"), "{err}");
    let log = backend.log();
    assert_eq!(log.created.len(), 1);
    assert_eq!(log.removed, log.created);
    assert!(log.detached.is_empty());
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn dropping_a_run_during_start_still_removes_the_instance() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::HangStart, Default::default());
    let runner = runner(&backend, root.path(), Duration::from_secs(60));

    let outcome = tokio::time::timeout(
        Duration::from_millis(250),
        runner.run(script.path(), &sample_known()),
    )
    .await;
    assert!(outcome.is_err());

    let log = backend.log();
    assert_eq!(log.created.len(), 1);
    assert_eq!(log.detached, log.created);
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn errors_from_inside_keep_their_kind() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = ScriptBuilder::new()
        .unit("partial", &["t"], &["z"])
        .write_temp();
    let backend = FakeBackend::new(
        FakeBehaviour::RunStaged,
        RegistryBuilder::new().constant("partial", &[]).build(),
    );

    let err = runner(&backend, root.path(), Duration::from_secs(5))
        .run(script.path(), &sample_known())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingRequiredReturnKey);
    assert_eq!(
        err.to_string(),
        "unit 'partial': key 'z' not present in function return value"
    );
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn dropping_a_run_midway_still_cleans_up() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(FakeBehaviour::Hang, Default::default());
    let runner = runner(&backend, root.path(), Duration::from_secs(60));

    // Cancel the run from the outside while the instance is "running".
    let outcome = tokio::time::timeout(
        Duration::from_millis(250),
        runner.run(script.path(), &sample_known()),
    )
    .await;
    assert!(outcome.is_err());

    let log = backend.log();
    assert_eq!(log.started.len(), 1);
    assert_eq!(log.detached, log.started);
    assert_no_staging_left(root.path());
}

#[tokio::test]
async fn independent_runs_do_not_share_staging() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let script = avg_script().write_temp();
    let backend = FakeBackend::new(
        FakeBehaviour::RunStaged,
        RegistryBuilder::new().mean("avg", "m", "avg").build(),
    );
    let runner = runner(&backend, root.path(), Duration::from_secs(5));
    let other_series = KnownValues::new()
        .with("t", vec![1.0, 2.0])
        .with("m", vec![2.0, 4.0]);

    let sample = sample_known();
    let (a, b) = tokio::join!(
        runner.run(script.path(), &sample),
        runner.run(script.path(), &other_series)
    );
    let avg = |result: featuredag::errors::Result<featuredag::dag::ExecutionResult>| {
        result.unwrap().get("avg").and_then(FeatureValue::as_scalar)
    };
    assert_eq!(avg(a).map(f64::round), Some(9.0));
    assert_eq!(avg(b), Some(3.0));

    let log = backend.log();
    assert_eq!(log.staged.len(), 2);
    assert_ne!(log.staged[0], log.staged[1]);
    assert_no_staging_left(root.path());
}
