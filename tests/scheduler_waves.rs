// tests/scheduler_waves.rs

use std::path::Path;

use featuredag::dag::{ExecutionResult, FeatureValue, KnownValues, Scheduler};
use featuredag::engine::{run_source, RunOptions};
use featuredag::errors::{ErrorKind, FeaturedagError, Result};
use featuredag::exec::{Arguments, Outputs, StaticLoader};
use featuredag::script::extract_declarations;
use featuredag::types::ResultScope;
use featuredag_test_utils::builders::{sample_known, RegistryBuilder, ScriptBuilder};
use featuredag_test_utils::init_tracing;

async fn run(
    script: &ScriptBuilder,
    registry: RegistryBuilder,
    known: KnownValues,
) -> Result<ExecutionResult> {
    run_source(
        script.source(),
        Path::new("feature_script.py"),
        known,
        &StaticLoader::new(registry.build()),
        RunOptions::default(),
    )
    .await
}

#[tokio::test]
async fn mean_of_m_is_computed_in_round_one() {
    init_tracing();
    let script = ScriptBuilder::new().unit("avg", &["t", "m"], &["avg"]);
    let registry = RegistryBuilder::new().mean("avg", "m", "avg");

    let result = run(&script, registry, sample_known()).await.unwrap();

    let avg = result.get("avg").and_then(FeatureValue::as_scalar).unwrap();
    assert!((avg - 8.667).abs() < 1e-3, "avg = {avg}");
    assert_eq!(result.round_of("avg"), Some(1));
    assert_eq!(result.rounds.len(), 1);
}

#[tokio::test]
async fn chained_units_run_in_successive_rounds() {
    init_tracing();
    let script = ScriptBuilder::new()
        .unit("B", &["x"], &["y"])
        .unit("A", &["t"], &["x"]);
    let registry = RegistryBuilder::new()
        .constant("A", &[("x", 1.0)])
        .constant("B", &[("y", 2.0)]);

    let result = run(&script, registry, sample_known()).await.unwrap();

    assert_eq!(result.round_of("A"), Some(1));
    assert_eq!(result.round_of("B"), Some(2));
    assert_eq!(
        result.computed.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["x", "y"]
    );
}

#[tokio::test]
async fn mutual_cycle_stalls_naming_both_units() {
    init_tracing();
    let script = ScriptBuilder::new()
        .unit("A", &["y"], &["x"])
        .unit("B", &["x"], &["y"]);
    let registry = RegistryBuilder::new()
        .constant("A", &[("x", 1.0)])
        .constant("B", &[("y", 1.0)]);

    // Both names are provided by someone, so validation passes and the
    // cycle is only caught by the scheduler.
    let err = run(&script, registry, sample_known()).await.unwrap_err();

    match &err {
        FeaturedagError::SchedulingStall { stalled } => {
            let names: Vec<_> = stalled.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["A", "B"]);
            assert_eq!(stalled[0].unresolved, vec!["y".to_string()]);
            assert_eq!(stalled[1].unresolved, vec!["x".to_string()]);
        }
        other => panic!("expected a stall, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::SchedulingStall);
    assert!(err.report().starts_with("SchedulingStallError: "));
}

#[tokio::test]
async fn missing_return_key_is_reported_and_nothing_is_merged() {
    init_tracing();
    let script = ScriptBuilder::new().unit("partial", &["t"], &["w", "z"]);
    let registry = RegistryBuilder::new().constant("partial", &[("w", 1.0)]);

    let table = extract_declarations(script.source()).unwrap();
    let registry = registry.build();
    let scheduler = Scheduler::new(&table);
    let mut state = scheduler.start(sample_known());

    let err = scheduler.step_round(&mut state, &registry).await.unwrap_err();
    assert!(matches!(
        err,
        FeaturedagError::MissingRequiredReturnKey { ref unit, ref key }
            if unit == "partial" && key == "z"
    ));
    assert!(!state.known().contains("w"));
    assert!(state.pending().contains("partial"));
}

#[tokio::test]
async fn caller_values_win_over_unit_outputs() {
    init_tracing();
    let script = ScriptBuilder::new()
        .unit("make_x", &["t"], &["x"])
        .unit("use_x", &["x"], &["doubled"]);
    let mut registry = RegistryBuilder::new().constant("make_x", &[("x", 1.0)]).build();
    registry.register_fn("use_x", |args: &Arguments| {
        let x = args["x"].as_scalar().unwrap_or(f64::NAN);
        let out: Outputs = [("doubled".to_string(), FeatureValue::Scalar(2.0 * x))]
            .into_iter()
            .collect();
        Ok(out)
    });

    let known = sample_known().with("x", 5.0);
    let result = run_source(
        script.source(),
        Path::new("s.py"),
        known,
        &StaticLoader::new(registry),
        RunOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.get("x"), Some(&FeatureValue::Scalar(5.0)));
    assert_eq!(result.get("doubled"), Some(&FeatureValue::Scalar(10.0)));
    assert!(!result.computed.contains("x"));
    // Already satisfied by the caller, so `use_x` can run alongside `make_x`.
    assert_eq!(result.round_of("use_x"), Some(1));
}

#[tokio::test]
async fn unit_errors_surface_as_unit_failed() {
    init_tracing();
    let script = ScriptBuilder::new().unit("boom", &["m"], &["b"]);
    let registry = RegistryBuilder::new().failing("boom", "division by zero");

    let err = run(&script, registry, sample_known()).await.unwrap_err();
    assert!(matches!(
        err,
        FeaturedagError::UnitFailed { ref unit, ref message }
            if unit == "boom" && message.contains("division by zero")
    ));
}

#[tokio::test]
async fn undeclared_outputs_are_not_merged() {
    init_tracing();
    let script = ScriptBuilder::new().unit("chatty", &["t"], &["a"]);
    let registry = RegistryBuilder::new().constant("chatty", &[("a", 1.0), ("extra", 2.0)]);

    let result = run(&script, registry, sample_known()).await.unwrap();
    assert!(result.get("a").is_some());
    assert!(result.get("extra").is_none());
}

#[tokio::test]
async fn same_inputs_give_identical_results() {
    init_tracing();
    let script = ScriptBuilder::new()
        .unit("avg", &["m"], &["avg"])
        .unit("avg_t", &["t"], &["avg_t"])
        .unit("both", &["avg", "avg_t"], &["sum"]);
    let registry = || {
        RegistryBuilder::new()
            .mean("avg", "m", "avg")
            .mean("avg_t", "t", "avg_t")
            .constant("both", &[("sum", 3.0)])
    };

    let first = run(&script, registry(), sample_known()).await.unwrap();
    let second = run(&script, registry(), sample_known()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.rounds,
        vec![
            vec!["avg".to_string(), "avg_t".to_string()],
            vec!["both".to_string()]
        ]
    );
}

#[tokio::test]
async fn computed_scope_drops_caller_inputs() {
    init_tracing();
    let script = ScriptBuilder::new().unit("avg", &["m"], &["avg"]);
    let table = extract_declarations(script.source()).unwrap();
    let registry = RegistryBuilder::new().mean("avg", "m", "avg").build();

    let result = Scheduler::new(&table)
        .run(&registry, sample_known(), ResultScope::Computed)
        .await
        .unwrap();
    let names: Vec<_> = result.values.names().into_iter().collect();
    assert_eq!(names, vec!["avg".to_string()]);
}
