// src/exec/builtin.rs

//! Built-in feature units over the canonical `t`, `m` and `e` series.
//!
//! The built-ins are an ordinary declaration table plus registry, run by the
//! same scheduler as script units. Several of them consume other built-ins'
//! outputs (`std` needs `avg_mag`), so a full run spans more than one round.

use anyhow::{anyhow, bail};

use crate::dag::{DeclarationTable, FeatureValue, UnitDeclaration};
use crate::errors::Result;
use crate::exec::unit::{Arguments, Outputs, UnitRegistry};

type BuiltinFn = fn(&Arguments) -> anyhow::Result<Outputs>;

struct Builtin {
    name: &'static str,
    requires: &'static [&'static str],
    provides: &'static [&'static str],
    compute: BuiltinFn,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "n_epochs",
        requires: &["t"],
        provides: &["n_epochs"],
        compute: n_epochs,
    },
    Builtin {
        name: "total_time",
        requires: &["t"],
        provides: &["total_time"],
        compute: total_time,
    },
    Builtin {
        name: "avg_t_diff",
        requires: &["t"],
        provides: &["avg_t_diff"],
        compute: avg_t_diff,
    },
    Builtin {
        name: "avg_mag",
        requires: &["m"],
        provides: &["avg_mag"],
        compute: avg_mag,
    },
    Builtin {
        name: "std",
        requires: &["m", "avg_mag"],
        provides: &["std"],
        compute: std_dev,
    },
    Builtin {
        name: "median",
        requires: &["m"],
        provides: &["median"],
        compute: median,
    },
    Builtin {
        name: "extrema",
        requires: &["m"],
        provides: &["min", "max", "amplitude"],
        compute: extrema,
    },
    Builtin {
        name: "avg_err",
        requires: &["e"],
        provides: &["avg_err"],
        compute: avg_err,
    },
    Builtin {
        name: "weighted_average",
        requires: &["m", "e"],
        provides: &["weighted_average"],
        compute: weighted_average,
    },
    Builtin {
        name: "percent_beyond_1_std",
        requires: &["m", "avg_mag", "std"],
        provides: &["percent_beyond_1_std"],
        compute: percent_beyond_1_std,
    },
];

/// Declaration table and callables for every built-in unit.
#[derive(Debug, Clone)]
pub struct BuiltinLibrary {
    table: DeclarationTable,
    registry: UnitRegistry,
}

impl BuiltinLibrary {
    pub fn new() -> Result<Self> {
        let table = DeclarationTable::from_declarations(BUILTINS.iter().map(|b| {
            UnitDeclaration::new(b.name, b.requires.iter().copied(), b.provides.iter().copied())
        }))?;

        let mut registry = UnitRegistry::new();
        for b in BUILTINS {
            registry.register_fn(b.name, b.compute);
        }

        Ok(Self { table, registry })
    }

    pub fn table(&self) -> &DeclarationTable {
        &self.table
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Every feature name some built-in produces, sorted.
    pub fn feature_names(&self) -> Vec<String> {
        self.table.all_provided().iter().cloned().collect()
    }
}

fn series<'a>(args: &'a Arguments, name: &str) -> anyhow::Result<&'a [f64]> {
    let values = args
        .get(name)
        .and_then(FeatureValue::as_series)
        .ok_or_else(|| anyhow!("'{name}' must be a series"))?;
    if values.is_empty() {
        bail!("'{name}' is empty");
    }
    Ok(values)
}

fn scalar(args: &Arguments, name: &str) -> anyhow::Result<f64> {
    args.get(name)
        .and_then(FeatureValue::as_scalar)
        .ok_or_else(|| anyhow!("'{name}' must be a number"))
}

fn single(name: &str, value: f64) -> Outputs {
    [(name.to_string(), FeatureValue::Scalar(value))]
        .into_iter()
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn n_epochs(args: &Arguments) -> anyhow::Result<Outputs> {
    let t = series(args, "t")?;
    Ok(single("n_epochs", t.len() as f64))
}

fn total_time(args: &Arguments) -> anyhow::Result<Outputs> {
    let t = series(args, "t")?;
    let lo = t.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = t.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(single("total_time", hi - lo))
}

fn avg_t_diff(args: &Arguments) -> anyhow::Result<Outputs> {
    let t = series(args, "t")?;
    if t.len() < 2 {
        bail!("need at least two epochs, got {}", t.len());
    }
    let diffs: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
    Ok(single("avg_t_diff", mean(&diffs)))
}

fn avg_mag(args: &Arguments) -> anyhow::Result<Outputs> {
    Ok(single("avg_mag", mean(series(args, "m")?)))
}

fn std_dev(args: &Arguments) -> anyhow::Result<Outputs> {
    let m = series(args, "m")?;
    let avg = scalar(args, "avg_mag")?;
    let var = m.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / m.len() as f64;
    Ok(single("std", var.sqrt()))
}

fn median(args: &Arguments) -> anyhow::Result<Outputs> {
    let mut m = series(args, "m")?.to_vec();
    m.sort_by(f64::total_cmp);
    let mid = m.len() / 2;
    let value = if m.len() % 2 == 0 {
        (m[mid - 1] + m[mid]) / 2.0
    } else {
        m[mid]
    };
    Ok(single("median", value))
}

fn extrema(args: &Arguments) -> anyhow::Result<Outputs> {
    let m = series(args, "m")?;
    let lo = m.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = m.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok([
        ("min".to_string(), FeatureValue::Scalar(lo)),
        ("max".to_string(), FeatureValue::Scalar(hi)),
        ("amplitude".to_string(), FeatureValue::Scalar((hi - lo) / 2.0)),
    ]
    .into_iter()
    .collect())
}

fn avg_err(args: &Arguments) -> anyhow::Result<Outputs> {
    Ok(single("avg_err", mean(series(args, "e")?)))
}

fn weighted_average(args: &Arguments) -> anyhow::Result<Outputs> {
    let m = series(args, "m")?;
    let e = series(args, "e")?;
    if m.len() != e.len() {
        bail!("'m' has {} values but 'e' has {}", m.len(), e.len());
    }
    if e.iter().any(|x| *x == 0.0) {
        bail!("'e' contains a zero error");
    }
    let (num, den) = m
        .iter()
        .zip(e)
        .fold((0.0, 0.0), |(num, den), (m, e)| {
            let w = 1.0 / (e * e);
            (num + w * m, den + w)
        });
    Ok(single("weighted_average", num / den))
}

fn percent_beyond_1_std(args: &Arguments) -> anyhow::Result<Outputs> {
    let m = series(args, "m")?;
    let avg = scalar(args, "avg_mag")?;
    let std = scalar(args, "std")?;
    let beyond = m.iter().filter(|x| (*x - avg).abs() > std).count();
    Ok(single(
        "percent_beyond_1_std",
        beyond as f64 / m.len() as f64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{KnownValues, Scheduler};
    use crate::types::ResultScope;

    fn sample() -> KnownValues {
        KnownValues::new()
            .with("t", vec![1.0, 2.0, 3.0])
            .with("m", vec![1.0, 23.0, 2.0])
            .with("e", vec![0.2, 0.3, 0.2])
    }

    fn scalar_of(result: &crate::dag::ExecutionResult, name: &str) -> f64 {
        result
            .get(name)
            .and_then(FeatureValue::as_scalar)
            .unwrap_or_else(|| panic!("missing scalar {name}"))
    }

    #[tokio::test]
    async fn full_library_runs_in_three_rounds() {
        let lib = BuiltinLibrary::new().unwrap();
        let result = Scheduler::new(lib.table())
            .run(lib.registry(), sample(), ResultScope::Computed)
            .await
            .unwrap();

        assert_eq!(result.rounds.len(), 3);
        assert_eq!(result.round_of("avg_mag"), Some(1));
        assert_eq!(result.round_of("std"), Some(2));
        assert_eq!(result.round_of("percent_beyond_1_std"), Some(3));

        assert_eq!(scalar_of(&result, "n_epochs"), 3.0);
        assert_eq!(scalar_of(&result, "total_time"), 2.0);
        assert_eq!(scalar_of(&result, "median"), 2.0);
        assert_eq!(scalar_of(&result, "amplitude"), 11.0);
        assert!((scalar_of(&result, "avg_mag") - 26.0 / 3.0).abs() < 1e-9);
        assert!((scalar_of(&result, "percent_beyond_1_std") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_favours_small_errors() {
        let args: Arguments = [
            ("m".to_string(), FeatureValue::from(vec![10.0, 20.0])),
            ("e".to_string(), FeatureValue::from(vec![0.1, 1.0])),
        ]
        .into_iter()
        .collect();
        let out = weighted_average(&args).unwrap();
        let value = out["weighted_average"].as_scalar().unwrap();
        assert!(value < 10.2);
    }

    #[test]
    fn empty_series_is_rejected() {
        let args: Arguments = [("m".to_string(), FeatureValue::from(Vec::<f64>::new()))]
            .into_iter()
            .collect();
        let err = avg_mag(&args).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn feature_names_cover_every_output() {
        let lib = BuiltinLibrary::new().unwrap();
        let names = lib.feature_names();
        assert!(names.contains(&"amplitude".to_string()));
        assert_eq!(names.len(), 12);
    }
}
