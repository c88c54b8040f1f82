// src/exec/interpreter.rs

//! Script functions executed through an interpreter process.
//!
//! Each call spawns `<program> -c <driver> <script> <function>`, writes the
//! call arguments as a JSON object to the child's stdin and reads the
//! returned mapping as JSON from its stdout. Output the script itself prints
//! is redirected to stderr by the driver and logged at debug. Non-finite
//! floats travel as `"NaN"`, `"Infinity"` and `"-Infinity"` in both
//! directions.
//!
//! Every call starts a fresh interpreter that imports the script again, so
//! module-level code in a script runs once per unit call, not once per run.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::DeclarationTable;
use crate::errors::{FeaturedagError, Result};
use crate::exec::loader::ScriptLoader;
use crate::exec::unit::{Arguments, FeatureUnit, Outputs, UnitFuture, UnitRegistry};

/// Driver run by the interpreter for every call.
///
/// The annotation is replaced by a no-op so scripts import cleanly; contract
/// checks happen on the Rust side.
const PYTHON_DRIVER: &str = r#"
import builtins, importlib.util, json, math, sys, types

def myFeature(requires=(), provides=()):
    return lambda f: f

builtins.myFeature = myFeature
builtins.feature = myFeature
shim = types.ModuleType("featuredag")
shim.myFeature = shim.feature = myFeature
sys.modules["featuredag"] = shim

script_path, func_name = sys.argv[1], sys.argv[2]
SPECIAL = {"NaN": math.nan, "Infinity": math.inf, "-Infinity": -math.inf}

def decode(v):
    if isinstance(v, list):
        return [decode(x) for x in v]
    if isinstance(v, str):
        return SPECIAL[v]
    return float(v) if v is not None else math.nan

args = {k: decode(v) for k, v in json.load(sys.stdin).items()}
try:
    import numpy as np
    args = {k: np.asarray(v) if isinstance(v, list) else v for k, v in args.items()}
except ImportError:
    pass

result_out = sys.stdout
sys.stdout = sys.stderr
spec = importlib.util.spec_from_file_location("feature_script", script_path)
module = importlib.util.module_from_spec(spec)
spec.loader.exec_module(module)
result = getattr(module, func_name)(**args)

def number(x):
    x = float(x)
    if math.isnan(x):
        return "NaN"
    if math.isinf(x):
        return "Infinity" if x > 0 else "-Infinity"
    return x

def plain(v):
    if hasattr(v, "tolist"):
        v = v.tolist()
    if isinstance(v, (list, tuple)):
        return [number(x) for x in v]
    return number(v)

if not isinstance(result, dict):
    raise TypeError("feature function must return a dict, got %s" % type(result).__name__)
json.dump({str(k): plain(v) for k, v in result.items()}, result_out, allow_nan=False)
"#;

/// Loads scripts by deferring each unit call to an interpreter process.
#[derive(Debug, Clone)]
pub struct InterpreterLoader {
    program: String,
}

impl InterpreterLoader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ScriptLoader for InterpreterLoader {
    fn load(&self, script: &Path, table: &DeclarationTable) -> Result<UnitRegistry> {
        if !script.is_file() {
            return Err(FeaturedagError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("feature script {} not found", script.display()),
            )));
        }

        let script = Arc::new(script.to_path_buf());
        let mut registry = UnitRegistry::new();
        for decl in table.units() {
            registry.register(
                decl.name.clone(),
                Arc::new(InterpreterUnit {
                    program: self.program.clone(),
                    script: Arc::clone(&script),
                    function: decl.name.clone(),
                }),
            );
        }

        info!(
            script = %script.display(),
            program = %self.program,
            units = registry.len(),
            "loaded feature script"
        );
        Ok(registry)
    }
}

/// One script function, invoked through the interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterUnit {
    program: String,
    script: Arc<PathBuf>,
    function: String,
}

impl FeatureUnit for InterpreterUnit {
    fn call(&self, args: Arguments) -> UnitFuture<'_> {
        Box::pin(async move { self.call_inner(args).await })
    }
}

impl InterpreterUnit {
    async fn call_inner(&self, args: Arguments) -> anyhow::Result<Outputs> {
        let payload = serde_json::to_vec(&args).context("encoding call arguments")?;

        let mut child = Command::new(&self.program)
            .arg("-c")
            .arg(PYTHON_DRIVER)
            .arg(self.script.as_os_str())
            .arg(&self.function)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning '{}' for unit '{}'", self.program, self.function))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .with_context(|| format!("writing arguments for unit '{}'", self.function))?;
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for unit '{}'", self.function))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!(unit = %self.function, "stderr: {}", line);
        }

        if !output.status.success() {
            let tail = stderr.lines().last().unwrap_or("no diagnostic output");
            bail!(
                "interpreter exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                tail
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("decoding return value of unit '{}'", self.function))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::dag::{KnownValues, Scheduler};
    use crate::script::extract_declarations;
    use crate::types::ResultScope;

    #[test]
    fn missing_script_is_an_io_error() {
        let loader = InterpreterLoader::new("python3");
        let err = loader
            .load(Path::new("/definitely/not/here.py"), &DeclarationTable::default())
            .unwrap_err();
        assert!(matches!(err, FeaturedagError::IoError(_)));
    }

    #[tokio::test]
    #[ignore = "requires python3 on PATH"]
    async fn runs_script_functions_through_python() {
        let source = r#"
@myFeature(requires=["t", "m"], provides=["avg"])
def avg(t, m):
    print("noise on stdout is fine")
    return {"avg": sum(m) / len(m)}
"#;
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        file.write_all(source.as_bytes()).unwrap();

        let table = extract_declarations(source).unwrap();
        let registry = InterpreterLoader::new("python3")
            .load(file.path(), &table)
            .unwrap();
        let known = KnownValues::new()
            .with("t", vec![1.0, 2.0, 3.0])
            .with("m", vec![1.0, 23.0, 2.0]);

        let result = Scheduler::new(&table)
            .run(&registry, known, ResultScope::Computed)
            .await
            .unwrap();
        let avg = result.get("avg").and_then(|v| v.as_scalar()).unwrap();
        assert!((avg - 8.6667).abs() < 1e-3);
    }

    #[tokio::test]
    #[ignore = "requires python3 on PATH"]
    async fn non_finite_floats_pass_through_python() {
        let source = r#"
@myFeature(requires=["m"], provides=["first", "worst"])
def spread(m):
    return {"first": m[0], "worst": [float("-inf"), float("nan")]}
"#;
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        file.write_all(source.as_bytes()).unwrap();

        let table = extract_declarations(source).unwrap();
        let registry = InterpreterLoader::new("python3")
            .load(file.path(), &table)
            .unwrap();
        let known = KnownValues::new().with("m", vec![f64::NAN, 1.0]);

        let result = Scheduler::new(&table)
            .run(&registry, known, ResultScope::Computed)
            .await
            .unwrap();
        assert!(result.get("first").and_then(|v| v.as_scalar()).unwrap().is_nan());
        let worst = result.get("worst").and_then(|v| v.as_series()).unwrap();
        assert_eq!(worst[0], f64::NEG_INFINITY);
        assert!(worst[1].is_nan());
    }
}
