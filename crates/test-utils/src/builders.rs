#![allow(dead_code)]

use std::io::Write;

use featuredag::config::{ConfigFile, RawConfigFile};
use featuredag::dag::{FeatureValue, KnownValues};
use featuredag::exec::{Arguments, Outputs, UnitRegistry};
use featuredag::types::{ExecutionMode, WhenUnavailable};
use tempfile::NamedTempFile;

/// Builder for annotated feature script text.
///
/// Units get a trivial body; tests pair the script with a registry that
/// supplies the real callables.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    source: String,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(mut self, name: &str, requires: &[&str], provides: &[&str]) -> Self {
        let quoted = |names: &[&str]| {
            names
                .iter()
                .map(|n| format!("\"{n}\""))
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.source.push_str(&format!(
            "@myFeature(requires=[{}], provides=[{}])\ndef {}({}):\n    return {{}}\n\n",
            quoted(requires),
            quoted(provides),
            name,
            requires.join(", "),
        ));
        self
    }

    /// Append raw text (helpers, imports, undecorated functions).
    pub fn raw(mut self, text: &str) -> Self {
        self.source.push_str(text);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Write the script to a temporary `.py` file.
    pub fn write_temp(&self) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".py")
            .tempfile()
            .expect("create temp script");
        file.write_all(self.source.as_bytes())
            .expect("write temp script");
        file
    }
}

/// Builder for `UnitRegistry` with common unit shapes.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: UnitRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit returning fixed scalar outputs.
    pub fn constant(mut self, name: &str, outputs: &[(&str, f64)]) -> Self {
        let outputs: Outputs = outputs
            .iter()
            .map(|(k, v)| (k.to_string(), FeatureValue::Scalar(*v)))
            .collect();
        self.registry
            .register_fn(name, move |_: &Arguments| Ok(outputs.clone()));
        self
    }

    /// Unit computing the mean of series `input` into `output`.
    pub fn mean(mut self, name: &str, input: &str, output: &str) -> Self {
        let input = input.to_string();
        let output = output.to_string();
        self.registry.register_fn(name, move |args: &Arguments| {
            let values = args
                .get(&input)
                .and_then(FeatureValue::as_series)
                .ok_or_else(|| anyhow::anyhow!("'{input}' must be a series"))?;
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Ok([(output.clone(), FeatureValue::Scalar(mean))]
                .into_iter()
                .collect())
        });
        self
    }

    /// Unit that always fails with `message`.
    pub fn failing(mut self, name: &str, message: &str) -> Self {
        let message = message.to_string();
        self.registry
            .register_fn(name, move |_: &Arguments| Err(anyhow::anyhow!(message.clone())));
        self
    }

    pub fn build(self) -> UnitRegistry {
        self.registry
    }
}

/// The sample inputs used throughout the tests.
pub fn sample_known() -> KnownValues {
    KnownValues::new()
        .with("t", vec![1.0, 2.0, 3.0])
        .with("m", vec![1.0, 23.0, 2.0])
        .with("e", vec![0.2, 0.3, 0.2])
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.config.execution.mode = mode;
        self
    }

    pub fn when_unavailable(mut self, behaviour: WhenUnavailable) -> Self {
        self.config.execution.when_unavailable = behaviour;
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.config.execution.timeout = timeout.to_string();
        self
    }

    pub fn staging_root(mut self, root: &std::path::Path) -> Self {
        self.config.isolation.staging_root = Some(root.to_path_buf());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
