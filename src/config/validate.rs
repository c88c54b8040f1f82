// src/config/validate.rs

use std::time::Duration;

use regex::Regex;

use crate::config::model::{ConfigFile, ExecutionConfig, RawConfigFile};
use crate::errors::{FeaturedagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FeaturedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let execution = validate_execution(&raw)?;
        validate_isolation(&raw)?;
        validate_interpreter(&raw)?;
        Ok(ConfigFile::new_unchecked(
            execution,
            raw.isolation,
            raw.interpreter,
        ))
    }
}

fn validate_execution(cfg: &RawConfigFile) -> Result<ExecutionConfig> {
    let timeout = parse_duration(&cfg.execution.timeout).map_err(|e| {
        FeaturedagError::ConfigError(format!("[execution].timeout: {e}"))
    })?;

    if timeout.is_zero() {
        return Err(FeaturedagError::ConfigError(
            "[execution].timeout must be greater than zero".to_string(),
        ));
    }

    Ok(ExecutionConfig {
        mode: cfg.execution.mode,
        when_unavailable: cfg.execution.when_unavailable,
        timeout,
    })
}

fn validate_isolation(cfg: &RawConfigFile) -> Result<()> {
    let iso = &cfg.isolation;

    if iso.docker.trim().is_empty() {
        return Err(FeaturedagError::ConfigError(
            "[isolation].docker must not be empty".to_string(),
        ));
    }
    if iso.image.trim().is_empty() {
        return Err(FeaturedagError::ConfigError(
            "[isolation].image must not be empty".to_string(),
        ));
    }
    if iso.command.is_empty() || iso.command.iter().any(|part| part.is_empty()) {
        return Err(FeaturedagError::ConfigError(
            "[isolation].command must be a non-empty list of non-empty strings".to_string(),
        ));
    }

    if let Some(memory) = &iso.memory {
        let pattern = Regex::new(r"^[0-9]+[bkmgBKMG]?$").map_err(anyhow::Error::from)?;
        if !pattern.is_match(memory) {
            return Err(FeaturedagError::ConfigError(format!(
                "[isolation].memory '{memory}' is not a size like \"512m\" or \"2g\""
            )));
        }
    }

    if let Some(cpus) = &iso.cpus {
        match cpus.parse::<f64>() {
            Ok(n) if n > 0.0 => {}
            _ => {
                return Err(FeaturedagError::ConfigError(format!(
                    "[isolation].cpus '{cpus}' must be a positive number"
                )));
            }
        }
    }

    Ok(())
}

fn validate_interpreter(cfg: &RawConfigFile) -> Result<()> {
    if cfg.interpreter.program.trim().is_empty() {
        return Err(FeaturedagError::ConfigError(
            "[interpreter].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Parse durations like `"1500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
