// src/timeseries.rs

//! Plain-text time series input.
//!
//! One epoch per line: `t,m[,e]`, separated by commas or whitespace. Blank
//! lines and `#` comments are skipped. The error column is kept only when
//! every epoch has one.

use std::path::Path;

use crate::dag::KnownValues;
use crate::errors::{FeaturedagError, Result};
use crate::fs::FileSystem;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub t: Vec<f64>,
    pub m: Vec<f64>,
    pub e: Option<Vec<f64>>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// `t`, `m` and (if present) `e` as known values.
    pub fn into_known_values(self) -> KnownValues {
        let mut known = KnownValues::new().with("t", self.t).with("m", self.m);
        if let Some(e) = self.e {
            known.insert_if_absent("e", e);
        }
        known
    }
}

pub fn parse_time_series(text: &str) -> Result<TimeSeries> {
    let mut series = TimeSeries::default();
    let mut errors = Vec::new();
    let mut all_have_errors = true;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if !(2..=3).contains(&fields.len()) {
            return Err(FeaturedagError::Parse {
                line: line_no,
                message: format!("expected 2 or 3 columns (t, m[, e]), got {}", fields.len()),
            });
        }

        let values = fields
            .iter()
            .map(|f| {
                f.parse::<f64>().map_err(|_| FeaturedagError::Parse {
                    line: line_no,
                    message: format!("'{f}' is not a number"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        series.t.push(values[0]);
        series.m.push(values[1]);
        match values.get(2) {
            Some(e) => errors.push(*e),
            None => all_have_errors = false,
        }
    }

    if series.is_empty() {
        return Err(FeaturedagError::Parse {
            line: 0,
            message: "time series contains no epochs".to_string(),
        });
    }
    if all_have_errors {
        series.e = Some(errors);
    }
    Ok(series)
}

/// Read and parse a time-series file.
pub fn read_time_series(fs: &dyn FileSystem, path: &Path) -> Result<TimeSeries> {
    let text = fs.read_to_string(path)?;
    parse_time_series(&text)
}
