// src/dag/known.rs

//! Feature values and the per-run known-values mapping.
//!
//! JSON has no literal for non-finite floats, so NaN and the infinities are
//! written as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`. Reading
//! also accepts `null` as NaN.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A named input or computed feature: a scalar or a numeric sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Scalar(f64),
    Series(Vec<f64>),
}

/// One float on the JSON boundary.
#[derive(Debug, Clone, Copy)]
struct JsonFloat(f64);

impl Serialize for JsonFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v == f64::INFINITY {
            serializer.serialize_str("Infinity")
        } else if v == f64::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(v)
        }
    }
}

struct JsonFloatVisitor;

impl<'de> Visitor<'de> for JsonFloatVisitor {
    type Value = JsonFloat;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, \"NaN\", \"Infinity\" or \"-Infinity\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonFloat, E> {
        match v {
            "NaN" => Ok(JsonFloat(f64::NAN)),
            "Infinity" => Ok(JsonFloat(f64::INFINITY)),
            "-Infinity" => Ok(JsonFloat(f64::NEG_INFINITY)),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<JsonFloat, E> {
        Ok(JsonFloat(f64::NAN))
    }

    fn visit_none<E: de::Error>(self) -> Result<JsonFloat, E> {
        Ok(JsonFloat(f64::NAN))
    }
}

impl<'de> Deserialize<'de> for JsonFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(JsonFloatVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Scalar(JsonFloat),
    Series(Vec<JsonFloat>),
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Scalar(v) => JsonFloat(*v).serialize(serializer),
            FeatureValue::Series(vs) => serializer.collect_seq(vs.iter().map(|v| JsonFloat(*v))),
        }
    }
}

impl<'de> Deserialize<'de> for FeatureValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireValue::deserialize(deserializer)? {
            WireValue::Scalar(v) => FeatureValue::Scalar(v.0),
            WireValue::Series(vs) => FeatureValue::Series(vs.into_iter().map(|v| v.0).collect()),
        })
    }
}

impl FeatureValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FeatureValue::Scalar(v) => Some(*v),
            FeatureValue::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            FeatureValue::Series(v) => Some(v),
            FeatureValue::Scalar(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Scalar(v)
    }
}

impl From<Vec<f64>> for FeatureValue {
    fn from(v: Vec<f64>) -> Self {
        FeatureValue::Series(v)
    }
}

impl From<&[f64]> for FeatureValue {
    fn from(v: &[f64]) -> Self {
        FeatureValue::Series(v.to_vec())
    }
}

/// Mapping from name to value used to decide runnability.
///
/// Values are only ever added: [`KnownValues::insert_if_absent`] keeps the
/// first value written for a name, so caller-supplied inputs take priority
/// over unit outputs of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownValues {
    values: BTreeMap<String, FeatureValue>,
}

impl KnownValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; later calls for the same name are ignored.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert_if_absent(name, value);
        self
    }

    /// Insert unless the name is already known. Returns whether it was inserted.
    pub fn insert_if_absent(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FeatureValue>,
    ) -> bool {
        use std::collections::btree_map::Entry;

        match self.values.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.values.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of this mapping restricted to the given names.
    pub fn restricted_to<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Self {
        names
            .into_iter()
            .filter_map(|n| self.values.get(n).map(|v| (n.clone(), v.clone())))
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, FeatureValue> {
        self.values
    }
}

impl FromIterator<(String, FeatureValue)> for KnownValues {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        let mut known = KnownValues::new();
        for (name, value) in iter {
            known.insert_if_absent(name, value);
        }
        known
    }
}

impl From<BTreeMap<String, FeatureValue>> for KnownValues {
    fn from(values: BTreeMap<String, FeatureValue>) -> Self {
        Self { values }
    }
}
