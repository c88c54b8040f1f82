// src/harness/sample.rs

//! Canonical light curve used to admit new scripts.

use crate::dag::KnownValues;

pub const SAMPLE_T: [f64; 12] = [
    2451180.0125, 2451181.0342, 2451183.9981, 2451185.0218, 2451188.0073, 2451190.9914,
    2451193.0161, 2451195.9852, 2451198.0037, 2451201.0199, 2451203.9962, 2451207.0105,
];

pub const SAMPLE_M: [f64; 12] = [
    17.362, 17.118, 16.874, 16.951, 17.240, 17.503, 17.611, 17.402, 17.096, 16.902, 17.018,
    17.287,
];

pub const SAMPLE_E: [f64; 12] = [
    0.041, 0.038, 0.036, 0.037, 0.040, 0.044, 0.046, 0.042, 0.038, 0.036, 0.037, 0.041,
];

/// Sky position of the sample source, passed along as meta-features.
pub const SAMPLE_META: [(&str, f64); 2] = [("ra", 83.8221), ("dec", -5.3911)];

/// Known values every candidate script is verified against: `t`, `m`, `e`
/// plus the sample's meta-features.
pub fn canonical_known_values() -> KnownValues {
    let mut known = KnownValues::new()
        .with("t", SAMPLE_T.to_vec())
        .with("m", SAMPLE_M.to_vec())
        .with("e", SAMPLE_E.to_vec());
    for (name, value) in SAMPLE_META {
        known.insert_if_absent(name, value);
    }
    known
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_values_are_consistent() {
        let known = canonical_known_values();
        let len = |name: &str| known.get(name).and_then(|v| v.as_series()).map(<[f64]>::len);
        assert_eq!(len("t"), Some(12));
        assert_eq!(len("m"), Some(12));
        assert_eq!(len("e"), Some(12));
        assert!(SAMPLE_T.windows(2).all(|w| w[0] < w[1]));
        assert!(known.contains("ra") && known.contains("dec"));
    }
}
