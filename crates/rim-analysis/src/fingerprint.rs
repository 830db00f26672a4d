//! BLAKE3 content fingerprint of an analysis input.
//!
//! Serializes the input records to JSON in field order, then hashes the bytes
//! with BLAKE3. Identical inputs give identical fingerprints, so hosts can use
//! the value as a cache key for reports.

use rim_core::types::GraphInput;

use crate::error::Result;

/// Hex-encoded BLAKE3 hash of the input's JSON form.
pub fn input_fingerprint(input: &GraphInput) -> Result<String> {
    let json = serde_json::to_vec(input)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use rim_core::types::*;

    fn sample() -> GraphInput {
        GraphInput {
            risks: vec![op("r1"), strat("r2")],
            influences: vec![influence("r1", "r2", InfluenceStrength::Strong)],
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = input_fingerprint(&sample()).unwrap();
        let b = input_fingerprint(&sample()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let mut changed = sample();
        changed.influences[0].strength = InfluenceStrength::Weak;
        assert_ne!(
            input_fingerprint(&sample()).unwrap(),
            input_fingerprint(&changed).unwrap()
        );
    }
}
