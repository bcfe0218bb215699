// SPDX-License-Identifier: Apache-2.0

//! Options controlling index construction.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TechlibError};

/// Truth tables of 2^20 bits per table are the largest the encoder accepts.
pub const MAX_SIGNATURE_INPUTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Whether to decompose class functions into pattern graphs.
    pub generate_patterns: bool,
    /// Cells whose signature would have more inputs are rejected.
    pub max_inputs: usize,
    /// Classes with a wider canonical support get no patterns.
    pub max_pattern_inputs: usize,
    /// Cap on the automorphisms recorded per class.
    pub max_automorphisms: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            generate_patterns: true,
            max_inputs: 16,
            max_pattern_inputs: 8,
            max_automorphisms: 4096,
        }
    }
}

impl BuildOptions {
    /// Parses options from JSON; absent fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let options: BuildOptions = serde_json::from_str(s)
            .map_err(|e| TechlibError::Config(format!("failed to parse options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_inputs == 0 || self.max_inputs > MAX_SIGNATURE_INPUTS {
            return Err(TechlibError::Config(format!(
                "max_inputs must be in 1..={}, got {}",
                MAX_SIGNATURE_INPUTS, self.max_inputs
            )));
        }
        if self.max_automorphisms == 0 {
            return Err(TechlibError::Config(
                "max_automorphisms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_object() {
        let o = BuildOptions::from_json_str("{}").unwrap();
        assert_eq!(o, BuildOptions::default());
    }

    #[test]
    fn test_partial_override() {
        let o = BuildOptions::from_json_str(r#"{"generate_patterns": false, "max_inputs": 10}"#)
            .unwrap();
        assert!(!o.generate_patterns);
        assert_eq!(o.max_inputs, 10);
        assert_eq!(o.max_pattern_inputs, 8);
    }

    #[test]
    fn test_json_roundtrip() {
        let o = BuildOptions {
            max_automorphisms: 12,
            ..BuildOptions::default()
        };
        let back = BuildOptions::from_json_str(&o.to_json().unwrap()).unwrap();
        assert_eq!(back, o);
    }

    #[test]
    fn test_rejects_bad_values() {
        for text in [
            r#"{"max_inputs": 0}"#,
            r#"{"max_inputs": 21}"#,
            r#"{"max_automorphisms": 0}"#,
            r#"{"unknown": 1}"#,
            "not json",
        ] {
            match BuildOptions::from_json_str(text) {
                Err(TechlibError::Config(_)) => {}
                other => panic!("{}: expected config error, got {:?}", text, other),
            }
        }
    }
}
