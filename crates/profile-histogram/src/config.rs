//! Schema-level histogram settings shared across a profile

use profile_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of bins per histogram
pub const DEFAULT_BIN_COUNT: usize = 20;

/// Settings every histogram in one profile file shares
///
/// The bin count is not stored per record, so writers and readers of a file
/// must agree on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Number of equal-width bins for non-point histograms
    pub bin_count: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
        }
    }
}

impl HistogramConfig {
    /// Settings with an explicit bin count
    pub fn new(bin_count: usize) -> Self {
        Self { bin_count }
    }

    /// Reject a zero bin count
    pub fn validate(&self) -> Result<()> {
        if self.bin_count == 0 {
            return Err(Error::invalid_bin_count(self.bin_count));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize settings to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
