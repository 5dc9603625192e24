//! Bundler configuration.

use std::path::PathBuf;

/// Configuration for the Bundler.
#[derive(Debug, Clone)]
pub struct BundlerConfig {
    /// Directory for temporary files created by streaming encode and decode.
    pub temp_dir: PathBuf,
    /// Whether to verify every item after decoding a bundle.
    pub verify_on_decode: bool,
    /// Largest declared item count accepted when decoding.
    pub max_item_count: u64,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            verify_on_decode: true,
            max_item_count: u32::MAX as u64,
        }
    }
}

impl BundlerConfig {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_verify_on_decode(mut self, verify: bool) -> Self {
        self.verify_on_decode = verify;
        self
    }

    pub fn with_max_item_count(mut self, max: u64) -> Self {
        self.max_item_count = max;
        self
    }
}
