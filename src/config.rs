//! Configuration for huffpack

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Capacity of the buffered readers and writers wrapped around files.
    pub io_buffer_size: usize,
    /// Inputs longer than this many bytes are rejected before compression.
    pub max_input_size: u64,
    pub compressed_suffix: String,
    pub decompressed_suffix: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            io_buffer_size: 64 * 1024,
            max_input_size: 1024 * 1024 * 1024, // 1 GiB
            compressed_suffix: "_compressed".to_string(),
            decompressed_suffix: "_uncompressed".to_string(),
        }
    }
}

impl CodecConfig {
    /// Parse a JSON configuration; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CodecError> {
        let config: CodecConfig =
            serde_json::from_str(json).map_err(|e| CodecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CodecError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), CodecError> {
        if self.io_buffer_size == 0 {
            return Err(CodecError::Config("io_buffer_size must be positive".into()));
        }
        if self.compressed_suffix.is_empty() || self.decompressed_suffix.is_empty() {
            return Err(CodecError::Config("output suffixes must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = CodecConfig::from_json_str(r#"{ "max_input_size": 10 }"#).unwrap();
        assert_eq!(config.max_input_size, 10);
        assert_eq!(config.io_buffer_size, CodecConfig::default().io_buffer_size);
        assert_eq!(config.compressed_suffix, "_compressed");
    }

    #[test]
    fn test_invalid_json() {
        let result = CodecConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(CodecError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_suffix() {
        let result = CodecConfig::from_json_str(r#"{ "compressed_suffix": "" }"#);
        assert!(matches!(result, Err(CodecError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let result = CodecConfig::from_json_str(r#"{ "io_buffer_size": 0 }"#);
        assert!(matches!(result, Err(CodecError::Config(_))));
    }
}
