//! Error types for huffpack

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 sequence at byte offset {offset}")]
    Decoding { offset: u64 },

    #[error("malformed header: {0}")]
    Format(String),

    #[error("corrupted payload: {0}")]
    CorruptedStream(String),

    #[error("input of {size} bytes exceeds the configured limit of {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl CodecError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        CodecError::Format(msg.into())
    }

    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        CodecError::CorruptedStream(msg.into())
    }
}
