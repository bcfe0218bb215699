// SPDX-License-Identifier: Apache-2.0

//! Error type shared by index construction and the binary codec.

use std::fmt;

#[derive(Debug)]
pub enum TechlibError {
    /// A cell whose functions cannot be encoded into a signature. Non-fatal
    /// during a build: the cell is dropped before any id is assigned.
    MalformedSignature { cell: String, reason: String },
    /// A truncated or inconsistent binary index; `offset` is the byte position
    /// at which the problem was detected.
    CorruptIndex { offset: u64, reason: String },
    /// A broken internal invariant of the canonicalizer or pattern generator.
    InternalInconsistency(String),
    Io(std::io::Error),
    Config(String),
    /// JSON rendering of a summary or of build options failed.
    Serialize(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TechlibError>;

impl TechlibError {
    pub(crate) fn malformed(cell: &str, reason: impl Into<String>) -> Self {
        TechlibError::MalformedSignature {
            cell: cell.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        TechlibError::CorruptIndex {
            offset: offset as u64,
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        TechlibError::InternalInconsistency(msg.into())
    }
}

impl fmt::Display for TechlibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechlibError::MalformedSignature { cell, reason } => {
                write!(f, "malformed signature for cell '{}': {}", cell, reason)
            }
            TechlibError::CorruptIndex { offset, reason } => {
                write!(f, "corrupt index at byte offset {}: {}", offset, reason)
            }
            TechlibError::InternalInconsistency(msg) => {
                write!(f, "internal inconsistency: {}", msg)
            }
            TechlibError::Io(e) => write!(f, "I/O error: {}", e),
            TechlibError::Config(msg) => write!(f, "invalid build options: {}", msg),
            TechlibError::Serialize(e) => write!(f, "JSON serialization failed: {}", e),
        }
    }
}

impl std::error::Error for TechlibError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TechlibError::Io(e) => Some(e),
            TechlibError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TechlibError {
    fn from(e: std::io::Error) -> Self {
        TechlibError::Io(e)
    }
}

impl From<serde_json::Error> for TechlibError {
    fn from(e: serde_json::Error) -> Self {
        TechlibError::Serialize(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let e = TechlibError::malformed("AND2", "variable 7 out of range");
        assert_eq!(
            e.to_string(),
            "malformed signature for cell 'AND2': variable 7 out of range"
        );
        let e = TechlibError::corrupt(42, "unexpected end of stream");
        assert_eq!(
            e.to_string(),
            "corrupt index at byte offset 42: unexpected end of stream"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        let e: TechlibError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into();
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn test_json_error_is_not_internal() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let e: TechlibError = json_err.into();
        assert!(matches!(e, TechlibError::Serialize(_)));
        assert!(e.to_string().starts_with("JSON serialization failed"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
