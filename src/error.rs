//! Error types for fldata

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The binary container a decoder was working on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    /// Compressed binary INI ("BINI").
    Bini,
    /// PE resource DLL.
    Resource,
    /// Universal Tree Format.
    Utf,
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryFormat::Bini => "BINI",
            BinaryFormat::Resource => "resource DLL",
            BinaryFormat::Utf => "UTF",
        })
    }
}

/// Why a binary decoder rejected its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BinaryReason {
    #[error("invalid magic number")]
    InvalidMagic,

    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),

    #[error("truncated data")]
    Truncated,

    #[error("offset out of bounds")]
    OffsetOutOfBounds,

    #[error("unknown value type {0:#04x}")]
    UnknownValueType(u8),

    #[error("not a PE image")]
    NotAnImage,

    #[error("no .rsrc section")]
    NoResourceSection,

    #[error("malformed resource directory")]
    MalformedDirectory,

    #[error("cycle in node table")]
    CycleInNodeTable,
}

/// Main error type for fldata operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("install path missing or not a Freelancer directory: {0}")]
    InstallPathMissing(PathBuf),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("malformed {format} data at offset {offset:#x}: {reason}")]
    MalformedBinary {
        format: BinaryFormat,
        offset: u64,
        reason: BinaryReason,
    },

    #[error("{file}:{line}: {reason}")]
    MalformedText {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("dangling reference from {from} to {to}")]
    DanglingReference { from: String, to: String },

    #[error("duplicate {kind} nickname: {nickname}")]
    CollisionOnNickname {
        kind: &'static str,
        nickname: String,
    },
}

impl Error {
    /// Shorthand used by the binary decoders.
    pub(crate) fn malformed(format: BinaryFormat, offset: u64, reason: BinaryReason) -> Self {
        Error::MalformedBinary {
            format,
            offset,
            reason,
        }
    }
}

/// Result type alias for fldata operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_binary_display() {
        let err = Error::malformed(BinaryFormat::Bini, 0x20, BinaryReason::OffsetOutOfBounds);
        assert_eq!(
            err.to_string(),
            "malformed BINI data at offset 0x20: offset out of bounds"
        );
    }

    #[test]
    fn test_collision_display() {
        let err = Error::CollisionOnNickname {
            kind: "system",
            nickname: "li01".into(),
        };
        assert_eq!(err.to_string(), "duplicate system nickname: li01");
    }
}
