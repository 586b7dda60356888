//! Error types for image tree and stream operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when building an image tree or moving bytes through
//! streams, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`:
//!
//! ```rust
//! use sqimage::fstree::{Metadata, Tree};
//! use sqimage::{Error, Result};
//!
//! fn build() -> Result<Tree> {
//!     let mut tree = Tree::new();
//!     tree.add_file("bin/sh", Metadata::default(), None)?;
//!     tree.add_hard_link("bin/bash", "bin/sh")?;
//!     tree.resolve_hard_links()?;
//!     Ok(tree)
//! }
//!
//! match build() {
//!     Ok(tree) => assert_eq!(tree.len(), 4),
//!     Err(e @ Error::HardLink { .. }) => eprintln!("{}", e),
//!     Err(e) => eprintln!("unexpected: {}", e),
//! }
//! ```
//!
//! Stream errors always carry the name of the stream (a path, `stdin`, or the
//! label given to an in-memory stream), so a message can be shown to the user
//! as-is.

use std::io;

/// The main error type for image tree and stream operations.
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Paths | [`InvalidPath`][Self::InvalidPath], [`InvalidArgument`][Self::InvalidArgument] | Malformed input from the tree builder |
/// | Lookup | [`AlreadyExists`][Self::AlreadyExists], [`NotFound`][Self::NotFound] | Conflicting or missing entries |
/// | Hard links | [`CycleDetected`][Self::CycleDetected], [`NotPermitted`][Self::NotPermitted], [`TooManyLinks`][Self::TooManyLinks], [`HardLink`][Self::HardLink] | Resolution pass |
/// | Streams | [`Io`][Self::Io], [`Codec`][Self::Codec], [`StreamFinished`][Self::StreamFinished] | Backing medium or compressed data |
/// | Codecs | [`UnsupportedMethod`][Self::UnsupportedMethod] | Codec not compiled in |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A path supplied to a tree insertion is malformed.
    ///
    /// Returned when the path contains `.` or `..` segments or NUL bytes,
    /// names the root directory itself, or passes through an existing entry
    /// that is not a directory.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The path as given by the caller.
        path: String,
        /// A description of what is wrong with it.
        reason: String,
    },

    /// An argument failed validation, e.g. a hard link target that cannot be
    /// canonicalized or a malformed defaults string.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An entry with the same name already exists.
    #[error("entry already exists: {path}")]
    AlreadyExists {
        /// Path of the existing entry.
        path: String,
    },

    /// No entry exists at the given path.
    #[error("no such file or directory: {path}")]
    NotFound {
        /// The path that was looked up.
        path: String,
    },

    /// A hard link chain leads back to an entry it already passed through.
    #[error("too many links")]
    CycleDetected,

    /// A hard link points at a directory.
    #[error("hard link to a directory")]
    NotPermitted,

    /// The hard link target's link count is already at its maximum.
    #[error("too many links to target (maximum is {})", u32::MAX)]
    TooManyLinks,

    /// Resolving a hard link failed.
    ///
    /// The resolution pass wraps the underlying cause with the full path of
    /// the link entry and its stored target.
    #[error("resolving hard link '{path}' -> '{target}': {source}")]
    HardLink {
        /// Full path of the hard link entry.
        path: String,
        /// Absolute path of the link's target.
        target: String,
        /// The underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// An I/O error from the backing medium of a stream.
    ///
    /// Interrupted system calls are retried internally and never surface here.
    #[error("{name}: {source}")]
    Io {
        /// The stream name (path, `stdin`, `stdout`, or a memory stream label).
        name: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Compressed data is malformed or the encoder failed internally.
    #[error("{method}: {reason}")]
    Codec {
        /// Human-readable codec name.
        method: &'static str,
        /// A description of the failure.
        reason: String,
    },

    /// The requested compression method is not available in this build.
    #[error("unsupported compression method: {name}")]
    UnsupportedMethod {
        /// Name of the method.
        name: String,
    },

    /// A stream was used again after it reported a fatal error.
    #[error("{name}: stream is unusable after a previous error")]
    StreamFinished {
        /// The stream name.
        name: String,
    },
}

impl Error {
    /// Creates an [`Error::Io`] tagged with a stream name.
    pub fn io(name: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }

    /// Creates an [`Error::Codec`].
    pub(crate) fn codec(method: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Codec {
            method,
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error (or the cause it wraps) is [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::HardLink { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if this error came out of hard link resolution.
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected | Self::NotPermitted | Self::TooManyLinks | Self::HardLink { .. }
        )
    }

    /// Returns the underlying cause of a [`Error::HardLink`], or `self`.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::HardLink { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A specialized Result type for image tree and stream operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_name() {
        let err = Error::io("/tmp/input.bin", io::Error::other("disk on fire"));
        assert_eq!(err.to_string(), "/tmp/input.bin: disk on fire");
    }

    #[test]
    fn test_hard_link_error_message() {
        let err = Error::HardLink {
            path: "/x".into(),
            target: "/x".into(),
            source: Box::new(Error::CycleDetected),
        };
        assert_eq!(err.to_string(), "resolving hard link '/x' -> '/x': too many links");
        assert!(matches!(err.root_cause(), Error::CycleDetected));
        assert!(err.is_link_error());
    }

    #[test]
    fn test_is_not_found_looks_through_hard_link() {
        let err = Error::HardLink {
            path: "/b".into(),
            target: "/missing".into(),
            source: Box::new(Error::NotFound {
                path: "missing".into(),
            }),
        };
        assert!(err.is_not_found());
        assert!(!Error::NotPermitted.is_not_found());
    }

    #[test]
    fn test_not_permitted_message() {
        assert_eq!(Error::NotPermitted.to_string(), "hard link to a directory");
    }
}
