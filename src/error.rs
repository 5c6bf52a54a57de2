//! Error types for votable

use std::fmt;
use thiserror::Error;

/// Position in XML source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing mandatory input or a disallowed combination of inputs
    InvalidArgument,
    /// Datatype or attribute outside the closed symbol set
    UnknownSymbol,
    /// A fallible reservation could not be satisfied
    ResourceExhausted,
    /// The tree refused to create or attach a node or attribute
    ConstructionFailed,
    /// Numeric-to-text conversion failed
    FormattingFailed,
    /// Input XML is not well formed
    Malformed { pos: Pos },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::UnknownSymbol => write!(f, "unknown symbol"),
            Self::ResourceExhausted => write!(f, "resource exhausted"),
            Self::ConstructionFailed => write!(f, "construction failed"),
            Self::FormattingFailed => write!(f, "formatting failed"),
            Self::Malformed { pos } => write!(f, "malformed xml at {pos}"),
        }
    }
}

/// Main error type for votable
///
/// Every error names the operation that raised it, so callers can tell a
/// failed `build_table_node` from a failed `assemble_document` without any
/// shared logging state.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    operation: &'static str,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            message: message.into(),
        }
    }

    pub fn invalid_argument(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, operation, message)
    }

    pub fn unknown_symbol(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownSymbol, operation, message)
    }

    pub fn construction(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConstructionFailed, operation, message)
    }

    pub fn exhausted(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, operation, message)
    }

    /// Create a reader error at a specific position
    pub fn malformed_at(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed { pos }, "parse", message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Re-tag an error raised by a lower layer with the calling operation
    pub(crate) fn within(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.operation, self.kind, self.message)
    }
}

/// Result type alias for votable
pub type Result<T> = std::result::Result<T, Error>;
