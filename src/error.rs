//! Error types for callview

use thiserror::Error;

/// Result type alias using callview's ParseError
pub type Result<T> = std::result::Result<T, ParseError>;

/// Fatal parse conditions. Every variant carries the 1-based number of the
/// line it was raised at; a parse aborts on the first error.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: malformed header: {header}")]
    MalformedHeader { line: u64, header: String },

    #[error("line {line}: unknown position axis: {axis}=")]
    UnknownPositionAxis { line: u64, axis: String },

    #[error("line {line}: cannot resolve compression for {axis}=")]
    MissingCompressionEntry {
        line: u64,
        axis: String,
        index: Option<u64>,
    },

    #[error("line {line}: compression index ({index}) is already bound")]
    DuplicateCompressionEntry { line: u64, index: u64 },

    #[error("line {line}: numeric overflow in \"{token}\"")]
    NumericOverflow { line: u64, token: String },

    #[error("line {line}: expected a cost line")]
    MissingCostLine { line: u64 },

    #[error("line {line}: expected calls= after a call position block")]
    MissingCallLine { line: u64 },

    #[error("line {line}: unexpected line: {content}")]
    UnexpectedLine { line: u64, content: String },

    #[error("line {line}: read failed: {source}")]
    Io {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// 1-based line number this error was raised at (0 for I/O failures
    /// that happen before the first line is read).
    pub fn line(&self) -> u64 {
        match self {
            ParseError::MalformedHeader { line, .. }
            | ParseError::UnknownPositionAxis { line, .. }
            | ParseError::MissingCompressionEntry { line, .. }
            | ParseError::DuplicateCompressionEntry { line, .. }
            | ParseError::NumericOverflow { line, .. }
            | ParseError::MissingCostLine { line }
            | ParseError::MissingCallLine { line }
            | ParseError::UnexpectedLine { line, .. }
            | ParseError::Io { line, .. } => *line,
        }
    }
}
