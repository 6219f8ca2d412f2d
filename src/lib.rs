//! callview - lightweight viewer core for Callgrind profiles
//!
//! Parses the textual call-graph dumps written by Valgrind's Callgrind
//! tool into an immutable, queryable model: the hottest functions, the
//! calls they make, and the callers that reach them.

pub mod cli;
pub mod error;
pub mod output;
pub mod profile;

pub use error::{ParseError, Result};
pub use profile::{parse, parse_path, parse_str, Model};
