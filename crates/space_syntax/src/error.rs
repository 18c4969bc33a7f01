//! Error kinds shared by every analysis.
//!
//! `IndexOutOfRange` is reserved for genuine programmer errors (a caller
//! passing a stale key); analyses never construct it for user-facing
//! failures, they return one of the other variants instead.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisError {
    /// Degenerate geometric input: zero-length line where one is required,
    /// a NaN coordinate, or similar.
    Geometry(String),
    /// A merge-link's endpoints are not both on filled cells, or it
    /// overlaps an existing link.
    InvalidLink(String),
    /// The all-line map's seed point is not visible from any convex
    /// corner of the polygon soup.
    NoSeedVertex,
    /// A column or cell index was missing where the caller guaranteed
    /// it would exist.
    IndexOutOfRange(String),
    /// Cooperative cancellation via `Communicator::is_cancelled`.
    Cancelled,
    /// Import-boundary parse failure. The core never produces this for
    /// its own analyses; it exists for importer collaborators.
    Parse(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Geometry(msg) => write!(f, "geometry error: {msg}"),
            AnalysisError::InvalidLink(msg) => write!(f, "invalid merge link: {msg}"),
            AnalysisError::NoSeedVertex => {
                write!(f, "seed point is not visible from any convex corner")
            }
            AnalysisError::IndexOutOfRange(msg) => write!(f, "index out of range: {msg}"),
            AnalysisError::Cancelled => write!(f, "analysis cancelled"),
            AnalysisError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

pub type Result<T> = std::result::Result<T, AnalysisError>;
