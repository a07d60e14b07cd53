//! Error kinds raised while loading extraction data, evaluating the basis
//! and running the collective mesh protocol.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed extraction or control-point data.
///
/// Raised while parsing; any of these aborts the whole load.
/// Line numbers are 0-based, matching the layout description of the format.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The extraction file could not be read.
    #[error("could not read {path:?}: {source}")]
    Io {
        /// File that was opened
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The file ended before a declared block was complete.
    #[error("line {line}: unexpected end of file while reading {context}")]
    MissingLine {
        /// Line that should have existed
        line: usize,
        /// What was being read
        context: &'static str,
    },

    /// A line has fewer tokens than required.
    #[error("line {line}: missing token {token} ({context})")]
    MissingToken {
        /// Offending line
        line: usize,
        /// Index of the missing token
        token: usize,
        /// What was being read
        context: &'static str,
    },

    /// A token could not be parsed as an integer.
    #[error("line {line}: {value:?} is not a valid integer")]
    InvalidInteger {
        /// Offending line
        line: usize,
        /// The raw token
        value: String,
    },

    /// A token could not be parsed as a finite real number.
    #[error("line {line}: {value:?} is not a valid real number")]
    InvalidReal {
        /// Offending line
        line: usize,
        /// The raw token
        value: String,
    },

    /// A line has a different number of tokens than its block declares.
    #[error("line {line}: expected {expected} tokens, found {found}")]
    TokenCount {
        /// Offending line
        line: usize,
        /// Declared count
        expected: usize,
        /// Actual count
        found: usize,
    },

    /// An element references a control point which doesn't exist.
    #[error("line {line}: node index {node} is outside of [0, {ncp})")]
    NodeOutOfRange {
        /// Offending line
        line: usize,
        /// The node index
        node: usize,
        /// Number of control points in the patch
        ncp: usize,
    },

    /// An element's extraction operator doesn't reproduce the Bernstein partition of unity.
    #[error("element {element}: column {column} of the extraction operator sums to {sum}")]
    NotPartitionOfUnity {
        /// Offending element
        element: usize,
        /// Bernstein mode whose coefficients don't sum to one
        column: usize,
        /// The actual sum
        sum: f64,
    },

    /// A control point has a zero, negative or non-finite weight.
    #[error("line {line}: control point {node} has non-positive weight {weight}")]
    NonPositiveWeight {
        /// Offending line
        line: usize,
        /// Control point index
        node: usize,
        /// The weight
        weight: f64,
    },
}

/// A lookup outside of the patch's domain.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    /// The parametric coordinate maps to an element which doesn't exist.
    #[error(
        "parametric coordinate {x0} maps to element {element}, but the patch has {count} elements"
    )]
    ElementOutOfRange {
        /// First parametric coordinate
        x0: f64,
        /// Computed element index (may be negative)
        element: i64,
        /// Number of elements
        count: usize,
    },

    /// A parametric coordinate is NaN or infinite.
    #[error("parametric coordinate ({x0}, {x1}) is not finite")]
    NonFiniteCoordinate {
        /// First coordinate
        x0: f64,
        /// Second coordinate
        x1: f64,
    },

    /// A control point index outside of [0, ncp).
    #[error("node {node} is outside of [0, {ncp})")]
    NodeOutOfRange {
        /// The node index
        node: usize,
        /// Number of control points
        ncp: usize,
    },

    /// A homogeneous coordinate direction outside of [0, nsd].
    #[error("direction {direction} is outside of [0, {nsd}]")]
    DirectionOutOfRange {
        /// The direction
        direction: usize,
        /// Spatial dimension
        nsd: usize,
    },
}

/// Failure of the write-once / barrier / read-everywhere mesh protocol.
///
/// Fatal for the whole parallel job, there is no retry.
#[derive(Debug, Error)]
pub enum CollectiveIoError {
    /// The coordinator failed to write the artifact.
    #[error("could not write mesh artifact {name:?}: {source}")]
    Write {
        /// Artifact name
        name: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A participant failed to read the artifact, e.g. because it is missing.
    #[error("could not read mesh artifact {name:?}: {source}")]
    Read {
        /// Artifact name
        name: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The barrier didn't complete.
    #[error("barrier failed on rank {rank}: {reason}")]
    Barrier {
        /// Rank which observed the failure
        rank: usize,
        /// Description of the failure
        reason: String,
    },

    /// The mesh couldn't be converted to or from xml.
    #[error("mesh artifact xml error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The artifact is valid xml but not a consistent mesh.
    #[error("malformed mesh artifact: {0}")]
    MalformedArtifact(String),
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`FormatError`]
    #[error(transparent)]
    Format(#[from] FormatError),

    /// See [`IndexError`]
    #[error(transparent)]
    Index(#[from] IndexError),

    /// See [`CollectiveIoError`]
    #[error(transparent)]
    CollectiveIo(#[from] CollectiveIoError),
}
