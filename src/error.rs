//! Error types for contact search
//!
//! This module defines all error types that can occur during tree construction,
//! collision search, point-to-curve projection and contact pair evaluation.

use thiserror::Error;

/// Error types for contact search operations
///
/// Configuration errors and numerical degeneracies are fatal for the current
/// operation. Non-convergence of the local Newton iteration is *not* an error;
/// it is reported through the `converged` flag of the projection result.
#[derive(Error, Debug)]
pub enum ContactSearchError {
    /// Mesh topology is invalid or corrupted
    ///
    /// This error occurs when the discretization violates expected constraints,
    /// such as out-of-bounds node ids or elements with the wrong node count.
    #[error("Invalid mesh topology: {0}")]
    InvalidMeshTopology(String),

    /// An element gid that the discretization does not know
    #[error("Element not found: {0}")]
    ElementNotFound(usize),

    /// Element type doesn't match expected type
    ///
    /// Contact pairs are created for a fixed element formulation. This error
    /// occurs when the runtime element does not match it.
    #[error("Invalid element type: expected {expected}, found {found}")]
    InvalidElementType { expected: String, found: String },

    /// Reading a mesh or config file, or writing results, failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Beam or contact point VTU export failed
    #[error("VTK error: {0}")]
    VtkError(String),

    /// Invalid search, projection or contact parameters
    ///
    /// Also raised for unparsable config files and overlapping slave and
    /// master element sets.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Geometric computation error
    ///
    /// Errors during geometric computations such as angles between zero vectors.
    #[error("Geometry error: {0}")]
    GeometryError(String),

    /// The projected point lies on the curve
    ///
    /// The orthogonality condition is ill-posed if the distance between slave
    /// point and curve point vanishes.
    #[error(
        "Point-to-curve projection fails because point lies on the curve \
         (iteration {iteration}, xi_master = {xi_master}, distance = {distance:e})"
    )]
    IdenticalPoints {
        iteration: usize,
        xi_master: f64,
        distance: f64,
    },

    /// The linearization of the orthogonality condition vanishes
    ///
    /// The minimal distance problem has no locally unique solution, e.g. when
    /// the slave point coincides with the center of a circular arc.
    #[error(
        "Linearization of point to curve projection is zero, i.e. the minimal distance \
         problem is non-unique (iteration {iteration}, xi_master = {xi_master}, \
         linearization = {linearization:e})"
    )]
    NonUniqueProjection {
        iteration: usize,
        xi_master: f64,
        linearization: f64,
    },

    /// More geometric segments than the pair type supports
    #[error(
        "Found {found} segments for the pair of elements {element1} and {element2}, \
         but this pair type supports at most one"
    )]
    TooManySegments {
        element1: usize,
        element2: usize,
        found: usize,
    },

    /// The tree was updated after the element topology changed
    ///
    /// Incremental updates are only valid for pure position changes. The tree
    /// has to be rebuilt with `init` after elements were added or removed.
    #[error(
        "Search tree was built for topology revision {expected}, but the discretization \
         is at revision {found}; rebuild the tree"
    )]
    TreeTopologyChanged { expected: u64, found: u64 },

    /// Error exchanging data between ranks
    #[error("Communication error: {0}")]
    CommunicationError(String),
}

/// Result alias used by every fallible operation in the crate
///
/// # Example
/// ```
/// use contact_search::Result;
///
/// fn my_function() -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, ContactSearchError>;
