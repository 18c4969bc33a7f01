//! Spatial network analysis core: visibility graphs, axial/segment maps,
//! agent simulation, and the traversal kernels that compute space-syntax
//! metrics over them.
//!
//! This crate is the engine only. It has no UI, no file-format importers,
//! and no legacy serialization compatibility layer — those are external
//! collaborators (see `comm` and `attribute` for the interfaces a host
//! implements).

pub mod agents;
pub mod analysis;
pub mod attribute;
pub mod axial;
pub mod comm;
pub mod error;
pub mod geom;
pub mod grid;
pub mod pushvalues;
pub mod rng;
pub mod shapes;
pub mod traversal;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use nalgebra::{Matrix2 as Mat2, Vector2 as Vec2};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::agents::{AgentEngine, AgentSet, LookRule};
    pub use crate::analysis::{Analysis, AnalysisResult};
    pub use crate::attribute::AttributeTable;
    pub use crate::axial::{allline::make_all_line_map, shapegraph::ShapeGraph};
    pub use crate::comm::{Communicator, NullCommunicator};
    pub use crate::error::AnalysisError;
    pub use crate::geom::{Line, PixelRef, Region};
    pub use crate::grid::{Point, PointMap};
    pub use crate::shapes::{SalaShape, ShapeMap};
}
