//! Axial/segment map construction: convex-corner enumeration, the
//! "all-line" flood-extend algorithm, and the "fewest-line" minimiser.

pub mod allline;
mod fewestline;
pub mod shapegraph;
mod types;

pub use fewestline::{reduce_fewest_line, FewestLineResult};
pub use shapegraph::{Connector, GraphKind, SegDir, SegmentRef, ShapeGraph};
pub use types::{AxialVertex, AxialVertexKey, PolyConnector, RadialKey, RadialLine, RadialSegment};
