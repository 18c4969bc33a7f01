//! The visibility graph: a dense grid of `Point`s, each owning at most
//! one `Node` of 32 directional bins (`PointMap`/`Point`/`Node`
//! construction).

mod build;
mod node;
mod point;
mod pointmap;

pub use build::build_visibility;
pub use node::{Bin, Node, PixelRun, BIN_COUNT};
pub use point::{Point, PointState};
pub use pointmap::PointMap;
