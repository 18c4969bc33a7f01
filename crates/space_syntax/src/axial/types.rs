//! Auxiliary entities used while building the all-line map and during
//! fewest-line reduction ("Axial auxiliary entities").

use crate::geom::Line;
use nalgebra::Vector2;

/// Identifies a convex corner: the wall-line index it sits on plus the
/// indices of the two incident wall lines that meet there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AxialVertexKey {
    pub vertex: usize,
    pub line_a: usize,
    pub line_b: usize,
}

/// A convex (or reflex) corner of the polygon soup.
#[derive(Clone, Debug)]
pub struct AxialVertex {
    pub key: AxialVertexKey,
    pub point: Vector2<f64>,
    /// A point just off the corner, on the open-space side, used to
    /// seed visibility tests from this vertex.
    pub open_point: Vector2<f64>,
    pub edge_a: Line,
    pub edge_b: Line,
    pub clockwise: bool,
    pub convex: bool,
}

/// A half-line from a convex vertex through open space toward another
/// vertex, with its angle (radians, `atan2` range) recorded so
/// fewest-line reduction can group radials at a common origin by angle.
#[derive(Clone, Copy, Debug)]
pub struct RadialLine {
    pub origin: usize,
    pub target: usize,
    pub angle: f64,
}

/// Two angularly-successive radial lines at a common vertex, bracketing
/// a narrow wedge of open space that some axial line must cover.
#[derive(Clone, Copy, Debug)]
pub struct RadialSegment {
    pub origin: usize,
    pub lo: usize,
    pub hi: usize,
}

/// Key identifying a `(vertex, neighbour)` radial used as a `HashMap`
/// key during radial-division bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RadialKey {
    pub origin: usize,
    pub target: usize,
}

/// Pairs the line segment an axial line was extended from with the
/// `RadialKey` signature that produced it, so the fewest-line reduction
/// can tell which axial lines cut which radial wedges.
#[derive(Clone, Debug)]
pub struct PolyConnector {
    pub line: Line,
    pub radial: RadialKey,
}
