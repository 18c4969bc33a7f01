//! A single grid cell (`Point`).

use super::node::Node;
use crate::geom::{GridConnections, Line, PixelRef};
use bitflags::bitflags;
use nalgebra::Vector2;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PointState: u16 {
        const EMPTY          = 0x0001;
        const FILLED         = 0x0002;
        const BLOCKED        = 0x0004;
        const CONTEXTFILLED  = 0x0008;
        const EDGE           = 0x0010;
        const MERGED         = 0x0020;
        const AGENT_A        = 0x0040;
        const AGENT_B        = 0x0080;
        const AGENT_C        = 0x0100;
    }
}

/// A grid cell. Owns at most one `Node` (`BLOCKED` cells never do).
#[derive(Clone, Debug)]
pub struct Point {
    pub state: PointState,
    pub grid_connections: GridConnections,
    pub node: Option<Node>,
    pub merge: Option<PixelRef>,
    pub location: Vector2<f64>,
    /// Wall-line fragments crossing this cell, recorded during
    /// rasterization and consulted during graph construction to decide
    /// whether a ray between two cells grazes an occluding corner.
    pub lines: Vec<Line>,
}

impl Point {
    pub fn empty(location: Vector2<f64>) -> Self {
        Self {
            state: PointState::EMPTY,
            grid_connections: GridConnections::empty(),
            node: None,
            merge: None,
            location,
            lines: Vec::new(),
        }
    }

    pub fn is_filled(&self) -> bool {
        self.state.contains(PointState::FILLED)
    }

    pub fn is_blocked(&self) -> bool {
        self.state.contains(PointState::BLOCKED)
    }

    pub fn is_merged(&self) -> bool {
        self.state.contains(PointState::MERGED)
    }

    /// FILLED and reachable for traversal: filled, not blocked.
    pub fn is_open(&self) -> bool {
        self.is_filled() && !self.is_blocked()
    }

    pub fn set_blocked(&mut self) {
        self.state.insert(PointState::BLOCKED);
        self.node = None;
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    pub fn node_mut(&mut self) -> &mut Node {
        self.node.get_or_insert_with(Node::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_blocked_drops_node() {
        let mut p = Point::empty(Vector2::new(0.0, 0.0));
        p.state.insert(PointState::FILLED);
        p.node_mut();
        assert!(p.node.is_some());
        p.set_blocked();
        assert!(p.node.is_none());
        assert!(p.is_blocked());
    }
}
