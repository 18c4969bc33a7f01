//! Visibility-graph construction: mark blocked cells from
//! wall lines, then cast rays between every pair of open cells and bin
//! the ones with a clear line of sight.

use super::node::bin_of;
use super::pointmap::PointMap;
use crate::comm::Communicator;
use crate::error::{AnalysisError, Result};
use crate::geom::{Line, PixelRef};

const WALL_TOUCH_TOLERANCE: f64 = 1e-6;

/// Builds the visibility graph for every open cell in `map` against
/// `walls`. Idempotent: re-running replaces each cell's `Node` rather
/// than accumulating into the old one (callers bump
/// `map.generation` themselves once this returns).
pub fn build_visibility(map: &mut PointMap, walls: &[Line], comm: &dyn Communicator) -> Result<()> {
    let base = map.pixel_base();

    for wall in walls {
        let cells = base.rasterize_touching(wall.start(), wall.end(), WALL_TOUCH_TOLERANCE);
        for c in cells {
            if let Some(pt) = map.get_mut(c) {
                pt.lines.push(*wall);
                if pt.is_filled() {
                    pt.set_blocked();
                }
            }
        }
    }

    let open: Vec<PixelRef> = map.open_cells().collect();
    for (i, &a) in open.iter().enumerate() {
        if i % 256 == 0 && comm.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        map.get_mut(a).unwrap().node_mut();
        for &b in &open {
            if a == b {
                continue;
            }
            match sight(map, a, b) {
                Sight::Clear => {
                    let loc_a = map.get(a).unwrap().location;
                    let loc_b = map.get(b).unwrap().location;
                    let d = (loc_b - loc_a).norm() / map.spacing;
                    let bin = bin_of(loc_b.x - loc_a.x, loc_b.y - loc_a.y);
                    map.get_mut(a).unwrap().node_mut().bins[bin].push(b, d);
                }
                Sight::Occluded(occluder) => {
                    let loc_a = map.get(a).unwrap().location;
                    let loc_o = map.get(occluder).unwrap().location;
                    let d = (loc_o - loc_a).norm() / map.spacing;
                    let bin = bin_of(loc_o.x - loc_a.x, loc_o.y - loc_a.y);
                    map.get_mut(a).unwrap().node_mut().bins[bin].push_occluder(occluder, d);
                }
                Sight::None => {}
            }
        }
    }
    Ok(())
}

enum Sight {
    Clear,
    /// Blocked; carries the first blocking cell along the path, used as
    /// an occlusion-bin entry (step 5).
    Occluded(PixelRef),
    None,
}

/// Whether `b` is visible from `a`: the Bresenham path between their
/// centres must not cross a `BLOCKED` cell, and a diagonal step must not
/// graze a blocked corner (both flanking cells blocked).
fn sight(map: &PointMap, a: PixelRef, b: PixelRef) -> Sight {
    let loc_a = map.get(a).unwrap().location;
    let loc_b = map.get(b).unwrap().location;
    let base = map.pixel_base();
    let path = base.rasterize_strict(loc_a, loc_b);

    for w in path.windows(2) {
        let (p, q) = (w[0], w[1]);
        if p.x != q.x && p.y != q.y {
            let flank1 = PixelRef::new(p.x, q.y);
            let flank2 = PixelRef::new(q.x, p.y);
            let f1_blocked = map.get(flank1).map(|pt| pt.is_blocked()).unwrap_or(true);
            let f2_blocked = map.get(flank2).map(|pt| pt.is_blocked()).unwrap_or(true);
            if f1_blocked && f2_blocked {
                return Sight::Occluded(if f1_blocked { flank1 } else { flank2 });
            }
        }
    }

    for p in &path {
        if *p == a || *p == b {
            continue;
        }
        if let Some(pt) = map.get(*p) {
            if pt.is_blocked() {
                return Sight::Occluded(*p);
            }
        } else {
            return Sight::None;
        }
    }
    Sight::Clear
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;
    use crate::geom::Region;
    use nalgebra::Vector2;

    fn empty_room(n: usize) -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(n as f64, n as f64));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        map
    }

    #[test]
    fn single_room_has_no_blocked_cells() {
        let mut map = empty_room(5);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        assert_eq!(map.filled_cells().filter(|&c| map.get(c).unwrap().is_blocked()).count(), 0);
    }

    #[test]
    fn corner_cells_see_the_opposite_corner_in_a_small_open_room() {
        let mut map = empty_room(5);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        let a = PixelRef::new(0, 0);
        let b = PixelRef::new(4, 4);
        let node = map.get(a).unwrap().node().unwrap();
        assert!(node.bins.iter().any(|bin| bin.contains(b)));
    }

    #[test]
    fn visibility_is_symmetric_across_opposite_bins() {
        let mut map = empty_room(4);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        let a = PixelRef::new(0, 0);
        let b = PixelRef::new(3, 2);
        let node_a = map.get(a).unwrap().node().unwrap();
        let bin_a = node_a
            .bins
            .iter()
            .enumerate()
            .find(|(_, bin)| bin.contains(b))
            .map(|(i, _)| i);
        let node_b = map.get(b).unwrap().node().unwrap();
        let bin_b = node_b
            .bins
            .iter()
            .enumerate()
            .find(|(_, bin)| bin.contains(a))
            .map(|(i, _)| i);
        assert!(bin_a.is_some() && bin_b.is_some());
        assert_eq!((bin_a.unwrap() + super::super::node::BIN_COUNT / 2) % super::super::node::BIN_COUNT, bin_b.unwrap());
    }

    #[test]
    fn a_wall_blocks_line_of_sight_through_it() {
        let mut map = empty_room(5);
        let wall = Line::new(Vector2::new(2.5, 0.0), Vector2::new(2.5, 5.0));
        build_visibility(&mut map, &[wall], &NullCommunicator).unwrap();
        let a = PixelRef::new(0, 2);
        let b = PixelRef::new(4, 2);
        if let Some(node) = map.get(a).unwrap().node() {
            assert!(!node.bins.iter().any(|bin| bin.contains(b)));
        }
    }
}
