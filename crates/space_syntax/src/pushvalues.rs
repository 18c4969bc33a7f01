//! Push-values: copies an attribute column from one map
//! representation to another by geometric correspondence — grid cell to
//! shape, shape to grid cell, shape to shape, axial line to grid cell —
//! reducing many-to-one correspondences with a caller-chosen `Reducer`.

use crate::error::{AnalysisError, Result};
use crate::geom::Region;
use crate::grid::PointMap;
use crate::shapes::{Containment, SalaShape, ShapeMap, ShapeRef};
use nalgebra::Vector2;

/// How a many-valued correspondence collapses to one value: min, max,
/// average, total, or none when the caller already knows the link is
/// one-to-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reducer {
    Min,
    Max,
    Avg,
    Tot,
    None,
}

impl Reducer {
    fn reduce(self, values: &[f64]) -> f64 {
        debug_assert!(!values.is_empty());
        match self {
            Reducer::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            Reducer::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Tot => values.iter().sum(),
            Reducer::Avg => values.iter().sum::<f64>() / values.len() as f64,
            Reducer::None => values[0],
        }
    }
}

/// Corridor half-width used when testing a point against a line-like
/// shape (line or open polyline), since those have no interior to test
/// containment against ("a line's correspondence region is
/// the set of points within tolerance of the line").
const LINE_CORRIDOR_TOLERANCE: f64 = 1e-6;

fn shape_covers_point(shape: &SalaShape, p: Vector2<f64>, tolerance: f64) -> bool {
    if shape.is_polygon() {
        return shape.contains_point(p, tolerance) != Containment::Outside;
    }
    let pts = shape.points();
    pts.windows(2).any(|w| point_near_segment(w[0], w[1], p, tolerance))
}

fn point_near_segment(a: Vector2<f64>, b: Vector2<f64>, p: Vector2<f64>, tolerance: f64) -> bool {
    let d = b - a;
    let len2 = d.norm_squared();
    if len2 < 1e-18 {
        return (p - a).norm() <= tolerance;
    }
    let t = ((p - a).dot(&d) / len2).clamp(0.0, 1.0);
    let closest = a + d * t;
    (p - closest).norm() <= tolerance
}

/// Copies `point_col` from every open grid cell inside or touching each
/// shape in `shapes`, into `dest_col` ("point -> shape").
/// `count_col`, if given, also records how many points contributed.
pub fn push_point_to_shape(
    map: &PointMap,
    point_col: &str,
    shapes: &mut ShapeMap,
    dest_col: &str,
    reducer: Reducer,
    count_col: Option<&str>,
) -> Result<()> {
    let src_idx = map
        .attributes
        .get_column_index(point_col)
        .ok_or_else(|| AnalysisError::InvalidLink(format!("no such point column: {point_col}")))?;

    let dest_idx = shapes.attributes.insert_or_reset_column(dest_col);
    let count_idx = count_col.map(|c| shapes.attributes.insert_or_reset_column(c));

    let refs: Vec<ShapeRef> = shapes.iter().map(|(r, _)| r).collect();
    for r in refs {
        let shape = shapes.get(r).unwrap().clone();
        let bbox = shape.bounding_region();
        let values: Vec<f64> = map
            .open_cells()
            .filter(|&c| {
                let pt = map.get(c).unwrap();
                bbox.contains_touch(pt.location) && shape_covers_point(&shape, pt.location, LINE_CORRIDOR_TOLERANCE)
            })
            .filter_map(|c| map.attributes.get(c, src_idx))
            .filter(|v| !v.is_nan())
            .collect();
        if values.is_empty() {
            continue;
        }
        shapes.attributes.set(r, dest_idx, reducer.reduce(&values));
        if let Some(idx) = count_idx {
            shapes.attributes.set(r, idx, values.len() as f64);
        }
    }
    Ok(())
}

/// Copies `shape_col` from every shape covering a grid cell, into
/// `dest_col` on the cell's row ("shape -> point"). Cells
/// covered by no shape are left untouched (not reset to `NaN`, so a
/// second push with a tighter shape set only refines coverage).
pub fn push_shape_to_point(
    shapes: &ShapeMap,
    shape_col: &str,
    map: &mut PointMap,
    dest_col: &str,
    reducer: Reducer,
) -> Result<()> {
    let src_idx = shapes
        .attributes
        .get_column_index(shape_col)
        .ok_or_else(|| AnalysisError::InvalidLink(format!("no such shape column: {shape_col}")))?;

    let dest_idx = map.attributes.insert_or_reset_column(dest_col);
    let cells: Vec<_> = map.open_cells().collect();
    for c in cells {
        let loc = map.get(c).unwrap().location;
        let candidates = shapes.query_point(loc);
        let values: Vec<f64> = candidates
            .into_iter()
            .filter(|&r| {
                shapes
                    .get(r)
                    .map(|s| shape_covers_point(s, loc, LINE_CORRIDOR_TOLERANCE))
                    .unwrap_or(false)
            })
            .filter_map(|r| shapes.attributes.get(r, src_idx))
            .filter(|v| !v.is_nan())
            .collect();
        if values.is_empty() {
            continue;
        }
        map.attributes.set(c, dest_idx, reducer.reduce(&values));
    }
    Ok(())
}

/// Copies `src_col` between two shape maps for shapes whose bounding
/// boxes overlap and whose centroids fall on/inside one another. Used
/// for axial <-> polygon transfers as well as arbitrary
/// shape-layer-to-shape-layer pushes.
pub fn push_shape_to_shape(
    src: &ShapeMap,
    src_col: &str,
    dst: &mut ShapeMap,
    dst_col: &str,
    reducer: Reducer,
) -> Result<()> {
    let src_idx = src
        .attributes
        .get_column_index(src_col)
        .ok_or_else(|| AnalysisError::InvalidLink(format!("no such shape column: {src_col}")))?;
    let dst_idx = dst.attributes.insert_or_reset_column(dst_col);

    let dst_refs: Vec<ShapeRef> = dst.iter().map(|(r, _)| r).collect();
    for r in dst_refs {
        let target = dst.get(r).unwrap().clone();
        let bbox = target.bounding_region();
        let candidates = src.query_region(&bbox);
        let values: Vec<f64> = candidates
            .into_iter()
            .filter(|&sr| {
                src.get(sr)
                    .map(|s| shapes_correspond(s, &target))
                    .unwrap_or(false)
            })
            .filter_map(|sr| src.attributes.get(sr, src_idx))
            .filter(|v| !v.is_nan())
            .collect();
        if values.is_empty() {
            continue;
        }
        dst.attributes.set(r, dst_idx, reducer.reduce(&values));
    }
    Ok(())
}

fn shapes_correspond(a: &SalaShape, b: &SalaShape) -> bool {
    shape_covers_point(a, b.centroid(), LINE_CORRIDOR_TOLERANCE) || shape_covers_point(b, a.centroid(), LINE_CORRIDOR_TOLERANCE)
}

/// Convenience for the common "restrict push-shape-to-point to a single
/// layer" case (layer-visibility filter): builds the region to
/// pre-filter candidates by before calling `push_shape_to_point`.
pub fn visible_region(shapes: &ShapeMap, layer: &str) -> Option<Region> {
    if !shapes.layer_visible(layer) {
        return None;
    }
    shapes.region()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;
    use crate::grid::build_visibility;
    use nalgebra::Vector2;

    fn room_with_depth_column() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        let col = map.attributes.insert_or_reset_column("Depth");
        for c in map.open_cells().collect::<Vec<_>>() {
            map.attributes.set(c, col, 3.0);
        }
        map
    }

    #[test]
    fn point_to_shape_averages_covered_cells() {
        let map = room_with_depth_column();
        let mut shapes = ShapeMap::new("rooms");
        shapes.insert(SalaShape::polygon(vec![
            Vector2::new(1.0, 1.0),
            Vector2::new(4.0, 1.0),
            Vector2::new(4.0, 4.0),
            Vector2::new(1.0, 4.0),
        ]));
        push_point_to_shape(&map, "Depth", &mut shapes, "Mean Depth", Reducer::Avg, Some("Count")).unwrap();
        let mean_col = shapes.attributes.get_column_index("Mean Depth").unwrap();
        let (r, _) = shapes.iter().next().unwrap();
        assert!((shapes.attributes.get(r, mean_col).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn shape_to_point_writes_only_covered_cells() {
        let mut map = room_with_depth_column();
        let mut shapes = ShapeMap::new("rooms");
        let r = shapes.insert(SalaShape::polygon(vec![
            Vector2::new(1.0, 1.0),
            Vector2::new(4.0, 1.0),
            Vector2::new(4.0, 4.0),
            Vector2::new(1.0, 4.0),
        ]));
        let col = shapes.attributes.insert_or_reset_column("Room Id");
        shapes.attributes.set(r, col, 42.0);

        push_shape_to_point(&shapes, "Room Id", &mut map, "Room Id", Reducer::None).unwrap();
        let dest_idx = map.attributes.get_column_index("Room Id").unwrap();
        let inside = map.attributes.get(crate::geom::PixelRef::new(2, 2), dest_idx);
        let outside = map.attributes.get(crate::geom::PixelRef::new(8, 8), dest_idx);
        assert_eq!(inside, Some(42.0));
        assert!(outside.map(|v| v.is_nan()).unwrap_or(true));
    }
}
