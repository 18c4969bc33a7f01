//! The "all-line" axial map algorithm (stage 1): cast axial
//! lines from every convex corner of the polygon soup, flood-extending
//! to new corners they reveal, then deduplicate.

use super::shapegraph::{GraphKind, ShapeGraph};
use super::types::{AxialVertex, AxialVertexKey, PolyConnector, RadialKey, RadialLine};
use crate::comm::Communicator;
use crate::error::{AnalysisError, Result};
use crate::geom::{Line, Region};
use crate::grid::PointMap;
use nalgebra::Vector2;
use std::collections::{HashSet, VecDeque};

/// The all-line region is grown before ray-casting and shrunk back
/// before the final crop: an undiagnosed edge
/// case in the source otherwise loses lines that should have reached
/// the true boundary. Reproduced verbatim rather than re-derived.
pub const ALL_LINE_GROW_FACTOR: f64 = 1.30;
pub const ALL_LINE_SHRINK_FACTOR: f64 = 0.99;

struct RawVertex {
    point: Vector2<f64>,
    incident: Vec<usize>,
}

fn merge_endpoints(walls: &[Line], eps: f64) -> Vec<RawVertex> {
    let mut vertices: Vec<RawVertex> = Vec::new();
    let mut attach = |p: Vector2<f64>, line_idx: usize, vertices: &mut Vec<RawVertex>| {
        for v in vertices.iter_mut() {
            if (v.point - p).norm() < eps {
                v.incident.push(line_idx);
                return;
            }
        }
        vertices.push(RawVertex {
            point: p,
            incident: vec![line_idx],
        });
    };
    for (i, w) in walls.iter().enumerate() {
        attach(w.start(), i, &mut vertices);
        attach(w.end(), i, &mut vertices);
    }
    vertices
}

/// Expands every raw vertex into its convex-corner wedges: sort
/// incident edges by angle around the vertex, and for each pair of
/// angularly-adjacent edges whose wedge opens onto filled, unblocked
/// grid, record an `AxialVertex` (convex if the wedge angle is < π).
fn convex_vertices(
    map: &PointMap,
    walls: &[Line],
    vertices: &[RawVertex],
    probe: f64,
) -> Vec<AxialVertex> {
    let mut out = Vec::new();
    for (vi, v) in vertices.iter().enumerate() {
        if v.incident.len() < 2 {
            continue;
        }
        let mut dirs: Vec<(usize, f64)> = v
            .incident
            .iter()
            .map(|&li| {
                let w = walls[li];
                let other = if (w.start() - v.point).norm() < 1e-6 {
                    w.end()
                } else {
                    w.start()
                };
                let d = other - v.point;
                (li, d.y.atan2(d.x))
            })
            .collect();
        dirs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let n = dirs.len();
        for k in 0..n {
            let (line_a, ang_a) = dirs[k];
            let (line_b, ang_b) = dirs[(k + 1) % n];
            let mut wedge = ang_b - ang_a;
            if wedge <= 0.0 {
                wedge += 2.0 * std::f64::consts::PI;
            }
            let bisector = ang_a + wedge / 2.0;
            let probe_point =
                v.point + Vector2::new(bisector.cos(), bisector.sin()) * probe;
            let base = map.pixel_base();
            let cell = base.pixelate(probe_point);
            let is_open = map.get(cell).map(|p| p.is_open()).unwrap_or(false);
            if !is_open {
                continue;
            }
            let convex = wedge < std::f64::consts::PI;
            out.push(AxialVertex {
                key: AxialVertexKey {
                    vertex: vi,
                    line_a,
                    line_b,
                },
                point: v.point,
                open_point: probe_point,
                edge_a: walls[line_a],
                edge_b: walls[line_b],
                clockwise: wedge < std::f64::consts::PI,
                convex,
            });
        }
    }
    out
}

fn nearest_convex_to(seed: Vector2<f64>, vertices: &[AxialVertex]) -> Result<usize> {
    vertices
        .iter()
        .enumerate()
        .filter(|(_, v)| v.convex)
        .min_by(|(_, a), (_, b)| {
            (a.point - seed)
                .norm()
                .partial_cmp(&(b.point - seed).norm())
                .unwrap()
        })
        .map(|(i, _)| i)
        .ok_or(AnalysisError::NoSeedVertex)
}

/// Whether `a` can see `b` through open, unblocked grid (a coarse
/// sampled check along the segment, since the axial vertices don't
/// necessarily align with cell centres the way `grid::build` does).
fn visible(map: &PointMap, a: Vector2<f64>, b: Vector2<f64>) -> bool {
    let base = map.pixel_base();
    let steps = ((b - a).norm() / (map.spacing * 0.5)).ceil().max(1.0) as i64;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = a + (b - a) * t;
        let cell = base.pixelate(p);
        match map.get(cell) {
            Some(pt) if pt.is_blocked() => return false,
            Some(_) => {}
            None => return false,
        }
    }
    true
}

/// Casts a ray from `origin` through `through` until it first hits a
/// wall line, falling back to the bounding `region`'s edge if no wall
/// is struck (keeps construction total on inputs with gaps in the wall
/// set).
fn cast_to_wall(
    origin: Vector2<f64>,
    through: Vector2<f64>,
    walls: &[Line],
    region: &Region,
) -> Vector2<f64> {
    let dir = (through - origin).normalize();
    let mut best: Option<f64> = None;
    for w in walls {
        let w0 = w.start();
        let e = w.end() - w0;
        let denom = dir.x * e.y - dir.y * e.x;
        if denom.abs() < 1e-12 {
            continue;
        }
        let diff = w0 - origin;
        let t = (diff.x * e.y - diff.y * e.x) / denom;
        let u = (diff.x * dir.y - diff.y * dir.x) / denom;
        if t > 1e-6 && (0.0..=1.0).contains(&u) {
            best = Some(best.map(|b: f64| b.min(t)).unwrap_or(t));
        }
    }
    if let Some(t) = best {
        return origin + dir * t;
    }
    let mut line = Line::new(origin, origin + dir * (region.width() + region.height()).max(1.0));
    line.ray(region);
    line.end()
}

/// Builds the all-line map: casts axial lines from convex corners
/// reachable from `seed`, flood-extending through newly revealed
/// corners, then deduplicates by endpoint tolerance (stage 1).
pub fn make_all_line_map(
    map: &PointMap,
    walls: &[Line],
    seed: Vector2<f64>,
    comm: &dyn Communicator,
) -> Result<ShapeGraph> {
    let grown = map.region.grow(ALL_LINE_GROW_FACTOR);
    let shrink_crop = map.region.grow(ALL_LINE_SHRINK_FACTOR);

    let raw_vertices = merge_endpoints(walls, map.spacing * 1e-3);
    let probe = map.spacing * 0.5;
    let vertices = convex_vertices(map, walls, &raw_vertices, probe);
    if vertices.iter().all(|v| !v.convex) {
        return Err(AnalysisError::NoSeedVertex);
    }

    let root = nearest_convex_to(seed, &vertices)?;

    let mut opened: HashSet<usize> = HashSet::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    opened.insert(root);
    queue.push_back(root);

    let mut candidate_lines: Vec<Line> = Vec::new();
    let mut poly_connections = Vec::new();
    let mut radial_lines = Vec::new();

    let mut iterations = 0usize;
    while let Some(vi) = queue.pop_front() {
        iterations += 1;
        if iterations % 64 == 0 && comm.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let v = &vertices[vi];
        for (ui, u) in vertices.iter().enumerate() {
            if ui == vi || !u.convex {
                continue;
            }
            if !visible(map, v.open_point, u.open_point) {
                continue;
            }
            let p0 = cast_to_wall(u.point, v.point, walls, &grown);
            let p1 = cast_to_wall(v.point, u.point, walls, &grown);
            let line = Line::new(p0, p1);
            if line.length() < 1e-9 {
                continue;
            }
            candidate_lines.push(line);

            let angle = (u.point - v.point).y.atan2((u.point - v.point).x);
            radial_lines.push(RadialLine {
                origin: vi,
                target: ui,
                angle,
            });
            poly_connections.push(PolyConnector {
                line,
                radial: RadialKey {
                    origin: vi,
                    target: ui,
                },
            });

            if opened.insert(ui) {
                queue.push_back(ui);
            }
            // Any other convex vertex the axial line passes through is
            // promoted too, since it now has a documented line through it.
            for (wi, w) in vertices.iter().enumerate() {
                if !w.convex || opened.contains(&wi) {
                    continue;
                }
                if point_on_line(&line, w.point, map.spacing * 1e-2) {
                    opened.insert(wi);
                    queue.push_back(wi);
                }
            }
        }
    }

    let dedup_eps = (grown.width() + grown.height()).max(1.0) * 1e-6;
    let deduped = dedup_lines(candidate_lines, dedup_eps);

    let mut graph = ShapeGraph::new("all-line map", GraphKind::Axial);
    for mut line in deduped {
        line.crop(&shrink_crop);
        graph.insert_line(line);
    }
    graph.poly_connections = poly_connections;
    graph.radial_lines = radial_lines;
    graph.make_connections(map.spacing * 1e-6);
    Ok(graph)
}

fn point_on_line(line: &Line, p: Vector2<f64>, eps: f64) -> bool {
    let a = line.start();
    let b = line.end();
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-18 {
        return (p - a).norm() < eps;
    }
    let t = (p - a).dot(&ab) / len2;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }
    let closest = a + ab * t;
    (p - closest).norm() < eps
}

/// Two lines are the same if both endpoint pairs agree within
/// tolerance, in either order.
fn dedup_lines(lines: Vec<Line>, eps: f64) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::new();
    for l in lines {
        let dup = out.iter().any(|o| same_line(*o, l, eps));
        if !dup {
            out.push(l);
        }
    }
    out
}

fn same_line(a: Line, b: Line, eps: f64) -> bool {
    let same_order =
        (a.start() - b.start()).norm() < eps && (a.end() - b.end()).norm() < eps;
    let swapped = (a.start() - b.end()).norm() < eps && (a.end() - b.start()).norm() < eps;
    same_order || swapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;

    /// A T-intersection: a long horizontal corridor with a perpendicular
    /// stub wall splitting it at the midpoint.
    fn t_intersection_walls() -> Vec<Line> {
        vec![
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(20.0, 0.0)),
            Line::new(Vector2::new(0.0, 4.0), Vector2::new(20.0, 4.0)),
            Line::new(Vector2::new(10.0, 0.0), Vector2::new(10.0, 2.0)),
        ]
    }

    fn corridor_map() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(20.0, 4.0));
        let mut map = PointMap::new(region, 0.5).unwrap();
        map.fill_region(&region);
        crate::grid::build_visibility(&mut map, &t_intersection_walls(), &NullCommunicator).unwrap();
        map
    }

    #[test]
    fn dedup_merges_lines_within_tolerance() {
        let a = Line::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0));
        let b = Line::new(Vector2::new(10.0, 0.0), Vector2::new(0.0, 0.0));
        let c = Line::new(Vector2::new(0.0, 5.0), Vector2::new(10.0, 5.0));
        let out = dedup_lines(vec![a, b, c], 1e-6);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn all_line_map_on_corridor_produces_at_least_one_axial_line() {
        let map = corridor_map();
        let walls = t_intersection_walls();
        let graph = make_all_line_map(&map, &walls, Vector2::new(2.0, 2.0), &NullCommunicator).unwrap();
        assert!(graph.map.len() >= 1);
    }
}
