//! Fewest-line reduction (stage 2): two independent
//! reductions from the same all-line map, each removing redundant
//! axial lines while preserving radial-segment coverage and
//! connectivity.

use super::shapegraph::{GraphKind, ShapeGraph};
use super::types::{RadialKey, RadialSegment};
use crate::geom::Line;
use crate::shapes::{ShapeKind, ShapeRef};
use nalgebra::Vector2;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct FewestLineResult {
    /// Result of the subset-removal pass ("fewest-line (subsets)").
    pub subsets: ShapeGraph,
    /// Result of the subsequent fewest-longest pass, starting from
    /// `subsets` ("fewest-line (minimal)").
    pub minimal: ShapeGraph,
    /// Lines in `minimal` whose removal would drop some radial
    /// segment's coverage to zero.
    pub vital: HashSet<ShapeRef>,
}

fn line_of(graph: &ShapeGraph, r: ShapeRef) -> Line {
    match &graph.map.get(r).unwrap().kind {
        ShapeKind::Line(a, b) => Line::new(*a, *b),
        _ => unreachable!("fewest-line reduction operates on axial line graphs"),
    }
}

/// Groups `radial_lines` by origin vertex and sorts each group by
/// angle, producing the wedge boundaries radial segments bracket.
fn build_radial_segments(graph: &ShapeGraph) -> Vec<RadialSegment> {
    let mut by_origin: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, rl) in graph.radial_lines.iter().enumerate() {
        by_origin.entry(rl.origin).or_default().push(i);
    }
    let mut segments = Vec::new();
    for (_, mut idxs) in by_origin {
        idxs.sort_by(|&a, &b| {
            graph.radial_lines[a]
                .angle
                .partial_cmp(&graph.radial_lines[b].angle)
                .unwrap()
        });
        for w in idxs.windows(2) {
            segments.push(RadialSegment {
                origin: graph.radial_lines[w[0]].origin,
                lo: w[0],
                hi: w[1],
            });
        }
    }
    segments
}

fn bracket_line(graph: &ShapeGraph, key: RadialKey) -> Option<Line> {
    graph
        .poly_connections
        .iter()
        .find(|pc| pc.radial == key)
        .map(|pc| pc.line)
}

/// Axial refs among `present` that cut both bracket lines of `seg`.
fn covering_set(
    graph: &ShapeGraph,
    seg: &RadialSegment,
    present: &HashSet<ShapeRef>,
    eps: f64,
) -> HashSet<ShapeRef> {
    let lo_key = RadialKey {
        origin: seg.origin,
        target: graph.radial_lines[seg.lo].target,
    };
    let hi_key = RadialKey {
        origin: seg.origin,
        target: graph.radial_lines[seg.hi].target,
    };
    let (Some(lo), Some(hi)) = (bracket_line(graph, lo_key), bracket_line(graph, hi_key)) else {
        return HashSet::new();
    };
    present
        .iter()
        .copied()
        .filter(|&r| {
            let l = line_of(graph, r);
            l.intersects(&lo, eps) && l.intersects(&hi, eps)
        })
        .collect()
}

fn origin_point(graph: &ShapeGraph, seg: &RadialSegment) -> Vector2<f64> {
    let lo_key = RadialKey {
        origin: seg.origin,
        target: graph.radial_lines[seg.lo].target,
    };
    bracket_line(graph, lo_key)
        .map(|l| l.start())
        .unwrap_or(Vector2::new(0.0, 0.0))
}

/// Whether some *other* pair of still-present lines jointly cover the
/// wedge by intersecting each other inside it (step 3's
/// stricter `checkVital` test), consulted only once a segment's
/// coverage would otherwise drop to zero.
fn check_vital(
    graph: &ShapeGraph,
    seg: &RadialSegment,
    origin: Vector2<f64>,
    present: &HashSet<ShapeRef>,
) -> bool {
    let lo_angle = graph.radial_lines[seg.lo].angle;
    let hi_angle = graph.radial_lines[seg.hi].angle;
    let refs: Vec<ShapeRef> = present.iter().copied().collect();
    for &a in &refs {
        let la = line_of(graph, a);
        for &b in &refs {
            if a == b {
                continue;
            }
            let lb = line_of(graph, b);
            if let Some(p) = la.intersection_point(&lb) {
                let v = p - origin;
                if v.norm() < 1e-9 {
                    continue;
                }
                let ang = v.y.atan2(v.x);
                if angle_in_wedge(ang, lo_angle, hi_angle) {
                    return true;
                }
            }
        }
    }
    false
}

fn angle_in_wedge(angle: f64, lo: f64, hi: f64) -> bool {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut rel = angle - lo;
    rel = rel.rem_euclid(two_pi);
    let mut span = hi - lo;
    span = span.rem_euclid(two_pi);
    rel <= span + 1e-9
}

/// Runs one alternating removal pass: lines are visited in `order`,
/// and a line is removed if its remaining connections are a subset of
/// some still-connected neighbour's (ignoring the mutual edge), no
/// radial segment's coverage would drop to zero without `check_vital`
/// rescuing it, and `extra_guard` (if given) doesn't veto the removal.
fn removal_pass(
    graph: &ShapeGraph,
    segments: &[RadialSegment],
    order: Vec<ShapeRef>,
    eps: f64,
    extra_guard: impl Fn(&HashSet<ShapeRef>, ShapeRef, &[ShapeRef]) -> bool,
) -> HashSet<ShapeRef> {
    let mut present: HashSet<ShapeRef> = graph.map.iter().map(|(r, _)| r).collect();
    loop {
        let mut changed = false;
        for &a in &order {
            if !present.contains(&a) {
                continue;
            }
            let conns_a: HashSet<ShapeRef> = graph
                .connections_of(a)
                .iter()
                .copied()
                .filter(|c| present.contains(c) && *c != a)
                .collect();
            let mut removable = false;
            let mut partner_neighbours: Vec<ShapeRef> = Vec::new();
            for &b in &conns_a {
                let conns_b: HashSet<ShapeRef> = graph
                    .connections_of(b)
                    .iter()
                    .copied()
                    .filter(|c| present.contains(c) && *c != a && *c != b)
                    .collect();
                let a_minus_b: HashSet<ShapeRef> =
                    conns_a.iter().copied().filter(|c| *c != b).collect();
                if a_minus_b.is_subset(&conns_b) {
                    removable = true;
                    partner_neighbours.push(b);
                    break;
                }
            }
            if !removable {
                continue;
            }
            if !extra_guard(&present, a, &partner_neighbours) {
                continue;
            }

            let hypothetical: HashSet<ShapeRef> =
                present.iter().copied().filter(|&r| r != a).collect();
            let mut safe = true;
            for seg in segments {
                let before = covering_set(graph, seg, &present, eps);
                if !before.contains(&a) {
                    continue;
                }
                let after = covering_set(graph, seg, &hypothetical, eps);
                if after.is_empty() {
                    let origin = origin_point(graph, seg);
                    if !check_vital(graph, seg, origin, &hypothetical) {
                        safe = false;
                        break;
                    }
                }
            }
            if safe {
                present.remove(&a);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    present
}

fn rebuild_graph(graph: &ShapeGraph, keep: &HashSet<ShapeRef>, name: &str) -> ShapeGraph {
    let mut out = ShapeGraph::new(name, GraphKind::Axial);
    for (r, shape) in graph.map.iter() {
        if keep.contains(&r) {
            if let ShapeKind::Line(a, b) = shape.kind {
                out.insert_line(Line::new(a, b));
            }
        }
    }
    out.radial_lines = graph.radial_lines.clone();
    out.poly_connections = graph.poly_connections.clone();
    out.make_connections(1e-9);
    out
}

/// Runs both reduction passes over the all-line map `graph`, returning
/// the subset-removal result, the fewest-longest result built from it,
/// and the set of lines in the final result marked vital (removing
/// them would zero out some radial segment's coverage).
pub fn reduce_fewest_line(graph: &ShapeGraph, eps: f64) -> FewestLineResult {
    let segments = build_radial_segments(graph);

    let mut by_conn_desc_len: Vec<ShapeRef> = graph.map.iter().map(|(r, _)| r).collect();
    by_conn_desc_len.sort_by(|&a, &b| {
        let ca = graph.connections_of(a).len();
        let cb = graph.connections_of(b).len();
        ca.cmp(&cb).then_with(|| {
            let la = line_of(graph, b).length();
            let lb = line_of(graph, a).length();
            la.partial_cmp(&lb).unwrap()
        })
    });
    let kept_subsets = removal_pass(graph, &segments, by_conn_desc_len, eps, |_, _, _| true);
    let subsets = rebuild_graph(graph, &kept_subsets, "fewest-line (subsets)");

    let mut by_conn_asc_len: Vec<ShapeRef> = subsets.map.iter().map(|(r, _)| r).collect();
    by_conn_asc_len.sort_by(|&a, &b| {
        let ca = subsets.connections_of(a).len();
        let cb = subsets.connections_of(b).len();
        ca.cmp(&cb).then_with(|| {
            let la = line_of(&subsets, a).length();
            let lb = line_of(&subsets, b).length();
            la.partial_cmp(&lb).unwrap()
        })
    });
    let min_degree_guard = |present: &HashSet<ShapeRef>, _a: ShapeRef, neighbours: &[ShapeRef]| {
        neighbours.iter().all(|&b| {
            let remaining = subsets
                .connections_of(b)
                .iter()
                .filter(|c| present.contains(c))
                .count();
            remaining.saturating_sub(1) > 2
        })
    };
    let kept_minimal = removal_pass(&subsets, &segments, by_conn_asc_len, eps, min_degree_guard);
    let minimal = rebuild_graph(&subsets, &kept_minimal, "fewest-line (minimal)");

    let mut vital = HashSet::new();
    for &r in &kept_minimal {
        let without: HashSet<ShapeRef> = kept_minimal.iter().copied().filter(|&x| x != r).collect();
        for seg in &segments {
            let before = covering_set(&subsets, seg, &kept_minimal, eps);
            if !before.contains(&r) {
                continue;
            }
            let after = covering_set(&subsets, seg, &without, eps);
            if after.is_empty() {
                vital.insert(r);
                break;
            }
        }
    }

    FewestLineResult {
        subsets,
        minimal,
        vital,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axial::allline::make_all_line_map;
    use crate::comm::NullCommunicator;
    use crate::geom::Region;
    use crate::grid::build_visibility;
    use crate::grid::PointMap;

    fn t_intersection_walls() -> Vec<Line> {
        vec![
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(20.0, 0.0)),
            Line::new(Vector2::new(0.0, 4.0), Vector2::new(20.0, 4.0)),
            Line::new(Vector2::new(10.0, 0.0), Vector2::new(10.0, 2.0)),
        ]
    }

    #[test]
    fn fewest_line_result_has_no_more_lines_than_all_line_map() {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(20.0, 4.0));
        let mut map = PointMap::new(region, 0.5).unwrap();
        map.fill_region(&region);
        let walls = t_intersection_walls();
        build_visibility(&mut map, &walls, &NullCommunicator).unwrap();
        let all_line =
            make_all_line_map(&map, &walls, Vector2::new(2.0, 2.0), &NullCommunicator).unwrap();
        let result = reduce_fewest_line(&all_line, 1e-6);
        assert!(result.subsets.map.len() <= all_line.map.len());
        assert!(result.minimal.map.len() <= result.subsets.map.len());
    }
}
