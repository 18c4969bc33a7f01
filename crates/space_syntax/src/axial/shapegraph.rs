//! `ShapeGraph`: a `ShapeMap` of axial lines or segments, augmented with
//! a connectors table (`ShapeGraph`/`Connector`).

use super::types::{PolyConnector, RadialLine};
use crate::geom::Line;
use crate::shapes::{SalaShape, ShapeKind, ShapeMap, ShapeRef};
use std::collections::HashMap;

/// Which end of a segment a connection leaves from, used as half of a
/// `SegmentRef` key (`Connector`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegDir {
    Forward,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub dir: SegDir,
    pub r: ShapeRef,
}

/// Per-shape adjacency. Axial lines carry a flat connection list;
/// segments carry direction-split forward/back maps with an angular
/// weight in `[0, 2]` half-turns.
#[derive(Clone, Debug, Default)]
pub struct Connector {
    pub connections: Vec<ShapeRef>,
    pub forward: HashMap<SegmentRef, f64>,
    pub back: HashMap<SegmentRef, f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphKind {
    Axial,
    Segment,
}

/// A `ShapeMap` of lines (axial) or segments, plus its connectors table
/// and the all-line construction's auxiliary vectors.
///
/// The source stores `poly_connections`/`radial_lines` outside the
/// shape-graph serialization block "for historical reasons"; since this
/// crate has no legacy-compatible serialization to match, they are
/// simply fields here and serialize inline with the rest of the
/// struct.
#[derive(Clone, Debug)]
pub struct ShapeGraph {
    pub map: ShapeMap,
    pub kind: GraphKind,
    pub connectors: HashMap<ShapeRef, Connector>,
    pub poly_connections: Vec<PolyConnector>,
    pub radial_lines: Vec<RadialLine>,
}

impl ShapeGraph {
    pub fn new(name: impl Into<String>, kind: GraphKind) -> Self {
        Self {
            map: ShapeMap::new(name),
            kind,
            connectors: HashMap::new(),
            poly_connections: Vec::new(),
            radial_lines: Vec::new(),
        }
    }

    pub fn insert_line(&mut self, line: Line) -> ShapeRef {
        let r = self
            .map
            .insert(SalaShape::line(line.start(), line.end()));
        self.connectors.insert(r, Connector::default());
        r
    }

    /// `connectors.len() == shapes.len()` invariant.
    pub fn has_graph(&self) -> bool {
        self.connectors.len() == self.map.len()
    }

    fn as_line(shape: &SalaShape) -> Option<Line> {
        match &shape.kind {
            ShapeKind::Line(a, b) => Some(Line::new(*a, *b)),
            _ => None,
        }
    }

    /// Intersection adjacency between every pair of lines in the map,
    /// via the pixel-bucket index rather than an O(n^2) scan.
    pub fn make_connections(&mut self, eps: f64) {
        for conn in self.connectors.values_mut() {
            conn.connections.clear();
        }
        let refs: Vec<ShapeRef> = self.map.iter().map(|(r, _)| r).collect();
        for &a in &refs {
            let shape_a = self.map.get(a).unwrap().clone();
            let Some(line_a) = Self::as_line(&shape_a) else {
                continue;
            };
            let bbox = shape_a.bounding_region();
            let candidates = self.map.query_region(&bbox);
            for &b in &candidates {
                if b == a {
                    continue;
                }
                let shape_b = self.map.get(b).unwrap().clone();
                let Some(line_b) = Self::as_line(&shape_b) else {
                    continue;
                };
                if line_a.intersects(&line_b, eps) {
                    let conn = self.connectors.entry(a).or_default();
                    if !conn.connections.contains(&b) {
                        conn.connections.push(b);
                    }
                }
            }
        }
    }

    pub fn connections_of(&self, r: ShapeRef) -> &[ShapeRef] {
        self.connectors
            .get(&r)
            .map(|c| c.connections.as_slice())
            .unwrap_or(&[])
    }

    /// Splits every axial line at every intersection point with another
    /// axial line, producing a segment `ShapeGraph` whose connectors
    /// carry forward/back angular-cost weights (`Connector`
    /// per-direction adjacency).
    pub fn to_segment_graph(&self, eps: f64) -> ShapeGraph {
        let mut seg = ShapeGraph::new(format!("{} (segments)", self.map.name), GraphKind::Segment);

        let refs: Vec<ShapeRef> = self.map.iter().map(|(r, _)| r).collect();
        let mut per_line_cuts: HashMap<ShapeRef, Vec<f64>> = HashMap::new();

        for &a in &refs {
            let line_a = Self::as_line(self.map.get(a).unwrap()).unwrap();
            let len = line_a.length().max(1e-12);
            let mut ts = vec![0.0, 1.0];
            for &b in &refs {
                if a == b {
                    continue;
                }
                let line_b = Self::as_line(self.map.get(b).unwrap()).unwrap();
                if let Some(p) = line_a.intersection_point(&line_b) {
                    let t = (p - line_a.start()).norm() / len;
                    if (-eps..=1.0 + eps).contains(&t) {
                        ts.push(t.clamp(0.0, 1.0));
                    }
                }
            }
            ts.sort_by(|x, y| x.partial_cmp(y).unwrap());
            ts.dedup_by(|x, y| (*x - *y).abs() < 1e-9);
            per_line_cuts.insert(a, ts);
        }

        // Segment junction bookkeeping: for each original axial line,
        // the ordered list of segment-refs it was cut into, so we can
        // wire angular weights between consecutive pieces and across
        // intersecting lines at shared junction points.
        let mut junctions: HashMap<(i64, i64), Vec<(ShapeRef, bool)>> = HashMap::new();
        let quantize = |v: f64| (v * 1e6).round() as i64;

        for &a in &refs {
            let line_a = Self::as_line(self.map.get(a).unwrap()).unwrap();
            let ts = &per_line_cuts[&a];
            let start = line_a.start();
            let dir = line_a.end() - start;
            for w in ts.windows(2) {
                let p0 = start + dir * w[0];
                let p1 = start + dir * w[1];
                if (p1 - p0).norm() < 1e-9 {
                    continue;
                }
                let r = seg.insert_line(Line::new(p0, p1));
                let key0 = (quantize(p0.x), quantize(p0.y));
                let key1 = (quantize(p1.x), quantize(p1.y));
                junctions.entry(key0).or_default().push((r, true));
                junctions.entry(key1).or_default().push((r, false));
            }
        }

        for members in junctions.values() {
            for &(r_i, end_i) in members {
                for &(r_j, end_j) in members {
                    if r_i == r_j {
                        continue;
                    }
                    let dir_i = seg_direction(&seg, r_i, end_i);
                    let dir_j = seg_direction(&seg, r_j, end_j);
                    let weight = angular_weight(dir_i, dir_j);
                    let segref_j = SegmentRef {
                        dir: if end_j { SegDir::Forward } else { SegDir::Back },
                        r: r_j,
                    };
                    let conn = seg.connectors.entry(r_i).or_default();
                    let table = if end_i { &mut conn.forward } else { &mut conn.back };
                    table.insert(segref_j, weight);
                }
            }
        }

        seg
    }
}

fn seg_direction(seg: &ShapeGraph, r: ShapeRef, at_end: bool) -> nalgebra::Vector2<f64> {
    let line = ShapeGraph::as_line(seg.map.get(r).unwrap()).unwrap();
    let v = line.end() - line.start();
    if at_end {
        v
    } else {
        -v
    }
}

/// Angular cost of turning from direction `a` into direction `b`,
/// `1 - cos(theta)` so it ranges over `[0, 2]`: `0` for
/// straight ahead, `1` for a right-angle turn, `2` for a full reversal.
fn angular_weight(a: nalgebra::Vector2<f64>, b: nalgebra::Vector2<f64>) -> f64 {
    let a = a.normalize();
    let b = b.normalize();
    let cos = a.dot(&b).clamp(-1.0, 1.0);
    1.0 - cos
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn make_connections_links_crossing_lines() {
        let mut g = ShapeGraph::new("axial", GraphKind::Axial);
        let a = g.insert_line(Line::new(Vector2::new(-5.0, 0.0), Vector2::new(5.0, 0.0)));
        let b = g.insert_line(Line::new(Vector2::new(0.0, -5.0), Vector2::new(0.0, 5.0)));
        g.make_connections(1e-9);
        assert!(g.connections_of(a).contains(&b));
        assert!(g.connections_of(b).contains(&a));
    }

    #[test]
    fn to_segment_graph_splits_at_crossings() {
        let mut g = ShapeGraph::new("axial", GraphKind::Axial);
        g.insert_line(Line::new(Vector2::new(-5.0, 0.0), Vector2::new(5.0, 0.0)));
        g.insert_line(Line::new(Vector2::new(0.0, -5.0), Vector2::new(0.0, 5.0)));
        let segs = g.to_segment_graph(1e-9);
        // each axial line is cut into 2 segments by the single crossing
        assert_eq!(segs.map.len(), 4);
    }

    #[test]
    fn angular_weight_is_zero_straight_ahead() {
        let w = angular_weight(Vector2::new(1.0, 0.0), Vector2::new(1.0, 0.0));
        assert!(w.abs() < 1e-9);
    }

    #[test]
    fn angular_weight_is_two_on_reversal() {
        let w = angular_weight(Vector2::new(1.0, 0.0), Vector2::new(-1.0, 0.0));
        assert!((w - 2.0).abs() < 1e-9);
    }
}
