//! Metric Dijkstra: shortest-path distance in world units,
//! gated so paths cannot leak through the backs of walls the visibility
//! graph inadvertently bridges, with an accumulated Penn angle per path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::scratch::DenseScratch;
use super::Radius;
use crate::attribute::ColumnBundle;
use crate::comm::Communicator;
use crate::error::{AnalysisError, Result};
use crate::geom::PixelRef;
use crate::grid::PointMap;

#[derive(Clone, Copy, Debug, Default)]
pub struct MetricResult {
    pub node_count: u32,
    pub total_distance: f64,
    pub mean_distance: f64,
    pub total_angle: f64,
    pub mean_angle: f64,
    pub total_euclidean: f64,
    pub mean_euclidean: f64,
}

/// Min-heap entry ordered by ascending distance (`BinaryHeap` is a
/// max-heap, so `Ord` is reversed).
#[derive(Clone, Copy, PartialEq)]
struct HeapEntry {
    dist: f64,
    cell: PixelRef,
}

impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Normalized turn angle between the direction `grandparent->parent` and
/// `parent->cell`, in `[0, 1]` half-turns (0 = straight ahead, 1 = full
/// reversal) — the "Penn angle" contribution of one hop.
fn penn_turn(map: &PointMap, grandparent: Option<PixelRef>, parent: PixelRef, cell: PixelRef) -> f64 {
    let Some(gp) = grandparent else { return 0.0 };
    let incoming = map.get(parent).unwrap().location - map.get(gp).unwrap().location;
    let outgoing = map.get(cell).unwrap().location - map.get(parent).unwrap().location;
    let (in_n, out_n) = (incoming.norm(), outgoing.norm());
    if in_n < 1e-12 || out_n < 1e-12 {
        return 0.0;
    }
    let cos = (incoming.dot(&outgoing) / (in_n * out_n)).clamp(-1.0, 1.0);
    cos.acos() / std::f64::consts::PI
}

/// Runs metric Dijkstra from `origin`, honouring a metric radius bound
/// (other radius kinds fall back to unbounded).
pub fn run_metric_from(map: &PointMap, origin: PixelRef, radius: Radius) -> MetricResult {
    let n_cells = map.cell_count();
    let mut dist = DenseScratch::new(n_cells, f64::INFINITY);
    let mut angle = DenseScratch::new(n_cells, 0.0f64);
    let mut settled = DenseScratch::new(n_cells, false);
    let mut pred: DenseScratch<Option<PixelRef>> = DenseScratch::new(n_cells, None);

    let max_dist = match radius {
        Radius::Metric(r) => r,
        _ => f64::INFINITY,
    };

    let origin_idx = map.cell_index(origin);
    dist.set(origin_idx, 0.0);
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry { dist: 0.0, cell: origin });

    while let Some(HeapEntry { dist: d, cell }) = heap.pop() {
        let idx = map.cell_index(cell);
        if *settled.get(idx) {
            continue;
        }
        settled.set(idx, true);
        if d > max_dist {
            continue;
        }
        let Some(pt) = map.get(cell) else { continue };
        if !pt.is_open() {
            continue;
        }
        let Some(node) = pt.node() else { continue };

        let mut expand = |target: PixelRef, step_dist: f64, grandparent: Option<PixelRef>| {
            let tidx = map.cell_index(target);
            let Some(tpt) = map.get(target) else { return };
            if !tpt.is_open() {
                return;
            }
            let nd = d + step_dist;
            if nd < *dist.get(tidx) - 1e-12 {
                dist.set(tidx, nd);
                let turn = penn_turn(map, grandparent, cell, target);
                angle.set(tidx, *angle.get(idx) + turn);
                pred.set(tidx, Some(cell));
                if !*settled.get(tidx) {
                    heap.push(HeapEntry { dist: nd, cell: target });
                }
            }
        };

        for (_, neighbour) in node.visible_pixels() {
            let step = PixelRef::dist(cell, neighbour) * map.spacing;
            expand(neighbour, step, *pred.get(idx));
            if let Some(partner) = map.merge_partner(neighbour) {
                expand(partner, 0.0, *pred.get(idx));
            }
        }
    }

    let mut node_count = 0u32;
    let mut total_distance = 0.0;
    let mut total_angle = 0.0;
    let mut total_euclidean = 0.0;
    for i in 0..n_cells {
        let d = *dist.get(i);
        if d.is_finite() {
            node_count += 1;
            total_distance += d;
            total_angle += *angle.get(i);
            let c = map.cell_at(i);
            total_euclidean += PixelRef::dist(origin, c) * map.spacing;
        }
    }
    let denom = node_count.max(1) as f64;
    MetricResult {
        node_count,
        total_distance,
        mean_distance: total_distance / denom,
        total_angle,
        mean_angle: total_angle / denom,
        total_euclidean,
        mean_euclidean: total_euclidean / denom,
    }
}

pub fn run_metric(map: &PointMap, radius: Radius, comm: &dyn Communicator) -> Result<ColumnBundle<PixelRef>> {
    let suffix = radius.suffix();
    let columns = vec![
        format!("Metric Mean Shortest-Path Distance {suffix}"),
        format!("Metric Mean Shortest-Path Angle {suffix}"),
        format!("Metric Mean Straight-Line Distance {suffix}"),
        format!("Metric Node Count {suffix}"),
    ];
    let mut bundle = ColumnBundle::new(columns);
    for (i, origin) in map.open_cells().enumerate() {
        if i % 64 == 0 && comm.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let r = run_metric_from(map, origin, radius);
        bundle.set(origin, 0, r.mean_distance);
        bundle.set(origin, 1, r.mean_angle);
        bundle.set(origin, 2, r.mean_euclidean);
        bundle.set(origin, 3, r.node_count as f64);
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;
    use crate::geom::Region;
    use crate::grid::build_visibility;
    use nalgebra::Vector2;

    /// A 2x20 corridor, spacing 1.0, origin at (0,0); distance at
    /// (19,0) is 19.0.
    fn corridor() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(20.0, 2.0));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        map
    }

    #[test]
    fn corridor_end_to_end_distance_matches_corridor_length() {
        let map = corridor();
        let origin = PixelRef::new(0, 0);
        let dest = PixelRef::new(19, 0);
        let n_cells = map.cell_count();
        let mut dist = DenseScratch::new(n_cells, f64::INFINITY);
        dist.set(map.cell_index(origin), 0.0);
        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry { dist: 0.0, cell: origin });
        while let Some(HeapEntry { dist: d, cell }) = heap.pop() {
            let idx = map.cell_index(cell);
            if d > *dist.get(idx) + 1e-9 {
                continue;
            }
            let Some(node) = map.get(cell).unwrap().node() else { continue };
            for (_, nb) in node.visible_pixels() {
                let nidx = map.cell_index(nb);
                let nd = d + PixelRef::dist(cell, nb) * map.spacing;
                if nd < *dist.get(nidx) - 1e-9 {
                    dist.set(nidx, nd);
                    heap.push(HeapEntry { dist: nd, cell: nb });
                }
            }
        }
        assert!((*dist.get(map.cell_index(dest)) - 19.0).abs() < 1e-6);
    }

    #[test]
    fn run_metric_from_produces_finite_mean_distance_in_open_room() {
        let map = corridor();
        let r = run_metric_from(&map, PixelRef::new(0, 0), Radius::Unbounded);
        assert!(r.mean_distance.is_finite());
        assert!(r.node_count > 1);
    }
}
