//! Segment tulip analysis: choice (betweenness) and
//! integration over a segment `ShapeGraph`, radius-gated by topological
//! step count, cumulative segment length, or accumulated angular cost,
//! reusing the angular bucket queue for the angular case.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::angular::{weight_to_bins, TulipQueue};
use super::Radius;
use crate::axial::{Connector, SegmentRef, ShapeGraph};
use crate::comm::Communicator;
use crate::error::{AnalysisError, Result};
use crate::shapes::ShapeRef;

/// Which cost function gates depth and weights each hop: topological,
/// metric, or angular tulip variants share one traversal shape,
/// differing only in edge weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentMetric {
    Topological,
    Metric,
    Angular,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct HeapEntry {
    cost: f64,
    seg: ShapeRef,
}
impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn segment_length(graph: &ShapeGraph, r: ShapeRef) -> f64 {
    graph.map.get(r).map(|s| s.perimeter()).unwrap_or(0.0)
}

/// One hop's cost and, for the angular metric, its bucket-queue weight
/// in tulip-bin units (shared with `angular.rs`'s traversal).
fn hop_cost(graph: &ShapeGraph, metric: SegmentMetric, target: ShapeRef, weight: f64) -> f64 {
    match metric {
        SegmentMetric::Topological => 1.0,
        SegmentMetric::Metric => segment_length(graph, target),
        SegmentMetric::Angular => weight,
    }
}

fn neighbours(conn: &Connector) -> impl Iterator<Item = (SegmentRef, f64)> + '_ {
    conn.forward
        .iter()
        .chain(conn.back.iter())
        .map(|(&k, &v)| (k, v))
}

/// Dijkstra from `origin` over the segment graph's directional
/// connectors, returning `(total_cost, predecessor)` maps keyed by the
/// graph's own shape-refs.
fn shortest_paths(
    graph: &ShapeGraph,
    origin: ShapeRef,
    metric: SegmentMetric,
    radius: Radius,
) -> (std::collections::HashMap<ShapeRef, f64>, std::collections::HashMap<ShapeRef, ShapeRef>) {
    use std::collections::HashMap;
    let mut dist: HashMap<ShapeRef, f64> = HashMap::new();
    let mut pred: HashMap<ShapeRef, ShapeRef> = HashMap::new();
    let mut settled: HashMap<ShapeRef, bool> = HashMap::new();

    let max_cost = match (metric, radius) {
        (SegmentMetric::Topological, Radius::Topological(n)) => n as f64,
        (SegmentMetric::Metric, Radius::Metric(r)) => r,
        (SegmentMetric::Angular, Radius::Angular(a)) => a,
        _ => f64::INFINITY,
    };

    dist.insert(origin, 0.0);
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry { cost: 0.0, seg: origin });

    while let Some(HeapEntry { cost, seg }) = heap.pop() {
        if *settled.get(&seg).unwrap_or(&false) {
            continue;
        }
        settled.insert(seg, true);
        if cost > max_cost {
            continue;
        }
        let Some(conn) = graph.connectors.get(&seg) else { continue };
        for (segref, weight) in neighbours(conn) {
            let target = segref.r;
            let step = hop_cost(graph, metric, target, weight);
            let nc = cost + step;
            if nc < *dist.get(&target).unwrap_or(&f64::INFINITY) {
                dist.insert(target, nc);
                pred.insert(target, seg);
                if !*settled.get(&target).unwrap_or(&false) {
                    heap.push(HeapEntry { cost: nc, seg: target });
                }
            }
        }
    }

    (dist, pred)
}

#[derive(Clone, Debug, Default)]
pub struct SegmentAnalysisResult {
    pub node_count: std::collections::HashMap<ShapeRef, u32>,
    pub total_depth: std::collections::HashMap<ShapeRef, f64>,
    pub mean_depth: std::collections::HashMap<ShapeRef, f64>,
    pub integration: std::collections::HashMap<ShapeRef, f64>,
    pub choice: std::collections::HashMap<ShapeRef, f64>,
    pub weighted_choice: Option<std::collections::HashMap<ShapeRef, f64>>,
}

/// Runs choice/integration analysis from every segment in `graph`,
/// gated by `radius` under `metric`'s cost function, recording
/// each segment's own node count / total depth / mean depth / HH-style
/// integration from its own traversal, plus the graph-wide Choice
/// (betweenness) tally. An optional `weight_col` names a per-segment
/// attribute (e.g. line length or an imported weight); when given, a
/// second `WeightedChoice` tally is accumulated alongside the plain one,
/// crediting each intermediate segment with `weight(origin) *
/// weight(dest)` per through-pair rather than a flat `1.0`.
pub fn run_segment_analysis(
    graph: &ShapeGraph,
    metric: SegmentMetric,
    radius: Radius,
    weight_col: Option<&str>,
    comm: &dyn Communicator,
) -> Result<SegmentAnalysisResult> {
    let refs: Vec<ShapeRef> = graph.map.iter().map(|(r, _)| r).collect();
    let weight_idx = weight_col.and_then(|name| graph.map.attributes.get_column_index(name));

    let mut node_count: std::collections::HashMap<ShapeRef, u32> = std::collections::HashMap::new();
    let mut total_depth: std::collections::HashMap<ShapeRef, f64> = std::collections::HashMap::new();
    let mut mean_depth: std::collections::HashMap<ShapeRef, f64> = std::collections::HashMap::new();
    let mut integration: std::collections::HashMap<ShapeRef, f64> = std::collections::HashMap::new();
    let mut choice: std::collections::HashMap<ShapeRef, f64> = refs.iter().map(|&r| (r, 0.0)).collect();
    let mut weighted_choice: Option<std::collections::HashMap<ShapeRef, f64>> =
        weight_idx.map(|_| refs.iter().map(|&r| (r, 0.0)).collect());

    for (i, &origin) in refs.iter().enumerate() {
        if i % 64 == 0 && comm.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let (dist, pred) = shortest_paths(graph, origin, metric, radius);
        let n_reached = dist.len() as u32;
        let sum_depth: f64 = dist.values().sum();
        let md = if n_reached > 1 {
            sum_depth / (n_reached - 1) as f64
        } else {
            0.0
        };
        node_count.insert(origin, n_reached);
        total_depth.insert(origin, sum_depth);
        mean_depth.insert(origin, md);

        let n = n_reached as f64;
        let seg_integration = if n > 2.0 {
            let ra = 2.0 * (md - 1.0) / (n - 2.0);
            if ra.abs() > 1e-12 {
                super::visual::dvalue(n) / ra
            } else {
                f64::NAN
            }
        } else {
            f64::NAN
        };
        integration.insert(origin, seg_integration);

        let origin_weight = weight_idx
            .and_then(|idx| graph.map.attributes.get(origin, idx))
            .unwrap_or(1.0);

        for (&dest, _) in dist.iter() {
            if dest == origin {
                continue;
            }
            let dest_weight = weight_idx
                .and_then(|idx| graph.map.attributes.get(dest, idx))
                .unwrap_or(1.0);
            let pair_weight = origin_weight * dest_weight;
            // walk the predecessor chain once per (origin, dest) pair,
            // crediting every intermediate segment with this pair's
            // choice contribution; a reversed dest->origin search would
            // double-count the same pair, so origin<dest is not imposed
            // here (choice is a directed count in the source: every
            // ordered pair contributes once).
            let mut cur = dest;
            let mut guard = 0usize;
            while let Some(&prev) = pred.get(&cur) {
                guard += 1;
                if guard > refs.len() + 1 {
                    break; // predecessor cycle guard; should not happen.
                }
                if prev != origin {
                    *choice.entry(prev).or_insert(0.0) += 1.0;
                    if let Some(wc) = weighted_choice.as_mut() {
                        *wc.entry(prev).or_insert(0.0) += pair_weight;
                    }
                }
                cur = prev;
                if cur == origin {
                    break;
                }
            }
        }
    }

    Ok(SegmentAnalysisResult {
        node_count,
        total_depth,
        mean_depth,
        integration,
        choice,
        weighted_choice,
    })
}

/// Writes the tulip result into `graph.map.attributes`, using the
/// canonical column naming convention `T<tulipBins> <Metric>
/// [<weightCol>] R<radiusType><radius>`. Emits `Node Count`, `Total
/// Depth`, `Mean Depth`, and `Integration` (each from the segment's own
/// traversal), `Choice` (graph-wide betweenness), and — only when
/// `result` carries one — `Weighted Choice`.
pub fn write_segment_columns(
    graph: &mut ShapeGraph,
    tulip_bins: u32,
    radius: Radius,
    weight_col: Option<&str>,
    result: &SegmentAnalysisResult,
) {
    let weight_part = weight_col.map(|w| format!(" {w}")).unwrap_or_default();
    let radius_part = radius.suffix();
    // `radius`'s own variant (Topological/Metric/Angular) already names
    // the metric kind via its column suffix (Rn / R_ metric / R_ angular).
    let prefix = format!("T{tulip_bins}{weight_part} {radius_part}");

    let node_count_col = graph
        .map
        .attributes
        .insert_or_reset_column(&format!("{prefix} Node Count"));
    let total_depth_col = graph
        .map
        .attributes
        .insert_or_reset_column(&format!("{prefix} Total Depth"));
    let mean_depth_col = graph
        .map
        .attributes
        .insert_or_reset_column(&format!("{prefix} Mean Depth"));
    let integration_col = graph
        .map
        .attributes
        .insert_or_reset_column(&format!("{prefix} Integration"));
    let choice_col = graph
        .map
        .attributes
        .insert_or_reset_column(&format!("{prefix} Choice"));
    let weighted_choice_col = result
        .weighted_choice
        .as_ref()
        .map(|_| graph.map.attributes.insert_or_reset_column(&format!("{prefix} Weighted Choice")));

    let refs: Vec<ShapeRef> = graph.map.iter().map(|(r, _)| r).collect();
    for r in refs {
        if let Some(&v) = result.node_count.get(&r) {
            graph.map.attributes.set(r, node_count_col, v as f64);
        }
        if let Some(&v) = result.total_depth.get(&r) {
            graph.map.attributes.set(r, total_depth_col, v);
        }
        if let Some(&v) = result.mean_depth.get(&r) {
            graph.map.attributes.set(r, mean_depth_col, v);
        }
        if let Some(&v) = result.integration.get(&r) {
            graph.map.attributes.set(r, integration_col, v);
        }
        if let Some(&v) = result.choice.get(&r) {
            graph.map.attributes.set(r, choice_col, v);
        }
        if let (Some(col), Some(wc)) = (weighted_choice_col, result.weighted_choice.as_ref()) {
            if let Some(&v) = wc.get(&r) {
                graph.map.attributes.set(r, col, v);
            }
        }
    }
}

/// Quantizes an angular-metric segment cost into tulip-bin units,
/// matching `angular.rs`'s bucket-queue convention, for callers that
/// want the O(1)-per-step queue instead of the generic binary heap
/// above (large tulip-resolution angular runs).
pub fn angular_bucket_shortest_paths(
    graph: &ShapeGraph,
    origin: ShapeRef,
    tulip_bins: u32,
) -> std::collections::HashMap<ShapeRef, f64> {
    use std::collections::HashMap;
    let refs: Vec<ShapeRef> = graph.map.iter().map(|(r, _)| r).collect();
    let capacity = (tulip_bins + 2) as usize;
    let mut best: HashMap<ShapeRef, u64> = HashMap::new();
    let mut queue: TulipQueue<ShapeRef> = TulipQueue::new(capacity);
    best.insert(origin, 0);
    queue.push(0, origin);

    while let Some((d, seg)) = queue.pop() {
        if d > *best.get(&seg).unwrap_or(&u64::MAX) {
            continue;
        }
        let Some(conn) = graph.connectors.get(&seg) else { continue };
        for (segref, weight) in neighbours(conn) {
            let target = segref.r;
            let step = weight_to_bins(weight, tulip_bins);
            let nd = d + step;
            if nd < *best.get(&target).unwrap_or(&u64::MAX) {
                best.insert(target, nd);
                queue.push(nd, target);
            }
        }
    }

    let to_half_turns = 2.0 / tulip_bins as f64;
    refs.into_iter()
        .filter_map(|r| best.get(&r).map(|&d| (r, d as f64 * to_half_turns)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axial::GraphKind;
    use crate::comm::NullCommunicator;
    use crate::geom::Line;
    use nalgebra::Vector2;

    fn cross_graph() -> ShapeGraph {
        let mut axial = ShapeGraph::new("axial", GraphKind::Axial);
        axial.insert_line(Line::new(Vector2::new(-5.0, 0.0), Vector2::new(5.0, 0.0)));
        axial.insert_line(Line::new(Vector2::new(0.0, -5.0), Vector2::new(0.0, 5.0)));
        axial.to_segment_graph(1e-9)
    }

    #[test]
    fn topological_choice_is_nonnegative_and_finite() {
        let graph = cross_graph();
        let result = run_segment_analysis(
            &graph,
            SegmentMetric::Topological,
            Radius::Unbounded,
            None,
            &NullCommunicator,
        )
        .unwrap();
        for &v in result.mean_depth.values() {
            assert!(v.is_finite());
        }
        for &v in result.choice.values() {
            assert!(v >= 0.0);
        }
        assert!(result.weighted_choice.is_none());
    }

    #[test]
    fn angular_bucket_paths_reach_every_segment_in_a_crossing() {
        let graph = cross_graph();
        let origin = graph.map.iter().next().unwrap().0;
        let reached = angular_bucket_shortest_paths(&graph, origin, 1024);
        assert_eq!(reached.len(), graph.map.len());
    }

    /// Weighting every segment with the same constant must not change
    /// which segments accumulate choice relative to the unweighted tally
    /// — duplicating a uniform weight is a no-op.
    #[test]
    fn weighted_choice_with_uniform_unit_weights_matches_plain_choice() {
        let mut graph = cross_graph();
        let weight_col = graph.map.attributes.insert_or_reset_column("Weight");
        for r in graph.map.iter().map(|(r, _)| r).collect::<Vec<_>>() {
            graph.map.attributes.set(r, weight_col, 1.0);
        }
        let result = run_segment_analysis(
            &graph,
            SegmentMetric::Topological,
            Radius::Unbounded,
            Some("Weight"),
            &NullCommunicator,
        )
        .unwrap();
        let weighted = result.weighted_choice.as_ref().unwrap();
        for (&r, &v) in &result.choice {
            assert!((weighted[&r] - v).abs() < 1e-9);
        }
    }
}
