//! Parallel-over-origins traversal: every origin's kernel run
//! only reads `map` and owns its own scratch, so origins split
//! across worker threads with no aliasing; each thread's result is
//! merged into the destination `ColumnBundle` only after the `rayon`
//! fan-out barrier completes — the same per-thread-local,
//! merge-after-barrier shape the pixel-world example uses for its
//! checkerboard-phase blitter.

use rayon::prelude::*;

use super::angular::{self, AngularResult, DEFAULT_TULIP_BINS};
use super::metric::{self, MetricResult};
use super::visual::{self, VisualResult};
use super::Radius;
use crate::attribute::ColumnBundle;
use crate::comm::Communicator;
use crate::error::{AnalysisError, Result};
use crate::geom::PixelRef;
use crate::grid::PointMap;

/// Runs visual BFS from every open cell in parallel, one task per
/// origin, then merges the per-origin rows into a single bundle.
pub fn run_visual_parallel(map: &PointMap, radius: Radius, comm: &dyn Communicator) -> Result<ColumnBundle<PixelRef>> {
    let origins: Vec<PixelRef> = map.open_cells().collect();
    if comm.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    let rows: Vec<(PixelRef, VisualResult)> = origins
        .par_iter()
        .map(|&origin| (origin, visual::run_visual_from(map, origin, radius)))
        .collect();

    let suffix = radius.suffix();
    let mut bundle = ColumnBundle::new(vec![
        "Visual Node Count".to_string(),
        format!("Visual Mean Depth {suffix}"),
        format!("Visual Integration [HH] {suffix}"),
        format!("Visual Integration [P-value] {suffix}"),
        format!("Visual Integration [Tekl] {suffix}"),
        format!("Visual Entropy {suffix}"),
        format!("Visual Relativised Entropy {suffix}"),
    ]);
    for (origin, r) in rows {
        bundle.set(origin, 0, r.node_count as f64);
        bundle.set(origin, 1, r.mean_depth);
        bundle.set(origin, 2, r.integration_hh);
        bundle.set(origin, 3, r.integration_p);
        bundle.set(origin, 4, r.integration_tekl);
        bundle.set(origin, 5, r.entropy);
        bundle.set(origin, 6, r.rel_entropy);
    }
    Ok(bundle)
}

pub fn run_metric_parallel(map: &PointMap, radius: Radius, comm: &dyn Communicator) -> Result<ColumnBundle<PixelRef>> {
    let origins: Vec<PixelRef> = map.open_cells().collect();
    if comm.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    let rows: Vec<(PixelRef, MetricResult)> = origins
        .par_iter()
        .map(|&origin| (origin, metric::run_metric_from(map, origin, radius)))
        .collect();

    let suffix = radius.suffix();
    let mut bundle = ColumnBundle::new(vec![
        format!("Metric Mean Shortest-Path Distance {suffix}"),
        format!("Metric Mean Shortest-Path Angle {suffix}"),
        format!("Metric Mean Straight-Line Distance {suffix}"),
        format!("Metric Node Count {suffix}"),
    ]);
    for (origin, r) in rows {
        bundle.set(origin, 0, r.mean_distance);
        bundle.set(origin, 1, r.mean_angle);
        bundle.set(origin, 2, r.mean_euclidean);
        bundle.set(origin, 3, r.node_count as f64);
    }
    Ok(bundle)
}

pub fn run_angular_parallel(
    map: &PointMap,
    tulip_bins: u32,
    radius: Radius,
    comm: &dyn Communicator,
) -> Result<ColumnBundle<PixelRef>> {
    let origins: Vec<PixelRef> = map.open_cells().collect();
    if comm.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    let rows: Vec<(PixelRef, AngularResult)> = origins
        .par_iter()
        .map(|&origin| (origin, angular::run_angular_from(map, origin, tulip_bins, radius)))
        .collect();

    let suffix = radius.suffix();
    let mut bundle = ColumnBundle::new(vec![
        format!("Angular Node Count {suffix}"),
        format!("Angular Total Depth {suffix}"),
        format!("Angular Mean Depth {suffix}"),
    ]);
    for (origin, r) in rows {
        bundle.set(origin, 0, r.node_count as f64);
        bundle.set(origin, 1, r.total_depth);
        bundle.set(origin, 2, r.mean_depth);
    }
    Ok(bundle)
}

/// Convenience wrapper defaulting to the source's usual tulip
/// resolution.
pub fn run_angular_parallel_default(map: &PointMap, radius: Radius, comm: &dyn Communicator) -> Result<ColumnBundle<PixelRef>> {
    run_angular_parallel(map, DEFAULT_TULIP_BINS, radius, comm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;
    use crate::geom::Region;
    use crate::grid::build_visibility;
    use nalgebra::Vector2;

    fn small_room() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(6.0, 6.0));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        map
    }

    #[test]
    fn parallel_visual_matches_sequential_mean_depth() {
        let map = small_room();
        let seq = visual::run_visual(&map, Radius::Unbounded, &NullCommunicator).unwrap();
        let par = run_visual_parallel(&map, Radius::Unbounded, &NullCommunicator).unwrap();
        for cell in map.open_cells() {
            let s = seq.values.get(&cell).map(|v| v[1]);
            let p = par.values.get(&cell).map(|v| v[1]);
            assert_eq!(s, p);
        }
    }

    #[test]
    fn parallel_metric_matches_sequential_mean_distance() {
        let map = small_room();
        let seq = metric::run_metric(&map, Radius::Unbounded, &NullCommunicator).unwrap();
        let par = run_metric_parallel(&map, Radius::Unbounded, &NullCommunicator).unwrap();
        for cell in map.open_cells() {
            let s = seq.values.get(&cell).map(|v| v[0]);
            let p = par.values.get(&cell).map(|v| v[0]);
            assert_eq!(s, p);
        }
    }
}
