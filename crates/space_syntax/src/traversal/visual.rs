//! Visual (topological) BFS: generation-by-generation
//! breadth-first depth from one origin, producing depth/integration/
//! entropy metrics.

use super::scratch::DenseScratch;
use super::Radius;
use crate::attribute::ColumnBundle;
use crate::comm::Communicator;
use crate::error::{AnalysisError, Result};
use crate::geom::PixelRef;
use crate::grid::{Point, PointMap};

#[derive(Clone, Copy, Debug, Default)]
pub struct VisualResult {
    pub node_count: u32,
    pub total_depth: u32,
    pub mean_depth: f64,
    pub integration_hh: f64,
    pub integration_p: f64,
    pub integration_tekl: f64,
    pub entropy: f64,
    pub rel_entropy: f64,
}

fn context_skippable(pt: &Point, p: PixelRef) -> bool {
    pt.state
        .contains(crate::grid::PointState::CONTEXTFILLED)
        && !p.is_even()
}

/// Runs the visual BFS from a single `origin`, honouring a topological
/// radius bound ("radius-bounded"; other radius kinds fall
/// back to unbounded, since visual depth is defined in steps).
pub fn run_visual_from(map: &PointMap, origin: PixelRef, radius: Radius) -> VisualResult {
    let n_cells = map.cell_count();
    let mut visited = DenseScratch::new(n_cells, false);
    let mut depth = DenseScratch::new(n_cells, -1i32);

    let origin_idx = map.cell_index(origin);
    visited.set(origin_idx, true);
    depth.set(origin_idx, 0);

    let mut level_counts: Vec<u32> = vec![1];
    let mut frontier = vec![origin];
    let max_steps = match radius {
        Radius::Topological(r) => r,
        _ => u32::MAX,
    };

    let mut level: u32 = 0;
    while !frontier.is_empty() && level < max_steps {
        let mut next = Vec::new();
        for &cell in &frontier {
            let Some(pt) = map.get(cell) else { continue };
            let Some(node) = pt.node() else { continue };
            for (_, neighbour) in node.visible_pixels() {
                let Some(npt) = map.get(neighbour) else { continue };
                if context_skippable(npt, neighbour) {
                    continue;
                }
                let nidx = map.cell_index(neighbour);
                if !*visited.get(nidx) {
                    visited.set(nidx, true);
                    depth.set(nidx, level as i32 + 1);
                    next.push(neighbour);
                    if let Some(partner) = map.merge_partner(neighbour) {
                        let pidx = map.cell_index(partner);
                        if !*visited.get(pidx) {
                            visited.set(pidx, true);
                            depth.set(pidx, level as i32 + 1);
                            next.push(partner);
                        }
                    }
                }
            }
        }
        level += 1;
        level_counts.push(next.len() as u32);
        frontier = next;
    }

    let node_count = depth.iter().filter(|&&d| d >= 0).count() as u32;
    let total_depth: u32 = depth.iter().filter(|&&d| d >= 0).map(|&d| d as u32).sum();
    let mean_depth = if node_count > 1 {
        total_depth as f64 / (node_count - 1) as f64
    } else {
        0.0
    };

    let n = node_count as f64;
    let ra = if node_count > 2 {
        2.0 * (mean_depth - 1.0) / (n - 2.0)
    } else {
        f64::NAN
    };
    let integration_hh = if ra.abs() > 1e-12 { dvalue(n) / ra } else { f64::NAN };
    let integration_p = if ra.abs() > 1e-12 { pvalue(n) / ra } else { f64::NAN };
    let integration_tekl = teklinteg(n, total_depth as f64);

    // entropy over level populations at depth >= 1 (depth 0 is just the
    // origin; mean_depth/RA already exclude it the same way).
    let populated: Vec<u32> = level_counts.iter().skip(1).copied().filter(|&c| c > 0).collect();
    let total: u32 = populated.iter().sum();
    let entropy = if total > 0 {
        -populated
            .iter()
            .map(|&c| {
                let p = c as f64 / total as f64;
                p * p.log2()
            })
            .sum::<f64>()
    } else {
        0.0
    };
    let rel_entropy = relative_entropy(&level_counts, mean_depth);

    VisualResult {
        node_count,
        total_depth,
        mean_depth,
        integration_hh,
        integration_p,
        integration_tekl,
        entropy,
        rel_entropy,
    }
}

/// Hillier-Hanson `D(n)` normalizing constant for relativised asymmetry,
/// used by the HH integration column (also reused by segment integration).
pub(crate) fn dvalue(n: f64) -> f64 {
    2.0 * (n * ((n + 2.0) / 3.0).log2() - 1.0) / ((n - 1.0) * (n - 2.0))
}

/// `P(n)` normalizing constant for the P-value integration column — same
/// family as `dvalue` but without the `(n+2)/3` rescaling, so it diverges
/// from HH for small node counts and converges for large ones.
fn pvalue(n: f64) -> f64 {
    2.0 * (n * (n - 1.0).log2() - 1.0) / ((n - 1.0) * (n - 2.0))
}

/// Teklenburg integration: a standalone function of node count and raw
/// total depth, deriving its own normalized relative asymmetry from
/// `total_depth` directly rather than reusing the caller's mean-depth
/// based `ra`.
fn teklinteg(n: f64, total_depth: f64) -> f64 {
    if n <= 2.0 {
        return f64::NAN;
    }
    let ra = 2.0 * (total_depth - n + 1.0) / ((n - 1.0) * (n - 2.0));
    if ra.abs() > 1e-12 {
        1.0 / ra
    } else {
        f64::NAN
    }
}

/// KL divergence of the observed depth-level distribution (levels 1..)
/// against a Poisson(mean_depth) reference, base 2.
fn relative_entropy(level_counts: &[u32], mean_depth: f64) -> f64 {
    if mean_depth <= 0.0 {
        return 0.0;
    }
    let total: u32 = level_counts.iter().skip(1).sum();
    if total == 0 {
        return 0.0;
    }
    let mut acc = 0.0;
    for (level, &count) in level_counts.iter().enumerate().skip(1) {
        if count == 0 {
            continue;
        }
        let p = count as f64 / total as f64;
        let q = poisson_pmf(level as u32, mean_depth).max(1e-300);
        acc += p * (p / q).log2();
    }
    acc
}

fn poisson_pmf(k: u32, lambda: f64) -> f64 {
    let ln_pmf = k as f64 * lambda.ln() - lambda - ln_factorial(k);
    ln_pmf.exp()
}

fn ln_factorial(k: u32) -> f64 {
    (1..=k).map(|i| (i as f64).ln()).sum()
}

/// Runs visual BFS from every open cell in `map`, writing per-cell
/// columns (`Visual Node Count`, `Visual Mean Depth R<r>`, ...) into a
/// bundle the caller merges into `map.attributes`. Embarrassingly
/// parallel over origins; see `traversal::parallel` for the threaded
/// path.
pub fn run_visual(map: &PointMap, radius: Radius, comm: &dyn Communicator) -> Result<ColumnBundle<PixelRef>> {
    let suffix = radius.suffix();
    let columns = vec![
        "Visual Node Count".to_string(),
        format!("Visual Mean Depth {suffix}"),
        format!("Visual Integration [HH] {suffix}"),
        format!("Visual Integration [P-value] {suffix}"),
        format!("Visual Integration [Tekl] {suffix}"),
        format!("Visual Entropy {suffix}"),
        format!("Visual Relativised Entropy {suffix}"),
    ];
    let mut bundle = ColumnBundle::new(columns);
    for (i, origin) in map.open_cells().enumerate() {
        if i % 64 == 0 && comm.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let r = run_visual_from(map, origin, radius);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;
    use crate::geom::Region;
    use crate::grid::build_visibility;
    use nalgebra::Vector2;

    /// A 10x10-unit room, spacing 1.0, no internal walls; centre cell
    /// sees every other cell at depth 1.
    fn single_room() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        map
    }

    #[test]
    fn single_room_centre_mean_depth_is_one() {
        let map = single_room();
        let centre = PixelRef::new(5, 5);
        let r = run_visual_from(&map, centre, Radius::Unbounded);
        assert_eq!(r.node_count, 100);
        assert!((r.mean_depth - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bfs_depth_never_jumps_more_than_one_from_a_visible_neighbour() {
        let map = single_room();
        let origin = PixelRef::new(0, 0);
        let n_cells = map.cell_count();
        let mut visited = DenseScratch::new(n_cells, false);
        let mut depth = DenseScratch::new(n_cells, -1i32);
        visited.set(map.cell_index(origin), true);
        depth.set(map.cell_index(origin), 0);
        let mut frontier = vec![origin];
        while !frontier.is_empty() {
            let mut next = vec![];
            for &c in &frontier {
                let Some(node) = map.get(c).unwrap().node() else { continue };
                for (_, nb) in node.visible_pixels() {
                    let idx = map.cell_index(nb);
                    if !*visited.get(idx) {
                        visited.set(idx, true);
                        depth.set(idx, *depth.get(map.cell_index(c)) + 1);
                        next.push(nb);
                    }
                }
            }
            frontier = next;
        }
        for c in map.open_cells() {
            let Some(node) = map.get(c).unwrap().node() else { continue };
            let dc = *depth.get(map.cell_index(c));
            if dc < 0 {
                continue;
            }
            for (_, nb) in node.visible_pixels() {
                let dn = *depth.get(map.cell_index(nb));
                if dn >= 0 {
                    assert!(dc <= dn + 1);
                }
            }
        }
    }
}
