//! The `Analysis` trait: a uniform run/name/columns interface
//! over the traversal kernels, so a host can enumerate and invoke them
//! without matching on which kernel produced a given result.

use crate::attribute::ColumnBundle;
use crate::axial::ShapeGraph;
use crate::comm::Communicator;
use crate::error::Result;
use crate::geom::PixelRef;
use crate::grid::PointMap;
use crate::traversal::segment::{self, SegmentAnalysisResult, SegmentMetric};
use crate::traversal::{angular, metric, parallel, visual, Radius};

/// Either a grid-keyed (`PointMap`) or segment-keyed (`ShapeGraph`)
/// result bundle, so `Analysis::run` has one return type regardless of
/// which map representation the kernel runs over.
pub enum AnalysisResult {
    Grid(ColumnBundle<PixelRef>),
    Segment(SegmentAnalysisResult),
}

impl AnalysisResult {
    pub fn as_grid(&self) -> Option<&ColumnBundle<PixelRef>> {
        match self {
            AnalysisResult::Grid(b) => Some(b),
            AnalysisResult::Segment(_) => None,
        }
    }

    pub fn as_segment(&self) -> Option<&SegmentAnalysisResult> {
        match self {
            AnalysisResult::Segment(r) => Some(r),
            AnalysisResult::Grid(_) => None,
        }
    }
}

/// One configured analysis invocation ("a host enumerates
/// available analyses, runs one, and merges its columns"). Implementors
/// own their parameters (radius, tulip resolution, weight column, ...)
/// and borrow whichever map they run over from the caller.
pub trait Analysis {
    fn name(&self) -> String;
    fn run(&self, comm: &dyn Communicator) -> Result<AnalysisResult>;
}

/// Visual (topological BFS) integration/entropy analysis over a
/// `PointMap`.
pub struct VisualAnalysis<'a> {
    pub map: &'a PointMap,
    pub radius: Radius,
    pub parallel: bool,
}

impl Analysis for VisualAnalysis<'_> {
    fn name(&self) -> String {
        format!("Visual {}", self.radius.suffix())
    }

    fn run(&self, comm: &dyn Communicator) -> Result<AnalysisResult> {
        let bundle = if self.parallel {
            parallel::run_visual_parallel(self.map, self.radius, comm)?
        } else {
            visual::run_visual(self.map, self.radius, comm)?
        };
        Ok(AnalysisResult::Grid(bundle))
    }
}

/// Metric (Dijkstra) distance/angle analysis over a `PointMap`.
pub struct MetricAnalysis<'a> {
    pub map: &'a PointMap,
    pub radius: Radius,
    pub parallel: bool,
}

impl Analysis for MetricAnalysis<'_> {
    fn name(&self) -> String {
        format!("Metric {}", self.radius.suffix())
    }

    fn run(&self, comm: &dyn Communicator) -> Result<AnalysisResult> {
        let bundle = if self.parallel {
            parallel::run_metric_parallel(self.map, self.radius, comm)?
        } else {
            metric::run_metric(self.map, self.radius, comm)?
        };
        Ok(AnalysisResult::Grid(bundle))
    }
}

/// Angular bucket-queue depth analysis over a `PointMap`.
pub struct AngularAnalysis<'a> {
    pub map: &'a PointMap,
    pub tulip_bins: u32,
    pub radius: Radius,
    pub parallel: bool,
}

impl Analysis for AngularAnalysis<'_> {
    fn name(&self) -> String {
        format!("Angular {}", self.radius.suffix())
    }

    fn run(&self, comm: &dyn Communicator) -> Result<AnalysisResult> {
        let bundle = if self.parallel {
            parallel::run_angular_parallel(self.map, self.tulip_bins, self.radius, comm)?
        } else {
            angular::run_angular(self.map, self.tulip_bins, self.radius, comm)?
        };
        Ok(AnalysisResult::Grid(bundle))
    }
}

/// Segment choice/integration tulip analysis over a segment
/// `ShapeGraph`.
pub struct SegmentAnalysis<'a> {
    pub graph: &'a ShapeGraph,
    pub metric: SegmentMetric,
    pub tulip_bins: u32,
    pub radius: Radius,
    pub weight_col: Option<&'a str>,
}

impl Analysis for SegmentAnalysis<'_> {
    fn name(&self) -> String {
        format!("T{} {}", self.tulip_bins, self.radius.suffix())
    }

    fn run(&self, comm: &dyn Communicator) -> Result<AnalysisResult> {
        let result = segment::run_segment_analysis(self.graph, self.metric, self.radius, self.weight_col, comm)?;
        Ok(AnalysisResult::Segment(result))
    }
}

/// Writes a grid `AnalysisResult` into `map.attributes`, no-op for a
/// `Segment` result (callers write those with
/// `segment::write_segment_columns`, which needs a `&mut ShapeGraph`
/// this trait's borrow-shape can't provide).
pub fn merge_grid_result(map: &mut PointMap, result: AnalysisResult) {
    if let AnalysisResult::Grid(bundle) = result {
        bundle.merge_into(&mut map.attributes);
    }
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
    fn visual_analysis_runs_and_merges() {
        let mut map = small_room();
        let result = {
            let a = VisualAnalysis {
                map: &map,
                radius: Radius::Unbounded,
                parallel: false,
            };
            a.run(&NullCommunicator).unwrap()
        };
        assert!(result.as_grid().is_some());
        merge_grid_result(&mut map, result);
        assert!(map.attributes.get_column_index("Visual Node Count").is_some());
    }

    #[test]
    fn metric_analysis_name_includes_radius_suffix() {
        let map = small_room();
        let a = MetricAnalysis {
            map: &map,
            radius: Radius::Metric(5.0),
            parallel: false,
        };
        assert!(a.name().contains("metric"));
    }
}
