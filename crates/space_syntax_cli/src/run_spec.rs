//! The JSON run-spec an `analyze` invocation loads: seed geometry plus
//! which analyses to run and with what parameters. Kept as a thin
//! `serde`-deserialized shell around `space_syntax`'s own parameter
//! types rather than a second config layer the library has to know
//! about.

use serde::Deserialize;

use space_syntax::geom::{Line, Region};
use space_syntax::traversal::segment::SegmentMetric;
use space_syntax::traversal::Radius;
use space_syntax::Vec2;

#[derive(Deserialize)]
pub struct RunSpec {
    pub region: RegionSpec,
    pub spacing: f64,
    #[serde(default)]
    pub walls: Vec<WallSpec>,
    /// Seed point for all-line map construction; required only if
    /// `analyses` contains a `segment` entry.
    #[serde(default)]
    pub axial_seed: Option<[f64; 2]>,
    #[serde(default)]
    pub analyses: Vec<AnalysisSpec>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    1
}

#[derive(Deserialize)]
pub struct RegionSpec {
    pub bottom_left: [f64; 2],
    pub top_right: [f64; 2],
}

impl RegionSpec {
    pub fn to_region(&self) -> Region {
        Region::new(
            Vec2::new(self.bottom_left[0], self.bottom_left[1]),
            Vec2::new(self.top_right[0], self.top_right[1]),
        )
    }
}

#[derive(Deserialize)]
pub struct WallSpec {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

impl WallSpec {
    pub fn to_line(&self) -> Line {
        Line::new(
            Vec2::new(self.start[0], self.start[1]),
            Vec2::new(self.end[0], self.end[1]),
        )
    }
}

/// Mirrors `space_syntax::traversal::Radius`, deserialized from either
/// the bare string `"unbounded"` or a single-field object, e.g.
/// `{"topological": 3}`.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusSpec {
    Unbounded,
    Topological(u32),
    Metric(f64),
    Angular(f64),
}

impl RadiusSpec {
    pub fn to_radius(&self) -> Radius {
        match self {
            RadiusSpec::Unbounded => Radius::Unbounded,
            RadiusSpec::Topological(n) => Radius::Topological(*n),
            RadiusSpec::Metric(v) => Radius::Metric(*v),
            RadiusSpec::Angular(v) => Radius::Angular(*v),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMetricSpec {
    Topological,
    Metric,
    Angular,
}

impl SegmentMetricSpec {
    pub fn to_metric(&self) -> SegmentMetric {
        match self {
            SegmentMetricSpec::Topological => SegmentMetric::Topological,
            SegmentMetricSpec::Metric => SegmentMetric::Metric,
            SegmentMetricSpec::Angular => SegmentMetric::Angular,
        }
    }
}

fn default_tulip_bins() -> u32 {
    1024
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisSpec {
    Visual {
        radius: RadiusSpec,
        #[serde(default)]
        parallel: bool,
    },
    Metric {
        radius: RadiusSpec,
        #[serde(default)]
        parallel: bool,
    },
    Angular {
        radius: RadiusSpec,
        #[serde(default = "default_tulip_bins")]
        tulip_bins: u32,
        #[serde(default)]
        parallel: bool,
    },
    Segment {
        metric: SegmentMetricSpec,
        radius: RadiusSpec,
        #[serde(default = "default_tulip_bins")]
        tulip_bins: u32,
        #[serde(default)]
        weight_col: Option<String>,
    },
}
