//! 2D geometry primitives shared by every map representation: regions,
//! lines, pixel coordinates, rasterization, and the BSP tree used for
//! isovist point-location.

mod bsp;
mod line;
mod pixelref;
mod rasterize;
mod region;

pub use bsp::{BspNode, BspTree, Side};
pub use line::{Intersection, Line};
pub use pixelref::{Direction, GridConnections, PixelRef};
pub use rasterize::PixelBase;
pub use region::Region;

/// Centralized tolerances for rasterization and intersection tests,
/// one struct instead of magic constants scattered through the module.
#[derive(Clone, Copy, Debug)]
pub struct GeomCfg {
    /// Tolerance passed to `Line::intersects`/`Region::intersects`.
    pub eps_intersect: f64,
    /// Tolerance used when deduplicating axial line endpoints.
    pub eps_dedup: f64,
}

impl Default for GeomCfg {
    fn default() -> Self {
        Self {
            eps_intersect: 1e-9,
            eps_dedup: 1e-6,
        }
    }
}
