//! `PointMap`: a dense grid of `Point`s plus its attribute table,
//! merge-links, and generation counter.

use super::point::{Point, PointState};
use crate::attribute::AttributeTable;
use crate::error::{AnalysisError, Result};
use crate::geom::{PixelBase, PixelRef, Region};
use nalgebra::Vector2;

/// A dense grid of `Point`s over `region`, `spacing` world-units per
/// cell. Invariants: `spacing > 0`; every `FILLED` point lies
/// inside `region`; every `MERGED` point's partner is also in the map.
#[derive(Clone, Debug)]
pub struct PointMap {
    pub region: Region,
    pub rows: usize,
    pub cols: usize,
    pub spacing: f64,
    points: Vec<Point>,
    pub attributes: AttributeTable<PixelRef>,
    pub merge_links: Vec<(PixelRef, PixelRef)>,
    pub generation: u64,
}

impl PointMap {
    /// Builds an empty (all-`EMPTY`) grid covering `region` at the
    /// given `spacing`. Cell centres are placed at
    /// `bottom_left + (i + 0.5, j + 0.5) * spacing`.
    pub fn new(region: Region, spacing: f64) -> Result<Self> {
        if !(spacing > 0.0) {
            return Err(AnalysisError::Geometry(format!(
                "spacing must be positive, got {spacing}"
            )));
        }
        let cols = (region.width() / spacing).ceil().max(1.0) as usize;
        let rows = (region.height() / spacing).ceil().max(1.0) as usize;
        let mut points = Vec::with_capacity(rows * cols);
        for y in 0..rows {
            for x in 0..cols {
                let loc = region.bottom_left
                    + Vector2::new((x as f64 + 0.5) * spacing, (y as f64 + 0.5) * spacing);
                points.push(Point::empty(loc));
            }
        }
        Ok(Self {
            region,
            rows,
            cols,
            spacing,
            points,
            attributes: AttributeTable::new(),
            merge_links: Vec::new(),
            generation: 0,
        })
    }

    pub fn pixel_base(&self) -> PixelBase {
        PixelBase::new(self.region, self.rows, self.cols)
    }

    #[inline]
    pub fn in_bounds(&self, p: PixelRef) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.cols && (p.y as usize) < self.rows
    }

    #[inline]
    fn index(&self, p: PixelRef) -> usize {
        p.y as usize * self.cols + p.x as usize
    }

    /// Dense cell index for `p`, used by traversal kernels to index
    /// their per-thread scratch arrays without a `HashMap` lookup.
    #[inline]
    pub fn cell_index(&self, p: PixelRef) -> usize {
        self.index(p)
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Inverse of `cell_index`.
    #[inline]
    pub fn cell_at(&self, index: usize) -> PixelRef {
        PixelRef::new((index % self.cols) as i32, (index / self.cols) as i32)
    }

    pub fn get(&self, p: PixelRef) -> Option<&Point> {
        if self.in_bounds(p) {
            Some(&self.points[self.index(p)])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, p: PixelRef) -> Option<&mut Point> {
        if self.in_bounds(p) {
            let idx = self.index(p);
            Some(&mut self.points[idx])
        } else {
            None
        }
    }

    /// Fills every cell within `region` (the "fill" operation seeded
    /// from the UI in the source; here just a rectangular mask since
    /// the core has no flood-fill-from-click UI concept).
    pub fn fill_region(&mut self, region: &Region) {
        let base = self.pixel_base();
        let bl = base.pixelate(region.bottom_left);
        let tr = base.pixelate(region.top_right);
        for y in bl.y..=tr.y {
            for x in bl.x..=tr.x {
                let p = PixelRef::new(x, y);
                if let Some(pt) = self.get_mut(p) {
                    pt.state.remove(PointState::EMPTY);
                    pt.state.insert(PointState::FILLED);
                }
            }
        }
    }

    pub fn filled_cells(&self) -> impl Iterator<Item = PixelRef> + '_ {
        let cols = self.cols;
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_filled())
            .map(move |(i, _)| PixelRef::new((i % cols) as i32, (i / cols) as i32))
    }

    pub fn open_cells(&self) -> impl Iterator<Item = PixelRef> + '_ {
        let cols = self.cols;
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_open())
            .map(move |(i, _)| PixelRef::new((i % cols) as i32, (i / cols) as i32))
    }

    /// Installs a zero-cost merge link between two filled cells.
    pub fn merge(&mut self, a: PixelRef, b: PixelRef) -> Result<()> {
        let a_ok = self.get(a).map(|p| p.is_open()).unwrap_or(false);
        let b_ok = self.get(b).map(|p| p.is_open()).unwrap_or(false);
        if !a_ok || !b_ok {
            return Err(AnalysisError::InvalidLink(format!(
                "merge endpoints must both be on filled, unblocked cells: {a:?}, {b:?}"
            )));
        }
        if self.get(a).unwrap().is_merged() || self.get(b).unwrap().is_merged() {
            return Err(AnalysisError::InvalidLink(
                "one of the merge endpoints already has a merge link".into(),
            ));
        }
        self.get_mut(a).unwrap().state.insert(PointState::MERGED);
        self.get_mut(a).unwrap().merge = Some(b);
        self.get_mut(b).unwrap().state.insert(PointState::MERGED);
        self.get_mut(b).unwrap().merge = Some(a);
        self.merge_links.push((a, b));
        Ok(())
    }

    pub fn merge_partner(&self, p: PixelRef) -> Option<PixelRef> {
        self.get(p).and_then(|pt| pt.merge)
    }

    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_map() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        map
    }

    #[test]
    fn new_rejects_nonpositive_spacing() {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        assert!(PointMap::new(region, 0.0).is_err());
    }

    #[test]
    fn fill_region_marks_cells_filled() {
        let map = small_map();
        assert_eq!(map.filled_cells().count(), map.rows * map.cols);
    }

    #[test]
    fn merge_requires_open_cells() {
        let mut map = small_map();
        map.get_mut(PixelRef::new(0, 0)).unwrap().set_blocked();
        assert!(map.merge(PixelRef::new(0, 0), PixelRef::new(1, 1)).is_err());
    }

    #[test]
    fn merge_is_symmetric() {
        let mut map = small_map();
        map.merge(PixelRef::new(0, 0), PixelRef::new(9, 9)).unwrap();
        assert_eq!(map.merge_partner(PixelRef::new(0, 0)), Some(PixelRef::new(9, 9)));
        assert_eq!(map.merge_partner(PixelRef::new(9, 9)), Some(PixelRef::new(0, 0)));
    }
}
