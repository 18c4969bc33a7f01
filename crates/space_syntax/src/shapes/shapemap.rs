//! `ShapeMap`: a keyed map of shape-ref -> `SalaShape`, a pixel-bucket
//! index for fast spatial queries, a per-layer visibility mask, and an
//! undo event log.

use super::salashape::SalaShape;
use crate::attribute::AttributeTable;
use crate::geom::{PixelBase, PixelRef, Region};
use std::collections::HashMap;

pub type ShapeRef = i32;

/// A create/delete/move record, kept so a host can offer undo without
/// the core needing to know what "undo" means to it.
#[derive(Clone, Debug)]
pub enum UndoEvent {
    Create(ShapeRef),
    Delete(ShapeRef, SalaShape),
    Move(ShapeRef, SalaShape),
}

/// Bucket-grid resolution: the pixel base's rows/cols used purely as a
/// spatial hash, independent of any `PointMap`'s own grid.
const BUCKET_RESOLUTION: usize = 64;

#[derive(Clone, Debug, Default)]
pub struct ShapeMap {
    pub name: String,
    shapes: HashMap<ShapeRef, SalaShape>,
    next_ref: ShapeRef,
    pub attributes: AttributeTable<ShapeRef>,
    region: Option<Region>,
    buckets: HashMap<PixelRef, Vec<ShapeRef>>,
    bucket_base: Option<PixelBase>,
    pub layer_visible: HashMap<String, bool>,
    pub undo_log: Vec<UndoEvent>,
}

impl ShapeMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get(&self, r: ShapeRef) -> Option<&SalaShape> {
        self.shapes.get(&r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeRef, &SalaShape)> {
        self.shapes.iter().map(|(&r, s)| (r, s))
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Inserts a shape, assigning it the next stable ref (refs are never
    /// reused, so edits elsewhere can keep holding one), and indexes it
    /// into the pixel-bucket matrix.
    pub fn insert(&mut self, shape: SalaShape) -> ShapeRef {
        let r = self.next_ref;
        self.next_ref += 1;
        let bbox = shape.bounding_region();
        self.region = Some(match self.region {
            Some(r) => r.union(&bbox),
            None => bbox,
        });
        self.rebuild_bucket_base();
        self.index_shape(r, &shape);
        self.shapes.insert(r, shape);
        self.attributes.ensure_row(r);
        self.undo_log.push(UndoEvent::Create(r));
        r
    }

    pub fn delete(&mut self, r: ShapeRef) -> Option<SalaShape> {
        let shape = self.shapes.remove(&r)?;
        self.unindex_shape(r, &shape);
        self.undo_log.push(UndoEvent::Delete(r, shape.clone()));
        Some(shape)
    }

    pub fn move_shape(&mut self, r: ShapeRef, new_shape: SalaShape) -> Option<()> {
        let old = self.shapes.get(&r)?.clone();
        self.unindex_shape(r, &old);
        self.index_shape(r, &new_shape);
        self.shapes.insert(r, new_shape);
        self.undo_log.push(UndoEvent::Move(r, old));
        Some(())
    }

    fn rebuild_bucket_base(&mut self) {
        if let Some(region) = self.region {
            self.bucket_base = Some(PixelBase::new(region, BUCKET_RESOLUTION, BUCKET_RESOLUTION));
        }
    }

    fn bucket_cells_for(&self, shape: &SalaShape) -> Vec<PixelRef> {
        let Some(base) = self.bucket_base else {
            return Vec::new();
        };
        let bbox = shape.bounding_region();
        let bl = base.pixelate(bbox.bottom_left);
        let tr = base.pixelate(bbox.top_right);
        let mut out = Vec::new();
        for y in bl.y..=tr.y {
            for x in bl.x..=tr.x {
                out.push(PixelRef::new(x, y));
            }
        }
        out
    }

    fn index_shape(&mut self, r: ShapeRef, shape: &SalaShape) {
        for cell in self.bucket_cells_for(shape) {
            self.buckets.entry(cell).or_default().push(r);
        }
    }

    fn unindex_shape(&mut self, r: ShapeRef, shape: &SalaShape) {
        for cell in self.bucket_cells_for(shape) {
            if let Some(v) = self.buckets.get_mut(&cell) {
                v.retain(|&x| x != r);
            }
        }
    }

    /// Candidate shape-refs whose bounding box bucket overlaps `region`
    /// (a coarse pre-filter; callers still test exact containment).
    pub fn query_region(&self, region: &Region) -> Vec<ShapeRef> {
        let Some(base) = self.bucket_base else {
            return Vec::new();
        };
        let bl = base.pixelate(region.bottom_left);
        let tr = base.pixelate(region.top_right);
        let mut out = Vec::new();
        for y in bl.y..=tr.y {
            for x in bl.x..=tr.x {
                if let Some(v) = self.buckets.get(&PixelRef::new(x, y)) {
                    for &r in v {
                        if !out.contains(&r) {
                            out.push(r);
                        }
                    }
                }
            }
        }
        out
    }

    /// Candidate shape-refs whose bucket contains the cell `p` falls
    /// into, used by push-values point->shape lookups.
    pub fn query_point(&self, p: nalgebra::Vector2<f64>) -> Vec<ShapeRef> {
        let Some(base) = self.bucket_base else {
            return Vec::new();
        };
        self.buckets
            .get(&base.pixelate(p))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_layer_visible(&mut self, layer: impl Into<String>, visible: bool) {
        self.layer_visible.insert(layer.into(), visible);
    }

    pub fn layer_visible(&self, layer: &str) -> bool {
        self.layer_visible.get(layer).copied().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn refs_are_stable_and_not_reused_after_delete() {
        let mut map = ShapeMap::new("test");
        let a = map.insert(SalaShape::point(Vector2::new(0.0, 0.0)));
        let b = map.insert(SalaShape::point(Vector2::new(1.0, 1.0)));
        map.delete(a);
        let c = map.insert(SalaShape::point(Vector2::new(2.0, 2.0)));
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert!(map.get(a).is_none());
    }

    #[test]
    fn query_point_finds_inserted_shape() {
        let mut map = ShapeMap::new("test");
        let poly = SalaShape::polygon(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ]);
        let r = map.insert(poly);
        let candidates = map.query_point(Vector2::new(5.0, 5.0));
        assert!(candidates.contains(&r));
    }

    #[test]
    fn undo_log_records_create_and_delete() {
        let mut map = ShapeMap::new("test");
        let r = map.insert(SalaShape::point(Vector2::new(0.0, 0.0)));
        map.delete(r);
        assert_eq!(map.undo_log.len(), 2);
    }
}
