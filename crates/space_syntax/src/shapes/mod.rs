//! Shape maps: a container of points/lines/polygons carrying user
//! attributes, with a pixel-bucket spatial index (`SalaShape`,
//! `ShapeMap`).

mod salashape;
mod shapemap;

pub use salashape::{Containment, SalaShape, ShapeKind};
pub use shapemap::{ShapeMap, ShapeRef, UndoEvent};
