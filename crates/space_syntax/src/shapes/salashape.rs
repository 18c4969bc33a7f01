//! `SalaShape`: a typed geometric primitive (point, line, open polyline,
//! or closed polygon) with cached centroid/area/perimeter/bounding box.

use crate::geom::Region;
use nalgebra::Vector2;

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Point(Vector2<f64>),
    Line(Vector2<f64>, Vector2<f64>),
    PolyLine(Vec<Vector2<f64>>),
    /// Closed ring; `ccw` records winding so push-values/containment
    /// tests don't have to recompute the signed area every call.
    Polygon(Vec<Vector2<f64>>, bool),
}

/// Three-valued point-in-polygon result ("Exception-for-control-
/// flow" `throw 1` on an edge touch becomes this enum, not a bool).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    Outside,
    OnEdge,
    Inside,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SalaShape {
    pub kind: ShapeKind,
}

impl SalaShape {
    pub fn point(p: Vector2<f64>) -> Self {
        Self {
            kind: ShapeKind::Point(p),
        }
    }

    pub fn line(a: Vector2<f64>, b: Vector2<f64>) -> Self {
        Self {
            kind: ShapeKind::Line(a, b),
        }
    }

    pub fn polyline(points: Vec<Vector2<f64>>) -> Self {
        Self {
            kind: ShapeKind::PolyLine(points),
        }
    }

    /// Builds a closed polygon, computing the `ccw` flag from the
    /// signed area of `points` (assumed not self-intersecting).
    pub fn polygon(points: Vec<Vector2<f64>>) -> Self {
        let area2 = signed_area2(&points);
        Self {
            kind: ShapeKind::Polygon(points, area2 > 0.0),
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self.kind, ShapeKind::Point(_))
    }

    pub fn is_line_like(&self) -> bool {
        matches!(self.kind, ShapeKind::Line(..) | ShapeKind::PolyLine(_))
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self.kind, ShapeKind::Polygon(..))
    }

    pub fn points(&self) -> Vec<Vector2<f64>> {
        match &self.kind {
            ShapeKind::Point(p) => vec![*p],
            ShapeKind::Line(a, b) => vec![*a, *b],
            ShapeKind::PolyLine(pts) => pts.clone(),
            ShapeKind::Polygon(pts, _) => pts.clone(),
        }
    }

    pub fn bounding_region(&self) -> Region {
        let pts = self.points();
        let mut r = Region::from_point(pts[0]);
        for p in &pts[1..] {
            r.encompass(*p);
        }
        r
    }

    pub fn centroid(&self) -> Vector2<f64> {
        match &self.kind {
            ShapeKind::Point(p) => *p,
            ShapeKind::Line(a, b) => (a + b) * 0.5,
            ShapeKind::PolyLine(pts) => {
                let mut total_len = 0.0;
                let mut acc = Vector2::new(0.0, 0.0);
                for w in pts.windows(2) {
                    let len = (w[1] - w[0]).norm();
                    acc += (w[0] + w[1]) * 0.5 * len;
                    total_len += len;
                }
                if total_len > 0.0 {
                    acc / total_len
                } else {
                    pts[0]
                }
            }
            ShapeKind::Polygon(pts, _) => polygon_centroid(pts),
        }
    }

    pub fn perimeter(&self) -> f64 {
        match &self.kind {
            ShapeKind::Point(_) => 0.0,
            ShapeKind::Line(a, b) => (b - a).norm(),
            ShapeKind::PolyLine(pts) => pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum(),
            ShapeKind::Polygon(pts, _) => ring_perimeter(pts),
        }
    }

    pub fn area(&self) -> f64 {
        match &self.kind {
            ShapeKind::Polygon(pts, _) => signed_area2(pts).abs() / 2.0,
            _ => 0.0,
        }
    }

    /// Point-in-polygon test for `Polygon` shapes; non-polygons are
    /// always `Outside`.
    pub fn contains_point(&self, p: Vector2<f64>, eps: f64) -> Containment {
        match &self.kind {
            ShapeKind::Polygon(pts, _) => point_in_ring(pts, p, eps),
            _ => Containment::Outside,
        }
    }
}

fn signed_area2(pts: &[Vector2<f64>]) -> f64 {
    let n = pts.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum
}

fn ring_perimeter(pts: &[Vector2<f64>]) -> f64 {
    let n = pts.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| (pts[(i + 1) % n] - pts[i]).norm()).sum()
}

fn polygon_centroid(pts: &[Vector2<f64>]) -> Vector2<f64> {
    let n = pts.len();
    if n == 0 {
        return Vector2::new(0.0, 0.0);
    }
    let a2 = signed_area2(pts);
    if a2.abs() < 1e-12 {
        let sum: Vector2<f64> = pts.iter().sum();
        return sum / n as f64;
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let factor = 1.0 / (3.0 * a2);
    Vector2::new(cx * factor, cy * factor)
}

/// Ray-casting point-in-polygon with an edge-touch tolerance, returning
/// the three-valued `Containment`.
fn point_in_ring(pts: &[Vector2<f64>], p: Vector2<f64>, eps: f64) -> Containment {
    let n = pts.len();
    if n < 3 {
        return Containment::Outside;
    }
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        if point_on_segment(a, b, p, eps) {
            return Containment::OnEdge;
        }
    }
    let mut inside = false;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x_at_y = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_at_y {
                inside = !inside;
            }
        }
    }
    if inside {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

fn point_on_segment(a: Vector2<f64>, b: Vector2<f64>, p: Vector2<f64>, eps: f64) -> bool {
    let ab = b - a;
    let ap = p - a;
    let cross = ab.x * ap.y - ab.y * ap.x;
    let len = ab.norm().max(1e-12);
    if cross.abs() / len > eps {
        return false;
    }
    let t = ap.dot(&ab) / ab.norm_squared().max(1e-24);
    (-eps..=1.0 + eps).contains(&t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_area_and_centroid() {
        let sq = SalaShape::polygon(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ]);
        assert!((sq.area() - 1.0).abs() < 1e-9);
        assert!((sq.centroid() - Vector2::new(0.5, 0.5)).norm() < 1e-9);
    }

    #[test]
    fn contains_point_distinguishes_inside_outside_edge() {
        let sq = SalaShape::polygon(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
        ]);
        assert_eq!(sq.contains_point(Vector2::new(1.0, 1.0), 1e-9), Containment::Inside);
        assert_eq!(sq.contains_point(Vector2::new(5.0, 5.0), 1e-9), Containment::Outside);
        assert_eq!(sq.contains_point(Vector2::new(1.0, 0.0), 1e-9), Containment::OnEdge);
    }

    #[test]
    fn polyline_centroid_is_length_weighted() {
        let pl = SalaShape::polyline(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 10.0),
        ]);
        let c = pl.centroid();
        assert!(c.y > 0.5);
    }
}
