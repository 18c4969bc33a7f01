//! A line stored as a region plus parity/direction bits, following the
//! source's "lines are regions with an inversion flag" representation —
//! it keeps the bounding-box tests (used heavily during BSP/rasterization)
//! free and derives the actual endpoints from three small fields.

use super::region::Region;
use nalgebra::Vector2;

/// Whether an intersection test found nothing, a boundary touch, or a
/// proper crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intersection {
    None,
    Touching,
    Crossing,
}

/// A 2D line segment. `region` is the bounding box; `parity` records
/// whether y ascends with x (true) or descends (false); `direction`
/// records whether the original (start, end) order went left-to-right /
/// bottom-to-top (true) or the reverse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub region: Region,
    pub parity: bool,
    pub direction: bool,
}

impl Line {
    pub fn new(a: Vector2<f64>, b: Vector2<f64>) -> Self {
        let bottom_left = Vector2::new(a.x.min(b.x), a.y.min(b.y));
        let top_right = Vector2::new(a.x.max(b.x), a.y.max(b.y));
        let parity = a.y <= b.y;
        let direction = a.x <= b.x;
        Self {
            region: Region::new(bottom_left, top_right),
            parity,
            direction,
        }
    }

    #[inline]
    fn ax(&self) -> f64 {
        self.region.bottom_left.x
    }
    #[inline]
    fn bx(&self) -> f64 {
        self.region.top_right.x
    }
    #[inline]
    fn ay(&self) -> f64 {
        if self.parity {
            self.region.bottom_left.y
        } else {
            self.region.top_right.y
        }
    }
    #[inline]
    fn by(&self) -> f64 {
        if self.parity {
            self.region.top_right.y
        } else {
            self.region.bottom_left.y
        }
    }

    /// Endpoint the line is considered to "start" from (respects
    /// `direction`, unlike `ax()/ay()` which are always the bbox corner).
    pub fn start(&self) -> Vector2<f64> {
        let x = if self.direction {
            self.region.bottom_left.x
        } else {
            self.region.top_right.x
        };
        let y = if self.direction == self.parity {
            self.region.bottom_left.y
        } else {
            self.region.top_right.y
        };
        Vector2::new(x, y)
    }

    pub fn end(&self) -> Vector2<f64> {
        let x = if self.direction {
            self.region.top_right.x
        } else {
            self.region.bottom_left.x
        };
        let y = if self.direction == self.parity {
            self.region.top_right.y
        } else {
            self.region.bottom_left.y
        };
        Vector2::new(x, y)
    }

    pub fn midpoint(&self) -> Vector2<f64> {
        (self.start() + self.end()) * 0.5
    }

    pub fn vector(&self) -> Vector2<f64> {
        self.end() - self.start()
    }

    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    #[inline]
    fn sign(&self) -> f64 {
        if self.parity {
            1.0
        } else {
            -1.0
        }
    }

    /// Crops the line to lie within `r`, returning `false` (leaving the
    /// line untouched) if the cropped segment would collapse entirely.
    pub fn crop(&mut self, r: &Region) -> bool {
        let (mut s, mut e) = (self.start(), self.end());
        let d = e - s;
        let mut t_lo = 0.0_f64;
        let mut t_hi = 1.0_f64;
        for (p, q, lo, hi) in [
            (s.x, d.x, r.bottom_left.x, r.top_right.x),
            (s.y, d.y, r.bottom_left.y, r.top_right.y),
        ] {
            if q.abs() < 1e-15 {
                if p < lo || p > hi {
                    return false;
                }
                continue;
            }
            let (mut t0, mut t1) = ((lo - p) / q, (hi - p) / q);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_lo = t_lo.max(t0);
            t_hi = t_hi.min(t1);
            if t_lo > t_hi {
                return false;
            }
        }
        s += d * t_lo;
        e = s + d * (t_hi - t_lo);
        *self = Line::new(s, e);
        true
    }

    /// Extends the line as a ray from `start()` through `end()` until it
    /// hits the boundary of `r`.
    pub fn ray(&mut self, r: &Region) {
        let s = self.start();
        let (edge, u) = r.cut_edge_u(s, self.end());
        let corners = [
            r.bottom_left,
            Vector2::new(r.top_right.x, r.bottom_left.y),
            r.top_right,
            Vector2::new(r.bottom_left.x, r.top_right.y),
        ];
        let a = corners[edge];
        let b = corners[(edge + 1) % 4];
        let hit = a + (b - a) * u;
        *self = Line::new(s, hit);
    }

    /// Tolerance-scaled touching/crossing classification (source:
    /// `intersect_line_distinguish`), tolerance scaled by segment length.
    pub fn intersect(&self, other: &Line, tolerance: f64) -> Intersection {
        let (a, b) = (self, other);
        let alpha = ((a.ay() - a.by()) * (b.ax() - a.ax()) + (a.bx() - a.ax()) * (b.ay() - a.ay()))
            * ((a.ay() - a.by()) * (b.bx() - a.ax()) + (a.bx() - a.ax()) * (b.by() - a.ay()));
        let beta = ((b.ay() - b.by()) * (a.ax() - b.ax()) + (b.bx() - b.ax()) * (a.ay() - b.ay()))
            * ((b.ay() - b.by()) * (a.bx() - b.ax()) + (b.bx() - b.ax()) * (a.by() - b.ay()));
        if alpha <= tolerance && beta <= tolerance {
            if alpha < -tolerance && beta < -tolerance {
                Intersection::Crossing
            } else {
                Intersection::Touching
            }
        } else {
            Intersection::None
        }
    }

    /// Convenience: scales tolerance by the geometric mean of the two
    /// lines' lengths, so a tolerance tuned for metre-scale walls still
    /// behaves sensibly for millimetre-scale detail lines.
    pub fn intersects(&self, other: &Line, eps: f64) -> bool {
        if !self.region.intersects(&other.region, eps) {
            return false;
        }
        let scale = (self.length() * other.length()).max(1e-12).sqrt();
        !matches!(self.intersect(other, eps * scale), Intersection::None)
    }

    /// The intersection point with `other`, along whichever axis this
    /// line is longer on (source: free function `intersection_point`).
    pub fn intersection_point(&self, other: &Line) -> Option<Vector2<f64>> {
        let use_x = self.region.width() >= self.region.height();
        if use_x {
            let lg = other.grad_y();
            let g = self.grad_y();
            if (lg - g).abs() < 1e-12 {
                return None;
            }
            let loc = ((self.ay() - g * self.ax()) - (other.ay() - lg * other.ax())) / (lg - g);
            Some(Vector2::new(loc, self.ay() + g * (loc - self.ax())))
        } else {
            let lg = other.grad_x();
            let g = self.grad_x();
            if (lg - g).abs() < 1e-12 {
                return None;
            }
            let loc = ((self.ax() - g * self.ay()) - (other.ax() - lg * other.ay())) / (lg - g);
            Some(Vector2::new(self.ax() + g * (loc - self.ay()), loc))
        }
    }

    #[inline]
    fn grad_y(&self) -> f64 {
        self.sign() * self.region.height() / self.region.width()
    }
    #[inline]
    fn grad_x(&self) -> f64 {
        self.sign() * self.region.width() / self.region.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn start_end_roundtrip_for_all_quadrant_orders() {
        for (a, b) in [
            (Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0)),
            (Vector2::new(1.0, 1.0), Vector2::new(0.0, 0.0)),
            (Vector2::new(0.0, 1.0), Vector2::new(1.0, 0.0)),
            (Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)),
        ] {
            let l = Line::new(a, b);
            assert!((l.start() - a).norm() < 1e-9);
            assert!((l.end() - b).norm() < 1e-9);
        }
    }

    #[test]
    fn intersect_is_symmetric() {
        let a = Line::new(Vector2::new(0.0, 0.0), Vector2::new(2.0, 2.0));
        let b = Line::new(Vector2::new(0.0, 2.0), Vector2::new(2.0, 0.0));
        assert_eq!(a.intersect(&b, 1e-9), Intersection::Crossing);
        assert_eq!(b.intersect(&a, 1e-9), Intersection::Crossing);
    }

    proptest! {
        #[test]
        fn intersects_is_symmetric_prop(
            ax in -10.0..10.0, ay in -10.0..10.0, bx in -10.0..10.0, by in -10.0..10.0,
            cx in -10.0..10.0, cy in -10.0..10.0, dx in -10.0..10.0, dy in -10.0..10.0,
        ) {
            let a = Line::new(Vector2::new(ax, ay), Vector2::new(bx, by));
            let b = Line::new(Vector2::new(cx, cy), Vector2::new(dx, dy));
            prop_assert_eq!(a.intersects(&b, 1e-9), b.intersects(&a, 1e-9));
        }
    }

    #[test]
    fn crop_clips_to_region() {
        let mut l = Line::new(Vector2::new(-5.0, 0.0), Vector2::new(5.0, 0.0));
        let r = Region::new(Vector2::new(-1.0, -1.0), Vector2::new(1.0, 1.0));
        assert!(l.crop(&r));
        assert!((l.start().x - -1.0).abs() < 1e-9);
        assert!((l.end().x - 1.0).abs() < 1e-9);
    }
}
