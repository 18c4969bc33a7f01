//! Coordinate <-> cell rasterization shared by every grid consumer
//! (`PointMap`, the BSP tree's isovist point-location, and push-values).
//!
//! `PixelBase` carries just enough to map a world point to a cell and
//! back; it is not a grid itself (that's `grid::PointMap`), just the
//! rasterization contract other consumers build on.

use super::{pixelref::PixelRef, region::Region};
use nalgebra::Vector2;

#[derive(Clone, Copy, Debug)]
pub struct PixelBase {
    pub region: Region,
    pub rows: usize,
    pub cols: usize,
}

impl PixelBase {
    pub fn new(region: Region, rows: usize, cols: usize) -> Self {
        Self { region, rows, cols }
    }

    #[inline]
    fn normalise(&self, p: Vector2<f64>) -> Vector2<f64> {
        let w = self.region.width();
        let h = self.region.height();
        Vector2::new(
            if w > 0.0 {
                (p.x - self.region.bottom_left.x) / w
            } else {
                0.0
            },
            if h > 0.0 {
                (p.y - self.region.bottom_left.y) / h
            } else {
                0.0
            },
        )
    }

    /// Maps a world point to its containing cell, clamped to the grid
    /// bounds.
    pub fn pixelate(&self, p: Vector2<f64>) -> PixelRef {
        let n = self.normalise(p);
        let x = ((n.x * self.cols as f64) as i64)
            .clamp(0, self.cols as i64 - 1)
            .max(0);
        let y = ((n.y * self.rows as f64) as i64)
            .clamp(0, self.rows as i64 - 1)
            .max(0);
        PixelRef::new(x as i32, y as i32)
    }

    fn in_bounds(&self, p: PixelRef) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.cols && (p.y as usize) < self.rows
    }

    /// Strict rasterization: the minimum connected chain of cells from
    /// `a` to `b`, stepping in x, y, or diagonally one cell at a time.
    /// Degenerate (zero-length) lines yield only their start pixel.
    pub fn rasterize_strict(&self, a: Vector2<f64>, b: Vector2<f64>) -> Vec<PixelRef> {
        let mut start = self.pixelate(a);
        let end = self.pixelate(b);
        let mut out = vec![start];
        if start == end {
            return out;
        }
        let dx = (end.x - start.x) as f64;
        let dy = (end.y - start.y) as f64;

        if start.x == end.x {
            let step = dy.signum() as i32;
            while start.y != end.y {
                start.y += step;
                out.push(start);
            }
            return out;
        }
        if start.y == end.y {
            let step = dx.signum() as i32;
            while start.x != end.x {
                start.x += step;
                out.push(start);
            }
            return out;
        }

        // Walk the real line, advancing whichever axis the parametric
        // line crosses a cell boundary on first; advance both on ties
        // (an exact corner crossing), matching the "diagonal steps only
        // on exact corners" contract.
        let xstep = dx.signum() as i32;
        let ystep = dy.signum() as i32;
        let (p0, p1) = (a, b);
        let dirv = p1 - p0;
        while start.x != end.x || start.y != end.y {
            // world-space boundary of the next cell in x and in y
            let next_x_bound = self.region.bottom_left.x
                + self.region.width() * ((start.x + if xstep > 0 { 1 } else { 0 }) as f64)
                    / self.cols as f64;
            let next_y_bound = self.region.bottom_left.y
                + self.region.height() * ((start.y + if ystep > 0 { 1 } else { 0 }) as f64)
                    / self.rows as f64;
            let t_x = if dirv.x.abs() > 1e-15 {
                (next_x_bound - p0.x) / dirv.x
            } else {
                f64::INFINITY
            };
            let t_y = if dirv.y.abs() > 1e-15 {
                (next_y_bound - p0.y) / dirv.y
            } else {
                f64::INFINITY
            };
            const EPS: f64 = 1e-9;
            let step_x = start.x != end.x && t_x <= t_y + EPS;
            let step_y = start.y != end.y && t_y <= t_x + EPS;
            if step_x {
                start.x += xstep;
            }
            if step_y {
                start.y += ystep;
            }
            out.push(start);
        }
        out
    }

    /// Touching rasterization: every cell the line passes through within
    /// `tolerance`, including cells it merely grazes at a corner — used
    /// for wall rasterization so visibility rays cannot leak through a
    /// shared corner. Superset of `rasterize_strict`.
    pub fn rasterize_touching(
        &self,
        a: Vector2<f64>,
        b: Vector2<f64>,
        tolerance: f64,
    ) -> Vec<PixelRef> {
        let la = self.normalise(a);
        let lb = self.normalise(b);
        let pa = Vector2::new(la.x * self.cols as f64, la.y * self.rows as f64);
        let pb = Vector2::new(lb.x * self.cols as f64, lb.y * self.rows as f64);

        let width = (pb.x - pa.x).abs();
        let height = (pb.y - pa.y).abs();

        let mut out = Vec::new();
        if width == 0.0 && height == 0.0 {
            let p = self.pixelate(a);
            if self.in_bounds(p) {
                out.push(p);
            }
            return out;
        }

        let sign = if (pb.y - pa.y) * (pb.x - pa.x) >= 0.0 || width == 0.0 {
            1.0
        } else {
            -1.0
        };

        if width >= height {
            // march along x, each column contributes the y-range the
            // line crosses within it
            let (x0, x1) = if pa.x <= pb.x { (pa.x, pb.x) } else { (pb.x, pa.x) };
            let grad = if width > 0.0 { (pb.y - pa.y) / (pb.x - pa.x) } else { 0.0 };
            let constant = pa.y - grad * pa.x;
            let first = (x0 - tolerance).floor() as i64;
            let last = (x1 + tolerance).floor() as i64;
            for i in first..=last {
                let xa = if i == first { x0 } else { i as f64 };
                let xb = if i == last { x1 } else { (i + 1) as f64 };
                let j1 = (xa * grad + constant - sign * tolerance).floor() as i64;
                let j2 = (xb * grad + constant + sign * tolerance).floor() as i64;
                for j in [j1, j2, (j1 + j2) / 2] {
                    let p = PixelRef::new(i as i32, j as i32);
                    if self.in_bounds(p) && !out.contains(&p) {
                        out.push(p);
                    }
                }
            }
        } else {
            let (y0, y1) = if pa.y <= pb.y { (pa.y, pb.y) } else { (pb.y, pa.y) };
            let grad = (pb.x - pa.x) / (pb.y - pa.y);
            let constant = pa.x - grad * pa.y;
            let first = (y0 - tolerance).floor() as i64;
            let last = (y1 + tolerance).floor() as i64;
            for i in first..=last {
                let ya = if i == first { y0 } else { i as f64 };
                let yb = if i == last { y1 } else { (i + 1) as f64 };
                let j1 = (ya * grad + constant - sign * tolerance).floor() as i64;
                let j2 = (yb * grad + constant + sign * tolerance).floor() as i64;
                for j in [j1, j2, (j1 + j2) / 2] {
                    let p = PixelRef::new(j as i32, i as i32);
                    if self.in_bounds(p) && !out.contains(&p) {
                        out.push(p);
                    }
                }
            }
        }
        out
    }

    /// Quick rasterization for visual overlays: Bresenham-like, step
    /// count `max(|dx|, |dy|)`; emits both adjacent cells at
    /// axis-polarity boundaries so overlays never show a gap.
    pub fn quick_rasterize(&self, p: PixelRef, q: PixelRef) -> Vec<PixelRef> {
        let dx = (q.x - p.x) as f64;
        let dy = (q.y - p.y) as f64;
        let mut out = vec![p];
        if dx == 0.0 && dy == 0.0 {
            return out;
        }
        let steps = dx.abs().max(dy.abs()) as i64;
        let mut cur = p;
        for s in 1..=steps {
            let t = s as f64 / steps as f64;
            let nx = p.x as f64 + dx * t;
            let ny = p.y as f64 + dy * t;
            let rx = nx.round();
            let ry = ny.round();
            let next = PixelRef::new(rx as i32, ry as i32);
            if next != cur {
                // axis-polarity boundary: emit the "other" adjacent cell
                // too when we're exactly on a half-integer crossing
                if (nx - nx.floor() - 0.5).abs() < 1e-9 {
                    out.push(PixelRef::new(rx as i32 - 1, ry as i32));
                }
                if (ny - ny.floor() - 0.5).abs() < 1e-9 {
                    out.push(PixelRef::new(rx as i32, ry as i32 - 1));
                }
                out.push(next);
                cur = next;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> PixelBase {
        PixelBase::new(
            Region::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0)),
            10,
            10,
        )
    }

    #[test]
    fn strict_start_pixel_only_for_degenerate_line() {
        let pb = base();
        let out = pb.rasterize_strict(Vector2::new(5.0, 5.0), Vector2::new(5.0, 5.0));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn touching_is_superset_of_strict_on_axis_aligned_line() {
        let pb = base();
        let a = Vector2::new(0.5, 0.5);
        let b = Vector2::new(8.5, 0.5);
        let strict = pb.rasterize_strict(a, b);
        let touching = pb.rasterize_touching(a, b, 1e-6);
        for p in &strict {
            assert!(touching.contains(p), "missing {:?}", p);
        }
    }

    proptest! {
        #[test]
        fn strict_steps_are_adjacent(
            ax in 0.1..9.9, ay in 0.1..9.9, bx in 0.1..9.9, by in 0.1..9.9,
        ) {
            let pb = base();
            let out = pb.rasterize_strict(Vector2::new(ax, ay), Vector2::new(bx, by));
            for w in out.windows(2) {
                let (p, q) = (w[0], w[1]);
                let step = (p.x - q.x).abs().max((p.y - q.y).abs());
                prop_assert_eq!(step, 1);
            }
        }
    }
}
