use super::contour::Contour;

/// Below this |area| a polygon is treated as having no shape.
const MIN_AREA: f64 = f32::EPSILON as f64;

/// Spatial moments of a closed polygon up to third order, computed with
/// Green's theorem over its edges. Orientation is normalised so `m00 >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,
}

impl Moments {
    /// `None` for polygons with (near) zero enclosed area.
    pub fn of_polygon(contour: &Contour) -> Option<Self> {
        let points = &contour.points;
        if points.len() < 3 {
            return None;
        }

        let (mut a00, mut a10, mut a01) = (0.0, 0.0, 0.0);
        let (mut a20, mut a11, mut a02) = (0.0, 0.0, 0.0);
        let (mut a30, mut a21, mut a12, mut a03) = (0.0, 0.0, 0.0, 0.0);

        let last = points[points.len() - 1];
        let (mut xp, mut yp) = (last.x as f64, last.y as f64);
        for p in points {
            let (x, y) = (p.x as f64, p.y as f64);
            let (xp2, yp2, x2, y2) = (xp * xp, yp * yp, x * x, y * y);

            let dxy = xp * y - x * yp;
            let xs = xp + x;
            let ys = yp + y;

            a00 += dxy;
            a10 += dxy * xs;
            a01 += dxy * ys;
            a20 += dxy * (xp * xs + x2);
            a11 += dxy * (xp * (ys + yp) + x * (ys + y));
            a02 += dxy * (yp * ys + y2);
            a30 += dxy * xs * (xp2 + x2);
            a03 += dxy * ys * (yp2 + y2);
            a21 += dxy * (xp2 * (3.0 * yp + y) + 2.0 * x * xp * ys + x2 * (yp + 3.0 * y));
            a12 += dxy * (yp2 * (3.0 * xp + x) + 2.0 * y * yp * xs + y2 * (xp + 3.0 * x));

            xp = x;
            yp = y;
        }

        if a00.abs() <= MIN_AREA {
            return None;
        }
        let sign = a00.signum();

        Some(Self {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
            m20: sign * a20 / 12.0,
            m11: sign * a11 / 24.0,
            m02: sign * a02 / 12.0,
            m30: sign * a30 / 20.0,
            m21: sign * a21 / 60.0,
            m12: sign * a12 / 60.0,
            m03: sign * a03 / 20.0,
        })
    }

    pub fn centroid(&self) -> (f64, f64) {
        (self.m10 / self.m00, self.m01 / self.m00)
    }

    /// The seven Hu invariants of the scale-normalised central moments.
    pub fn hu(&self) -> HuMoments {
        let (cx, cy) = self.centroid();

        let mu20 = self.m20 - self.m10 * cx;
        let mu11 = self.m11 - self.m10 * cy;
        let mu02 = self.m02 - self.m01 * cy;
        let mu30 = self.m30 - cx * (3.0 * mu20 + cx * self.m10);
        let mu21 = self.m21 - cx * (2.0 * mu11 + cx * self.m01) - cy * mu20;
        let mu12 = self.m12 - cy * (2.0 * mu11 + cy * self.m10) - cx * mu02;
        let mu03 = self.m03 - cy * (3.0 * mu02 + cy * self.m01);

        let inv_m00 = 1.0 / self.m00;
        let s2 = inv_m00 * inv_m00;
        let s3 = s2 * inv_m00.sqrt();

        let (n20, n11, n02) = (mu20 * s2, mu11 * s2, mu02 * s2);
        let (n30, n21, n12, n03) = (mu30 * s3, mu21 * s3, mu12 * s3, mu03 * s3);

        let mut t0 = n30 + n12;
        let mut t1 = n21 + n03;
        let q0 = t0 * t0;
        let q1 = t1 * t1;
        let n4 = 4.0 * n11;
        let s = n20 + n02;
        let d = n20 - n02;

        let h0 = s;
        let h1 = d * d + n4 * n11;
        let h3 = q0 + q1;
        let h5 = d * (q0 - q1) + n4 * t0 * t1;

        t0 *= q0 - 3.0 * q1;
        t1 *= 3.0 * q0 - q1;

        let r0 = n30 - 3.0 * n12;
        let r1 = 3.0 * n21 - n03;

        let h2 = r0 * r0 + r1 * r1;
        let h4 = r0 * t0 + r1 * t1;
        let h6 = r1 * t0 - r0 * t1;

        HuMoments([h0, h1, h2, h3, h4, h5, h6])
    }
}

/// Translation, scale and rotation invariant shape descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuMoments(pub [f64; 7]);

impl HuMoments {
    /// Descriptor of a simplified contour; `None` when it encloses no area.
    pub fn of_contour(contour: &Contour) -> Option<Self> {
        Moments::of_polygon(contour).map(|m| m.hu())
    }

    /// Largest (signed) element of the descriptor.
    pub fn max_element(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn polygon(points: &[(i32, i32)]) -> Contour {
        Contour::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn square_area_and_centroid() {
        let m = Moments::of_polygon(&polygon(&[(0, 0), (10, 0), (10, 10), (0, 10)])).unwrap();
        assert_close(m.m00, 100.0);
        let (cx, cy) = m.centroid();
        assert_close(cx, 5.0);
        assert_close(cy, 5.0);
    }

    #[test]
    fn orientation_does_not_change_moments() {
        let ccw = Moments::of_polygon(&polygon(&[(0, 0), (10, 0), (10, 4), (0, 4)])).unwrap();
        let cw = Moments::of_polygon(&polygon(&[(0, 0), (0, 4), (10, 4), (10, 0)])).unwrap();
        assert_close(ccw.m00, cw.m00);
        assert_close(ccw.m20, cw.m20);
        assert_close(ccw.m21, cw.m21);
    }

    #[test]
    fn square_hu_invariants() {
        let hu = HuMoments::of_contour(&polygon(&[(0, 0), (10, 0), (10, 10), (0, 10)])).unwrap();
        assert_close(hu.0[0], 1.0 / 6.0);
        for h in &hu.0[1..] {
            assert!(h.abs() < 1e-12);
        }
        assert_close(hu.max_element(), 1.0 / 6.0);
    }

    #[test]
    fn invariant_to_translation_and_scale() {
        let small = HuMoments::of_contour(&polygon(&[(0, 0), (8, 0), (8, 2), (0, 2)])).unwrap();
        let large =
            HuMoments::of_contour(&polygon(&[(50, 30), (82, 30), (82, 38), (50, 38)])).unwrap();
        for (a, b) in small.0.iter().zip(large.0.iter()) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn invariant_to_quarter_turn() {
        let wide = HuMoments::of_contour(&polygon(&[(0, 0), (12, 0), (12, 3), (0, 3)])).unwrap();
        let tall = HuMoments::of_contour(&polygon(&[(0, 0), (3, 0), (3, 12), (0, 12)])).unwrap();
        for (a, b) in wide.0.iter().zip(tall.0.iter()) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn flat_polygon_has_no_descriptor() {
        assert!(HuMoments::of_contour(&polygon(&[(0, 0), (5, 0), (10, 0)])).is_none());
    }
}
