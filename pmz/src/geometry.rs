//! 2D helpers for the drawing interpreters. Everything is plain `f64`; the
//! spline stencil below must reproduce its reference output bit-for-bit, so
//! no coordinate type with rounding is allowed anywhere in this path.

pub type Point = (f64, f64);

pub fn vector_rotate(v: Point, degree: f64) -> Point {
    let r = degree.to_radians();
    (
        v.0 * r.cos() - v.1 * r.sin(),
        v.0 * r.sin() + v.1 * r.cos(),
    )
}

pub fn vector_add(v1: Point, v2: Point) -> Point {
    (v1.0 + v2.0, v1.1 + v2.1)
}

pub fn vector_sub(v1: Point, v2: Point) -> Point {
    (v1.0 - v2.0, v1.1 - v2.1)
}

pub fn vector_mul_s(v: Point, s: f64) -> Point {
    (v.0 * s, v.1 * s)
}

pub fn vector_len(v: Point) -> f64 {
    (v.0 * v.0 + v.1 * v.1).sqrt()
}

/// Unit vector perpendicular to `v`, to its left.
pub fn vector_left(v: Point) -> Point {
    vector_rotate(vector_mul_s(v, 1.0 / vector_len(v)), 90.0)
}

/// Fixed-subdivision smoothing of a control polyline. Each pass inserts
/// midpoints with a 4-point cubic stencil (`3,6,-1 / 8` at the ends,
/// `-1,9,9,-1 / 16` inside), halving the step until every slot is filled.
/// The endpoints are anchored exactly; the result is an approximation, not an
/// interpolating spline. With fewer than 3 points there is no curve to build.
pub fn cubic_interpolate(pts: &[Point]) -> Vec<Point> {
    if pts.len() < 3 {
        return pts.to_vec();
    }

    const STEPS: usize = 8;
    let count = pts.len() - 1;
    let mut coord = vec![0.0f64; (count * STEPS + 1) * 2];

    for (i, pt) in pts.iter().enumerate() {
        coord[2 * i * STEPS] = pt.0;
        coord[2 * i * STEPS + 1] = pt.1;
    }

    let last = 2 * count * STEPS;
    let mut step = STEPS;
    while step > 1 {
        coord[step] = (3.0 * coord[0] + 6.0 * coord[2 * step] - coord[4 * step]) / 8.0;
        coord[step + 1] = (3.0 * coord[1] + 6.0 * coord[2 * step + 1] - coord[4 * step + 1]) / 8.0;

        coord[last - step] =
            (3.0 * coord[last] + 6.0 * coord[last - 2 * step] - coord[last - 4 * step]) / 8.0;
        coord[last - step + 1] = (3.0 * coord[last + 1] + 6.0 * coord[last - 2 * step + 1]
            - coord[last - 4 * step + 1])
            / 8.0;

        for i in 1..(count * STEPS / step - 1) {
            let c = 2 * i * step;
            coord[c + step] = (-coord[c - 2 * step] + 9.0 * coord[c] + 9.0 * coord[c + 2 * step]
                - coord[c + 4 * step])
                / 16.0;
            coord[c + step + 1] = (-coord[c - 2 * step + 1]
                + 9.0 * coord[c + 1]
                + 9.0 * coord[c + 2 * step + 1]
                - coord[c + 4 * step + 1])
                / 16.0;
        }

        step /= 2;
    }

    (0..=count * STEPS)
        .map(|i| (coord[2 * i], coord[2 * i + 1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spline_is_deterministic() {
        let pts = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let a = cubic_interpolate(&pts);
        let b = cubic_interpolate(&pts);
        assert_eq!(a, b);
        assert_eq!(a.len(), 17);
    }

    #[test]
    fn spline_anchors_endpoints() {
        let pts = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)];
        let out = cubic_interpolate(&pts);
        assert_eq!(out[0], (0.0, 0.0));
        assert_eq!(*out.last().unwrap(), (20.0, 10.0));
    }

    #[test]
    fn too_few_points_pass_through() {
        let pts = vec![(0.0, 0.0), (5.0, 5.0)];
        assert_eq!(cubic_interpolate(&pts), pts);
    }

    #[test]
    fn rotate_quarter_turn() {
        let (x, y) = vector_rotate((1.0, 0.0), 90.0);
        assert!((x - 0.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }
}
