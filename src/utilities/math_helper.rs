use glam::Vec3;

/// Returns -1 if the value is negative and 1 otherwise.
#[inline(always)]
pub fn binary_sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Closest point on segment `start..end` to `point`.
#[inline]
pub fn closest_point_on_segment(start: Vec3, end: Vec3, point: Vec3) -> Vec3 {
    let delta = end - start;
    let length_squared = delta.length_squared();
    if length_squared <= 0.0 {
        return start;
    }
    let t = ((point - start).dot(delta) / length_squared).clamp(0.0, 1.0);
    start + delta * t
}

/// Computes the closest pair of points between segments `p1..q1` and `p2..q2`.
///
/// Degenerate (zero length) segments are handled as points. Returns the points on the first and
/// second segment respectively.
pub fn closest_points_segment_to_segment(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t);
    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }
    if a <= f32::EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments pick an arbitrary s and let the clamps below fix up t.
            let mut s_candidate = if denom != 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t_candidate = (b * s_candidate + f) / e;
            if t_candidate < 0.0 {
                t_candidate = 0.0;
                s_candidate = (-c / a).clamp(0.0, 1.0);
            } else if t_candidate > 1.0 {
                t_candidate = 1.0;
                s_candidate = ((b - c) / a).clamp(0.0, 1.0);
            }
            s = s_candidate;
            t = t_candidate;
        }
    }
    (p1 + d1 * s, p2 + d2 * t)
}
