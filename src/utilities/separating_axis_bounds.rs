use glam::Vec3;

/// Interval of a point set projected onto an axis, used for separating axis tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeparatingAxisBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for SeparatingAxisBounds {
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }
}

impl SeparatingAxisBounds {
    /// Projects every point onto `axis`.
    #[inline]
    pub fn from_points(axis: Vec3, points: &[Vec3]) -> Self {
        let mut bounds = Self::default();
        for point in points {
            let p = axis.dot(*point);
            bounds.min = bounds.min.min(p);
            bounds.max = bounds.max.max(p);
        }
        bounds
    }

    /// True if the two intervals do not overlap. Touching intervals overlap.
    #[inline]
    pub fn is_separated(&self, other: &Self) -> bool {
        self.min > other.max || other.min > self.max
    }
}

/// True if `axis` separates the two point sets. Zero-length axes never separate.
#[inline]
pub fn separated_on_axis(axis: Vec3, points_a: &[Vec3], points_b: &[Vec3]) -> bool {
    if axis.length_squared() <= f32::EPSILON * f32::EPSILON {
        return false;
    }
    SeparatingAxisBounds::from_points(axis, points_a)
        .is_separated(&SeparatingAxisBounds::from_points(axis, points_b))
}
