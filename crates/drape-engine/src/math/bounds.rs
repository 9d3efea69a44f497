use glam::DVec3;

/// Bounding sphere in world coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    #[inline]
    pub const fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Sphere around the axis-aligned box of `points`. `None` for no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = DVec3>,
    {
        let points: Vec<DVec3> = points.into_iter().collect();
        let first = *points.first()?;

        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f64, f64::max);

        Some(Self { center, radius })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.radius >= 0.0 && self.radius.is_finite() && self.center.is_finite()
    }

    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        p.distance(self.center) <= self.radius
    }
}
