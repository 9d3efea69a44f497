use glam::{DMat4, DVec4};

use super::BoundingSphere;

const EPSILON: f64 = 1e-6;
const NEAR_PULL_RATIO: f64 = 0.98;
const FAR_PUSH_RATIO: f64 = 1.02;

/// How a render pass derives its near/far planes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ComputeNearFar {
    /// Use the projection matrix as given.
    Off,
    /// Fit near/far to the bounding volumes of the rendered content.
    #[default]
    BoundingVolumes,
}

/// Cull-time settings of the active traversal.
///
/// `clamp_projection` is the default near/far clamping algorithm; callbacks
/// installed on a camera may wrap it but should not change its result.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CullSettings {
    pub near_far_mode: ComputeNearFar,
    /// Smallest allowed `near / far` for perspective projections.
    pub near_far_ratio: f64,
}

impl Default for CullSettings {
    fn default() -> Self {
        Self {
            near_far_mode: ComputeNearFar::BoundingVolumes,
            near_far_ratio: 0.0005,
        }
    }
}

impl CullSettings {
    /// Tightens `projection` to the computed `znear`/`zfar` distances.
    ///
    /// On success `znear`/`zfar` hold the padded distances actually used and
    /// `projection` maps them to depth 0 and 1. Returns `false` when the range
    /// is inverted (nothing to render) or cannot be represented; `projection`
    /// is then left untouched.
    pub fn clamp_projection(&self, projection: &mut DMat4, znear: &mut f64, zfar: &mut f64) -> bool {
        if *zfar < *znear - EPSILON {
            return false;
        }

        if *zfar < *znear + EPSILON {
            let average = (*znear + *zfar) * 0.5;
            *znear = average - EPSILON;
            *zfar = average + EPSILON;
        }

        let (desired_near, desired_far) = if is_orthographic(projection) {
            let span = ((*zfar - *znear) * 0.02).max(1.0);
            (*znear - span, *zfar + span)
        } else {
            if *zfar <= 0.0 {
                return false;
            }
            let min_near = *zfar * self.near_far_ratio;
            ((*znear * NEAR_PULL_RATIO).max(min_near), *zfar * FAR_PUSH_RATIO)
        };

        *znear = desired_near;
        *zfar = desired_far;

        let depth_near = ndc_depth(projection, desired_near);
        let depth_far = ndc_depth(projection, desired_far);
        let span = depth_far - depth_near;
        if !span.is_finite() || span.abs() < f64::EPSILON {
            return false;
        }

        let remap = DMat4::from_cols(
            DVec4::X,
            DVec4::Y,
            DVec4::new(0.0, 0.0, 1.0 / span, 0.0),
            DVec4::new(0.0, 0.0, -depth_near / span, 1.0),
        );
        *projection = remap * *projection;
        true
    }
}

/// True when the projection has no perspective divide.
#[inline]
pub fn is_orthographic(projection: &DMat4) -> bool {
    let w = projection.row(3);
    w.x.abs() < EPSILON && w.y.abs() < EPSILON && w.z.abs() < EPSILON
}

/// Normalized device depth of the eye-space plane `distance` units ahead.
#[inline]
pub fn ndc_depth(projection: &DMat4, distance: f64) -> f64 {
    let clip = *projection * DVec4::new(0.0, 0.0, -distance, 1.0);
    clip.z / clip.w
}

/// Near/far distances enclosing `bounds` as seen through `view`.
///
/// Near may be negative for content behind the eye plane; the clamp decides
/// what that means for the projection in use.
pub fn compute_near_far(view: &DMat4, bounds: &BoundingSphere) -> Option<(f64, f64)> {
    if !bounds.is_valid() {
        return None;
    }
    let distance = -view.transform_point3(bounds.center).z;
    Some((distance - bounds.radius, distance + bounds.radius))
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    fn ortho() -> DMat4 {
        DMat4::orthographic_rh(-100.0, 100.0, -100.0, 100.0, 0.0, 10_000.0)
    }

    fn perspective() -> DMat4 {
        DMat4::perspective_rh(60f64.to_radians(), 1.5, 1.0, 100_000.0)
    }

    // ── classification ────────────────────────────────────────────────────

    #[test]
    fn detects_orthographic_and_perspective() {
        assert!(is_orthographic(&ortho()));
        assert!(!is_orthographic(&perspective()));
    }

    // ── clamp_projection ──────────────────────────────────────────────────

    #[test]
    fn inverted_range_is_rejected() {
        let mut p = ortho();
        let before = p;
        let (mut n, mut f) = (50.0, 10.0);
        assert!(!CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        assert_eq!(p, before);
    }

    #[test]
    fn orthographic_maps_padded_range_to_unit_depth() {
        let mut p = ortho();
        let (mut n, mut f) = (200.0, 700.0);
        assert!(CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        // 2% of 500 is 10 units of padding.
        assert!((n - 190.0).abs() < 1e-9);
        assert!((f - 710.0).abs() < 1e-9);
        assert!(ndc_depth(&p, n).abs() < 1e-9);
        assert!((ndc_depth(&p, f) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthographic_padding_has_a_floor() {
        let mut p = ortho();
        let (mut n, mut f) = (10.0, 12.0);
        assert!(CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        assert!((n - 9.0).abs() < 1e-9);
        assert!((f - 13.0).abs() < 1e-9);
    }

    #[test]
    fn perspective_pulls_near_and_pushes_far() {
        let mut p = perspective();
        let (mut n, mut f) = (100.0, 1000.0);
        assert!(CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        assert!((n - 98.0).abs() < 1e-9);
        assert!((f - 1020.0).abs() < 1e-9);
        assert!(ndc_depth(&p, n).abs() < 1e-9);
        assert!((ndc_depth(&p, f) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn perspective_near_is_floored_by_ratio() {
        let mut p = perspective();
        let (mut n, mut f) = (-50.0, 10_000.0);
        let cull = CullSettings::default();
        assert!(cull.clamp_projection(&mut p, &mut n, &mut f));
        assert!((n - 10_000.0 * cull.near_far_ratio).abs() < 1e-9);
    }

    #[test]
    fn clamp_preserves_xy_projection() {
        let original = perspective();
        let mut p = original;
        let (mut n, mut f) = (10.0, 500.0);
        assert!(CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        for row in [0, 1, 3] {
            assert!(p.row(row).abs_diff_eq(original.row(row), 1e-12));
        }
    }

    #[test]
    fn coincident_planes_are_separated() {
        let mut p = ortho();
        let (mut n, mut f) = (100.0, 100.0);
        assert!(CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        assert!(f > n);
    }

    // ── compute_near_far ──────────────────────────────────────────────────

    #[test]
    fn near_far_brackets_the_sphere() {
        let view = DMat4::look_at_rh(DVec3::new(0.0, 0.0, 500.0), DVec3::ZERO, DVec3::Y);
        let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, 100.0), 50.0);
        let (n, f) = compute_near_far(&view, &sphere).unwrap();
        assert!((n - 350.0).abs() < 1e-9);
        assert!((f - 450.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_sphere_has_no_range() {
        let sphere = BoundingSphere::new(DVec3::ZERO, f64::NAN);
        assert!(compute_near_far(&DMat4::IDENTITY, &sphere).is_none());
    }
}
