use glam::{DMat4, DVec3, DVec4};

/// Maps depth-pass clip coordinates to depth texture coordinates.
///
/// x,y go from [-1, 1] to [0, 1] with v pointing down; z is already a [0, 1]
/// depth and passes through.
#[inline]
pub fn scale_bias() -> DMat4 {
    DMat4::from_translation(DVec3::new(0.5, 0.5, 0.0)) * DMat4::from_scale(DVec3::new(0.5, -0.5, 1.0))
}

/// The per-frame matrix pair uploaded to the clamping shader.
///
/// `depth_clip_to_eye` is always the inverse of `eye_to_depth_clip`; the
/// pair is only ever built together.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthTransforms {
    /// Main view eye space → depth texture space (projective).
    pub eye_to_depth_clip: DMat4,
    /// Depth texture space → main view eye space (homogeneous).
    pub depth_clip_to_eye: DMat4,
}

impl DepthTransforms {
    /// Composes `scale_bias * depth_projection * depth_view * main_view⁻¹` in
    /// double precision so the shader needs one multiply per vertex.
    ///
    /// `depth_projection` must be the projection the depth pass rendered
    /// with, i.e. after near/far clamping. Returns `None` for degenerate
    /// input (singular or non-finite matrices).
    pub fn derive(main_view: &DMat4, depth_view: &DMat4, depth_projection: &DMat4) -> Option<Self> {
        let forward = scale_bias() * *depth_projection * *depth_view * main_view.inverse();
        Self::from_forward(forward)
    }

    pub fn from_forward(eye_to_depth_clip: DMat4) -> Option<Self> {
        if !eye_to_depth_clip.is_finite() {
            return None;
        }
        let det = eye_to_depth_clip.determinant();
        if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
            return None;
        }
        let depth_clip_to_eye = eye_to_depth_clip.inverse();
        if !depth_clip_to_eye.is_finite() {
            return None;
        }
        Some(Self {
            eye_to_depth_clip,
            depth_clip_to_eye,
        })
    }

    /// Projects an eye-space point into depth texture space (before the divide).
    #[inline]
    pub fn to_depth_clip(&self, eye: DVec4) -> DVec4 {
        self.eye_to_depth_clip * eye
    }

    /// Rebuilds the eye-space point under `tc` at captured depth `depth`.
    ///
    /// The result is homogeneous; divide by `w` for a 3D point.
    #[inline]
    pub fn reconstruct_eye(&self, tc: DVec4, depth: f64) -> DVec4 {
        self.depth_clip_to_eye * DVec4::new(tc.x / tc.w, tc.y / tc.w, depth, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{compute_near_far, BoundingSphere, CullSettings};

    /// Deterministic generator for sampled cameras.
    struct Lcg(u64);

    impl Lcg {
        fn unit(&mut self) -> f64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        fn range(&mut self, lo: f64, hi: f64) -> f64 {
            lo + (hi - lo) * self.unit()
        }

        fn point(&mut self, extent: f64) -> DVec3 {
            DVec3::new(
                self.range(-extent, extent),
                self.range(-extent, extent),
                self.range(-extent, extent),
            )
        }
    }

    fn main_view(rng: &mut Lcg) -> DMat4 {
        let eye = rng.point(5_000.0) + DVec3::new(0.0, 0.0, 8_000.0);
        DMat4::look_at_rh(eye, rng.point(1_000.0), DVec3::Z)
    }

    fn drape_camera(rng: &mut Lcg, perspective: bool) -> (DMat4, DMat4) {
        let center = rng.point(500.0);
        let eye = center + DVec3::new(rng.range(-10.0, 10.0), rng.range(-10.0, 10.0), 6_000.0);
        let view = DMat4::look_at_rh(eye, center, DVec3::Y);
        let half = rng.range(500.0, 3_000.0);
        let proj = if perspective {
            DMat4::perspective_rh(rng.range(0.3, 1.2), 1.0, 10.0, 20_000.0)
        } else {
            DMat4::orthographic_rh(-half, half, -half, half, 1.0, 20_000.0)
        };
        (view, proj)
    }

    fn clamped(view: &DMat4, proj: DMat4) -> DMat4 {
        let terrain = BoundingSphere::new(DVec3::ZERO, 2_000.0);
        let (mut n, mut f) = compute_near_far(view, &terrain).unwrap();
        let mut p = proj;
        assert!(CullSettings::default().clamp_projection(&mut p, &mut n, &mut f));
        p
    }

    #[test]
    fn scale_bias_maps_clip_corners_to_texture_corners() {
        let sb = scale_bias();
        assert!((sb * DVec4::new(-1.0, 1.0, 0.25, 1.0)).abs_diff_eq(DVec4::new(0.0, 0.0, 0.25, 1.0), 1e-12));
        assert!((sb * DVec4::new(1.0, -1.0, 0.75, 1.0)).abs_diff_eq(DVec4::new(1.0, 1.0, 0.75, 1.0), 1e-12));
        assert!((sb * DVec4::new(0.0, 0.0, 0.5, 1.0)).abs_diff_eq(DVec4::new(0.5, 0.5, 0.5, 1.0), 1e-12));
    }

    #[test]
    fn inverse_is_consistent_for_sampled_cameras() {
        let mut rng = Lcg(0x5eed);
        for i in 0..200 {
            let view = main_view(&mut rng);
            let (dv, dp) = drape_camera(&mut rng, i % 2 == 1);
            let t = DepthTransforms::derive(&view, &dv, &clamped(&dv, dp)).unwrap();
            let product = t.depth_clip_to_eye * t.eye_to_depth_clip;
            assert!(
                product.abs_diff_eq(DMat4::IDENTITY, 1e-5),
                "sample {i}: {product:?}"
            );
        }
    }

    #[test]
    fn reconstruct_round_trips_exact_depth() {
        let mut rng = Lcg(42);
        for i in 0..200 {
            let view = main_view(&mut rng);
            let (dv, dp) = drape_camera(&mut rng, i % 2 == 1);
            let t = DepthTransforms::derive(&view, &dv, &clamped(&dv, dp)).unwrap();

            let world = rng.point(1_000.0);
            let eye = view * world.extend(1.0);
            let tc = t.to_depth_clip(eye);
            let depth = tc.z / tc.w;

            let back = t.reconstruct_eye(tc, depth);
            let back = back.truncate() / back.w;
            assert!(
                back.abs_diff_eq(eye.truncate(), 1e-6 * eye.truncate().length().max(1.0)),
                "sample {i}: {back:?} vs {eye:?}"
            );
        }
    }

    #[test]
    fn singular_input_is_rejected() {
        let view = DMat4::look_at_rh(DVec3::new(0.0, 0.0, 10.0), DVec3::ZERO, DVec3::Y);
        assert!(DepthTransforms::derive(&view, &view, &DMat4::ZERO).is_none());
        assert!(DepthTransforms::from_forward(DMat4::from_cols_array(&[f64::NAN; 16])).is_none());
    }
}
