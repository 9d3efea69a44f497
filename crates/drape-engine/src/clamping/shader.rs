//! WGSL generation for the clamping program, plus CPU evaluations of the same
//! math for tests and diagnostics.

use glam::{DMat4, DVec4};

use crate::shader::{wgsl_f32, InjectionPoint, VirtualProgram};

use super::transform::DepthTransforms;

// ── interface names ───────────────────────────────────────────────────────

pub const PROGRAM_NAME: &str = "drape clamping program";
pub const VERTEX_FUNCTION: &str = "drape_clamp_vertex";
pub const FRAGMENT_FUNCTION: &str = "drape_clamp_fragment";

pub const DEPTH_TEXTURE: &str = "drape_clamp_depth_tex";
pub const DEPTH_SAMPLER: &str = "drape_clamp_depth_sampler";
pub const EYE_TO_DEPTH_CLIP: &str = "drape_clamp_eye_to_depth_clip";
pub const DEPTH_CLIP_TO_EYE: &str = "drape_clamp_depth_clip_to_eye";
pub const SIM_VERTEX: &str = "drape_clamp_sim_vert";
pub const SIM_RANGE: &str = "drape_clamp_sim_range";

/// Bindings inside the technique's reserved bind group.
pub const BINDING_DEPTH_TEXTURE: u32 = 0;
pub const BINDING_DEPTH_SAMPLER: u32 = 1;
pub const BINDING_EYE_TO_DEPTH_CLIP: u32 = 2;
pub const BINDING_DEPTH_CLIP_TO_EYE: u32 = 3;

// ── depth offset ──────────────────────────────────────────────────────────

/// Distance-scaled depth offset applied to clamped vertices.
///
/// The offset grows linearly from `min_offset` at `min_range` to `max_offset`
/// at `max_range` and is constant outside that interval. Values are
/// empirical; tune them for the scene scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthOffset {
    pub min_offset: f64,
    pub max_offset: f64,
    pub min_range: f64,
    pub max_range: f64,
}

impl Default for DepthOffset {
    fn default() -> Self {
        Self {
            min_offset: 10.0,
            max_offset: 10_000.0,
            min_range: 1_000.0,
            max_range: 10_000_000.0,
        }
    }
}

impl DepthOffset {
    /// Offset toward the eye for a vertex `range` units away.
    pub fn offset(&self, range: f64) -> f64 {
        let span = self.max_range - self.min_range;
        let ratio = if span > 0.0 {
            (range.clamp(self.min_range, self.max_range) - self.min_range) / span
        } else {
            0.0
        };
        self.min_offset + ratio * (self.max_offset - self.min_offset)
    }
}

/// Output depth for a simulated vertex at normalized depth `sim_depth`.
///
/// An offset that pushed the vertex behind the eye projects past the far
/// plane; such fragments are pulled to the near plane instead.
#[inline]
pub fn fragment_depth(sim_depth: f64, sim_range: f64) -> f64 {
    let depth = if sim_depth > 1.0 && sim_range < 0.0 {
        0.0
    } else {
        sim_depth
    };
    depth.max(0.0)
}

/// Result of the vertex stage for one vertex.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClampedVertex {
    /// Clip position on the captured surface.
    pub position: DVec4,
    /// Clip position after the depth offset.
    pub sim_vertex: DVec4,
    /// Distance from the eye after the depth offset; negative behind the eye.
    pub sim_range: f64,
}

impl ClampedVertex {
    /// Runs the vertex stage for eye-space `eye`, reading captured depth
    /// through `sample` (texture coordinates in, depth out).
    pub fn evaluate<F>(
        eye: DVec4,
        transforms: &DepthTransforms,
        projection: &DMat4,
        offset: &DepthOffset,
        sample: F,
    ) -> Self
    where
        F: FnOnce(f64, f64) -> f64,
    {
        let tc = transforms.to_depth_clip(eye);
        let depth = sample(tc.x / tc.w, tc.y / tc.w);
        let v_eye = transforms.reconstruct_eye(tc, depth);
        let position = *projection * v_eye;

        let v_eye3 = v_eye.truncate() / v_eye.w;
        let range = v_eye3.length();
        let offset = offset.offset(range);
        let sim_eye3 = v_eye3 - v_eye3.normalize_or_zero() * offset;
        let sim_vertex = *projection * (sim_eye3 * v_eye.w).extend(v_eye.w);

        Self {
            position,
            sim_vertex,
            sim_range: range - offset,
        }
    }

    /// Depth the fragment stage writes for this vertex.
    #[inline]
    pub fn fragment_depth(&self) -> f64 {
        fragment_depth(self.sim_vertex.z / self.sim_vertex.w, self.sim_range)
    }
}

// ── WGSL ──────────────────────────────────────────────────────────────────

/// Parameters the generated source depends on.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClampingShader {
    /// Bind group holding the depth texture and transform uniforms.
    pub bind_group: u32,
    pub depth_offset: DepthOffset,
    /// Bound out-of-range samples in the shader (no border sampler support).
    pub emulate_border: bool,
}

impl ClampingShader {
    /// Bindings, constants and the depth lookup helper.
    pub fn declarations(&self) -> String {
        let g = self.bind_group;
        let o = &self.depth_offset;
        let border = if self.emulate_border {
            "    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0))) {\n        return 1.0;\n    }\n"
        } else {
            ""
        };

        format!(
            "@group({g}) @binding({BINDING_DEPTH_TEXTURE}) var {DEPTH_TEXTURE}: texture_2d<f32>;\n\
             @group({g}) @binding({BINDING_DEPTH_SAMPLER}) var {DEPTH_SAMPLER}: sampler;\n\
             @group({g}) @binding({BINDING_EYE_TO_DEPTH_CLIP}) var<uniform> {EYE_TO_DEPTH_CLIP}: mat4x4<f32>;\n\
             @group({g}) @binding({BINDING_DEPTH_CLIP_TO_EYE}) var<uniform> {DEPTH_CLIP_TO_EYE}: mat4x4<f32>;\n\
             \n\
             const DRAPE_CLAMP_MIN_OFFSET: f32 = {min_offset};\n\
             const DRAPE_CLAMP_MAX_OFFSET: f32 = {max_offset};\n\
             const DRAPE_CLAMP_MIN_RANGE: f32 = {min_range};\n\
             const DRAPE_CLAMP_MAX_RANGE: f32 = {max_range};\n\
             \n\
             fn drape_clamp_texel(st: vec2<f32>, inv_size: vec2<f32>) -> f32 {{\n\
             \x20   return textureSampleLevel({DEPTH_TEXTURE}, {DEPTH_SAMPLER}, (st + vec2<f32>(0.5)) * inv_size, 0.0).x;\n\
             }}\n\
             \n\
             // Bilinear over the four texels around uv; the sampler fetches single texels.\n\
             fn drape_clamp_sample_depth(tc: vec4<f32>) -> f32 {{\n\
             \x20   let uv = tc.xy / tc.w;\n\
             {border}\
             \x20   let size = vec2<f32>(textureDimensions({DEPTH_TEXTURE}, 0));\n\
             \x20   let inv_size = 1.0 / size;\n\
             \x20   let st = uv * size - vec2<f32>(0.5);\n\
             \x20   let base = floor(st);\n\
             \x20   let f = st - base;\n\
             \x20   let d00 = drape_clamp_texel(base, inv_size);\n\
             \x20   let d10 = drape_clamp_texel(base + vec2<f32>(1.0, 0.0), inv_size);\n\
             \x20   let d01 = drape_clamp_texel(base + vec2<f32>(0.0, 1.0), inv_size);\n\
             \x20   let d11 = drape_clamp_texel(base + vec2<f32>(1.0, 1.0), inv_size);\n\
             \x20   return mix(mix(d00, d10, f.x), mix(d01, d11, f.x), f.y);\n\
             }}\n",
            min_offset = wgsl_f32(o.min_offset),
            max_offset = wgsl_f32(o.max_offset),
            min_range = wgsl_f32(o.min_range),
            max_range = wgsl_f32(o.max_range),
        )
    }

    pub fn vertex_source(&self) -> String {
        format!(
            "fn {VERTEX_FUNCTION}() {{\n\
             \x20   let tc = {EYE_TO_DEPTH_CLIP} * drape_frame.model_view * drape_vertex;\n\
             \x20   let d = drape_clamp_sample_depth(tc);\n\
             \x20   let p = vec4<f32>(tc.xy / tc.w, d, 1.0);\n\
             \x20   let v_eye = {DEPTH_CLIP_TO_EYE} * p;\n\
             \x20   drape_position = drape_frame.projection * v_eye;\n\
             \n\
             \x20   let v_eye3 = v_eye.xyz / v_eye.w;\n\
             \x20   let range = length(v_eye3);\n\
             \x20   let ratio = (clamp(range, DRAPE_CLAMP_MIN_RANGE, DRAPE_CLAMP_MAX_RANGE) - DRAPE_CLAMP_MIN_RANGE)\n\
             \x20       / (DRAPE_CLAMP_MAX_RANGE - DRAPE_CLAMP_MIN_RANGE);\n\
             \x20   let offset = DRAPE_CLAMP_MIN_OFFSET + ratio * (DRAPE_CLAMP_MAX_OFFSET - DRAPE_CLAMP_MIN_OFFSET);\n\
             \x20   let dir = select(vec3<f32>(0.0), v_eye3 / range, range > 0.0);\n\
             \x20   let sim_eye3 = v_eye3 - dir * offset;\n\
             \x20   {SIM_VERTEX} = drape_frame.projection * vec4<f32>(sim_eye3 * v_eye.w, v_eye.w);\n\
             \x20   {SIM_RANGE} = range - offset;\n\
             }}\n"
        )
    }

    pub fn fragment_source(&self) -> String {
        format!(
            "fn {FRAGMENT_FUNCTION}(color: ptr<function, vec4<f32>>) {{\n\
             \x20   var sim_depth = {SIM_VERTEX}.z / {SIM_VERTEX}.w;\n\
             \x20   if (sim_depth > 1.0 && {SIM_RANGE} < 0.0) {{\n\
             \x20       sim_depth = 0.0;\n\
             \x20   }}\n\
             \x20   drape_frag_depth = max(0.0, sim_depth);\n\
             }}\n"
        )
    }

    /// Registers the clamping contributions on `program`.
    pub fn install(&self, program: &mut VirtualProgram) {
        program.add_varying(SIM_VERTEX, "vec4<f32>");
        program.add_varying(SIM_RANGE, "f32");
        program.add_declarations(self.declarations());
        program.set_function(VERTEX_FUNCTION, self.vertex_source(), InjectionPoint::VertexPostLighting);
        program.set_function(FRAGMENT_FUNCTION, self.fragment_source(), InjectionPoint::FragmentPreLighting);
    }

    /// The complete overlay program.
    pub fn program(&self) -> VirtualProgram {
        let mut program = VirtualProgram::new(PROGRAM_NAME);
        self.install(&mut program);
        program
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    fn shader(emulate_border: bool) -> ClampingShader {
        ClampingShader {
            bind_group: 3,
            depth_offset: DepthOffset::default(),
            emulate_border,
        }
    }

    // ── depth offset ──────────────────────────────────────────────────────

    #[test]
    fn offset_is_min_inside_min_range() {
        let o = DepthOffset::default();
        for r in [0.0, 1.0, 500.0, 1_000.0] {
            assert_eq!(o.offset(r), 10.0);
        }
    }

    #[test]
    fn offset_is_max_beyond_max_range() {
        let o = DepthOffset::default();
        for r in [10_000_000.0, 2e7, 1e12] {
            assert_eq!(o.offset(r), 10_000.0);
        }
    }

    #[test]
    fn offset_is_monotonic_and_bounded() {
        let o = DepthOffset::default();
        let mut last = o.offset(0.0);
        let mut r = 1.0;
        while r < 1e9 {
            let cur = o.offset(r);
            assert!(cur >= last, "offset decreased at {r}");
            assert!((10.0..=10_000.0).contains(&cur));
            last = cur;
            r *= 1.37;
        }
    }

    #[test]
    fn offset_midpoint_is_linear() {
        let o = DepthOffset::default();
        let mid = (o.min_range + o.max_range) * 0.5;
        assert!((o.offset(mid) - (o.min_offset + o.max_offset) * 0.5).abs() < 1e-9);
    }

    // ── fragment depth ────────────────────────────────────────────────────

    #[test]
    fn behind_eye_wraparound_goes_to_near_plane() {
        assert_eq!(fragment_depth(1.2, -5.0), 0.0);
    }

    #[test]
    fn beyond_far_plane_is_kept() {
        assert_eq!(fragment_depth(1.2, 5.0), 1.2);
    }

    #[test]
    fn negative_depth_is_floored() {
        assert_eq!(fragment_depth(-0.3, 5.0), 0.0);
        assert_eq!(fragment_depth(0.4, -5.0), 0.4);
    }

    // ── vertex stage ──────────────────────────────────────────────────────

    #[test]
    fn vertex_lands_on_captured_surface_and_moves_toward_eye() {
        // Drape camera straight down onto a flat surface at z = 25.
        let depth_view = DMat4::look_at_rh(DVec3::new(0.0, 0.0, 1_000.0), DVec3::ZERO, DVec3::Y);
        let depth_proj = DMat4::orthographic_rh(-500.0, 500.0, -500.0, 500.0, 10.0, 2_000.0);
        let main_view = DMat4::look_at_rh(DVec3::new(0.0, -3_000.0, 2_000.0), DVec3::ZERO, DVec3::Z);
        let main_proj = DMat4::perspective_rh(1.0, 1.5, 10.0, 50_000.0);
        let t = DepthTransforms::derive(&main_view, &depth_view, &depth_proj).unwrap();

        let surface_depth = {
            let clip = depth_proj * depth_view * DVec4::new(0.0, 0.0, 25.0, 1.0);
            clip.z / clip.w
        };

        let vertex_world = DVec4::new(120.0, -80.0, 0.0, 1.0);
        let eye = main_view * vertex_world;
        let v = ClampedVertex::evaluate(eye, &t, &main_proj, &DepthOffset::default(), |u, v| {
            assert!((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v));
            surface_depth
        });

        let expected_eye = main_view * DVec4::new(120.0, -80.0, 25.0, 1.0);
        let expected = main_proj * expected_eye;
        assert!((v.position / v.position.w).abs_diff_eq(expected / expected.w, 1e-9));

        let range = expected_eye.truncate().length();
        assert!((v.sim_range - (range - DepthOffset::default().offset(range))).abs() < 1e-6);
        assert!(v.fragment_depth() < v.position.z / v.position.w);
    }

    #[test]
    fn vertex_at_eye_stays_finite() {
        // Identity chain with the captured surface through the eye point.
        let t = DepthTransforms::from_forward(crate::clamping::scale_bias()).unwrap();
        let proj = DMat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let v = ClampedVertex::evaluate(DVec4::W, &t, &proj, &DepthOffset::default(), |_, _| 0.0);
        assert_eq!(v.sim_range, -DepthOffset::default().min_offset);
        assert!(v.position.is_finite());
        assert!(v.sim_vertex.is_finite());
        assert!(v.sim_range.is_finite());
    }

    #[test]
    fn vertex_offset_direction_is_guarded_at_eye() {
        let src = shader(false).vertex_source();
        assert!(src.contains("select(vec3<f32>(0.0), v_eye3 / range, range > 0.0)"));
        assert!(!src.contains("normalize("));
    }

    #[test]
    fn depth_lookup_blends_four_texels() {
        let src = shader(false).declarations();
        assert_eq!(src.matches("drape_clamp_texel(base").count(), 4);
        assert!(src.contains("textureSampleLevel(drape_clamp_depth_tex, drape_clamp_depth_sampler"));
        assert!(!src.contains("texture_depth_2d"));
    }

    // ── source generation ─────────────────────────────────────────────────

    #[test]
    fn declarations_use_reserved_group_and_named_constants() {
        let src = shader(false).declarations();
        assert!(src.contains("@group(3) @binding(0) var drape_clamp_depth_tex: texture_2d<f32>;"));
        assert!(src.contains("var<uniform> drape_clamp_eye_to_depth_clip: mat4x4<f32>;"));
        assert!(src.contains("var<uniform> drape_clamp_depth_clip_to_eye: mat4x4<f32>;"));
        assert!(src.contains("const DRAPE_CLAMP_MIN_OFFSET: f32 = 10.0;"));
        assert!(src.contains("const DRAPE_CLAMP_MAX_RANGE: f32 = 10000000.0;"));
        assert!(!src.contains("return 1.0;"));
    }

    #[test]
    fn border_emulation_is_emitted_on_request() {
        assert!(shader(true).declarations().contains("return 1.0;"));
    }

    #[test]
    fn tuned_offsets_reach_the_source() {
        let mut s = shader(false);
        s.depth_offset.max_offset = 250.0;
        assert!(s.declarations().contains("const DRAPE_CLAMP_MAX_OFFSET: f32 = 250.0;"));
    }

    #[test]
    fn program_wires_both_stages() {
        let src = shader(false).program().compose();
        assert!(src.contains("drape_clamp_vertex();"));
        assert!(src.contains("drape_clamp_fragment(&color);"));
        assert!(src.contains("@location(1) drape_clamp_sim_vert: vec4<f32>,"));
        assert!(src.contains("@location(2) drape_clamp_sim_range: f32,"));
        assert!(src.contains("drape_frag_depth = max(0.0, sim_depth);"));
    }
}
