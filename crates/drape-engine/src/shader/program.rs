use std::fmt::Write as _;

/// Vertex entry point of composed programs.
pub const VERTEX_ENTRY: &str = "vs_main";

/// Fragment entry point of composed programs.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Bind group holding the host's per-frame matrices.
pub const FRAME_BIND_GROUP: u32 = 0;

/// Where a contributed function is called from.
///
/// Vertex functions take no arguments and may read/write the host's private
/// globals (`drape_vertex`, `drape_position`) and any declared varyings.
/// Fragment functions receive the working color as
/// `ptr<function, vec4<f32>>` and may overwrite `drape_frag_depth`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum InjectionPoint {
    /// After the host has computed the clip-space position.
    VertexPostLighting,
    /// Before the host's fragment shading.
    FragmentPreLighting,
}

/// A named WGSL function registered at an injection point.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderFunction {
    pub name: String,
    pub location: InjectionPoint,
    pub source: String,
}

/// A value passed from the vertex stage to the fragment stage.
///
/// Exposed to both stages as a module-scope `var<private>` of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Varying {
    pub name: String,
    pub ty: &'static str,
}

/// Named collection of shader contributions.
#[derive(Debug, Clone, Default)]
pub struct VirtualProgram {
    name: String,
    declarations: Vec<String>,
    varyings: Vec<Varying>,
    functions: Vec<ShaderFunction>,
}

impl VirtualProgram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `source` (which must define `fn <name>`) at `location`.
    ///
    /// Registering an existing name replaces the earlier function.
    pub fn set_function(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        location: InjectionPoint,
    ) {
        let function = ShaderFunction {
            name: name.into(),
            location,
            source: source.into(),
        };
        match self.functions.iter_mut().find(|f| f.name == function.name) {
            Some(existing) => *existing = function,
            None => self.functions.push(function),
        }
    }

    /// Adds module-scope declarations (bindings, constants, helpers).
    pub fn add_declarations(&mut self, source: impl Into<String>) {
        self.declarations.push(source.into());
    }

    /// Declares a varying; repeated names are ignored.
    pub fn add_varying(&mut self, name: impl Into<String>, ty: &'static str) {
        let name = name.into();
        if self.varyings.iter().all(|v| v.name != name) {
            self.varyings.push(Varying { name, ty });
        }
    }

    pub fn functions(&self) -> &[ShaderFunction] {
        &self.functions
    }

    pub fn functions_at(&self, location: InjectionPoint) -> impl Iterator<Item = &ShaderFunction> {
        self.functions.iter().filter(move |f| f.location == location)
    }

    pub fn varyings(&self) -> &[Varying] {
        &self.varyings
    }

    /// Links every contribution into one WGSL module with `vs_main`/`fs_main`.
    ///
    /// Vertex input: `@location(0) position: vec3<f32>`, `@location(1) color:
    /// vec4<f32>` (see [`OverlayVertex`](crate::scene::OverlayVertex)).
    pub fn compose(&self) -> String {
        let mut src = String::new();

        let _ = writeln!(src, "// program: {}", self.name);
        let _ = writeln!(
            src,
            "struct DrapeFrame {{\n    model_view: mat4x4<f32>,\n    projection: mat4x4<f32>,\n}}"
        );
        let _ = writeln!(
            src,
            "@group({FRAME_BIND_GROUP}) @binding(0) var<uniform> drape_frame: DrapeFrame;\n"
        );
        src.push_str("var<private> drape_vertex: vec4<f32>;\n");
        src.push_str("var<private> drape_position: vec4<f32>;\n");
        src.push_str("var<private> drape_frag_depth: f32;\n");
        for v in &self.varyings {
            let _ = writeln!(src, "var<private> {}: {};", v.name, v.ty);
        }
        src.push('\n');

        for decl in &self.declarations {
            src.push_str(decl);
            src.push('\n');
        }
        for f in &self.functions {
            src.push_str(&f.source);
            src.push('\n');
        }

        // ── interface ────────────────────────────────────────────────────
        src.push_str(
            "struct VertexInput {\n    @location(0) position: vec3<f32>,\n    @location(1) color: vec4<f32>,\n}\n\n",
        );
        src.push_str("struct VertexOutput {\n    @builtin(position) clip: vec4<f32>,\n    @location(0) color: vec4<f32>,\n");
        for (i, v) in self.varyings.iter().enumerate() {
            let _ = writeln!(src, "    @location({}) {}: {},", i + 1, v.name, v.ty);
        }
        src.push_str("}\n\n");
        src.push_str(
            "struct FragmentOutput {\n    @location(0) color: vec4<f32>,\n    @builtin(frag_depth) depth: f32,\n}\n\n",
        );

        // ── vertex ───────────────────────────────────────────────────────
        let _ = writeln!(src, "@vertex\nfn {VERTEX_ENTRY}(in: VertexInput) -> VertexOutput {{");
        src.push_str("    drape_vertex = vec4<f32>(in.position, 1.0);\n");
        src.push_str("    drape_position = drape_frame.projection * drape_frame.model_view * drape_vertex;\n");
        for f in self.functions_at(InjectionPoint::VertexPostLighting) {
            let _ = writeln!(src, "    {}();", f.name);
        }
        src.push_str("    var out: VertexOutput;\n    out.clip = drape_position;\n    out.color = in.color;\n");
        for v in &self.varyings {
            let _ = writeln!(src, "    out.{0} = {0};", v.name);
        }
        src.push_str("    return out;\n}\n\n");

        // ── fragment ─────────────────────────────────────────────────────
        let _ = writeln!(src, "@fragment\nfn {FRAGMENT_ENTRY}(in: VertexOutput) -> FragmentOutput {{");
        for v in &self.varyings {
            let _ = writeln!(src, "    {0} = in.{0};", v.name);
        }
        src.push_str("    drape_frag_depth = in.clip.z;\n    var color = in.color;\n");
        for f in self.functions_at(InjectionPoint::FragmentPreLighting) {
            let _ = writeln!(src, "    {}(&color);", f.name);
        }
        src.push_str("    var out: FragmentOutput;\n    out.color = color;\n    out.depth = drape_frag_depth;\n    return out;\n}\n");

        src
    }
}

/// Formats `v` as a WGSL float literal.
pub fn wgsl_f32(v: f64) -> String {
    let s = format!("{:?}", v as f32);
    if s.contains(['.', 'e', 'E']) || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> VirtualProgram {
        let mut vp = VirtualProgram::new("test program");
        vp.add_varying("tint", "vec4<f32>");
        vp.set_function("lift", "fn lift() { drape_position.y += 1.0; }", InjectionPoint::VertexPostLighting);
        vp.set_function(
            "shade",
            "fn shade(color: ptr<function, vec4<f32>>) { *color = tint; }",
            InjectionPoint::FragmentPreLighting,
        );
        vp
    }

    #[test]
    fn functions_are_called_at_their_injection_points() {
        let src = program().compose();
        let vs = src.find("fn vs_main").unwrap();
        let fs = src.find("fn fs_main").unwrap();
        let lift = src.rfind("lift();").unwrap();
        let shade = src.rfind("shade(&color);").unwrap();
        assert!(vs < lift && lift < fs);
        assert!(fs < shade);
    }

    #[test]
    fn varyings_are_linked_through_the_interface() {
        let src = program().compose();
        assert!(src.contains("var<private> tint: vec4<f32>;"));
        assert!(src.contains("@location(1) tint: vec4<f32>,"));
        assert!(src.contains("out.tint = tint;"));
        assert!(src.contains("tint = in.tint;"));
    }

    #[test]
    fn set_function_replaces_same_name() {
        let mut vp = program();
        vp.set_function("lift", "fn lift() {}", InjectionPoint::VertexPostLighting);
        assert_eq!(vp.functions().len(), 2);
        assert_eq!(vp.functions()[0].source, "fn lift() {}");
    }

    #[test]
    fn duplicate_varying_is_ignored() {
        let mut vp = program();
        vp.add_varying("tint", "vec4<f32>");
        assert_eq!(vp.varyings().len(), 1);
    }

    #[test]
    fn float_literals_always_have_a_fraction() {
        assert_eq!(wgsl_f32(10.0), "10.0");
        assert_eq!(wgsl_f32(10_000_000.0), "10000000.0");
        assert_eq!(wgsl_f32(0.5), "0.5");
    }
}
