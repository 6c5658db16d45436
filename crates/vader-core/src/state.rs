//! Per-surface render state
//!
//! A `RenderState` owns the backend, the current program and the quad
//! buffer for one drawing surface. It starts `Uninitialized`, becomes
//! `Compiled` after the first successful compile, and stays there: a later
//! failed compile keeps the previous program in place.

use std::time::Instant;

use crate::backend::{Backend, BufferHandle, ProgramHandle};
use crate::error::{Diagnostic, Result, VaderError};
use crate::infer::{SHADERTOY_DIRECTIVE, has_shadertoy_directive};
use crate::program;
use crate::registry::{self, UpdateOutcome};
use crate::uniform::{UniformSet, UniformValue};

/// Two triangles covering clip space
pub const SCREEN_QUAD: [f32; 12] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0];

/// Uniform and entry-point convention used for a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupportMode {
    #[default]
    Default,
    /// `mainImage` entry point with the `i*` inputs
    Shadertoy,
}

impl SupportMode {
    /// Mode to use for `source`: the directive wins over the requested mode
    pub fn resolve(self, source: &str) -> Self {
        if has_shadertoy_directive(source) {
            SupportMode::Shadertoy
        } else {
            self
        }
    }
}

impl std::str::FromStr for SupportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(SupportMode::Default),
            "shadertoy" => Ok(SupportMode::Shadertoy),
            other => Err(format!("unknown support mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Uninitialized,
    Compiled,
}

/// Everything needed to draw one shader to one surface
pub struct RenderState<B: Backend> {
    pub(crate) label: String,
    pub(crate) backend: B,
    pub(crate) mode: SupportMode,
    pub(crate) program: Option<ProgramHandle>,
    /// User source as supplied, kept for recompiles
    pub(crate) source: String,
    /// Wrapped and substituted source of the current program
    pub(crate) processed_source: String,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) frame: u64,
    pub(crate) epoch: Instant,
    /// Seconds since `epoch` when the last frame finished
    pub(crate) time_at_last_frame: f32,
    pub(crate) needs_recompile: bool,
    pub(crate) position_attribute: Option<u32>,
    pub(crate) vertex_buffer: Option<BufferHandle>,
}

impl<B: Backend> RenderState<B> {
    /// Create an uncompiled state
    pub fn new(label: impl Into<String>, backend: B, mode: SupportMode) -> Self {
        Self {
            label: label.into(),
            backend,
            mode,
            program: None,
            source: String::new(),
            processed_source: String::new(),
            diagnostics: Vec::new(),
            frame: 0,
            epoch: Instant::now(),
            time_at_last_frame: 0.0,
            needs_recompile: false,
            position_attribute: None,
            vertex_buffer: None,
        }
    }

    /// Create a state and compile `source` into it
    ///
    /// A `VADER_MODE(shadertoy)` directive in the source overrides `mode`.
    pub fn init(
        label: impl Into<String>,
        backend: B,
        source: &str,
        uniforms: &mut UniformSet,
        mode: SupportMode,
    ) -> Result<Self> {
        let resolved = mode.resolve(source);
        if resolved != mode {
            log::info!("Vader::init - '{}' forcing support mode", SHADERTOY_DIRECTIVE);
        }
        let mut state = Self::new(label, backend, resolved);
        log::debug!("Vader::init[{}] mode {:?}, {} uniforms", state.label, state.mode, uniforms.len());
        state.compile(source, uniforms)?;
        Ok(state)
    }

    /// Compile `source`, replacing the current program on success
    pub fn compile(&mut self, source: &str, uniforms: &mut UniformSet) -> Result<Vec<Diagnostic>> {
        program::compile(self, source, uniforms)
    }

    /// Draw one frame
    ///
    /// Recompiles first when a static value changed since the last compile.
    pub fn render(&mut self, uniforms: &mut UniformSet) -> Result<()> {
        if self.program.is_none() {
            return Err(VaderError::NotCompiled);
        }

        if self.needs_recompile {
            let source = self.source.clone();
            self.compile(&source, uniforms)?;
        }

        let program = self.program.ok_or(VaderError::NotCompiled)?;

        let (width, height) = self.backend.drawable_size();
        self.backend.viewport(0, 0, width, height);
        self.backend.use_program(Some(program));

        if let Some(attribute) = self.position_attribute {
            self.backend.enable_vertex_attrib_array(attribute);
            self.backend.bind_array_buffer(self.vertex_buffer);
            self.backend.vertex_attrib_pointer_f32(attribute, 2, 0, 0);
        }

        registry::commit_uniforms(&mut self.backend, program, uniforms)?;

        self.backend.draw_triangles(0, 6);

        self.frame += 1;
        self.time_at_last_frame = self.elapsed();
        Ok(())
    }

    /// Set a uniform's value through its kind's update rule
    pub fn update_uniform(
        &mut self,
        uniforms: &mut UniformSet,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<UpdateOutcome> {
        let uniform = uniforms
            .get_mut(name)
            .ok_or_else(|| VaderError::UnknownUniform { name: name.to_string() })?;

        let outcome = registry::update(Some(&mut self.backend as &mut dyn Backend), uniform, value)?;
        if outcome == UpdateOutcome::RecompileRequired {
            log::debug!("Vader[{}] '{}' changed, recompile scheduled", self.label, name);
            self.needs_recompile = true;
        }
        Ok(outcome)
    }

    /// Add a uniform whose kind is inferred from the current source
    ///
    /// The source is wrapped for the mode first, so prologue names resolve.
    pub fn declare_uniform(
        &mut self,
        uniforms: &mut UniformSet,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<()> {
        let location = self.program.and_then(|p| self.backend.uniform_location(p, name));
        let wrapped = program::wrap_source(self.mode, &self.source);
        let uniform = crate::uniform::create_inferred(location, name, value.into(), &wrapped)?;
        uniforms.insert(name, uniform);
        Ok(())
    }

    /// Release the program and vertex buffer
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn destroy(&mut self) {
        if let Some(program) = self.program.take() {
            self.backend.delete_program(program);
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            self.backend.delete_buffer(buffer);
        }
        self.position_attribute = None;
    }

    // === Accessors ===

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mode(&self) -> SupportMode {
        self.mode
    }

    pub fn phase(&self) -> RenderPhase {
        match self.program {
            Some(_) => RenderPhase::Compiled,
            None => RenderPhase::Uninitialized,
        }
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn needs_recompile(&self) -> bool {
        self.needs_recompile
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn processed_source(&self) -> &str {
        &self.processed_source
    }

    /// Diagnostics from the most recent successful compile
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Seconds since the state was created
    pub fn elapsed(&self) -> f32 {
        self.epoch.elapsed().as_secs_f32()
    }

    pub fn time_at_last_frame(&self) -> f32 {
        self.time_at_last_frame
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: Backend> Drop for RenderState<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::RgbaImage;

    use super::*;
    use crate::defaults::generate_default_uniforms;
    use crate::mock::{BackendCall, RecordingBackend};
    use crate::registry::create;
    use crate::uniform::{UniformKind, UniformLength};

    const RED_TIME: &str = "void main(){ gl_FragColor = vec4(u_time,0,0,1); }";

    fn compiled(source: &str, uniforms: &mut UniformSet) -> RenderState<RecordingBackend> {
        RenderState::init("test", RecordingBackend::new(), source, uniforms, SupportMode::Default)
            .unwrap()
    }

    #[test]
    fn test_end_to_end_default_mode() {
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let mut state = compiled(RED_TIME, &mut uniforms);

        assert_eq!(state.phase(), RenderPhase::Compiled);
        assert!(!state.needs_recompile());
        assert_eq!(state.frame(), 0);

        state.render(&mut uniforms).unwrap();

        assert_eq!(state.frame(), 1);
        assert_eq!(state.backend().draw_count(), 1);
        assert!(
            state
                .backend()
                .calls
                .contains(&BackendCall::DrawTriangles { first: 0, count: 6 })
        );
    }

    #[test]
    fn test_render_setup_order() {
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let mut state = compiled(RED_TIME, &mut uniforms);
        state.backend_mut().clear_calls();

        state.render(&mut uniforms).unwrap();

        let calls = &state.backend().calls;
        let program = state.program();
        assert_eq!(
            calls[0],
            BackendCall::Viewport {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            }
        );
        assert_eq!(calls[1], BackendCall::UseProgram(program));
        assert_eq!(calls[2], BackendCall::EnableVertexAttribArray(0));
        assert!(matches!(calls.last(), Some(BackendCall::DrawTriangles { .. })));
    }

    #[test]
    fn test_quad_buffer_uploaded_once() {
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let mut state = compiled(RED_TIME, &mut uniforms);
        state.compile(RED_TIME, &mut uniforms).unwrap();

        let uploads = state
            .backend()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::ArrayBufferData(_)))
            .count();
        assert_eq!(uploads, 1);
        assert!(
            state
                .backend()
                .calls
                .contains(&BackendCall::ArrayBufferData(SCREEN_QUAD.to_vec()))
        );
    }

    #[test]
    fn test_render_before_compile_fails() {
        let mut state = RenderState::new("bare", RecordingBackend::new(), SupportMode::Default);
        let err = state.render(&mut UniformSet::new()).unwrap_err();
        assert!(matches!(err, VaderError::NotCompiled));
        assert_eq!(state.phase(), RenderPhase::Uninitialized);
    }

    #[test]
    fn test_static_update_triggers_recompile() {
        let src = "#define GAIN VADER_STATIC(GAIN, 1.0)\nvoid main(){ gl_FragColor = vec4(GAIN); }";
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        uniforms.declare("GAIN", "2.0", src).unwrap();
        let mut state = compiled(src, &mut uniforms);
        assert!(state.processed_source().contains("#define GAIN 2.0"));

        state.update_uniform(&mut uniforms, "u_time", 3.0f32).unwrap();
        assert!(!state.needs_recompile());

        let outcome = state.update_uniform(&mut uniforms, "GAIN", "4.0").unwrap();
        assert_eq!(outcome, UpdateOutcome::RecompileRequired);
        assert!(state.needs_recompile());

        state.render(&mut uniforms).unwrap();

        assert!(!state.needs_recompile());
        assert!(state.processed_source().contains("#define GAIN 4.0"));
        assert_eq!(state.backend().programs_created(), 2);
        assert_eq!(state.backend().live_programs(), 1);
    }

    #[test]
    fn test_update_unknown_uniform() {
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let mut state = compiled(RED_TIME, &mut uniforms);
        let err = state.update_uniform(&mut uniforms, "u_nope", 1.0f32).unwrap_err();
        assert!(matches!(err, VaderError::UnknownUniform { name } if name == "u_nope"));
    }

    #[test]
    fn test_directive_forces_shadertoy() {
        let src = "// VADER_MODE(shadertoy)\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(iTime); }";
        let mut uniforms = generate_default_uniforms(SupportMode::Shadertoy);
        let state = compiled(src, &mut uniforms);

        assert_eq!(state.mode(), SupportMode::Shadertoy);
        assert!(state.processed_source().contains("mainImage(gl_FragColor, gl_FragCoord.xy)"));
        assert!(state.diagnostics().is_empty(), "{:?}", state.diagnostics());
    }

    #[test]
    fn test_textures_bound_in_order_at_render() {
        let src = "uniform sampler2D u_a;\nuniform sampler2D u_b;\nuniform float u_gain;\nvoid main(){}";
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let image = || Arc::new(RgbaImage::new(4, 4));
        uniforms.declare("u_a", image(), src).unwrap();
        uniforms.declare("u_b", image(), src).unwrap();
        uniforms.declare("u_gain", 0.5f32, src).unwrap();

        let mut state = compiled(src, &mut uniforms);
        state.render(&mut uniforms).unwrap();

        assert_eq!(state.backend().texture_units_activated(), vec![1, 2]);
        assert_eq!(state.backend().textures_created(), 2);
    }

    #[test]
    fn test_same_image_update_builds_once() {
        let src = "uniform sampler2D u_tex;\nvoid main(){}";
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        uniforms.declare("u_tex", UniformValue::None, src).unwrap();
        let mut state = compiled(src, &mut uniforms);

        let img = Arc::new(RgbaImage::new(4, 4));
        state.update_uniform(&mut uniforms, "u_tex", img.clone()).unwrap();
        let outcome = state.update_uniform(&mut uniforms, "u_tex", img).unwrap();

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(state.backend().textures_created(), 1);
    }

    #[test]
    fn test_declare_uniform_resolves_location() {
        let src = "uniform vec4 u_tint;\nvoid main(){}";
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let mut state = compiled(src, &mut uniforms);

        state.declare_uniform(&mut uniforms, "u_tint", [1.0, 0.0, 0.0, 1.0]).unwrap();

        let tint = uniforms.get("u_tint").unwrap();
        assert_eq!(tint.kind(), UniformKind::Vec4);
        assert!(tint.location().is_some());
    }

    #[test]
    fn test_declare_uniform_sees_prologue() {
        let mut uniforms = UniformSet::new();
        let mut state = compiled("void main() { gl_FragColor = vec4(u_time); }", &mut uniforms);

        state.declare_uniform(&mut uniforms, "u_time", 2.5f32).unwrap();

        let time = uniforms.get("u_time").unwrap();
        assert_eq!(time.kind(), UniformKind::Float);
        assert!(time.location().is_some());
    }

    #[test]
    fn test_destroy_releases_once() {
        let mut uniforms = generate_default_uniforms(SupportMode::Default);
        let mut state = compiled(RED_TIME, &mut uniforms);
        assert_eq!(state.backend().live_programs(), 1);
        assert_eq!(state.backend().live_buffers(), 1);

        state.destroy();
        state.destroy();

        let deletes = state
            .backend()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::DeleteProgram(_) | BackendCall::DeleteBuffer(_)))
            .count();
        assert_eq!(deletes, 2);
        assert_eq!(state.backend().live_programs(), 0);
        assert_eq!(state.phase(), RenderPhase::Uninitialized);
    }

    #[test]
    fn test_failed_recompile_keeps_source() {
        let src = "#define N VADER_STATIC(N)\nvoid main(){ float x = float(N); }";
        let mut uniforms = UniformSet::new();
        uniforms.insert(
            "N",
            create(UniformKind::StaticMacro, None, UniformLength::Single, "3").unwrap(),
        );
        let mut state = compiled(src, &mut uniforms);

        state.update_uniform(&mut uniforms, "N", "4").unwrap();
        state.backend_mut().fragment_error = Some("ERROR: 0:9: syntax error".into());

        assert!(state.render(&mut uniforms).is_err());
        assert_eq!(state.source(), src);
        assert!(state.needs_recompile());
        assert_eq!(state.phase(), RenderPhase::Compiled);
    }

    #[test]
    fn test_support_mode_from_str() {
        assert_eq!("shadertoy".parse::<SupportMode>(), Ok(SupportMode::Shadertoy));
        assert_eq!("Default".parse::<SupportMode>(), Ok(SupportMode::Default));
        assert!("webgl".parse::<SupportMode>().is_err());
    }
}
