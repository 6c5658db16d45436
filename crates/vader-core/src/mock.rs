//! Recording backend for testing
//!
//! Provides a `RecordingBackend` that implements `Backend` without a GPU.
//! Every call is recorded for test assertions. Programs behave enough like
//! the real thing to exercise the runner: uniforms and attributes declared
//! in attached shader source resolve to locations, and compile or link
//! failures can be injected with canned driver logs.

use std::collections::{HashMap, HashSet};

use crate::backend::*;
use crate::infer::parse_uniform_declaration;

/// Record of a backend call for test inspection
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    // Shaders and programs
    CreateShader(ShaderHandle, ShaderStage),
    ShaderSource(ShaderHandle),
    CompileShader(ShaderHandle),
    DeleteShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    AttachShader(ProgramHandle, ShaderHandle),
    LinkProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),

    // Buffers and drawing
    CreateBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    BindArrayBuffer(Option<BufferHandle>),
    ArrayBufferData(Vec<f32>),
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    EnableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        stride: i32,
        offset: i32,
    },
    DrawTriangles {
        first: i32,
        count: i32,
    },

    // Uniform uploads
    Uniform1I(UniformLocation, i32),
    Uniform1F(UniformLocation, f32),
    Uniform2F(UniformLocation, f32, f32),
    Uniform3F(UniformLocation, f32, f32, f32),
    Uniform4F(UniformLocation, f32, f32, f32, f32),
    Uniform3FV(UniformLocation, Vec<f32>),

    // Textures
    CreateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    ActiveTexture(u32),
    BindTexture2D(Option<TextureHandle>),
    TextureWrap(TextureWrap),
    TextureFilter(TextureFilter),
    TexImage2D {
        width: u32,
        height: u32,
    },
}

impl BackendCall {
    /// Location targeted by a uniform upload
    pub fn upload_location(&self) -> Option<UniformLocation> {
        match self {
            BackendCall::Uniform1I(loc, ..)
            | BackendCall::Uniform1F(loc, ..)
            | BackendCall::Uniform2F(loc, ..)
            | BackendCall::Uniform3F(loc, ..)
            | BackendCall::Uniform4F(loc, ..)
            | BackendCall::Uniform3FV(loc, ..) => Some(*loc),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct ShaderState {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramState {
    shaders: Vec<ShaderHandle>,
    linked: bool,
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

/// A backend that records all calls instead of talking to a GPU
#[derive(Debug)]
pub struct RecordingBackend {
    /// All calls made to this backend
    pub calls: Vec<BackendCall>,
    /// Size reported by `drawable_size`
    pub size: (u32, u32),
    /// When set, vertex shaders fail to compile with this log
    pub vertex_error: Option<String>,
    /// When set, fragment shaders fail to compile with this log
    pub fragment_error: Option<String>,
    /// When set, programs fail to link with this log
    pub link_error: Option<String>,

    next_handle: u32,
    shaders: HashMap<ShaderHandle, ShaderState>,
    programs: HashMap<ProgramHandle, ProgramState>,
    buffers: HashSet<BufferHandle>,
    textures: HashSet<TextureHandle>,
    extra_uniforms: Vec<String>,
    sources: Vec<(ShaderStage, String)>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::with_size(800, 600)
    }
}

impl RecordingBackend {
    /// Create a new recording backend with an 800x600 drawable
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recording backend with a specific drawable size
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            calls: Vec::new(),
            size: (width, height),
            vertex_error: None,
            fragment_error: None,
            link_error: None,
            next_handle: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashSet::new(),
            textures: HashSet::new(),
            extra_uniforms: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Make `name` resolvable in every program, declared or not
    pub fn declare_uniform(&mut self, name: &str) {
        if !self.extra_uniforms.iter().any(|n| n == name) {
            self.extra_uniforms.push(name.to_string());
        }
    }

    fn next(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    /// Clear all recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Get the number of recorded calls
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    // === Assertion helpers ===

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of programs ever created
    pub fn programs_created(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateProgram(_)))
    }

    /// Number of textures ever created
    pub fn textures_created(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateTexture(_)))
    }

    /// Number of draw calls issued
    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::DrawTriangles { .. }))
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    /// Texture units passed to `active_texture`, in call order
    pub fn texture_units_activated(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::ActiveTexture(unit) => Some(*unit),
                _ => None,
            })
            .collect()
    }

    /// Every uniform upload, in call order
    pub fn uploads(&self) -> Vec<BackendCall> {
        self.calls
            .iter()
            .filter(|call| call.upload_location().is_some())
            .cloned()
            .collect()
    }

    /// Uniform uploads that targeted one location
    pub fn uploads_for(&self, location: UniformLocation) -> Vec<BackendCall> {
        self.calls
            .iter()
            .filter(|call| call.upload_location() == Some(location))
            .cloned()
            .collect()
    }

    /// Source most recently handed to a shader of `stage`
    pub fn last_source(&self, stage: ShaderStage) -> Option<&str> {
        self.sources
            .iter()
            .rev()
            .find(|(s, _)| *s == stage)
            .map(|(_, source)| source.as_str())
    }

    /// The program passed to the last `use_program` call
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.calls.iter().rev().find_map(|call| match call {
            BackendCall::UseProgram(program) => Some(*program),
            _ => None,
        })?
    }

    fn program_names(&self, program: ProgramHandle) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .programs
            .get(&program)
            .filter(|p| p.linked)
            .map(|p| p.uniforms.iter().map(String::as_str).collect())
            .unwrap_or_default();
        for extra in &self.extra_uniforms {
            if !names.contains(&extra.as_str()) {
                names.push(extra);
            }
        }
        names
    }
}

/// Declared uniform and attribute names in shader source
fn scan_declarations(source: &str) -> (Vec<String>, Vec<String>) {
    let mut uniforms = Vec::new();
    let mut attributes = Vec::new();
    for line in source.lines().map(str::trim) {
        if let Some(decl) = parse_uniform_declaration(line) {
            uniforms.push(decl.name.to_string());
        } else if let Some(rest) = line.strip_prefix("attribute") {
            if let Some(name) = rest.split_whitespace().nth(1) {
                attributes.push(name.trim_end_matches(';').to_string());
            }
        }
    }
    (uniforms, attributes)
}

impl Backend for RecordingBackend {
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderHandle> {
        let shader = ShaderHandle(self.next());
        self.shaders.insert(
            shader,
            ShaderState {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        self.calls.push(BackendCall::CreateShader(shader, stage));
        Some(shader)
    }

    fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(state) = self.shaders.get_mut(&shader) {
            state.source = source.to_string();
            self.sources.push((state.stage, source.to_string()));
        }
        self.calls.push(BackendCall::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: ShaderHandle) {
        let (vertex_ok, fragment_ok) = (self.vertex_error.is_none(), self.fragment_error.is_none());
        if let Some(state) = self.shaders.get_mut(&shader) {
            state.compiled = match state.stage {
                ShaderStage::Vertex => vertex_ok,
                ShaderStage::Fragment => fragment_ok,
            };
        }
        self.calls.push(BackendCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        self.shaders.get(&shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        let log = match self.shaders.get(&shader).map(|s| s.stage) {
            Some(ShaderStage::Vertex) => self.vertex_error.as_ref(),
            Some(ShaderStage::Fragment) => self.fragment_error.as_ref(),
            None => None,
        };
        log.cloned().unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
        self.calls.push(BackendCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Option<ProgramHandle> {
        let program = ProgramHandle(self.next());
        self.programs.insert(program, ProgramState::default());
        self.calls.push(BackendCall::CreateProgram(program));
        Some(program)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(state) = self.programs.get_mut(&program) {
            state.shaders.push(shader);
        }
        self.calls.push(BackendCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramHandle) {
        self.calls.push(BackendCall::LinkProgram(program));
        let link_ok = self.link_error.is_none();
        let Some(state) = self.programs.get_mut(&program) else {
            return;
        };

        let mut uniforms = Vec::new();
        let mut attributes = Vec::new();
        let mut all_compiled = !state.shaders.is_empty();
        for shader in &state.shaders {
            match self.shaders.get(shader) {
                Some(s) if s.compiled => {
                    let (u, a) = scan_declarations(&s.source);
                    for name in u {
                        if !uniforms.contains(&name) {
                            uniforms.push(name);
                        }
                    }
                    attributes.extend(a);
                }
                _ => all_compiled = false,
            }
        }

        state.linked = link_ok && all_compiled;
        if state.linked {
            state.uniforms = uniforms;
            state.attributes = attributes;
        }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        if self.program_link_status(program) {
            return String::new();
        }
        self.link_error
            .clone()
            .unwrap_or_else(|| "one or more attached shaders not compiled".to_string())
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.calls.push(BackendCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let state = self.programs.get(&program).filter(|p| p.linked)?;
        state.attributes.iter().position(|a| a == name).map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.program_names(program)
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(program.0 * 1000 + i as u32))
    }

    fn create_buffer(&mut self) -> Option<BufferHandle> {
        let buffer = BufferHandle(self.next());
        self.buffers.insert(buffer);
        self.calls.push(BackendCall::CreateBuffer(buffer));
        Some(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.calls.push(BackendCall::DeleteBuffer(buffer));
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.calls.push(BackendCall::BindArrayBuffer(buffer));
    }

    fn array_buffer_data(&mut self, data: &[f32]) {
        self.calls.push(BackendCall::ArrayBufferData(data.to_vec()));
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(BackendCall::Viewport { x, y, width, height });
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.calls.push(BackendCall::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32) {
        self.calls.push(BackendCall::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn draw_triangles(&mut self, first: i32, count: i32) {
        self.calls.push(BackendCall::DrawTriangles { first, count });
    }

    fn uniform_1_i32(&mut self, location: UniformLocation, x: i32) {
        self.calls.push(BackendCall::Uniform1I(location, x));
    }

    fn uniform_1_f32(&mut self, location: UniformLocation, x: f32) {
        self.calls.push(BackendCall::Uniform1F(location, x));
    }

    fn uniform_2_f32(&mut self, location: UniformLocation, x: f32, y: f32) {
        self.calls.push(BackendCall::Uniform2F(location, x, y));
    }

    fn uniform_3_f32(&mut self, location: UniformLocation, x: f32, y: f32, z: f32) {
        self.calls.push(BackendCall::Uniform3F(location, x, y, z));
    }

    fn uniform_4_f32(&mut self, location: UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        self.calls.push(BackendCall::Uniform4F(location, x, y, z, w));
    }

    fn uniform_3_f32_slice(&mut self, location: UniformLocation, values: &[f32]) {
        self.calls.push(BackendCall::Uniform3FV(location, values.to_vec()));
    }

    fn create_texture(&mut self) -> Option<TextureHandle> {
        let texture = TextureHandle(self.next());
        self.textures.insert(texture);
        self.calls.push(BackendCall::CreateTexture(texture));
        Some(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(BackendCall::ActiveTexture(unit));
    }

    fn bind_texture_2d(&mut self, texture: Option<TextureHandle>) {
        self.calls.push(BackendCall::BindTexture2D(texture));
    }

    fn texture_wrap(&mut self, wrap: TextureWrap) {
        self.calls.push(BackendCall::TextureWrap(wrap));
    }

    fn texture_filter(&mut self, filter: TextureFilter) {
        self.calls.push(BackendCall::TextureFilter(filter));
    }

    fn tex_image_2d_rgba(&mut self, width: u32, height: u32, _pixels: &[u8]) {
        self.calls.push(BackendCall::TexImage2D { width, height });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(backend: &mut RecordingBackend, vertex: &str, fragment: &str) -> ProgramHandle {
        let vs = backend.create_shader(ShaderStage::Vertex).unwrap();
        backend.shader_source(vs, vertex);
        backend.compile_shader(vs);
        let fs = backend.create_shader(ShaderStage::Fragment).unwrap();
        backend.shader_source(fs, fragment);
        backend.compile_shader(fs);
        let program = backend.create_program().unwrap();
        backend.attach_shader(program, vs);
        backend.attach_shader(program, fs);
        backend.link_program(program);
        program
    }

    #[test]
    fn test_new_mock_is_empty() {
        let mock = RecordingBackend::new();
        assert_eq!(mock.call_count(), 0);
        assert_eq!(mock.drawable_size(), (800, 600));
    }

    #[test]
    fn test_linked_program_resolves_declarations() {
        let mut mock = RecordingBackend::new();
        let program = build(
            &mut mock,
            "attribute vec4 a_position;",
            "uniform float u_time;\nuniform vec2 u_resolution;",
        );

        assert!(mock.program_link_status(program));
        assert_eq!(mock.attrib_location(program, "a_position"), Some(0));
        assert!(mock.uniform_location(program, "u_time").is_some());
        assert!(mock.uniform_location(program, "u_resolution").is_some());
        assert_eq!(mock.uniform_location(program, "u_mouse"), None);
    }

    #[test]
    fn test_locations_differ_between_programs() {
        let mut mock = RecordingBackend::new();
        let a = build(&mut mock, "", "uniform float u_time;");
        let b = build(&mut mock, "", "uniform float u_time;");
        assert_ne!(
            mock.uniform_location(a, "u_time"),
            mock.uniform_location(b, "u_time")
        );
    }

    #[test]
    fn test_injected_compile_failure() {
        let mut mock = RecordingBackend::new();
        mock.fragment_error = Some("ERROR: 0:2: 'x' : undeclared identifier".into());
        let program = build(&mut mock, "", "void main() { x; }");

        let fs = ShaderHandle(2);
        assert!(!mock.shader_compile_status(fs));
        assert!(mock.shader_info_log(fs).contains("undeclared"));
        assert!(!mock.program_link_status(program));
    }

    #[test]
    fn test_injected_link_failure() {
        let mut mock = RecordingBackend::new();
        mock.link_error = Some("missing main".into());
        let program = build(&mut mock, "", "");
        assert!(!mock.program_link_status(program));
        assert_eq!(mock.program_info_log(program), "missing main");
    }

    #[test]
    fn test_declared_uniform_resolves_without_program() {
        let mut mock = RecordingBackend::new();
        mock.declare_uniform("u_extra");
        assert!(mock.uniform_location(ProgramHandle(42), "u_extra").is_some());
    }

    #[test]
    fn test_live_handle_tracking() {
        let mut mock = RecordingBackend::new();
        let tex = mock.create_texture().unwrap();
        let buf = mock.create_buffer().unwrap();
        assert_eq!(mock.live_textures(), 1);
        assert_eq!(mock.live_buffers(), 1);

        mock.delete_texture(tex);
        mock.delete_buffer(buf);
        assert_eq!(mock.live_textures(), 0);
        assert_eq!(mock.live_buffers(), 0);
        assert_eq!(mock.textures_created(), 1);
    }

    #[test]
    fn test_clear_calls() {
        let mut mock = RecordingBackend::new();
        mock.viewport(0, 0, 10, 10);
        mock.draw_triangles(0, 6);
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.draw_count(), 1);

        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_upload_filtering() {
        let mut mock = RecordingBackend::new();
        let loc = UniformLocation(7);
        mock.uniform_1_f32(loc, 1.0);
        mock.uniform_1_f32(UniformLocation(8), 2.0);
        mock.active_texture(1);

        assert_eq!(mock.uploads().len(), 2);
        assert_eq!(mock.uploads_for(loc), vec![BackendCall::Uniform1F(loc, 1.0)]);
        assert_eq!(mock.texture_units_activated(), vec![1]);
    }
}
