//! Graphics backend capability abstraction
//!
//! This module defines the small, GPU-agnostic surface the shader runner
//! needs from a graphics API. Implementors wrap a real context (WebGL,
//! OpenGL ES, ...) while the `mock` module provides a recording backend so
//! the whole pipeline runs without a GPU.

/// Handle to a compiled (or failed) shader object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Handle to a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Handle to a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle to a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Location of a uniform inside one specific program
///
/// Only valid for the program it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Texture coordinate wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureWrap {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

/// Trait for the graphics calls the runner issues
///
/// Calls are synchronous from the caller's point of view. Creation calls
/// return `None` when the backend cannot allocate the object (the GL "0"
/// handle). Upload calls take the bound program implicitly, as GL does.
pub trait Backend {
    // === Shaders ===

    /// Create an empty shader object for a stage
    fn create_shader(&mut self, stage: ShaderStage) -> Option<ShaderHandle>;

    /// Replace the shader's source text
    fn shader_source(&mut self, shader: ShaderHandle, source: &str);

    /// Compile the shader's current source
    fn compile_shader(&mut self, shader: ShaderHandle);

    /// Whether the last compile succeeded
    fn shader_compile_status(&self, shader: ShaderHandle) -> bool;

    /// Compiler log for the shader
    fn shader_info_log(&self, shader: ShaderHandle) -> String;

    /// Release a shader object
    fn delete_shader(&mut self, shader: ShaderHandle);

    // === Programs ===

    /// Create an empty program object
    fn create_program(&mut self) -> Option<ProgramHandle>;

    /// Attach a shader to a program
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Link the program's attached shaders
    fn link_program(&mut self, program: ProgramHandle);

    /// Whether the last link succeeded
    fn program_link_status(&self, program: ProgramHandle) -> bool;

    /// Linker log for the program
    fn program_info_log(&self, program: ProgramHandle) -> String;

    /// Release a program object
    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current (or unbind with `None`)
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Look up a vertex attribute by name
    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Look up a uniform by name; `None` when inactive or absent
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    // === Buffers and drawing ===

    /// Create a vertex buffer
    fn create_buffer(&mut self) -> Option<BufferHandle>;

    /// Release a vertex buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Bind the array buffer target
    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>);

    /// Upload static float data to the bound array buffer
    fn array_buffer_data(&mut self, data: &[f32]);

    /// Current drawable size in pixels
    fn drawable_size(&self) -> (u32, u32);

    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Enable a vertex attribute array
    fn enable_vertex_attrib_array(&mut self, index: u32);

    /// Describe float vertex data for an attribute
    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32);

    /// Draw `count` vertices as triangles
    fn draw_triangles(&mut self, first: i32, count: i32);

    // === Uniform uploads ===

    fn uniform_1_i32(&mut self, location: UniformLocation, x: i32);

    fn uniform_1_f32(&mut self, location: UniformLocation, x: f32);

    fn uniform_2_f32(&mut self, location: UniformLocation, x: f32, y: f32);

    fn uniform_3_f32(&mut self, location: UniformLocation, x: f32, y: f32, z: f32);

    fn uniform_4_f32(&mut self, location: UniformLocation, x: f32, y: f32, z: f32, w: f32);

    /// Upload a flat `vec3[]` array
    fn uniform_3_f32_slice(&mut self, location: UniformLocation, values: &[f32]);

    // === Textures ===

    /// Create a texture object
    fn create_texture(&mut self) -> Option<TextureHandle>;

    /// Release a texture object
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Select the active texture unit (0-based)
    fn active_texture(&mut self, unit: u32);

    /// Bind a texture to the 2D target of the active unit
    fn bind_texture_2d(&mut self, texture: Option<TextureHandle>);

    /// Set wrap mode on both axes for the bound 2D texture
    fn texture_wrap(&mut self, wrap: TextureWrap);

    /// Set min and mag filter for the bound 2D texture
    fn texture_filter(&mut self, filter: TextureFilter);

    /// Upload RGBA8 pixels to the bound 2D texture
    fn tex_image_2d_rgba(&mut self, width: u32, height: u32, pixels: &[u8]);
}
