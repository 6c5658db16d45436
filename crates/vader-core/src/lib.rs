//! Vader Core - fragment shader runner
//!
//! This crate provides:
//! - Uniform inference from shader source and a closed kind registry
//! - `STATIC(...)` compile-time substitution
//! - Program compilation with readable error windows
//! - A per-surface render state that commits uniforms and draws a quad
//!
//! The graphics API sits behind the `Backend` trait; `mock` provides a
//! recording implementation for tests and headless runs.

pub mod backend;
pub mod defaults;
pub mod error;
pub mod infer;
pub mod mock;
pub mod preprocess;
pub mod program;
pub mod registry;
pub mod shaders;
pub mod state;
pub mod texture;
pub mod uniform;

pub use backend::{
    Backend, BufferHandle, ProgramHandle, ShaderHandle, ShaderStage, TextureFilter, TextureHandle,
    TextureWrap, UniformLocation,
};
pub use defaults::{FrameInputs, MouseState, generate_default_uniforms, update_default_uniforms};
pub use error::{Diagnostic, Result, VaderError};
pub use infer::{InferredKind, InferredType, has_shadertoy_directive, infer_uniform_type};
pub use mock::{BackendCall, RecordingBackend};
pub use preprocess::{Preprocessed, preprocess};
pub use registry::UpdateOutcome;
pub use state::{RenderPhase, RenderState, SupportMode};
pub use texture::{TextureSource, load_texture_source};
pub use uniform::{
    Uniform, UniformKind, UniformLength, UniformPayload, UniformSet, UniformValue, dump_uniforms,
};
