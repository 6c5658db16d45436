//! Vader - headless fragment shader runner
//!
//! Ties the workspace crates together:
//! - `vader-config` - run manifests and bundled shaders
//! - `vader-core` - uniforms, statics, compilation and the render state
//!
//! A `Session` loads a manifest, builds the uniform set, compiles the shader
//! against a recording backend and renders frames, so shaders can be checked
//! (compile errors, missing uniforms, texture binding) without a GPU.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use vader_config::{Manifest, ShaderMode, UniformConfig, UniformSource, ValueSpec};
use vader_core::program::wrap_source;
use vader_core::{
    Diagnostic, FrameInputs, MouseState, RecordingBackend, RenderState, SupportMode, UniformSet,
    UniformValue, UpdateOutcome, dump_uniforms, generate_default_uniforms, load_texture_source,
    update_default_uniforms,
};

/// Map the manifest's mode onto the core's
pub fn support_mode(mode: ShaderMode) -> SupportMode {
    match mode {
        ShaderMode::Default => SupportMode::Default,
        ShaderMode::Shadertoy => SupportMode::Shadertoy,
    }
}

/// Convert one manifest entry into a host value
///
/// Texture paths are resolved against the manifest and loaded here.
pub fn uniform_value(manifest: &Manifest, entry: &UniformConfig) -> Result<UniformValue> {
    let value = match entry.source()? {
        UniformSource::Value(ValueSpec::Int(v)) => UniformValue::Int(*v),
        UniformSource::Value(ValueSpec::Float(v)) => UniformValue::Float(*v),
        UniformSource::Value(ValueSpec::Vector(v)) => match v.as_slice() {
            [x, y] => UniformValue::Vec2([*x, *y]),
            [x, y, z] => UniformValue::Vec3([*x, *y, *z]),
            [x, y, z, w] => UniformValue::Vec4([*x, *y, *z, *w]),
            other => {
                return Err(anyhow!(
                    "uniform '{}': {} components is not a vector",
                    entry.name,
                    other.len()
                ));
            }
        },
        UniformSource::Value(ValueSpec::Points(points)) => UniformValue::Vec3Array(points.clone()),
        UniformSource::Texture(path) => {
            let path = manifest.resolve_path(path);
            let image = load_texture_source(&path).map_err(|e| anyhow!(e))?;
            log::debug!("Loaded texture {:?} ({}x{})", path, image.width(), image.height());
            UniformValue::Texture(image)
        }
        UniformSource::Static(text) => UniformValue::Static(text),
    };
    Ok(value)
}

/// Summary of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub frames: u64,
    pub draw_calls: usize,
    pub uploads: usize,
    pub textures: usize,
}

/// One manifest compiled onto a recording backend
pub struct Session {
    state: RenderState<RecordingBackend>,
    uniforms: UniformSet,
    inputs: FrameInputs,
    frames: u32,
}

impl Session {
    /// Load a manifest file and compile it
    pub fn load(path: &Path) -> Result<Self> {
        let manifest = Manifest::load_from(path)?;
        Self::from_manifest(&manifest)
    }

    /// Build the uniform set and compile the manifest's shader
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let source = manifest.resolve_shader_source()?;
        let mode = support_mode(manifest.mode()).resolve(&source);
        let label = manifest.shader.label.as_str();

        // Infer against the wrapped source so prologue declarations count
        let wrapped = wrap_source(mode, &source);
        let mut uniforms = generate_default_uniforms(mode);
        for entry in &manifest.uniforms {
            let value = uniform_value(manifest, entry)?;
            uniforms
                .declare(&entry.name, value, &wrapped)
                .with_context(|| format!("Invalid uniform '{}'", entry.name))?;
        }

        let backend = RecordingBackend::with_size(manifest.render.width, manifest.render.height);
        let state = RenderState::init(label, backend, &source, &mut uniforms, mode)
            .with_context(|| format!("Failed to compile shader '{}'", label))?;

        let inputs = FrameInputs {
            width: manifest.render.width as f32,
            height: manifest.render.height as f32,
            scale: manifest.render.scale,
            mouse: MouseState::default(),
        };

        Ok(Self {
            state,
            uniforms,
            inputs,
            frames: manifest.render.frames,
        })
    }

    /// Refresh the built-in uniforms and draw one frame
    pub fn render_frame(&mut self) -> Result<()> {
        update_default_uniforms(&self.state, &mut self.uniforms, &self.inputs)?;
        self.state
            .render(&mut self.uniforms)
            .with_context(|| format!("Failed to render frame {}", self.state.frame()))?;
        Ok(())
    }

    /// Render `frames` frames (the manifest's count when `None`)
    pub fn run(&mut self, frames: Option<u32>) -> Result<RunReport> {
        let frames = frames.unwrap_or(self.frames);
        for _ in 0..frames {
            self.render_frame()?;
        }
        log::info!("Vader[{}] rendered {} frames", self.state.label(), frames);
        Ok(self.report())
    }

    /// Counters from the backend so far
    pub fn report(&self) -> RunReport {
        let backend = self.state.backend();
        RunReport {
            frames: self.state.frame(),
            draw_calls: backend.draw_count(),
            uploads: backend.uploads().len(),
            textures: backend.live_textures(),
        }
    }

    /// Set a uniform by name
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<UpdateOutcome> {
        Ok(self.state.update_uniform(&mut self.uniforms, name, value)?)
    }

    pub fn set_mouse(&mut self, mouse: MouseState) {
        self.inputs.mouse = mouse;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.state.diagnostics()
    }

    pub fn processed_source(&self) -> &str {
        self.state.processed_source()
    }

    pub fn dump(&self) -> String {
        dump_uniforms(&self.uniforms)
    }

    pub fn state(&self) -> &RenderState<RecordingBackend> {
        &self.state
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }
}
