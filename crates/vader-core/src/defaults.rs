//! Built-in uniforms
//!
//! Default mode provides:
//! - `vec2  u_resolution`: surface size in pixels, divided by the scale
//! - `float u_time`: seconds since the render state was created
//! - `vec4  u_mouse`: pointer position, z = 1 while a button is down
//!
//! Shadertoy mode provides `iResolution`, `iFrame`, `iFrameRate`, `iTime`,
//! `iTimeDelta` and `iMouse` with the same meanings Shadertoy gives them.

use crate::backend::Backend;
use crate::error::Result;
use crate::registry;
use crate::state::{RenderState, SupportMode};
use crate::uniform::{Uniform, UniformLength, UniformPayload, UniformSet, UniformValue};

/// Pointer state sampled by the host
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseState {
    pub x: f32,
    pub y: f32,
    pub down: bool,
}

/// Per-frame host inputs for the built-in uniforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub width: f32,
    pub height: f32,
    /// Pixel scale; resolution uniforms report `size / scale`
    pub scale: f32,
    pub mouse: MouseState,
}

impl Default for FrameInputs {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            scale: 1.0,
            mouse: MouseState::default(),
        }
    }
}

fn builtin(payload: UniformPayload) -> Uniform {
    Uniform::new(None, UniformLength::Single, payload)
}

/// Uniforms the runner maintains itself for `mode`
pub fn generate_default_uniforms(mode: SupportMode) -> UniformSet {
    let mut uniforms = UniformSet::new();

    match mode {
        SupportMode::Shadertoy => {
            uniforms.insert("iResolution", builtin(UniformPayload::Vec3([0.0, 0.0, 1.0])));
            uniforms.insert("iFrame", builtin(UniformPayload::Int(0)));
            uniforms.insert("iFrameRate", builtin(UniformPayload::Float(0.0)));
            uniforms.insert("iTime", builtin(UniformPayload::Float(0.0)));
            uniforms.insert("iTimeDelta", builtin(UniformPayload::Float(0.0)));
            uniforms.insert("iMouse", builtin(UniformPayload::Vec4([0.0; 4])));
        }
        SupportMode::Default => {
            uniforms.insert("u_resolution", builtin(UniformPayload::Vec2([0.0, 0.0])));
            uniforms.insert("u_time", builtin(UniformPayload::Float(0.0)));
            uniforms.insert("u_mouse", builtin(UniformPayload::Vec4([0.0; 4])));
        }
    }

    uniforms
}

/// Update a uniform if the set has it
///
/// Callers may drop built-ins they do not want, so absence is not an error.
fn set(uniforms: &mut UniformSet, name: &str, value: impl Into<UniformValue>) -> Result<()> {
    if let Some(uniform) = uniforms.get_mut(name) {
        registry::update(None, uniform, value)?;
    }
    Ok(())
}

/// Refresh the built-in uniforms before a frame
pub fn update_default_uniforms<B: Backend>(
    state: &RenderState<B>,
    uniforms: &mut UniformSet,
    inputs: &FrameInputs,
) -> Result<()> {
    let now = state.elapsed();
    let scale = if inputs.scale > 0.0 { inputs.scale } else { 1.0 };
    let (width, height) = (inputs.width / scale, inputs.height / scale);
    let mouse = [
        inputs.mouse.x,
        inputs.mouse.y,
        if inputs.mouse.down { 1.0 } else { 0.0 },
        0.0,
    ];

    match state.mode() {
        SupportMode::Shadertoy => {
            let delta = now - state.time_at_last_frame();
            let frame_rate = if delta > 0.0 { 1.0 / delta } else { 0.0 };

            set(uniforms, "iResolution", [width, height, 1.0])?;
            set(uniforms, "iFrame", state.frame() as i32)?;
            set(uniforms, "iTime", now)?;
            set(uniforms, "iTimeDelta", delta)?;
            set(uniforms, "iFrameRate", frame_rate)?;
            set(uniforms, "iMouse", mouse)?;
        }
        SupportMode::Default => {
            set(uniforms, "u_resolution", [width, height])?;
            set(uniforms, "u_time", now)?;
            set(uniforms, "u_mouse", mouse)?;
        }
    }

    Ok(())
}
