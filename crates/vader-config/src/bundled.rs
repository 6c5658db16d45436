//! Bundled demo shaders
//!
//! Embedded in the binary so a manifest can run without any shader file.

use crate::ShaderMode;

/// Bundled shader data
pub struct BundledShader {
    pub name: &'static str,
    pub mode: ShaderMode,
    pub source: &'static str,
}

/// Sine plasma that follows the mouse
pub const PLASMA: BundledShader = BundledShader {
    name: "plasma",
    mode: ShaderMode::Default,
    source: include_str!("../../../shaders/plasma.frag"),
};

/// Vertical gradient with an optional texture overlay
pub const GRADIENT: BundledShader = BundledShader {
    name: "gradient",
    mode: ShaderMode::Default,
    source: include_str!("../../../shaders/gradient.frag"),
};

/// Shadertoy-style tunnel
pub const TUNNEL: BundledShader = BundledShader {
    name: "tunnel",
    mode: ShaderMode::Shadertoy,
    source: include_str!("../../../shaders/tunnel.frag"),
};

/// All bundled shaders
pub const ALL_SHADERS: &[&BundledShader] = &[&PLASMA, &GRADIENT, &TUNNEL];

/// Get a bundled shader by name
pub fn get_bundled_shader(name: &str) -> Option<&'static BundledShader> {
    ALL_SHADERS.iter().find(|s| s.name == name).copied()
}

/// List all bundled shader names
pub fn bundled_shader_names() -> Vec<&'static str> {
    ALL_SHADERS.iter().map(|s| s.name).collect()
}
