//! Fixed GLSL wrapped around user fragment source
//!
//! Kept as external .glsl files and included at compile time.

/// Pass-through vertex shader drawing the full-screen quad
pub const VERTEX: &str = include_str!("vertex.glsl");

/// Declares `u_resolution` and `u_time` for default mode
pub const VADER_PROLOGUE: &str = include_str!("vader_prologue.glsl");

/// Declares the Shadertoy inputs the runner provides
pub const SHADERTOY_PROLOGUE: &str = include_str!("shadertoy_prologue.glsl");

/// Entry point forwarding to the user's `mainImage`
pub const SHADERTOY_EPILOGUE: &str = include_str!("shadertoy_epilogue.glsl");
