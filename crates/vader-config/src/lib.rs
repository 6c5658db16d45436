//! Vader run manifests
//!
//! A manifest is a TOML file naming a shader, the surface to render it on,
//! and the uniforms to feed it:
//!
//! ```toml
//! [shader]
//! bundled = "plasma"      # or: path = "my-shader.frag"
//! mode = "default"        # or "shadertoy"
//!
//! [render]
//! width = 640
//! height = 480
//! frames = 3
//!
//! [[uniform]]
//! name = "u_top"
//! value = [1.0, 0.5, 0.0]
//!
//! [[uniform]]
//! name = "u_overlay"
//! texture = "overlay.png"
//!
//! [[uniform]]
//! name = "SPEED"
//! static = 2.5
//! ```
//!
//! Relative paths resolve against the manifest's directory.

pub mod bundled;

pub use bundled::{BundledShader, bundled_shader_names, get_bundled_shader};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Support mode requested by a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShaderMode {
    #[default]
    Default,
    Shadertoy,
}

/// `[shader]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShaderConfig {
    /// Shader file, relative to the manifest
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Name of a bundled shader
    #[serde(default)]
    pub bundled: Option<String>,

    /// Requested support mode; a directive in the source overrides it
    #[serde(default)]
    pub mode: ShaderMode,

    /// Label used in log output
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_label() -> String {
    "vader".to_string()
}

/// `[render]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Surface width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Surface height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Pixel scale; resolution uniforms report size / scale
    #[serde(default = "default_scale")]
    pub scale: f32,

    /// Number of frames to render
    #[serde(default = "default_frames")]
    pub frames: u32,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_scale() -> f32 {
    1.0
}

fn default_frames() -> u32 {
    1
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            scale: default_scale(),
            frames: default_frames(),
        }
    }
}

/// Literal uniform value as written in TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Int(i32),
    Float(f32),
    /// 2, 3 or 4 components
    Vector(Vec<f32>),
    /// Array of vec3
    Points(Vec<[f32; 3]>),
}

/// Text of a static value; numbers are accepted and printed as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StaticSpec {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for StaticSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticSpec::Int(v) => write!(f, "{}", v),
            // Keep a decimal point so GLSL sees a float literal
            StaticSpec::Float(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            StaticSpec::Float(v) => write!(f, "{}", v),
            StaticSpec::Text(s) => f.write_str(s),
        }
    }
}

/// One `[[uniform]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformConfig {
    pub name: String,

    #[serde(default)]
    pub value: Option<ValueSpec>,

    /// Image file, relative to the manifest
    #[serde(default)]
    pub texture: Option<PathBuf>,

    #[serde(default, rename = "static")]
    pub static_value: Option<StaticSpec>,
}

/// Where a uniform's value comes from, once validated
#[derive(Debug, Clone, PartialEq)]
pub enum UniformSource<'a> {
    Value(&'a ValueSpec),
    Texture(&'a Path),
    Static(String),
}

impl UniformConfig {
    /// The single value source this entry names
    pub fn source(&self) -> Result<UniformSource<'_>, ManifestError> {
        let invalid = |reason: String| ManifestError::InvalidUniform {
            name: self.name.clone(),
            reason,
        };

        match (&self.value, &self.texture, &self.static_value) {
            (Some(ValueSpec::Vector(v)), None, None) if !(2..=4).contains(&v.len()) => Err(
                invalid(format!("vectors need 2 to 4 components, got {}", v.len())),
            ),
            (Some(value), None, None) => Ok(UniformSource::Value(value)),
            (None, Some(path), None) => Ok(UniformSource::Texture(path)),
            (None, None, Some(value)) => Ok(UniformSource::Static(value.to_string())),
            _ => Err(invalid(
                "needs exactly one of `value`, `texture` or `static`".into(),
            )),
        }
    }
}

/// A parsed manifest
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    #[serde(default)]
    pub shader: ShaderConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default, rename = "uniform")]
    pub uniforms: Vec<UniformConfig>,

    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load_from(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ManifestError::Read(path.to_path_buf(), e))?;

        let mut manifest: Manifest = toml::from_str(&content)
            .map_err(|e| ManifestError::Parse(path.to_path_buf(), e))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        manifest.validate()?;

        log::info!("Loaded manifest from {:?}", path);
        Ok(manifest)
    }

    /// Parse and validate manifest text with paths relative to `base_dir`
    pub fn parse(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let mut manifest: Manifest =
            toml::from_str(content).map_err(|e| ManifestError::Parse(PathBuf::new(), e))?;
        manifest.base_dir = base_dir.into();
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the cross-field rules serde cannot express
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.shader.path.is_some() == self.shader.bundled.is_some() {
            return Err(ManifestError::ShaderSource);
        }
        if let Some(name) = &self.shader.bundled {
            if get_bundled_shader(name).is_none() {
                return Err(ManifestError::UnknownBundled {
                    name: name.clone(),
                    available: bundled_shader_names().join(", "),
                });
            }
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ManifestError::InvalidRender("width and height must be non-zero".into()));
        }
        if self.render.scale <= 0.0 {
            return Err(ManifestError::InvalidRender("scale must be positive".into()));
        }

        let mut seen = HashSet::new();
        for uniform in &self.uniforms {
            if !seen.insert(uniform.name.as_str()) {
                return Err(ManifestError::InvalidUniform {
                    name: uniform.name.clone(),
                    reason: "declared more than once".into(),
                });
            }
            uniform.source()?;
        }
        Ok(())
    }

    /// Resolve a manifest-relative path
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Read the shader source the manifest names
    ///
    /// Priority: `path` > `bundled`
    pub fn resolve_shader_source(&self) -> Result<String, ManifestError> {
        if let Some(path) = &self.shader.path {
            let path = self.resolve_path(path);
            let source =
                fs::read_to_string(&path).map_err(|e| ManifestError::Read(path.clone(), e))?;
            log::info!("Loaded shader from {:?}", path);
            return Ok(source);
        }

        let name = self.shader.bundled.as_deref().ok_or(ManifestError::ShaderSource)?;
        let bundled = get_bundled_shader(name).ok_or_else(|| ManifestError::UnknownBundled {
            name: name.to_string(),
            available: bundled_shader_names().join(", "),
        })?;
        log::info!("Using bundled shader: {}", bundled.name);
        Ok(bundled.source.to_string())
    }

    /// Requested mode, taking a bundled shader's own mode into account
    pub fn mode(&self) -> ShaderMode {
        match self.shader.bundled.as_deref().and_then(get_bundled_shader) {
            Some(bundled) if self.shader.path.is_none() => bundled.mode,
            _ => self.shader.mode,
        }
    }
}

/// Manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read {0:?}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse {0:?}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("[shader] needs exactly one of `path` or `bundled`")]
    ShaderSource,

    #[error("No bundled shader named '{name}' (available: {available})")]
    UnknownBundled { name: String, available: String },

    #[error("Invalid [render] section: {0}")]
    InvalidRender(String),

    #[error("Invalid uniform '{name}': {reason}")]
    InvalidUniform { name: String, reason: String },
}
