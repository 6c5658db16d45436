//! Uniform data model
//!
//! A `Uniform` is a tagged union over the closed set of supported kinds.
//! `UniformSet` keeps uniforms in insertion order, which is also the order
//! texture units are handed out at commit time.

use std::collections::HashMap;
use std::fmt;

use crate::backend::{TextureHandle, UniformLocation};
use crate::error::Result;
use crate::infer::{InferredKind, infer_uniform_type};
use crate::registry;
use crate::texture::TextureSource;

/// Closed set of uniform shapes the runner knows how to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Vec3Array,
    Texture2D,
    StaticMacro,
    Unused,
}

impl UniformKind {
    /// Every kind, in table order
    pub const ALL: [UniformKind; 9] = [
        UniformKind::Int,
        UniformKind::Float,
        UniformKind::Vec2,
        UniformKind::Vec3,
        UniformKind::Vec4,
        UniformKind::Vec3Array,
        UniformKind::Texture2D,
        UniformKind::StaticMacro,
        UniformKind::Unused,
    ];

    /// Shader-side spelling (arrays get a `v` suffix)
    pub fn type_name(self) -> &'static str {
        match self {
            UniformKind::Int => "int",
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Vec3Array => "vec3v",
            UniformKind::Texture2D => "sampler2D",
            UniformKind::StaticMacro => "static",
            UniformKind::Unused => "unused",
        }
    }

    /// Map a declared GLSL type to a kind, `None` if there is no table entry
    pub fn from_glsl(type_name: &str, is_array: bool) -> Option<Self> {
        let kind = match (type_name, is_array) {
            ("int", false) => UniformKind::Int,
            ("float", false) => UniformKind::Float,
            ("vec2", false) => UniformKind::Vec2,
            ("vec3", false) => UniformKind::Vec3,
            ("vec4", false) => UniformKind::Vec4,
            ("vec3", true) => UniformKind::Vec3Array,
            ("sampler2D", false) => UniformKind::Texture2D,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Declared element count of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniformLength {
    #[default]
    Single,
    /// Fixed-size array
    Array(usize),
    /// Array whose size could not be read from the source; only produced by
    /// inference and resolved from the supplied value at create time
    Dynamic,
}

/// A value supplied by the host
#[derive(Debug, Clone)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Vec3Array(Vec<[f32; 3]>),
    Texture(TextureSource),
    Static(String),
    None,
}

impl UniformValue {
    /// Element count for array-shaped values
    pub fn array_len(&self) -> Option<usize> {
        match self {
            UniformValue::Vec3Array(values) => Some(values.len()),
            _ => None,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Vec<[f32; 3]>> for UniformValue {
    fn from(v: Vec<[f32; 3]>) -> Self {
        UniformValue::Vec3Array(v)
    }
}

impl From<TextureSource> for UniformValue {
    fn from(v: TextureSource) -> Self {
        UniformValue::Texture(v)
    }
}

impl From<&str> for UniformValue {
    fn from(v: &str) -> Self {
        UniformValue::Static(v.to_string())
    }
}

impl From<String> for UniformValue {
    fn from(v: String) -> Self {
        UniformValue::Static(v)
    }
}

fn write_floats(f: &mut fmt::Formatter<'_>, values: &[f32]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformValue::Int(v) => write!(f, "{}", v),
            UniformValue::Float(v) => write!(f, "{}", v),
            UniformValue::Vec2(v) => write_floats(f, v),
            UniformValue::Vec3(v) => write_floats(f, v),
            UniformValue::Vec4(v) => write_floats(f, v),
            UniformValue::Vec3Array(v) => write_floats(f, v.as_flattened()),
            UniformValue::Texture(image) => {
                write!(f, "<image {}x{}>", image.width(), image.height())
            }
            UniformValue::Static(s) => f.write_str(s),
            UniformValue::None => Ok(()),
        }
    }
}

/// GPU-side state of a `sampler2D` uniform
#[derive(Debug, Clone, Default)]
pub struct TextureBinding {
    /// Image the current GPU texture was built from
    pub(crate) image: Option<TextureSource>,
    /// GPU texture, unset until the first successful build
    pub(crate) texture: Option<TextureHandle>,
    /// Image waiting for a backend to build it
    pub(crate) pending: Option<TextureSource>,
}

impl TextureBinding {
    /// Image the binding represents, including a not-yet-built one
    pub fn source(&self) -> Option<&TextureSource> {
        self.pending.as_ref().or(self.image.as_ref())
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Whether an update is waiting for the next commit
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Kind-specific payload
#[derive(Debug, Clone)]
pub enum UniformPayload {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Vec3Array(Vec<[f32; 3]>),
    Texture2D(TextureBinding),
    StaticMacro(String),
    Unused,
}

/// A named value bound (or bindable) to a program
#[derive(Debug, Clone)]
pub struct Uniform {
    pub(crate) location: Option<UniformLocation>,
    pub(crate) length: UniformLength,
    pub(crate) payload: UniformPayload,
}

impl Uniform {
    pub(crate) fn new(
        location: Option<UniformLocation>,
        length: UniformLength,
        payload: UniformPayload,
    ) -> Self {
        Self { location, length, payload }
    }

    pub fn kind(&self) -> UniformKind {
        match self.payload {
            UniformPayload::Int(_) => UniformKind::Int,
            UniformPayload::Float(_) => UniformKind::Float,
            UniformPayload::Vec2(_) => UniformKind::Vec2,
            UniformPayload::Vec3(_) => UniformKind::Vec3,
            UniformPayload::Vec4(_) => UniformKind::Vec4,
            UniformPayload::Vec3Array(_) => UniformKind::Vec3Array,
            UniformPayload::Texture2D(_) => UniformKind::Texture2D,
            UniformPayload::StaticMacro(_) => UniformKind::StaticMacro,
            UniformPayload::Unused => UniformKind::Unused,
        }
    }

    pub fn location(&self) -> Option<UniformLocation> {
        self.location
    }

    pub fn length(&self) -> UniformLength {
        self.length
    }

    pub fn payload(&self) -> &UniformPayload {
        &self.payload
    }

    /// Literal text of a static macro
    pub fn static_value(&self) -> Option<&str> {
        match &self.payload {
            UniformPayload::StaticMacro(s) => Some(s),
            _ => None,
        }
    }

    pub fn texture_binding(&self) -> Option<&TextureBinding> {
        match &self.payload {
            UniformPayload::Texture2D(binding) => Some(binding),
            _ => None,
        }
    }

    /// Current value in host form
    pub fn value(&self) -> UniformValue {
        match &self.payload {
            UniformPayload::Int(v) => UniformValue::Int(*v),
            UniformPayload::Float(v) => UniformValue::Float(*v),
            UniformPayload::Vec2(v) => UniformValue::Vec2(*v),
            UniformPayload::Vec3(v) => UniformValue::Vec3(*v),
            UniformPayload::Vec4(v) => UniformValue::Vec4(*v),
            UniformPayload::Vec3Array(v) => UniformValue::Vec3Array(v.clone()),
            UniformPayload::Texture2D(binding) => binding
                .source()
                .cloned()
                .map_or(UniformValue::None, UniformValue::Texture),
            UniformPayload::StaticMacro(s) => UniformValue::Static(s.clone()),
            UniformPayload::Unused => UniformValue::None,
        }
    }
}

/// Insertion-ordered mapping from name to uniform
#[derive(Debug, Clone, Default)]
pub struct UniformSet {
    entries: Vec<(String, Uniform)>,
    index: HashMap<String, usize>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a uniform; an existing entry keeps its position
    pub fn insert(&mut self, name: impl Into<String>, uniform: Uniform) -> Option<Uniform> {
        let name = name.into();
        if let Some(&i) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[i].1, uniform));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, uniform));
        None
    }

    /// Create a uniform whose kind is inferred from shader source
    ///
    /// Names the source never mentions are stored as `Unused`.
    pub fn declare(
        &mut self,
        name: &str,
        value: impl Into<UniformValue>,
        source: &str,
    ) -> Result<&Uniform> {
        let uniform = create_inferred(None, name, value.into(), source)?;
        self.insert(name, uniform);
        Ok(&self.entries[self.index[name]].1)
    }

    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.index.get(name).map(|&i| &mut self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.entries.iter().map(|(name, u)| (name.as_str(), u))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Uniform)> {
        self.entries.iter_mut().map(|(name, u)| (name.as_str(), u))
    }
}

/// Build a uniform for `name`, inferring its kind from `source`
pub(crate) fn create_inferred(
    location: Option<UniformLocation>,
    name: &str,
    value: UniformValue,
    source: &str,
) -> Result<Uniform> {
    let inferred = infer_uniform_type(name, source);
    let kind = match inferred.kind {
        InferredKind::Known(kind) => kind,
        InferredKind::Unsupported(type_name) => {
            return Err(crate::VaderError::UnsupportedUniformKind { kind: type_name });
        }
    };

    let length = match inferred.length {
        UniformLength::Dynamic => UniformLength::Array(value.array_len().unwrap_or(0)),
        length => length,
    };

    if kind == UniformKind::Unused {
        log::debug!("uniform {} is not referenced by the shader", name);
    }

    registry::create(kind, location, length, value)
}

/// Format every uniform as `  <kind> <name> = [<value>]`
pub fn dump_uniforms(uniforms: &UniformSet) -> String {
    let mut out = String::from("Vader::dumpUniforms\n");
    for (name, uniform) in uniforms.iter() {
        out.push_str(&format!("  {} {} = [{}]\n", uniform.kind(), name, uniform.value()));
    }
    log::info!("{}", out.trim_end());
    out
}
