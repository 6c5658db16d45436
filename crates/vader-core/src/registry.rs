//! Uniform type registry
//!
//! Each supported kind has one entry in `REGISTRY` describing how to create,
//! update and commit it. Supporting a new kind means adding an entry here.
//!
//! ## Texture units
//!
//! `commit_uniforms` walks the set in insertion order with a running unit
//! counter that starts at zero and is incremented *before* each
//! texture-consuming uniform commits, so the first sampler binds unit 1.

use crate::backend::{Backend, ProgramHandle, UniformLocation};
use crate::error::{Result, VaderError};
use crate::texture::{TextureSource, make_texture, nearest_power_of_two, same_source};
use crate::uniform::{
    TextureBinding, Uniform, UniformKind, UniformLength, UniformPayload, UniformSet, UniformValue,
};

/// What an update did to the uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New value stored, visible at the next commit
    Applied,
    /// Nothing changed
    Unchanged,
    /// Backend unavailable; the update is retried at the next commit
    Deferred,
    /// Value stored, but the program must be recompiled to see it
    RecompileRequired,
}

pub type CreateFn = fn(Option<UniformLocation>, UniformLength, UniformValue) -> Result<Uniform>;
pub type UpdateFn = fn(Option<&mut dyn Backend>, &mut Uniform, UniformValue) -> Result<UpdateOutcome>;
pub type CommitFn = fn(&mut dyn Backend, &mut Uniform, u32) -> Result<()>;

/// Behaviour of one uniform kind
pub struct UniformOps {
    pub kind: UniformKind,
    pub create: CreateFn,
    pub update: UpdateFn,
    pub commit: CommitFn,
    /// Whether committing this kind consumes a texture unit
    pub consumes_texture_unit: bool,
}

impl std::fmt::Debug for UniformOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformOps")
            .field("kind", &self.kind)
            .field("consumes_texture_unit", &self.consumes_texture_unit)
            .finish()
    }
}

/// The supported uniform kinds
pub static REGISTRY: [UniformOps; 9] = [
    UniformOps {
        kind: UniformKind::Int,
        create: create_int,
        update: update_value,
        commit: commit_value,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Float,
        create: create_float,
        update: update_value,
        commit: commit_value,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Vec2,
        create: create_vec2,
        update: update_value,
        commit: commit_value,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Vec3,
        create: create_vec3,
        update: update_value,
        commit: commit_value,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Vec4,
        create: create_vec4,
        update: update_value,
        commit: commit_value,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Vec3Array,
        create: create_vec3_array,
        update: update_value,
        commit: commit_value,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Texture2D,
        create: create_texture,
        update: update_texture,
        commit: commit_texture,
        consumes_texture_unit: true,
    },
    UniformOps {
        kind: UniformKind::StaticMacro,
        create: create_static,
        update: update_static,
        commit: commit_noop,
        consumes_texture_unit: false,
    },
    UniformOps {
        kind: UniformKind::Unused,
        create: create_unused,
        update: update_unused,
        commit: commit_noop,
        consumes_texture_unit: false,
    },
];

/// Look up the operations for a kind
pub fn ops(kind: UniformKind) -> Result<&'static UniformOps> {
    REGISTRY
        .iter()
        .find(|ops| ops.kind == kind)
        .ok_or_else(|| VaderError::UnsupportedUniformKind {
            kind: kind.to_string(),
        })
}

/// Create a uniform of an explicit kind
pub fn create(
    kind: UniformKind,
    location: Option<UniformLocation>,
    length: UniformLength,
    value: impl Into<UniformValue>,
) -> Result<Uniform> {
    (ops(kind)?.create)(location, length, value.into())
}

/// Update a uniform through its kind's entry
pub fn update(
    backend: Option<&mut dyn Backend>,
    uniform: &mut Uniform,
    value: impl Into<UniformValue>,
) -> Result<UpdateOutcome> {
    (ops(uniform.kind())?.update)(backend, uniform, value.into())
}

/// Upload every uniform to the bound program, assigning texture units in order
///
/// Uniforms without a location get one resolved against `program` first.
pub fn commit_uniforms(
    backend: &mut dyn Backend,
    program: ProgramHandle,
    uniforms: &mut UniformSet,
) -> Result<()> {
    let mut texture_index = 0;

    for (name, uniform) in uniforms.iter_mut() {
        let ops = ops(uniform.kind())?;
        let bindable = !matches!(uniform.kind(), UniformKind::StaticMacro | UniformKind::Unused);
        if bindable && uniform.location.is_none() {
            uniform.location = backend.uniform_location(program, name);
        }
        if ops.consumes_texture_unit {
            texture_index += 1;
        }
        (ops.commit)(backend, uniform, texture_index)?;
    }

    Ok(())
}

fn describe(value: &UniformValue) -> String {
    match value {
        UniformValue::Texture(_) => "an image".to_string(),
        UniformValue::None => "nothing".to_string(),
        other => format!("'{}'", other),
    }
}

fn mismatch(kind: UniformKind, value: &UniformValue) -> VaderError {
    VaderError::ValueMismatch {
        kind,
        value: describe(value),
    }
}

/// Convert a host value into the payload of a value-carrying kind
fn convert(kind: UniformKind, value: UniformValue) -> Result<UniformPayload> {
    let payload = match (kind, value) {
        (UniformKind::Int, UniformValue::Int(v)) => UniformPayload::Int(v),
        (UniformKind::Float, UniformValue::Float(v)) => UniformPayload::Float(v),
        (UniformKind::Float, UniformValue::Int(v)) => UniformPayload::Float(v as f32),
        (UniformKind::Vec2, UniformValue::Vec2(v)) => UniformPayload::Vec2(v),
        (UniformKind::Vec3, UniformValue::Vec3(v)) => UniformPayload::Vec3(v),
        (UniformKind::Vec4, UniformValue::Vec4(v)) => UniformPayload::Vec4(v),
        (UniformKind::Vec3Array, UniformValue::Vec3Array(v)) => UniformPayload::Vec3Array(v),
        (UniformKind::Vec3Array, UniformValue::Vec3(v)) => UniformPayload::Vec3Array(vec![v]),
        (kind, value) => return Err(mismatch(kind, &value)),
    };
    Ok(payload)
}

// === Scalar and vector kinds ===

fn create_value(
    kind: UniformKind,
    location: Option<UniformLocation>,
    length: UniformLength,
    value: UniformValue,
) -> Result<Uniform> {
    Ok(Uniform::new(location, length, convert(kind, value)?))
}

fn create_int(l: Option<UniformLocation>, n: UniformLength, v: UniformValue) -> Result<Uniform> {
    create_value(UniformKind::Int, l, n, v)
}

fn create_float(l: Option<UniformLocation>, n: UniformLength, v: UniformValue) -> Result<Uniform> {
    create_value(UniformKind::Float, l, n, v)
}

fn create_vec2(l: Option<UniformLocation>, n: UniformLength, v: UniformValue) -> Result<Uniform> {
    create_value(UniformKind::Vec2, l, n, v)
}

fn create_vec3(l: Option<UniformLocation>, n: UniformLength, v: UniformValue) -> Result<Uniform> {
    create_value(UniformKind::Vec3, l, n, v)
}

fn create_vec4(l: Option<UniformLocation>, n: UniformLength, v: UniformValue) -> Result<Uniform> {
    create_value(UniformKind::Vec4, l, n, v)
}

fn create_vec3_array(
    l: Option<UniformLocation>,
    n: UniformLength,
    v: UniformValue,
) -> Result<Uniform> {
    create_value(UniformKind::Vec3Array, l, n, v)
}

fn update_value(
    _backend: Option<&mut dyn Backend>,
    uniform: &mut Uniform,
    value: UniformValue,
) -> Result<UpdateOutcome> {
    uniform.payload = convert(uniform.kind(), value)?;
    Ok(UpdateOutcome::Applied)
}

fn commit_value(backend: &mut dyn Backend, uniform: &mut Uniform, _unit: u32) -> Result<()> {
    let Some(location) = uniform.location else {
        return Ok(());
    };

    match &uniform.payload {
        UniformPayload::Int(v) => backend.uniform_1_i32(location, *v),
        UniformPayload::Float(v) => backend.uniform_1_f32(location, *v),
        UniformPayload::Vec2([x, y]) => backend.uniform_2_f32(location, *x, *y),
        UniformPayload::Vec3([x, y, z]) => backend.uniform_3_f32(location, *x, *y, *z),
        UniformPayload::Vec4([x, y, z, w]) => backend.uniform_4_f32(location, *x, *y, *z, *w),
        UniformPayload::Vec3Array(values) => {
            backend.uniform_3_f32_slice(location, values.as_flattened())
        }
        _ => {
            return Err(VaderError::UnsupportedUniformKind {
                kind: uniform.kind().to_string(),
            });
        }
    }
    Ok(())
}

// === Textures ===

fn texture_binding(uniform: &mut Uniform) -> Result<&mut TextureBinding> {
    let kind = uniform.kind();
    match &mut uniform.payload {
        UniformPayload::Texture2D(binding) => Ok(binding),
        _ => Err(VaderError::UnsupportedUniformKind {
            kind: kind.to_string(),
        }),
    }
}

/// Whether `binding` already holds a GPU texture built from `image`
fn is_built_from(binding: &TextureBinding, image: &TextureSource) -> bool {
    binding.texture.is_some() && binding.image.as_ref().is_some_and(|cur| same_source(cur, image))
}

/// Build a GPU texture for `image`, releasing the one it replaces
fn build_texture(
    backend: &mut dyn Backend,
    binding: &mut TextureBinding,
    image: TextureSource,
) -> Result<()> {
    let texture = make_texture(backend, &nearest_power_of_two(&image, 0))?;
    if let Some(old) = binding.texture.replace(texture) {
        backend.delete_texture(old);
    }
    binding.image = Some(image);
    Ok(())
}

fn create_texture(
    location: Option<UniformLocation>,
    length: UniformLength,
    value: UniformValue,
) -> Result<Uniform> {
    let pending = match value {
        UniformValue::Texture(image) => Some(image),
        UniformValue::None => None,
        other => return Err(mismatch(UniformKind::Texture2D, &other)),
    };
    let binding = TextureBinding {
        image: None,
        texture: None,
        pending,
    };
    Ok(Uniform::new(location, length, UniformPayload::Texture2D(binding)))
}

fn update_texture(
    backend: Option<&mut dyn Backend>,
    uniform: &mut Uniform,
    value: UniformValue,
) -> Result<UpdateOutcome> {
    let image = match value {
        UniformValue::Texture(image) => image,
        other => return Err(mismatch(UniformKind::Texture2D, &other)),
    };
    let binding = texture_binding(uniform)?;

    if is_built_from(binding, &image) {
        binding.pending = None;
        return Ok(UpdateOutcome::Unchanged);
    }

    match backend {
        None => {
            binding.pending = Some(image);
            Ok(UpdateOutcome::Deferred)
        }
        Some(backend) => {
            build_texture(backend, binding, image)?;
            binding.pending = None;
            Ok(UpdateOutcome::Applied)
        }
    }
}

fn commit_texture(backend: &mut dyn Backend, uniform: &mut Uniform, unit: u32) -> Result<()> {
    let location = uniform.location;
    let binding = texture_binding(uniform)?;

    if let Some(image) = binding.pending.clone() {
        if !is_built_from(binding, &image) {
            build_texture(backend, binding, image)?;
        }
        binding.pending = None;
    }

    if let Some(location) = location {
        backend.uniform_1_i32(location, unit as i32);
    }

    if binding.image.is_none() {
        return Ok(());
    }
    let Some(texture) = binding.texture else {
        return Ok(());
    };

    backend.active_texture(unit);
    backend.bind_texture_2d(Some(texture));
    Ok(())
}

// === Statics and unused ===

fn create_static(
    _location: Option<UniformLocation>,
    _length: UniformLength,
    value: UniformValue,
) -> Result<Uniform> {
    let text = match value {
        UniformValue::Texture(_) | UniformValue::Vec3Array(_) => {
            return Err(mismatch(UniformKind::StaticMacro, &value));
        }
        other => other.to_string(),
    };
    Ok(Uniform::new(None, UniformLength::Single, UniformPayload::StaticMacro(text)))
}

fn update_static(
    _backend: Option<&mut dyn Backend>,
    uniform: &mut Uniform,
    value: UniformValue,
) -> Result<UpdateOutcome> {
    if matches!(value, UniformValue::Texture(_) | UniformValue::Vec3Array(_)) {
        return Err(mismatch(UniformKind::StaticMacro, &value));
    }
    uniform.payload = UniformPayload::StaticMacro(value.to_string());
    Ok(UpdateOutcome::RecompileRequired)
}

fn create_unused(
    _location: Option<UniformLocation>,
    length: UniformLength,
    _value: UniformValue,
) -> Result<Uniform> {
    Ok(Uniform::new(None, length, UniformPayload::Unused))
}

fn update_unused(
    _backend: Option<&mut dyn Backend>,
    _uniform: &mut Uniform,
    _value: UniformValue,
) -> Result<UpdateOutcome> {
    Ok(UpdateOutcome::Unchanged)
}

fn commit_noop(_backend: &mut dyn Backend, _uniform: &mut Uniform, _unit: u32) -> Result<()> {
    Ok(())
}
