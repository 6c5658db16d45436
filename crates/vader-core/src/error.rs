//! Error and diagnostic types
//!
//! Fatal conditions abort the compile or update in progress and come back as
//! `VaderError`. Non-fatal conditions are `Diagnostic`s: they are logged and
//! handed back to the caller, and execution continues.

use thiserror::Error;

use crate::backend::ShaderStage;
use crate::uniform::UniformKind;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, VaderError>;

#[derive(Error, Debug)]
pub enum VaderError {
    /// A shader stage failed to compile
    #[error("COMPILE ERROR ({stage}): {log}\n------\n{context}\n------")]
    Compile {
        stage: ShaderStage,
        log: String,
        /// 1-based line reported by the driver, if it could be parsed
        line: Option<usize>,
        /// Numbered source window around `line`
        context: String,
    },

    #[error("LINK ERROR: {log}")]
    Link { log: String },

    #[error("'{name}' has no static value and no inline default")]
    MissingStaticValue { name: String },

    /// A macro call without a name or a closing paren
    #[error("Malformed static macro '{text}'")]
    MalformedStatic { text: String },

    #[error("Unsupported uniform type '{kind}'")]
    UnsupportedUniformKind { kind: String },

    #[error("Value {value} cannot be stored in a {kind} uniform")]
    ValueMismatch { kind: UniformKind, value: String },

    #[error("No uniform named '{name}'")]
    UnknownUniform { name: String },

    #[error("Render called before a program was compiled")]
    NotCompiled,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Non-fatal report produced while preparing or compiling a shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Declared in the shader, not supplied by the caller
    MissingUniform { name: String },
    /// Supplied by the caller, not referenced by the shader
    UnusedUniform { name: String },
    /// A static value was supplied but its macro never appears in the source
    StaticNotReferenced { name: String },
}

impl Diagnostic {
    /// Name of the uniform or macro the diagnostic is about
    pub fn name(&self) -> &str {
        match self {
            Diagnostic::MissingUniform { name }
            | Diagnostic::UnusedUniform { name }
            | Diagnostic::StaticNotReferenced { name } => name,
        }
    }

    /// Log the diagnostic under a label and hand it back
    pub(crate) fn report(self, label: &str) -> Self {
        log::warn!("Vader[{}] {}", label, self);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MissingUniform { name } => {
                write!(f, "uniform {} is referenced, but was not supplied", name)
            }
            Diagnostic::UnusedUniform { name } => {
                write!(f, "uniform {} is not being referenced", name)
            }
            Diagnostic::StaticNotReferenced { name } => {
                write!(f, "static '{}' not found in source", name)
            }
        }
    }
}
