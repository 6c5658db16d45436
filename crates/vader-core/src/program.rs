//! Program compilation
//!
//! Turns user fragment source into a linked program: wrap it for the
//! support mode, substitute statics, compile both stages, link, then
//! reconcile the uniform set with what the new program declares.

use std::sync::OnceLock;

use regex::Regex;

use crate::backend::{Backend, ProgramHandle, ShaderHandle, ShaderStage};
use crate::error::{Diagnostic, Result, VaderError};
use crate::infer::parse_uniform_declaration;
use crate::preprocess::{Preprocessed, preprocess};
use crate::shaders;
use crate::state::{RenderState, SCREEN_QUAD, SupportMode};
use crate::uniform::{UniformKind, UniformSet};

/// Name of the quad position attribute in the vertex shader
pub const POSITION_ATTRIBUTE: &str = "a_position";

fn error_line_regex() -> &'static Regex {
    static ERROR_LINE: OnceLock<Regex> = OnceLock::new();
    ERROR_LINE.get_or_init(|| Regex::new(r"ERROR: \d+:(\d+):").expect("Invalid error line regex"))
}

/// Wrap user source with the prologue (and epilogue) for `mode`
pub fn wrap_source(mode: SupportMode, source: &str) -> String {
    match mode {
        SupportMode::Default => format!("{}{}", shaders::VADER_PROLOGUE, source),
        SupportMode::Shadertoy => format!(
            "{}{}{}",
            shaders::SHADERTOY_PROLOGUE,
            source,
            shaders::SHADERTOY_EPILOGUE
        ),
    }
}

/// Line number reported in a driver log like `ERROR: 0:12: ...`
pub fn parse_error_line(log: &str) -> Option<usize> {
    error_line_regex()
        .captures(log)
        .and_then(|caps| caps[1].parse().ok())
}

fn format_error_line(text: &str, number: usize, error_line: usize) -> String {
    let head = if number == error_line { "> " } else { "  " };
    format!("{:>5}: {}", format!("{}{}", head, number), text)
}

/// Numbered window of up to five lines centred on `line` (1-based)
pub fn error_context(source: &str, line: usize) -> String {
    let start = line.saturating_sub(3);
    let end = line + 2;
    source
        .lines()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(i, text)| format_error_line(text, i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compile one shader stage, deleting the shader on failure
pub fn glsl_compile(
    backend: &mut dyn Backend,
    source: &str,
    stage: ShaderStage,
) -> Result<ShaderHandle> {
    let shader = backend
        .create_shader(stage)
        .ok_or_else(|| VaderError::Backend(format!("failed to create {} shader", stage)))?;
    backend.shader_source(shader, source);
    backend.compile_shader(shader);

    if backend.shader_compile_status(shader) {
        return Ok(shader);
    }

    let mut log = backend.shader_info_log(shader);
    if log.trim().is_empty() {
        log = "Error report unavailable".to_string();
    }
    let line = parse_error_line(&log);
    let context = error_context(source, line.unwrap_or(1));

    log::debug!("Full source ({}):\n{}", stage, source);
    backend.delete_shader(shader);

    Err(VaderError::Compile {
        stage,
        log: log.trim_end().to_string(),
        line,
        context,
    })
}

/// Build and link a program from the fixed vertex shader and `fragment`
pub fn create_program(backend: &mut dyn Backend, fragment: &str) -> Result<ProgramHandle> {
    let vert = glsl_compile(backend, shaders::VERTEX, ShaderStage::Vertex)?;
    let frag = match glsl_compile(backend, fragment, ShaderStage::Fragment) {
        Ok(frag) => frag,
        Err(e) => {
            backend.delete_shader(vert);
            return Err(e);
        }
    };

    let Some(program) = backend.create_program() else {
        backend.delete_shader(vert);
        backend.delete_shader(frag);
        return Err(VaderError::Backend("failed to create program".into()));
    };

    backend.attach_shader(program, vert);
    backend.attach_shader(program, frag);
    backend.link_program(program);

    // Attached shaders are no longer needed once linking has run
    backend.delete_shader(vert);
    backend.delete_shader(frag);

    if !backend.program_link_status(program) {
        let log = backend.program_info_log(program);
        backend.delete_program(program);
        return Err(VaderError::Link { log });
    }

    Ok(program)
}

/// Compare declarations in processed source against the uniform set
///
/// Declared but not supplied gives `MissingUniform`; supplied but never
/// referenced (kind `Unused`) gives `UnusedUniform`.
pub fn check_for_missing_uniforms(uniforms: &UniformSet, source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for line in source.lines().map(str::trim) {
        if !line.starts_with("uniform") {
            continue;
        }
        if let Some(decl) = parse_uniform_declaration(line) {
            if !uniforms.contains(decl.name) {
                diagnostics.push(Diagnostic::MissingUniform { name: decl.name.to_string() });
            }
        }
    }

    for (name, uniform) in uniforms.iter() {
        if uniform.kind() == UniformKind::Unused {
            diagnostics.push(Diagnostic::UnusedUniform { name: name.to_string() });
        }
    }

    diagnostics
}

/// Compile `source` into `state`
///
/// The previous program is only released once the new one has linked, so a
/// failed compile leaves the state drawing what it drew before.
pub fn compile<B: Backend>(
    state: &mut RenderState<B>,
    source: &str,
    uniforms: &mut UniformSet,
) -> Result<Vec<Diagnostic>> {
    state.source = source.to_string();

    let wrapped = wrap_source(state.mode, source);
    let Preprocessed {
        source: processed,
        mut diagnostics,
    } = preprocess(&wrapped, uniforms)?;

    let program = create_program(&mut state.backend, &processed)?;
    if let Some(old) = state.program.replace(program) {
        state.backend.delete_program(old);
    }
    state.processed_source = processed;

    // Locations belong to a single program
    for (name, uniform) in uniforms.iter_mut() {
        uniform.location = match uniform.kind() {
            UniformKind::StaticMacro | UniformKind::Unused => None,
            _ => state.backend.uniform_location(program, name),
        };
    }

    state.position_attribute = state.backend.attrib_location(program, POSITION_ATTRIBUTE);
    if state.vertex_buffer.is_none() {
        let buffer = state
            .backend
            .create_buffer()
            .ok_or_else(|| VaderError::Backend("failed to create vertex buffer".into()))?;
        state.backend.bind_array_buffer(Some(buffer));
        state.backend.array_buffer_data(&SCREEN_QUAD);
        state.vertex_buffer = Some(buffer);
    }

    diagnostics.extend(check_for_missing_uniforms(uniforms, &state.processed_source));
    let diagnostics: Vec<Diagnostic> = diagnostics
        .into_iter()
        .map(|d| d.report(&state.label))
        .collect();

    log::info!(
        "Vader[{}] compiled program {:?} ({} uniforms, {} warnings)",
        state.label,
        program,
        uniforms.len(),
        diagnostics.len()
    );

    state.diagnostics = diagnostics.clone();
    state.needs_recompile = false;
    Ok(diagnostics)
}
