//! Lexical uniform type inference
//!
//! A best-effort line scan over raw shader source. It never fails: anything
//! it cannot recognise simply does not match, and an unmatched name is
//! classified `Unused`.

use regex::Regex;

use crate::uniform::{UniformKind, UniformLength};

/// Directive that forces Shadertoy-compatible mode when present in source
pub const SHADERTOY_DIRECTIVE: &str = "VADER_MODE(shadertoy)";

/// Outcome of classifying a declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredKind {
    Known(UniformKind),
    /// Declared with a type the registry has no entry for
    Unsupported(String),
}

/// Result of inferring one uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredType {
    pub name: String,
    pub kind: InferredKind,
    pub length: UniformLength,
}

/// A parsed `uniform <type> <name>[...];` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformDeclaration<'a> {
    pub type_name: &'a str,
    pub name: &'a str,
    /// Raw text between the brackets, if any
    pub array_len: Option<&'a str>,
}

/// Parse a trimmed line that starts with `uniform`
///
/// Precision qualifiers (`uniform highp float x;`) are skipped.
pub(crate) fn parse_uniform_declaration(line: &str) -> Option<UniformDeclaration<'_>> {
    let mut words = line.split_whitespace();
    if words.next()? != "uniform" {
        return None;
    }

    let mut type_name = words.next()?;
    if matches!(type_name, "lowp" | "mediump" | "highp") {
        type_name = words.next()?;
    }

    let rest = words.next()?;
    let rest = rest.split(';').next().unwrap_or(rest);
    let (name, array_len) = match rest.split_once('[') {
        Some((name, tail)) => (name, Some(tail.split(']').next().unwrap_or(tail).trim())),
        None => (rest, None),
    };

    if name.is_empty() {
        return None;
    }

    Some(UniformDeclaration { type_name, name, array_len })
}

/// Matches a `STATIC(name` or `VADER_STATIC(name` call head for one name
fn static_call_regex(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b(?:VADER_)?STATIC\(\s*{}\s*[,)]", regex::escape(name))).ok()
}

/// Classify `name` by scanning `src`
pub fn infer_uniform_type(name: &str, src: &str) -> InferredType {
    let static_call = static_call_regex(name);

    for line in src.lines() {
        let line = line.trim();

        if line.starts_with("uniform") && line.contains(name) {
            if let Some(decl) = parse_uniform_declaration(line) {
                if decl.name == name {
                    return classify_declaration(name, &decl);
                }
            }
        }

        if static_call.as_ref().is_some_and(|rx| rx.is_match(line)) {
            return InferredType {
                name: name.to_string(),
                kind: InferredKind::Known(UniformKind::StaticMacro),
                length: UniformLength::Single,
            };
        }
    }

    InferredType {
        name: name.to_string(),
        kind: InferredKind::Known(UniformKind::Unused),
        length: UniformLength::Single,
    }
}

fn classify_declaration(name: &str, decl: &UniformDeclaration<'_>) -> InferredType {
    let is_array = decl.array_len.is_some();
    let length = match decl.array_len {
        None => UniformLength::Single,
        Some(len) => match len.parse::<usize>() {
            Ok(n) if n > 0 => UniformLength::Array(n),
            _ => UniformLength::Dynamic,
        },
    };

    let kind = match UniformKind::from_glsl(decl.type_name, is_array) {
        Some(kind) => InferredKind::Known(kind),
        None if is_array => InferredKind::Unsupported(format!("{}v", decl.type_name)),
        None => InferredKind::Unsupported(decl.type_name.to_string()),
    };

    InferredType { name: name.to_string(), kind, length }
}

/// Whether the raw source asks for Shadertoy-compatible mode
pub fn has_shadertoy_directive(src: &str) -> bool {
    src.lines().any(|line| line.contains(SHADERTOY_DIRECTIVE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(kind: UniformKind) -> InferredKind {
        InferredKind::Known(kind)
    }

    #[test]
    fn test_scalar_and_vector_types() {
        let src = "
            uniform int   u_count;
            uniform float u_gain;
            uniform vec2  u_offset;
            uniform vec3  u_color;
            uniform vec4  u_mouse;
            uniform sampler2D u_image;
        ";
        for (name, kind) in [
            ("u_count", UniformKind::Int),
            ("u_gain", UniformKind::Float),
            ("u_offset", UniformKind::Vec2),
            ("u_color", UniformKind::Vec3),
            ("u_mouse", UniformKind::Vec4),
            ("u_image", UniformKind::Texture2D),
        ] {
            let inferred = infer_uniform_type(name, src);
            assert_eq!(inferred.kind, known(kind), "{}", name);
            assert_eq!(inferred.length, UniformLength::Single, "{}", name);
        }
    }

    #[test]
    fn test_array_declaration() {
        let inferred = infer_uniform_type("u_points", "uniform vec3 u_points[8];");
        assert_eq!(inferred.kind, known(UniformKind::Vec3Array));
        assert_eq!(inferred.length, UniformLength::Array(8));
    }

    #[test]
    fn test_array_with_symbolic_length_is_dynamic() {
        let inferred = infer_uniform_type("u_points", "uniform vec3 u_points[N_POINTS];");
        assert_eq!(inferred.kind, known(UniformKind::Vec3Array));
        assert_eq!(inferred.length, UniformLength::Dynamic);
    }

    #[test]
    fn test_unsupported_types() {
        assert_eq!(
            infer_uniform_type("u_mvp", "uniform mat4 u_mvp;").kind,
            InferredKind::Unsupported("mat4".into())
        );
        assert_eq!(
            infer_uniform_type("u_uvs", "uniform vec2 u_uvs[4];").kind,
            InferredKind::Unsupported("vec2v".into())
        );
    }

    #[test]
    fn test_precision_qualifier() {
        let inferred = infer_uniform_type("u_time", "uniform highp float u_time;");
        assert_eq!(inferred.kind, known(UniformKind::Float));
    }

    #[test]
    fn test_prefix_name_does_not_match() {
        let src = "uniform vec2 u_time2;\nuniform float u_time;";
        assert_eq!(infer_uniform_type("u_time", src).kind, known(UniformKind::Float));
    }

    #[test]
    fn test_static_define() {
        let src = "#define OCTAVES VADER_STATIC(OCTAVES, 4)\nvoid main() {}";
        let inferred = infer_uniform_type("OCTAVES", src);
        assert_eq!(inferred.kind, known(UniformKind::StaticMacro));
        assert_eq!(inferred.length, UniformLength::Single);
    }

    #[test]
    fn test_static_call_in_any_spelling() {
        let src = "#define CURVE STATIC(CURVE, 1.0)\nvoid main() { float g = STATIC( GAIN , 0.5) * VADER_STATIC(MIX); }";
        for name in ["CURVE", "GAIN", "MIX"] {
            assert_eq!(infer_uniform_type(name, src).kind, known(UniformKind::StaticMacro), "{}", name);
        }
    }

    #[test]
    fn test_static_call_name_is_exact() {
        let src = "float a = STATIC(GAIN2, 1.0) + MY_STATIC(GAIN);";
        assert_eq!(infer_uniform_type("GAIN", src).kind, known(UniformKind::Unused));
    }

    #[test]
    fn test_absent_name_is_unused() {
        let inferred = infer_uniform_type("u_nothing", "void main() { gl_FragColor = vec4(1.0); }");
        assert_eq!(inferred.kind, known(UniformKind::Unused));
    }

    #[test]
    fn test_malformed_source_does_not_fail() {
        for src in ["uniform", "uniform float", "uniform float ;", "uniform }{ [[[", ""] {
            let inferred = infer_uniform_type("x", src);
            assert_eq!(inferred.kind, known(UniformKind::Unused), "{:?}", src);
        }
    }

    #[test]
    fn test_parse_declaration() {
        let decl = parse_uniform_declaration("uniform vec3 u_pts[12];").unwrap();
        assert_eq!(decl.type_name, "vec3");
        assert_eq!(decl.name, "u_pts");
        assert_eq!(decl.array_len, Some("12"));

        let decl = parse_uniform_declaration("uniform float u_time; // seconds").unwrap();
        assert_eq!(decl.name, "u_time");
        assert_eq!(decl.array_len, None);
    }

    #[test]
    fn test_shadertoy_directive() {
        assert!(has_shadertoy_directive("// VADER_MODE(shadertoy)\nvoid mainImage() {}"));
        assert!(!has_shadertoy_directive("void main() {}"));
    }
}
