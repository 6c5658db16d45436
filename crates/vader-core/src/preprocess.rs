//! Static macro substitution
//!
//! Rewrites `STATIC(name)` and `STATIC(name, literal)` (also spelled
//! `VADER_STATIC(...)`) into literal text before compilation. Values come
//! from `StaticMacro` uniforms first, then from the inline literal. The
//! scan is textual: a regex finds each macro head and the literal runs to
//! the paren that balances the call. It does not understand GLSL.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Diagnostic, Result, VaderError};
use crate::uniform::UniformSet;

fn macro_head_regex() -> &'static Regex {
    static HEAD: OnceLock<Regex> = OnceLock::new();
    HEAD.get_or_init(|| Regex::new(r"\b(?:VADER_)?STATIC\(").expect("Invalid static macro regex"))
}

fn macro_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^\s*([_A-Za-z]\w*)\s*").expect("Invalid static name regex"))
}

/// One macro call found in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall<'a> {
    /// Byte range of the whole call, closing paren included
    pub range: Range<usize>,
    pub name: &'a str,
    /// Trimmed inline default; `None` when absent or empty
    pub literal: Option<&'a str>,
}

fn malformed(src: &str, start: usize) -> VaderError {
    let text = src[start..].lines().next().unwrap_or_default().trim_end();
    VaderError::MalformedStatic { text: text.to_string() }
}

fn parse_macro(src: &str, start: usize, body: usize) -> Result<MacroCall<'_>> {
    let caps = macro_name_regex()
        .captures(&src[body..])
        .ok_or_else(|| malformed(src, start))?;
    let name = caps.get(1).map_or("", |m| &src[body + m.start()..body + m.end()]);
    let after_name = body + caps.get(0).map_or(0, |m| m.end());

    match src[after_name..].chars().next() {
        Some(')') => Ok(MacroCall {
            range: start..after_name + 1,
            name,
            literal: None,
        }),
        Some(',') => {
            let literal_start = after_name + 1;
            let mut depth = 0usize;
            for (i, c) in src[literal_start..].char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' if depth == 0 => {
                        let literal = src[literal_start..literal_start + i].trim();
                        return Ok(MacroCall {
                            range: start..literal_start + i + 1,
                            name,
                            literal: (!literal.is_empty()).then_some(literal),
                        });
                    }
                    ')' => depth -= 1,
                    _ => {}
                }
            }
            Err(malformed(src, start))
        }
        _ => Err(malformed(src, start)),
    }
}

/// Every macro call in `src`, in order
///
/// A head with no name or no balancing paren is `MalformedStatic`.
pub fn find_static_macros(src: &str) -> Result<Vec<MacroCall<'_>>> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(head) = macro_head_regex().find_at(src, from) {
        let call = parse_macro(src, head.start(), head.end())?;
        from = call.range.end;
        found.push(call);
    }
    Ok(found)
}

/// Rebuild `src`, replacing each call for which `with` returns text
fn splice<'s, 't>(
    src: &'s str,
    calls: &[MacroCall<'s>],
    mut with: impl FnMut(&MacroCall<'s>) -> Option<&'t str>,
) -> String {
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    for call in calls {
        if let Some(text) = with(call) {
            out.push_str(&src[last..call.range.start]);
            out.push_str(text);
            last = call.range.end;
        }
    }
    out.push_str(&src[last..]);
    out
}

/// Replace every `STATIC(name...)` occurrence with `value`
///
/// Returns `None` when the macro does not occur at all.
pub fn replace(src: &str, name: &str, value: &str) -> Result<Option<String>> {
    let calls = find_static_macros(src)?;
    if !calls.iter().any(|call| call.name == name) {
        return Ok(None);
    }
    Ok(Some(splice(src, &calls, |call| (call.name == name).then_some(value))))
}

/// Resolve remaining macros from their inline literals
///
/// The first macro with neither a uniform nor a literal is an error.
pub fn resolve_defaults(src: &str) -> Result<String> {
    let calls = find_static_macros(src)?;
    if let Some(call) = calls.iter().find(|call| call.literal.is_none()) {
        return Err(VaderError::MissingStaticValue {
            name: call.name.to_string(),
        });
    }
    Ok(splice(src, &calls, |call| call.literal))
}

/// Source after substitution plus anything worth warning about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Substitute all static macros in `src` using the uniform set
pub fn preprocess(src: &str, uniforms: &UniformSet) -> Result<Preprocessed> {
    let mut source = src.to_string();
    let mut diagnostics = Vec::new();

    for (name, uniform) in uniforms.iter() {
        let Some(value) = uniform.static_value() else {
            continue;
        };
        match replace(&source, name, value)? {
            Some(replaced) => source = replaced,
            None => diagnostics.push(Diagnostic::StaticNotReferenced { name: name.to_string() }),
        }
    }

    let source = resolve_defaults(&source)?;
    Ok(Preprocessed { source, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use crate::uniform::{UniformKind, UniformLength};

    fn statics(pairs: &[(&str, &str)]) -> UniformSet {
        let mut set = UniformSet::new();
        for (name, value) in pairs {
            let u = registry::create(UniformKind::StaticMacro, None, UniformLength::Single, *value)
                .unwrap();
            set.insert(*name, u);
        }
        set
    }

    #[test]
    fn test_replaces_every_occurrence_and_nothing_else() {
        let src = "float a = STATIC(x);\nfloat b = STATIC( x ) * 2.0;\n// x stays";
        let out = preprocess(src, &statics(&[("x", "3")])).unwrap();
        assert_eq!(out.source, "float a = 3;\nfloat b = 3 * 2.0;\n// x stays");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_uniform_overrides_inline_literal() {
        let out = preprocess("int n = STATIC(N, 4);", &statics(&[("N", "16")])).unwrap();
        assert_eq!(out.source, "int n = 16;");
    }

    #[test]
    fn test_inline_literal_fallback() {
        let out = preprocess("float y = STATIC(y, 7);", &UniformSet::new()).unwrap();
        assert_eq!(out.source, "float y = 7;");
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = preprocess("float z = STATIC(z);", &UniformSet::new()).unwrap_err();
        match err {
            VaderError::MissingStaticValue { name } => assert_eq!(name, "z"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_vader_prefixed_spelling() {
        let src = "#define STEPS VADER_STATIC(STEPS, 32)\nint s = VADER_STATIC(SCALE);";
        let out = preprocess(src, &statics(&[("SCALE", "2")])).unwrap();
        assert_eq!(out.source, "#define STEPS 32\nint s = 2;");
    }

    #[test]
    fn test_nested_literal_and_multiple_per_line() {
        let src = "vec3 c = vec3(STATIC(R, 1.0), STATIC(G, vec2(0.5, 0.5)).x, 0.0);";
        let out = preprocess(src, &UniformSet::new()).unwrap();
        assert_eq!(out.source, "vec3 c = vec3(1.0, vec2(0.5, 0.5).x, 0.0);");
    }

    #[test]
    fn test_name_is_escaped_and_bounded() {
        let src = "float a = STATIC(x);\nfloat b = STATIC(xx, 5);";
        let out = preprocess(src, &statics(&[("x", "1")])).unwrap();
        assert_eq!(out.source, "float a = 1;\nfloat b = 5;");
    }

    #[test]
    fn test_value_is_not_expanded() {
        let out = preprocess("float a = STATIC(x);", &statics(&[("x", "$1")])).unwrap();
        assert_eq!(out.source, "float a = $1;");
    }

    #[test]
    fn test_unreferenced_static_warns() {
        let out = preprocess("void main() {}", &statics(&[("GHOST", "1")])).unwrap();
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::StaticNotReferenced { name: "GHOST".into() }]
        );
    }

    #[test]
    fn test_suffix_word_is_not_a_macro() {
        let src = "float MY_STATIC(float v) { return v; }";
        let out = preprocess(src, &UniformSet::new()).unwrap();
        assert_eq!(out.source, src);
    }

    #[test]
    fn test_literal_nesting_is_unbounded() {
        let src = "float y = STATIC(y, max(1.0, min(2.0, 3.0)));";
        let out = preprocess(src, &UniformSet::new()).unwrap();
        assert_eq!(out.source, "float y = max(1.0, min(2.0, 3.0));");

        let out = preprocess(src, &statics(&[("y", "4.0")])).unwrap();
        assert_eq!(out.source, "float y = 4.0;");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_unbalanced_macro_is_error() {
        let err = preprocess("float y = STATIC(y, max(1.0);", &UniformSet::new()).unwrap_err();
        match err {
            VaderError::MalformedStatic { text } => assert_eq!(text, "STATIC(y, max(1.0);"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_macro_without_name_is_error() {
        for src in ["float a = STATIC(1.0);", "float a = VADER_STATIC();", "int n = STATIC(N 4);"] {
            let err = preprocess(src, &UniformSet::new()).unwrap_err();
            assert!(matches!(err, VaderError::MalformedStatic { .. }), "{}", src);
        }
    }

    #[test]
    fn test_empty_literal_counts_as_missing() {
        let err = preprocess("float y = STATIC(y, );", &UniformSet::new()).unwrap_err();
        assert!(matches!(err, VaderError::MissingStaticValue { ref name } if name == "y"));
    }

    #[test]
    fn test_find_static_macros() {
        let src = "a STATIC(x) b VADER_STATIC( y , f(1, 2) ) c";
        let calls = find_static_macros(src).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "x");
        assert_eq!(calls[0].literal, None);
        assert_eq!(&src[calls[0].range.clone()], "STATIC(x)");
        assert_eq!(calls[1].name, "y");
        assert_eq!(calls[1].literal, Some("f(1, 2)"));
        assert_eq!(&src[calls[1].range.clone()], "VADER_STATIC( y , f(1, 2) )");
    }
}
