//! Type-string utilities for PHPDoc types.
//!
//! This submodule provides helpers for splitting raw type tokens off a tag
//! body, classifying built-in type keywords, and the [`TypeResolver`]
//! service that qualifies class names against a [`TypeContext`].  The full
//! PHP type grammar is not modelled; types stay strings.

use crate::types::TypeContext;

use super::factory::HandlerError;

/// Built-in and pseudo type keywords that never name a class and are left
/// untouched by resolution.
pub(crate) const KEYWORD_TYPES: &[&str] = &[
    "int", "integer", "float", "double", "string", "bool", "boolean", "void", "never", "null",
    "false", "true", "array", "callable", "iterable", "resource", "mixed", "object", "self",
    "static", "parent", "list", "scalar", "numeric",
];

/// Check whether a type name is a built-in keyword (case-insensitive).
///
/// Dashed names such as `class-string` or `non-empty-array` are PHPStan /
/// Psalm pseudo types and count as keywords too.
pub(crate) fn is_keyword(type_name: &str) -> bool {
    if type_name.contains('-') {
        return true;
    }
    let lower = type_name.to_ascii_lowercase();
    KEYWORD_TYPES.contains(&lower.as_str())
}

/// Split off the first type token from `s`, respecting `<…>`, `(…)`, `{…}`
/// and `[…]` nesting.
///
/// Returns `(type_token, remainder)` where `type_token` is the full type
/// (e.g. `Collection<int, User>` or `callable(int): void`) and `remainder`
/// is whatever follows.  A callable's `: ReturnType` suffix is kept with
/// the type.
pub(crate) fn split_type_token(s: &str) -> (&str, &str) {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth -= 1,
            // `callable(int): void`: the return type belongs to the token.
            ':' if depth == 0 && s[..i].ends_with(')') => {
                let after = s[i + 1..].trim_start();
                let skipped = s.len() - (i + 1) - after.len();
                let (ret, _) = split_type_token(after);
                let end = i + 1 + skipped + ret.len();
                return (&s[..end], &s[end..]);
            }
            // `Foo&$x` / `Foo & $x`: a by-reference variable, not an
            // intersection.
            '&' if depth == 0 && s[i + 1..].trim_start().starts_with('$') => {
                return (s[..i].trim_end(), &s[i..]);
            }
            // Union / intersection operators may be surrounded by spaces.
            c if c.is_whitespace() && depth == 0 => {
                let tail = s[i..].trim_start();
                let reference = tail.starts_with('&') && tail[1..].trim_start().starts_with('$');
                if tail.starts_with('|') || tail.starts_with('&') && !reference {
                    continue;
                }
                if s[..i].ends_with('|') || s[..i].ends_with('&') {
                    continue;
                }
                return (&s[..i], &s[i..]);
            }
            _ => {}
        }
    }
    (s, "")
}

/// Strip trailing punctuation that leaks from prose (`Foo.` / `Foo,`).
pub(crate) fn trim_type(raw: &str) -> &str {
    raw.trim().trim_end_matches(['.', ','])
}

/// Check that all brackets in a type expression balance.
pub(crate) fn brackets_balanced(type_expr: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_quote: Option<char> = None;
    for c in type_expr.chars() {
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_quote = Some(c),
            '<' | '(' | '{' | '[' => stack.push(c),
            '>' | ')' | '}' | ']' => {
                let expected = match c {
                    '>' => '<',
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && in_quote.is_none()
}

// ─── Resolution service ────────────────────────────────────────────────────

/// Service that turns a raw type expression into its resolved form.
///
/// Registered on the tag factory under
/// [`TYPE_RESOLVER`](super::factory::TYPE_RESOLVER).
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, type_expr: &str, context: &TypeContext) -> Result<String, HandlerError>;
}

/// Default resolver: qualifies every class-like identifier in the
/// expression through [`TypeContext::resolve_class_name`], leaving keywords,
/// variables, literals, constants after `::` and array-shape keys alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextTypeResolver;

impl TypeResolver for ContextTypeResolver {
    fn resolve(&self, type_expr: &str, context: &TypeContext) -> Result<String, HandlerError> {
        if !brackets_balanced(type_expr) {
            return Err(HandlerError::new(format!(
                "unbalanced brackets in type \"{}\"",
                type_expr
            )));
        }

        let mut out = String::with_capacity(type_expr.len() + 16);
        let mut rest = type_expr;
        let mut prev: Option<char> = None;
        // Open brackets, innermost last.  Shape keys only occur directly
        // inside `{...}`.
        let mut open: Vec<char> = Vec::new();
        // The identifier just seen was the subject of a conditional type
        // (`$x is ...`) or its `is` keyword.
        let mut after_subject = false;
        let mut after_is = false;

        while let Some(c) = rest.chars().next() {
            if c == '\'' || c == '"' {
                // Literal string: copy through the closing quote.
                let end = rest[1..].find(c).map(|i| i + 2).unwrap_or(rest.len());
                out.push_str(&rest[..end]);
                prev = Some(c);
                rest = &rest[end..];
                continue;
            }

            if c.is_ascii_digit() {
                // Numeric literal (`1`, `0.5`, `1e3`).
                let end = rest
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
                    .unwrap_or(rest.len());
                out.push_str(&rest[..end]);
                prev = Some(c);
                rest = &rest[end..];
                continue;
            }

            if is_ident_start(c) {
                let end = rest
                    .find(|ch: char| !is_ident_char(ch))
                    .unwrap_or(rest.len());
                let ident = &rest[..end];
                let after = &rest[end..];

                let after_trimmed = after.trim_start();
                let is_shape_key = open.last() == Some(&'{')
                    && (after_trimmed.starts_with(':') && !after_trimmed.starts_with("::")
                        || after_trimmed.starts_with("?:"));
                let is_member = out.ends_with("::");
                let is_variable = prev == Some('$');
                // `$x is T` / `$x is not T` in conditional return types.
                let is_operator =
                    after_subject && ident == "is" || after_is && ident == "not";

                if is_shape_key || is_member || is_variable || is_operator || is_keyword(ident) {
                    out.push_str(ident);
                } else {
                    out.push_str(&context.resolve_class_name(ident));
                }
                after_is = after_subject && ident == "is";
                after_subject = is_variable;
                prev = ident.chars().last();
                rest = after;
                continue;
            }

            match c {
                '<' | '(' | '{' | '[' => open.push(c),
                '>' | ')' | '}' | ']' => {
                    open.pop();
                }
                _ => {}
            }
            if !c.is_whitespace() {
                after_subject = false;
                after_is = false;
            }
            out.push(c);
            prev = Some(c);
            rest = &rest[c.len_utf8()..];
        }

        Ok(out)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '\\'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\\' || c == '-'
}
