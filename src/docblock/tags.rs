//! Standard PHPDoc tag grammars.
//!
//! Each [`StandardHandler`] knows the body grammar of one family of tags:
//!
//!   - `@param [Type] [&][...]$name [description]`
//!   - `@return Type [description]`
//!   - `@var [Type] [$name] [description]`
//!   - `@throws Type [description]`
//!   - `@property[-read|-write] [Type] $name [description]`
//!   - `@method [static] [ReturnType] name(params) [description]`
//!   - `@author Name [<email>]`
//!   - `@version` / `@since` / `@deprecated [version] [description]`
//!   - `@see` / `@link` / `@uses` / `@covers reference [description]`
//!   - anything else registered as generic: free text
//!
//! [`STANDARD_TAGS`] maps tag names (including the `@phpstan-` / `@psalm-`
//! variants) onto these handlers; it is what
//! [`TagFactory::with_standard_handlers`](super::TagFactory::with_standard_handlers)
//! registers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::pcre::{self, MAX_NESTING_DEPTH, PcreError};
use crate::types::{MethodParameter, PropertyAccess, TagBody};

use super::factory::{HandlerContext, HandlerError, HandlerResult, RESOLVE_TYPES_PARAMETER, TagHandler};
use super::types::split_type_token;

static AUTHOR_PATTERN: LazyLock<Result<Regex, PcreError>> =
    LazyLock::new(|| pcre::compile(r"^(?s)([^<]*?)\s*(?:<([^>]*)>)?\s*$"));

static EMAIL_PATTERN: LazyLock<Result<Regex, PcreError>> =
    LazyLock::new(|| pcre::compile(r"^[^@\s<>]+@[^@\s<>]+$"));

// Either a version-ish token starting with a digit, or a VCS keyword such
// as `$Id: Foo.php 12 $` / `GIT: $Id$`.
static VERSION_PATTERN: LazyLock<Result<Regex, PcreError>> =
    LazyLock::new(|| pcre::compile(r"^(?s)(\d\S*|[^\s:]+:\s*\$[^$]+\$|\$[^$]+\$)(?:\s+(.*))?$"));

/// The built-in tag grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardHandler {
    Generic,
    Param,
    Return,
    Var,
    Throws,
    Property(PropertyAccess),
    Method,
    Author,
    Version,
    Reference,
}

/// Tag names registered by default, with their grammar.
pub const STANDARD_TAGS: &[(&str, StandardHandler)] = &[
    ("param", StandardHandler::Param),
    ("phpstan-param", StandardHandler::Param),
    ("psalm-param", StandardHandler::Param),
    ("return", StandardHandler::Return),
    ("phpstan-return", StandardHandler::Return),
    ("psalm-return", StandardHandler::Return),
    ("var", StandardHandler::Var),
    ("phpstan-var", StandardHandler::Var),
    ("psalm-var", StandardHandler::Var),
    ("throws", StandardHandler::Throws),
    ("property", StandardHandler::Property(PropertyAccess::ReadWrite)),
    ("property-read", StandardHandler::Property(PropertyAccess::Read)),
    ("property-write", StandardHandler::Property(PropertyAccess::Write)),
    ("method", StandardHandler::Method),
    ("author", StandardHandler::Author),
    ("version", StandardHandler::Version),
    ("since", StandardHandler::Version),
    ("deprecated", StandardHandler::Version),
    ("see", StandardHandler::Reference),
    ("link", StandardHandler::Reference),
    ("uses", StandardHandler::Reference),
    ("covers", StandardHandler::Reference),
    ("api", StandardHandler::Generic),
    ("internal", StandardHandler::Generic),
    ("inheritdoc", StandardHandler::Generic),
    ("inheritDoc", StandardHandler::Generic),
    ("todo", StandardHandler::Generic),
    ("example", StandardHandler::Generic),
    ("license", StandardHandler::Generic),
    ("copyright", StandardHandler::Generic),
    ("package", StandardHandler::Generic),
    ("subpackage", StandardHandler::Generic),
    ("category", StandardHandler::Generic),
    ("ignore", StandardHandler::Generic),
    ("mixin", StandardHandler::Generic),
    ("template", StandardHandler::Generic),
    ("final", StandardHandler::Generic),
];

impl StandardHandler {
    /// Look up a handler by catalog id.
    pub fn from_id(id: &str) -> Option<Self> {
        let handler = match id {
            "generic" => Self::Generic,
            "param" => Self::Param,
            "return" => Self::Return,
            "var" => Self::Var,
            "throws" => Self::Throws,
            "property" => Self::Property(PropertyAccess::ReadWrite),
            "property-read" => Self::Property(PropertyAccess::Read),
            "property-write" => Self::Property(PropertyAccess::Write),
            "method" => Self::Method,
            "author" => Self::Author,
            "version" => Self::Version,
            "reference" => Self::Reference,
            _ => return None,
        };
        Some(handler)
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Param => "param",
            Self::Return => "return",
            Self::Var => "var",
            Self::Throws => "throws",
            Self::Property(PropertyAccess::ReadWrite) => "property",
            Self::Property(PropertyAccess::Read) => "property-read",
            Self::Property(PropertyAccess::Write) => "property-write",
            Self::Method => "method",
            Self::Author => "author",
            Self::Version => "version",
            Self::Reference => "reference",
        }
    }
}

impl TagHandler for StandardHandler {
    fn create(&self, body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
        match *self {
            Self::Generic => Ok(TagBody::Generic {
                description: ctx.description(body),
            }),
            Self::Param => create_param(body, ctx),
            Self::Return => {
                let (type_hint, rest) = required_type(body, ctx)?;
                Ok(TagBody::Return {
                    type_hint,
                    description: ctx.description(rest),
                })
            }
            Self::Throws => {
                let (type_hint, rest) = required_type(body, ctx)?;
                Ok(TagBody::Throws {
                    type_hint,
                    description: ctx.description(rest),
                })
            }
            Self::Var => create_var(body, ctx),
            Self::Property(access) => create_property(access, body, ctx),
            Self::Method => create_method(body, ctx),
            Self::Author => create_author(body),
            Self::Version => create_version(body, ctx),
            Self::Reference => create_reference(body, ctx),
        }
    }
}

// ─── Shared pieces ──────────────────────────────────────────────────────────

/// Whether the body starts with a variable token rather than a type.
fn starts_with_variable(s: &str) -> bool {
    s.starts_with('$') || s.starts_with('&') || s.starts_with("...")
}

/// Split off an optional leading type.
fn optional_type<'b>(
    body: &'b str,
    ctx: &HandlerContext<'_>,
) -> Result<(Option<String>, &'b str), HandlerError> {
    if body.is_empty() || starts_with_variable(body) {
        return Ok((None, body));
    }
    let (raw, rest) = split_type_token(body);
    Ok((Some(ctx.resolve_type(raw)?), rest.trim_start()))
}

fn required_type<'b>(
    body: &'b str,
    ctx: &HandlerContext<'_>,
) -> Result<(String, &'b str), HandlerError> {
    if body.is_empty() {
        return Err(HandlerError::new("missing type"));
    }
    let (raw, rest) = split_type_token(body);
    Ok((ctx.resolve_type(raw)?, rest.trim_start()))
}

/// A parsed `[&][...]$name` token.
struct VariableToken<'b> {
    name: &'b str,
    is_reference: bool,
    is_variadic: bool,
}

/// Parse a `[&][...]$name` token at the start of `s`.  Returns the token
/// and whatever follows it.
fn variable_token(s: &str) -> Option<(VariableToken<'_>, &str)> {
    let (is_reference, s) = match s.strip_prefix('&') {
        Some(r) => (true, r.trim_start()),
        None => (false, s),
    };
    let (is_variadic, s) = match s.strip_prefix("...") {
        Some(r) => (true, r),
        None => (false, s),
    };
    let s = s.strip_prefix('$')?;
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let (name, rest) = s.split_at(end);
    // `$name,` or `$name.` in prose-y docblocks.
    let rest = rest.trim_start_matches([',', '.']);
    Some((
        VariableToken {
            name,
            is_reference,
            is_variadic,
        },
        rest.trim_start(),
    ))
}

// ─── Individual grammars ────────────────────────────────────────────────────

fn create_param(body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    let (type_hint, rest) = optional_type(body, ctx)?;
    let (var, rest) =
        variable_token(rest).ok_or_else(|| HandlerError::new("missing variable name"))?;

    Ok(TagBody::Param {
        type_hint,
        variable: var.name.to_string(),
        is_variadic: var.is_variadic,
        is_reference: var.is_reference,
        description: ctx.description(rest),
    })
}

fn create_var(body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    let (type_hint, rest) = optional_type(body, ctx)?;
    let (variable, rest) = match variable_token(rest) {
        Some((var, rest)) => (Some(var.name.to_string()), rest),
        None => (None, rest),
    };

    Ok(TagBody::Var {
        type_hint,
        variable,
        description: ctx.description(rest),
    })
}

fn create_property(access: PropertyAccess, body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    let (type_hint, rest) = optional_type(body, ctx)?;
    let (var, rest) =
        variable_token(rest).ok_or_else(|| HandlerError::new("missing property name"))?;

    Ok(TagBody::Property {
        access,
        type_hint,
        variable: var.name.to_string(),
        description: ctx.description(rest),
    })
}

fn create_method(body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    // Check for optional `static` keyword.  It must be followed by
    // whitespace to avoid matching a method literally named "staticFoo".
    let (is_static, rest) = match body.strip_prefix("static") {
        Some(after) if after.starts_with(char::is_whitespace) => (true, after.trim_start()),
        _ => (false, body),
    };

    // The method name is the token immediately before the first `(`.
    let paren_pos = rest
        .find('(')
        .ok_or_else(|| HandlerError::new("missing parameter list"))?;
    let before_paren = rest[..paren_pos].trim();
    if before_paren.is_empty() {
        return Err(HandlerError::new("missing method name"));
    }

    let (return_raw, name) = match before_paren.rfind(char::is_whitespace) {
        Some(last_space) => (
            Some(before_paren[..last_space].trim()),
            before_paren[last_space..].trim(),
        ),
        None => (None, before_paren),
    };
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(HandlerError::new(format!("invalid method name \"{}\"", name)));
    }

    let return_type = match return_raw {
        Some(raw) => Some(ctx.resolve_type(raw)?),
        None => None,
    };

    let close_paren = pcre::find_balanced(rest, paren_pos, '(', ')', MAX_NESTING_DEPTH)?
        .ok_or_else(|| HandlerError::new("unclosed parameter list"))?;
    let params_str = rest[paren_pos + 1..close_paren].trim();
    let parameters = if params_str.is_empty() {
        Vec::new()
    } else {
        parse_method_params(params_str, ctx)?
    };

    Ok(TagBody::Method {
        is_static,
        return_type,
        name: name.to_string(),
        parameters,
        description: ctx.description(rest[close_paren + 1..].trim_start()),
    })
}

/// Parse the parameter list of a `@method` tag.
///
/// Handles formats like:
///   - `string $abstract, callable():mixed $mockDefinition = null`
///   - `array<string, mixed> $data, string ...$rest`
///
/// Parts without a `$name` are skipped.
fn parse_method_params(
    params_str: &str,
    ctx: &HandlerContext<'_>,
) -> Result<Vec<MethodParameter>, HandlerError> {
    let mut result = Vec::new();

    for part in split_params(params_str) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (decl, default_value) = match split_default(part) {
            Some((decl, default)) => (decl.trim(), Some(default.trim().to_string())),
            None => (part, None),
        };

        let Some(dollar) = decl.rfind('$') else {
            tracing::trace!(part, "skipping @method parameter without a name");
            continue;
        };

        let prefix = decl[..dollar].trim_end();
        let (is_variadic, prefix) = match prefix.strip_suffix("...") {
            Some(p) => (true, p.trim_end()),
            None => (false, prefix),
        };
        let (is_reference, prefix) = match prefix.strip_suffix('&') {
            Some(p) => (true, p.trim_end()),
            None => (false, prefix),
        };

        let name = &decl[dollar + 1..];
        let name = name
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .map_or(name, |end| &name[..end]);
        if name.is_empty() {
            continue;
        }

        let type_hint = if prefix.is_empty() {
            None
        } else {
            Some(ctx.resolve_type(prefix)?)
        };

        result.push(MethodParameter {
            name: name.to_string(),
            type_hint,
            is_variadic,
            is_reference,
            default_value: default_value.filter(|d| !d.is_empty()),
        });
    }

    Ok(result)
}

/// Split a parameter string on commas while respecting `<>`, `()`, `{}`
/// and `[]` nesting so that `array<string, mixed>` is not split.
fn split_params(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    let mut prev = None;

    for (i, ch) in s.char_indices() {
        match ch {
            '<' | '(' | '{' | '[' => depth += 1,
            // `=>` in an array literal default closes nothing.
            '>' if prev == Some('=') => {}
            '>' | ')' | '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev = Some(ch);
    }
    parts.push(&s[start..]);
    parts
}

/// Split `decl = default` at the first top-level `=`.
fn split_default(part: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut prev = None;
    for (i, ch) in part.char_indices() {
        match ch {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' if prev == Some('=') => {}
            '>' | ')' | '}' | ']' => depth -= 1,
            // `=>` inside shapes is not a default.
            '=' if depth == 0 && !part[i + 1..].starts_with('>') => {
                return Some((&part[..i], &part[i + 1..]));
            }
            _ => {}
        }
        prev = Some(ch);
    }
    None
}

fn create_author(body: &str) -> HandlerResult {
    let re = AUTHOR_PATTERN.as_ref().map_err(|e| HandlerError::from(e.clone()))?;
    let caps = pcre::captures_at(re, body, 0)?
        .ok_or_else(|| HandlerError::new("malformed author"))?;

    let author_name = caps.get(1).map_or("", |m| m.as_str()).trim();
    if author_name.is_empty() {
        return Err(HandlerError::new("missing author name"));
    }

    let email = match caps.get(2) {
        Some(m) => {
            let email = m.as_str().trim();
            let email_re = EMAIL_PATTERN.as_ref().map_err(|e| HandlerError::from(e.clone()))?;
            if !email_re.is_match(email) {
                return Err(HandlerError::new(format!("invalid email address \"{}\"", email)));
            }
            Some(email.to_string())
        }
        None => None,
    };

    Ok(TagBody::Author {
        author_name: author_name.to_string(),
        email,
    })
}

fn create_version(body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    let re = VERSION_PATTERN.as_ref().map_err(|e| HandlerError::from(e.clone()))?;
    match pcre::captures_at(re, body, 0)? {
        Some(caps) => Ok(TagBody::Version {
            version: caps.get(1).map(|m| m.as_str().to_string()),
            description: ctx.description(caps.get(2).map_or("", |m| m.as_str())),
        }),
        None => Ok(TagBody::Version {
            version: None,
            description: ctx.description(body),
        }),
    }
}

fn create_reference(body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    let (reference, rest) = match body.split_once(char::is_whitespace) {
        Some((r, rest)) => (r, rest.trim_start()),
        None => (body, ""),
    };
    if reference.is_empty() {
        return Err(HandlerError::new("missing reference"));
    }

    Ok(TagBody::Reference {
        reference: resolve_reference(reference, ctx),
        description: ctx.description(rest),
    })
}

/// Qualify the class part of a structural reference (`Foo::bar()`,
/// `Foo`) against the type context.  URLs, functions (`foo()`) and
/// anything in a context-free parse are left as written.
fn resolve_reference(reference: &str, ctx: &HandlerContext<'_>) -> String {
    let Some(context) = ctx.type_context() else {
        return reference.to_string();
    };
    if ctx.parameter(RESOLVE_TYPES_PARAMETER).and_then(Value::as_bool) == Some(false)
        || reference.contains("://")
    {
        return reference.to_string();
    }

    let (class_part, member) = match reference.split_once("::") {
        Some((class, member)) => (class, Some(member)),
        None => (reference, None),
    };
    let is_class_like = class_part
        .chars()
        .next()
        .is_some_and(|c| c == '\\' || c.is_uppercase());
    if !is_class_like || (member.is_none() && class_part.ends_with("()")) {
        return reference.to_string();
    }

    let class = context.resolve_class_name(class_part);
    match member {
        Some(member) => format!("{}::{}", class, member),
        None => class,
    }
}
