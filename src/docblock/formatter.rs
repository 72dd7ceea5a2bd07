//! Rendering of tags and description token streams back into text.
//!
//! A [`Formatter`] decides how a single tag is printed; the default
//! [`Formatter::format`] stitches a description together from its text
//! fragments and inline tags (wrapped in `{` `}`), in order.

use crate::types::{DescriptionToken, MethodParameter, Tag, TagBody};

/// Strategy for rendering tags.
pub trait Formatter: Send + Sync {
    /// Render one tag as `@name ...`, without the inline `{}` wrapper.
    fn format_tag(&self, tag: &Tag) -> String;

    /// Render a description token stream.  Text fragments are copied
    /// verbatim.
    fn format(&self, tokens: &[DescriptionToken]) -> String {
        let mut out = String::new();
        for token in tokens {
            match token {
                DescriptionToken::Text(text) => out.push_str(text),
                DescriptionToken::Tag(tag) => {
                    out.push('{');
                    out.push_str(&self.format_tag(tag));
                    out.push('}');
                }
            }
        }
        out
    }
}

/// Renders tags exactly as parsed, whitespace included.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsIsFormatter;

impl Formatter for AsIsFormatter {
    fn format_tag(&self, tag: &Tag) -> String {
        if let TagBody::Invalid { text, .. } = tag.body() {
            return text.clone();
        }
        let mut out = tag_prefix(tag);
        let body = render_body(tag.body(), self);
        if !body.is_empty() {
            out.push(' ');
            out.push_str(&body);
        }
        out
    }
}

/// Renders tags on a single line: whitespace runs collapse to one space.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFormatter;

impl Formatter for PassthroughFormatter {
    fn format_tag(&self, tag: &Tag) -> String {
        let raw = match tag.body() {
            TagBody::Invalid { text, .. } => text.clone(),
            body => format!("{} {}", tag_prefix(tag), render_body(body, self)),
        };
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn tag_prefix(tag: &Tag) -> String {
    match tag.specialization() {
        Some(spec) => format!("@{}:{}", tag.name(), spec),
        None => format!("@{}", tag.name()),
    }
}

/// Render a tag body (everything after `@name`).
///
/// Pieces are joined with single spaces and empty pieces are skipped, so a
/// body without any content renders as an empty string.
pub fn render_body(body: &TagBody, formatter: &dyn Formatter) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |s: String| {
        if !s.is_empty() {
            parts.push(s);
        }
    };

    match body {
        TagBody::Generic { description } => push(description.render(formatter)),
        TagBody::Param {
            type_hint,
            variable,
            is_variadic,
            is_reference,
            description,
        } => {
            push(type_hint.clone().unwrap_or_default());
            push(variable_token(variable, *is_reference, *is_variadic));
            push(description.render(formatter));
        }
        TagBody::Return {
            type_hint,
            description,
        }
        | TagBody::Throws {
            type_hint,
            description,
        } => {
            push(type_hint.clone());
            push(description.render(formatter));
        }
        TagBody::Var {
            type_hint,
            variable,
            description,
        } => {
            push(type_hint.clone().unwrap_or_default());
            push(variable.as_ref().map(|v| format!("${}", v)).unwrap_or_default());
            push(description.render(formatter));
        }
        TagBody::Property {
            type_hint,
            variable,
            description,
            ..
        } => {
            push(type_hint.clone().unwrap_or_default());
            push(format!("${}", variable));
            push(description.render(formatter));
        }
        TagBody::Method {
            is_static,
            return_type,
            name,
            parameters,
            description,
        } => {
            if *is_static {
                push("static".to_string());
            }
            push(return_type.clone().unwrap_or_default());
            let params: Vec<String> = parameters.iter().map(render_method_parameter).collect();
            push(format!("{}({})", name, params.join(", ")));
            push(description.render(formatter));
        }
        TagBody::Author { author_name, email } => {
            push(author_name.clone());
            push(email.as_ref().map(|e| format!("<{}>", e)).unwrap_or_default());
        }
        TagBody::Version {
            version,
            description,
        } => {
            push(version.clone().unwrap_or_default());
            push(description.render(formatter));
        }
        TagBody::Reference {
            reference,
            description,
        } => {
            push(reference.clone());
            push(description.render(formatter));
        }
        TagBody::Invalid { text, .. } => push(text.clone()),
    }

    parts.join(" ")
}

fn variable_token(name: &str, is_reference: bool, is_variadic: bool) -> String {
    let mut out = String::new();
    if is_reference {
        out.push('&');
    }
    if is_variadic {
        out.push_str("...");
    }
    out.push('$');
    out.push_str(name);
    out
}

fn render_method_parameter(param: &MethodParameter) -> String {
    let mut out = String::new();
    if let Some(ref th) = param.type_hint {
        out.push_str(th);
        out.push(' ');
    }
    out.push_str(&variable_token(
        &param.name,
        param.is_reference,
        param.is_variadic,
    ));
    if let Some(ref default) = param.default_value {
        out.push_str(" = ");
        out.push_str(default);
    }
    out
}
