//! Data types for parsed docblocks.
//!
//! This module contains the immutable "model" values produced by the
//! parser: [`Docblock`], [`Tag`] with its typed [`TagBody`], the
//! [`Description`] token stream, and the [`TypeContext`] that tag handlers
//! use to resolve class names.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::docblock::formatter::Formatter;
use crate::error::{Error, Result};

// ─── Description ────────────────────────────────────────────────────────────

/// One piece of a description: verbatim text or an inline `{@tag}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DescriptionToken {
    Text(String),
    Tag(Tag),
}

/// Free-form text with inline tags, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Description {
    tokens: Vec<DescriptionToken>,
}

impl Description {
    pub fn new(tokens: Vec<DescriptionToken>) -> Self {
        Self { tokens }
    }

    /// A description made of a single text fragment (empty text yields an
    /// empty description).
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            tokens: vec![DescriptionToken::Text(text)],
        }
    }

    pub fn tokens(&self) -> &[DescriptionToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.iter().all(|t| match t {
            DescriptionToken::Text(s) => s.is_empty(),
            DescriptionToken::Tag(_) => false,
        })
    }

    /// Inline tags, in order.
    pub fn inline_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tokens.iter().filter_map(|t| match t {
            DescriptionToken::Tag(tag) => Some(tag),
            DescriptionToken::Text(_) => None,
        })
    }

    pub fn render(&self, formatter: &dyn Formatter) -> String {
        formatter.format(&self.tokens)
    }
}

// ─── Tags ───────────────────────────────────────────────────────────────────

/// Which accessors a `@property` tag declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyAccess {
    /// `@property`
    ReadWrite,
    /// `@property-read`
    Read,
    /// `@property-write`
    Write,
}

/// A parameter declared inside a `@method` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodParameter {
    /// The parameter name WITHOUT the `$` prefix.
    pub name: String,
    pub type_hint: Option<String>,
    pub is_variadic: bool,
    pub is_reference: bool,
    /// Raw default value text (e.g. `null`, `[]`).
    pub default_value: Option<String>,
}

impl MethodParameter {
    /// Whether the caller has to pass this parameter.
    pub fn is_required(&self) -> bool {
        self.default_value.is_none() && !self.is_variadic
    }
}

/// The typed payload of a [`Tag`].
///
/// Variable names are stored WITHOUT their `$` prefix.  Type hints are
/// normalised strings; when a [`TypeContext`] was available, class names in
/// them are fully qualified with a leading `\`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TagBody {
    Generic {
        description: Description,
    },
    Param {
        type_hint: Option<String>,
        variable: String,
        is_variadic: bool,
        is_reference: bool,
        description: Description,
    },
    Return {
        type_hint: String,
        description: Description,
    },
    Var {
        type_hint: Option<String>,
        variable: Option<String>,
        description: Description,
    },
    Throws {
        type_hint: String,
        description: Description,
    },
    Property {
        access: PropertyAccess,
        type_hint: Option<String>,
        variable: String,
        description: Description,
    },
    Method {
        is_static: bool,
        return_type: Option<String>,
        name: String,
        parameters: Vec<MethodParameter>,
        description: Description,
    },
    Author {
        author_name: String,
        email: Option<String>,
    },
    /// `@version`, `@since`, `@deprecated`.
    Version {
        version: Option<String>,
        description: Description,
    },
    /// `@see`, `@link`, `@uses`, `@covers`.
    Reference {
        reference: String,
        description: Description,
    },
    /// A tag line that could not be recognised.  `text` is the original
    /// line, `@name` prefix included.
    Invalid {
        text: String,
        reason: String,
    },
}

impl TagBody {
    /// The trailing description, for bodies that carry one.
    pub fn description(&self) -> Option<&Description> {
        match self {
            Self::Generic { description }
            | Self::Param { description, .. }
            | Self::Return { description, .. }
            | Self::Var { description, .. }
            | Self::Throws { description, .. }
            | Self::Property { description, .. }
            | Self::Method { description, .. }
            | Self::Version { description, .. }
            | Self::Reference { description, .. } => Some(description),
            Self::Author { .. } | Self::Invalid { .. } => None,
        }
    }

    /// The declared type for type-bearing bodies.
    pub fn type_hint(&self) -> Option<&str> {
        match self {
            Self::Param { type_hint, .. }
            | Self::Var { type_hint, .. }
            | Self::Property { type_hint, .. } => type_hint.as_deref(),
            Self::Return { type_hint, .. } | Self::Throws { type_hint, .. } => Some(type_hint),
            Self::Method { return_type, .. } => return_type.as_deref(),
            _ => None,
        }
    }

    /// The variable name (without `$`) for bodies that name one.
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Param { variable, .. } | Self::Property { variable, .. } => Some(variable),
            Self::Var { variable, .. } => variable.as_deref(),
            _ => None,
        }
    }
}

/// A single `@name[:specialization] body` annotation.
///
/// Two tags are equal when their name and specialization are equal; the
/// body does not take part in comparisons or hashing.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    name: String,
    specialization: Option<String>,
    body: TagBody,
}

impl Tag {
    /// Build a tag with an empty generic body.
    pub fn new(name: impl Into<String>, specialization: Option<String>) -> Result<Self> {
        Self::with_body(
            name,
            specialization,
            TagBody::Generic {
                description: Description::default(),
            },
        )
    }

    pub fn with_body(
        name: impl Into<String>,
        specialization: Option<String>,
        body: TagBody,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "tag name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            specialization,
            body,
        })
    }

    /// Build the invalid-tag sentinel.  An empty `name` is replaced by
    /// `invalid` so the sentinel itself always upholds the name invariant.
    pub fn invalid(name: &str, text: impl Into<String>, reason: impl Into<String>) -> Self {
        let name = if name.is_empty() { "invalid" } else { name };
        Self {
            name: name.to_string(),
            specialization: None,
            body: TagBody::Invalid {
                text: text.into(),
                reason: reason.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn specialization(&self) -> Option<&str> {
        self.specialization.as_deref()
    }

    pub fn body(&self) -> &TagBody {
        &self.body
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.body, TagBody::Invalid { .. })
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.specialization == other.specialization
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.specialization.hash(state);
    }
}

// ─── Docblock ───────────────────────────────────────────────────────────────

/// A parsed docblock: summary, description and tags in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Docblock {
    summary: Option<String>,
    description: Description,
    tags: Vec<Tag>,
}

impl Docblock {
    pub fn new(summary: Option<String>, tags: Vec<Tag>) -> Self {
        Self::with_description(summary, Description::default(), tags)
    }

    pub fn with_description(
        summary: Option<String>,
        description: Description,
        tags: Vec<Tag>,
    ) -> Self {
        Self {
            summary,
            description,
            tags,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// All tags called `name`, in source order.
    pub fn tags_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.name() == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name() == name)
    }

    /// Tags that failed to parse.
    pub fn invalid_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(|t| t.is_invalid())
    }
}

// ─── Type context ───────────────────────────────────────────────────────────

/// Namespace scope used to resolve class names written inside tags.
///
/// The tag factory passes this through to handlers without looking at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeContext {
    /// The current namespace without leading or trailing `\`
    /// (e.g. `App\Models`).  Empty for the global namespace.
    namespace: String,
    /// `use` imports: alias -> fully-qualified name without leading `\`.
    aliases: HashMap<String, String>,
}

impl TypeContext {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.trim_matches('\\').to_string(),
            aliases: HashMap::new(),
        }
    }

    /// Add a `use Fqn as alias;` import.
    pub fn with_alias(mut self, alias: &str, fqn: &str) -> Self {
        self.aliases
            .insert(alias.to_string(), fqn.trim_start_matches('\\').to_string());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    /// Fully qualify a class-like name.
    ///
    ///   - `\Foo\Bar` stays as is
    ///   - `Alias\Rest` expands a `use` alias (case-insensitive, as in PHP)
    ///   - anything else is prefixed with the current namespace
    ///
    /// The result always starts with `\`.
    pub fn resolve_class_name(&self, name: &str) -> String {
        if name.starts_with('\\') {
            return name.to_string();
        }

        let (head, rest) = match name.find('\\') {
            Some(idx) => (&name[..idx], &name[idx..]),
            None => (name, ""),
        };

        if let Some(fqn) = self
            .aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(head))
            .map(|(_, fqn)| fqn)
        {
            return format!("\\{}{}", fqn, rest);
        }

        if self.namespace.is_empty() {
            format!("\\{}", name)
        } else {
            format!("\\{}\\{}", self.namespace, name)
        }
    }
}
