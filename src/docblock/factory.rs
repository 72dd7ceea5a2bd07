//! The tag factory: turns raw tag lines into typed [`Tag`]s.
//!
//! Tag grammars are open-ended, so the factory does not know any of them
//! itself.  Integrators register a [`TagHandler`] per tag name, plus named
//! parameters and typed services the handlers may ask for.  [`create`]
//! dispatches a tag line to its handler and never fails: unknown tags and
//! handler failures come back as the invalid-tag sentinel
//! ([`TagBody::Invalid`]), so one bad tag never loses the rest of a
//! docblock.
//!
//! The registries sit behind a [`parking_lot::RwLock`] holding an
//! `Arc<Registry>`.  Registration copies the registry on write; [`create`]
//! clones the `Arc` and releases the lock before any handler runs, so
//! handlers are free to call back into the factory (inline tags inside
//! descriptions do exactly that).
//!
//! [`create`]: TagFactory::create

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pcre::PcreError;
use crate::types::{Description, Tag, TagBody, TypeContext};

use super::description::DescriptionParser;
use super::tags::{STANDARD_TAGS, StandardHandler};
use super::types::{ContextTypeResolver, TypeResolver, brackets_balanced, trim_type};

/// Parameter that switches class-name resolution off when set to `false`.
pub const RESOLVE_TYPES_PARAMETER: &str = "resolve_types";

/// Key for the type resolver service used by [`HandlerContext::resolve_type`].
pub const TYPE_RESOLVER: ServiceKey<Arc<dyn TypeResolver>> = ServiceKey::new("type-resolver");

// ─── Handler contract ───────────────────────────────────────────────────────

/// Why a handler could not build a tag.  Becomes the `reason` of the
/// invalid-tag sentinel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct HandlerError {
    reason: String,
}

impl HandlerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<PcreError> for HandlerError {
    fn from(err: PcreError) -> Self {
        Self::new(err.to_string())
    }
}

/// What a handler returns.
pub type HandlerResult = std::result::Result<TagBody, HandlerError>;

/// Grammar for one tag name.
///
/// `body` is the text after `@name[:specialization]`, trimmed.
pub trait TagHandler: Send + Sync {
    fn create(&self, body: &str, ctx: &HandlerContext<'_>) -> HandlerResult;
}

impl<F> TagHandler for F
where
    F: Fn(&str, &HandlerContext<'_>) -> HandlerResult + Send + Sync,
{
    fn create(&self, body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
        self(body, ctx)
    }
}

// ─── Services ───────────────────────────────────────────────────────────────

/// Typed capability identifier for a service.
///
/// The `id` is the registry key; `T` is the type stored under it (usually
/// an `Arc<dyn Trait>`).  Declaring keys as constants keeps registration and
/// lookup in agreement.
pub struct ServiceKey<T> {
    id: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ServiceKey<T> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<T> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ServiceKey<T> {}

impl<T> fmt::Debug for ServiceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.id).finish()
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Registry {
    handlers: HashMap<String, Arc<dyn TagHandler>>,
    parameters: HashMap<String, Value>,
    services: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

/// What a handler gets to see while building a tag.
pub struct HandlerContext<'a> {
    factory: &'a TagFactory,
    registry: &'a Registry,
    tag_name: &'a str,
    specialization: Option<&'a str>,
    type_context: Option<&'a TypeContext>,
    description_parser: DescriptionParser,
}

impl<'a> HandlerContext<'a> {
    pub fn tag_name(&self) -> &'a str {
        self.tag_name
    }

    pub fn specialization(&self) -> Option<&'a str> {
        self.specialization
    }

    pub fn type_context(&self) -> Option<&'a TypeContext> {
        self.type_context
    }

    pub fn parameter(&self, name: &str) -> Option<&'a Value> {
        self.registry.parameters.get(name)
    }

    /// Fetch the service registered under `key`.
    pub fn service<T: Clone + 'static>(&self, key: ServiceKey<T>) -> Option<T> {
        self.registry
            .services
            .get(key.id)
            .and_then(|s| s.downcast_ref::<T>())
            .cloned()
    }

    /// Parse description text, turning `{@...}` spans into inline tags
    /// through the same factory and with the same nesting limit as the
    /// caller.
    pub fn description(&self, text: &str) -> Description {
        self.description_parser
            .parse(text, self.factory, self.type_context)
    }

    /// Clean a raw type token and, when a type context is available,
    /// resolve its class names through the [`TYPE_RESOLVER`] service.
    pub fn resolve_type(&self, raw: &str) -> std::result::Result<String, HandlerError> {
        let raw = trim_type(raw);
        if raw.is_empty() {
            return Err(HandlerError::new("missing type"));
        }
        if !brackets_balanced(raw) {
            return Err(HandlerError::new(format!(
                "unbalanced brackets in type \"{}\"",
                raw
            )));
        }

        let Some(context) = self.type_context else {
            return Ok(raw.to_string());
        };
        if self
            .parameter(RESOLVE_TYPES_PARAMETER)
            .and_then(Value::as_bool)
            == Some(false)
        {
            return Ok(raw.to_string());
        }
        match self.service(TYPE_RESOLVER) {
            Some(resolver) => resolver.resolve(raw, context),
            None => Ok(raw.to_string()),
        }
    }
}

// ─── Factory ────────────────────────────────────────────────────────────────

/// Registry of tag handlers, parameters and services.
#[derive(Default)]
pub struct TagFactory {
    registry: RwLock<Arc<Registry>>,
}

impl TagFactory {
    /// A factory with nothing registered: every tag comes back invalid.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with the standard PHPDoc handlers and the default type
    /// resolver registered.
    pub fn with_standard_handlers() -> Self {
        let factory = Self::new();
        for &(tag_name, handler) in STANDARD_TAGS {
            factory.register_tag_handler(tag_name, handler);
        }
        factory.add_service(
            TYPE_RESOLVER,
            Arc::new(ContextTypeResolver) as Arc<dyn TypeResolver>,
        );
        factory
    }

    /// Associate `tag_name` with `handler`.  Replaces any earlier handler
    /// for the same name.
    pub fn register_tag_handler(&self, tag_name: impl Into<String>, handler: impl TagHandler + 'static) {
        let tag_name = tag_name.into();
        tracing::trace!(tag = %tag_name, "registering tag handler");
        self.update(|r| {
            r.handlers.insert(tag_name, Arc::new(handler));
        });
    }

    /// Associate `tag_name` with a standard handler by its catalog id
    /// (see [`StandardHandler::from_id`]).
    pub fn register_tag_handler_by_id(&self, tag_name: impl Into<String>, handler_id: &str) -> Result<()> {
        let handler = StandardHandler::from_id(handler_id)
            .ok_or_else(|| Error::UnknownHandler(handler_id.to_string()))?;
        self.register_tag_handler(tag_name, handler);
        Ok(())
    }

    /// Store a named value handlers can read.  Overwrites by name.
    pub fn add_parameter(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        self.update(|r| {
            r.parameters.insert(name, value);
        });
    }

    /// Register a service under its capability key.  Overwrites by key.
    pub fn add_service<T: Send + Sync + 'static>(&self, key: ServiceKey<T>, service: T) {
        self.update(|r| {
            r.services.insert(key.id, Arc::new(service));
        });
    }

    pub fn has_handler(&self, tag_name: &str) -> bool {
        self.registry.read().handlers.contains_key(tag_name)
    }

    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.registry.read().parameters.get(name).cloned()
    }

    pub fn service<T: Clone + 'static>(&self, key: ServiceKey<T>) -> Option<T> {
        self.registry
            .read()
            .services
            .get(key.id)
            .and_then(|s| s.downcast_ref::<T>())
            .cloned()
    }

    /// Turn one tag line into a [`Tag`].
    ///
    /// Never fails: a line without a recognisable `@name`, a name without
    /// a handler, a handler error and a panicking handler all produce an
    /// invalid tag that keeps `tag_line` verbatim.
    pub fn create(&self, tag_line: &str, context: Option<&TypeContext>) -> Tag {
        self.create_with(tag_line, context, DescriptionParser::default())
    }

    /// [`create`](Self::create), parsing descriptions inside the tag body
    /// with `description_parser`.
    pub fn create_with(
        &self,
        tag_line: &str,
        context: Option<&TypeContext>,
        description_parser: DescriptionParser,
    ) -> Tag {
        let Some((name, specialization, body)) = split_tag_line(tag_line) else {
            tracing::debug!(line = tag_line, "not a tag line");
            return Tag::invalid("", tag_line, "tag line does not start with a tag name");
        };

        let registry = self.snapshot();
        let Some(handler) = registry.handlers.get(name).cloned() else {
            tracing::debug!(tag = name, "no handler registered");
            return Tag::invalid(
                name,
                tag_line,
                format!("no handler registered for tag name \"{}\"", name),
            );
        };

        let ctx = HandlerContext {
            factory: self,
            registry: &registry,
            tag_name: name,
            specialization,
            type_context: context,
            description_parser,
        };

        tracing::trace!(tag = name, body, "dispatching to handler");
        let outcome = catch_unwind(AssertUnwindSafe(|| handler.create(body, &ctx)))
            .unwrap_or_else(|payload| Err(HandlerError::new(panic_reason(payload.as_ref()))));

        let result = outcome
            .map_err(|err| err.reason)
            .and_then(|tag_body| {
                Tag::with_body(name, specialization.map(str::to_string), tag_body)
                    .map_err(|err| err.to_string())
            });

        match result {
            Ok(tag) => tag,
            Err(reason) => {
                tracing::debug!(tag = name, %reason, "tag handler failed");
                Tag::invalid(name, tag_line, reason)
            }
        }
    }

    fn snapshot(&self) -> Arc<Registry> {
        Arc::clone(&self.registry.read())
    }

    fn update(&self, f: impl FnOnce(&mut Registry)) {
        let mut guard = self.registry.write();
        f(Arc::make_mut(&mut guard));
    }
}

impl fmt::Debug for TagFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.snapshot();
        let mut handlers: Vec<_> = registry.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("TagFactory")
            .field("handlers", &handlers)
            .field("parameters", &registry.parameters)
            .field("services", &registry.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("tag handler panicked: {}", message)
}

/// Split `@name[:specialization] body` into its parts.
///
/// The name may contain word characters, `-` and `\`.  It must be followed
/// by whitespace, `(`, `{` or the end of the line.  The body is trimmed.
pub(crate) fn split_tag_line(line: &str) -> Option<(&str, Option<&str>, &str)> {
    let rest = line.trim_start().strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '\\' | ':')))
        .unwrap_or(rest.len());
    let (full_name, body) = rest.split_at(end);

    if !body.is_empty() && !body.starts_with(|c: char| c.is_whitespace() || c == '(' || c == '{') {
        return None;
    }

    let (name, specialization) = match full_name.split_once(':') {
        Some((name, spec)) if !spec.is_empty() => (name, Some(spec)),
        Some((name, _)) => (name, None),
        None => (full_name, None),
    };
    if name.is_empty() {
        return None;
    }

    Some((name, specialization, body.trim()))
}
