//! PHPDoc block parsing.
//!
//! This module turns docblock comments (`/** ... */`) into the typed AST in
//! [`crate::types`]:
//!
//! ```text
//! /**
//!  * Summary line.
//!  *
//!  * Description with an inline {@link https://example.com tag}.
//!  *
//!  * @param int $count how many
//!  * @return list<User>
//!  */
//! ```
//!
//! # Submodules
//!
//! - [`factory`]: the [`TagFactory`] extension point (handlers,
//!   parameters, services) and the invalid-tag fallback.
//! - [`tags`]: the standard tag grammars (`@param`, `@return`, `@method`,
//!   `@author`, ...).
//! - [`description`]: description text -> text fragments + inline tags.
//! - [`parser`]: the [`DocblockParser`] tokenizer.
//! - [`formatter`]: [`Formatter`] strategies for rendering tags.
//! - [`serializer`]: [`Serializer`], docblock -> comment text.
//! - [`types`]: type-string helpers and the [`TypeResolver`] service.

pub mod description;
pub mod factory;
pub mod formatter;
pub mod parser;
pub mod serializer;
pub mod tags;
pub mod types;

pub use description::DescriptionParser;
pub use factory::{
    HandlerContext, HandlerError, HandlerResult, RESOLVE_TYPES_PARAMETER, ServiceKey,
    TYPE_RESOLVER, TagFactory, TagHandler,
};
pub use formatter::{AsIsFormatter, Formatter, PassthroughFormatter, render_body};
pub use parser::DocblockParser;
pub use serializer::Serializer;
pub use tags::{STANDARD_TAGS, StandardHandler};
pub use types::{ContextTypeResolver, TypeResolver};
