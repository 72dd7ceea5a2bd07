//! PHPDoc docblock parser and object model.
//!
//! Raw comment text becomes an immutable [`Docblock`]: an optional summary,
//! a [`Description`] (text with inline tags) and an ordered list of
//! [`Tag`]s.  Tag grammars are pluggable through the [`TagFactory`], which
//! never fails: tags it cannot understand come back as invalid tags that
//! keep the original text and the reason.
//!
//! ```no_run
//! use phpantom_docblock::{DocblockParser, TagFactory, TypeContext};
//!
//! let factory = TagFactory::with_standard_handlers();
//! let context = TypeContext::new("App\\Models");
//! let doc = DocblockParser::new(&factory).parse(
//!     "/**\n * Find a user.\n * @param int $id\n * @return User|null\n */",
//!     Some(&context),
//! );
//! assert_eq!(doc.summary(), Some("Find a user."));
//! ```

pub mod config;
pub mod docblock;
pub mod error;
pub mod pcre;
pub mod types;

pub use config::Config;
pub use docblock::{
    AsIsFormatter, DocblockParser, Formatter, HandlerContext, HandlerError, HandlerResult,
    PassthroughFormatter, Serializer, ServiceKey, TagFactory, TagHandler,
};
pub use error::{Error, Result};
pub use pcre::{PcreError, PcreErrorCode, translate};
pub use types::{
    Description, DescriptionToken, Docblock, MethodParameter, PropertyAccess, Tag, TagBody,
    TypeContext,
};
