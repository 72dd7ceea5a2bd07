#![allow(dead_code)]

use phpantom_docblock::{
    Docblock, DocblockParser, HandlerContext, HandlerResult, Tag, TagBody, TagFactory,
    TypeContext,
};

pub fn create_test_factory() -> TagFactory {
    TagFactory::with_standard_handlers()
}

/// Parse a docblock with the standard handlers and no type context.
pub fn parse(doc: &str) -> Docblock {
    let factory = create_test_factory();
    DocblockParser::new(&factory).parse(doc, None)
}

/// Parse a docblock with the standard handlers inside `namespace`.
pub fn parse_in(doc: &str, namespace: &str, aliases: &[(&str, &str)]) -> Docblock {
    let factory = create_test_factory();
    let context = aliases
        .iter()
        .fold(TypeContext::new(namespace), |ctx, (alias, fqn)| ctx.with_alias(alias, fqn));
    DocblockParser::new(&factory).parse(doc, Some(&context))
}

/// A handler that stores its body as a plain description.
pub fn text_handler(body: &str, ctx: &HandlerContext<'_>) -> HandlerResult {
    Ok(TagBody::Generic {
        description: ctx.description(body),
    })
}

pub fn invalid_reason(tag: &Tag) -> Option<&str> {
    match tag.body() {
        TagBody::Invalid { reason, .. } => Some(reason),
        _ => None,
    }
}
