//! Description text -> token stream.
//!
//! A description is prose with inline tags such as
//! `See {@link https://example.com the docs} for details`.  Each balanced
//! `{@name ...}` span becomes a [`DescriptionToken::Tag`] built by the tag
//! factory; everything else is kept verbatim, whitespace included, so that
//! rendering with [`AsIsFormatter`](super::AsIsFormatter) gives the input
//! back.

use memchr::memmem;

use crate::pcre::{self, MAX_NESTING_DEPTH};
use crate::types::{Description, DescriptionToken, TypeContext};

use super::factory::{TagFactory, split_tag_line};

/// Splits description text into text fragments and inline tags.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionParser {
    max_depth: usize,
}

impl Default for DescriptionParser {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl DescriptionParser {
    /// A parser that gives up on inline tags nested deeper than
    /// `max_depth` braces (the span is kept as text).
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn parse(
        &self,
        text: &str,
        factory: &TagFactory,
        context: Option<&TypeContext>,
    ) -> Description {
        let mut tokens = Vec::new();
        let mut text_start = 0;
        let mut search_from = 0;

        while let Some(rel) = memmem::find(&text.as_bytes()[search_from..], b"{@") {
            let open = search_from + rel;
            search_from = open + 2;

            let close = match pcre::find_balanced(text, open, '{', '}', self.max_depth) {
                Ok(Some(close)) => close,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(offset = open, error = %err, "inline tag kept as text");
                    continue;
                }
            };

            let inner = &text[open + 1..close];
            if split_tag_line(inner).is_none() {
                // `{@}` and friends are plain text.
                continue;
            }

            if open > text_start {
                tokens.push(DescriptionToken::Text(text[text_start..open].to_string()));
            }
            tokens.push(DescriptionToken::Tag(factory.create_with(inner, context, *self)));
            text_start = close + 1;
            search_from = text_start;
        }

        if text_start < text.len() {
            tokens.push(DescriptionToken::Text(text[text_start..].to_string()));
        }

        Description::new(tokens)
    }
}
