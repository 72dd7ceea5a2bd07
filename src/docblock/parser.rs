//! Docblock tokenizer.
//!
//! Splits a raw `/** ... */` comment into its summary, description and tag
//! lines, then hands the description to the [`DescriptionParser`] and each
//! tag line to the [`TagFactory`].
//!
//! Layout rules:
//!   - `/**`, `*/` and the `*` gutter (plus one space after it) are removed;
//!   - the summary runs up to the first blank line or the first line that
//!     ends with a `.`;
//!   - the tag section starts at the first line beginning with `@` that is
//!     not inside an open `{@ ... }` span;
//!   - a tag continues on following lines until the next `@` line.

use crate::error::Result;
use crate::pcre;
use crate::types::{Docblock, TypeContext};

use super::description::DescriptionParser;
use super::factory::TagFactory;

/// Parses docblock comments with a given tag factory.
#[derive(Debug, Clone, Copy)]
pub struct DocblockParser<'f> {
    factory: &'f TagFactory,
    description: DescriptionParser,
}

/// The raw pieces of a docblock before any tag is interpreted.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RawDocblock {
    pub summary: Option<String>,
    pub description: String,
    pub tag_lines: Vec<String>,
}

impl<'f> DocblockParser<'f> {
    pub fn new(factory: &'f TagFactory) -> Self {
        Self {
            factory,
            description: DescriptionParser::default(),
        }
    }

    pub fn with_description_parser(mut self, description: DescriptionParser) -> Self {
        self.description = description;
        self
    }

    /// Parse a docblock comment.  Unknown or malformed tags end up as
    /// invalid tags; parsing itself cannot fail.
    pub fn parse(&self, comment: &str, context: Option<&TypeContext>) -> Docblock {
        let raw = split_docblock(comment);
        let description = self
            .description
            .parse(&raw.description, self.factory, context);
        let tags = raw
            .tag_lines
            .iter()
            .map(|line| self.factory.create_with(line, context, self.description))
            .collect();

        tracing::trace!(
            summary = raw.summary.is_some(),
            tags = raw.tag_lines.len(),
            "parsed docblock"
        );

        Docblock::with_description(raw.summary, description, tags)
    }

    /// Parse a comment given as raw bytes.  Fails with the "Bad UTF8"
    /// engine error when the bytes are not valid UTF-8.
    pub fn parse_bytes(&self, comment: &[u8], context: Option<&TypeContext>) -> Result<Docblock> {
        let text = pcre::decode(comment)?;
        Ok(self.parse(text, context))
    }
}

/// Strip comment markers and return the content lines.
fn comment_lines(comment: &str) -> Vec<String> {
    let normalized = comment.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim();
    let inner = trimmed
        .strip_prefix("/**")
        .or_else(|| trimmed.strip_prefix("/*"))
        .unwrap_or(trimmed);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    let mut lines: Vec<String> = inner
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = match line.strip_prefix('*') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                None => line,
            };
            line.trim_end().to_string()
        })
        .collect();

    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Split a comment into summary, description and raw tag lines.
pub(crate) fn split_docblock(comment: &str) -> RawDocblock {
    let lines = comment_lines(comment);

    // Find where the tag section starts.
    let mut depth = 0i32;
    let mut tag_start = lines.len();
    for (i, line) in lines.iter().enumerate() {
        if depth <= 0 && line.trim_start().starts_with('@') {
            tag_start = i;
            break;
        }
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }

    let (text_lines, tag_section) = lines.split_at(tag_start);

    // Summary: up to the first blank line or a line ending in `.`.
    let mut summary_end = 0;
    for (i, line) in text_lines.iter().enumerate() {
        if line.is_empty() {
            break;
        }
        summary_end = i + 1;
        if line.ends_with('.') {
            break;
        }
    }

    let summary = text_lines[..summary_end].join("\n");
    let description = trim_blank_lines(&text_lines[summary_end..]).join("\n");

    let mut tag_lines: Vec<String> = Vec::new();
    for line in tag_section {
        if line.trim_start().starts_with('@') || tag_lines.is_empty() {
            tag_lines.push(line.trim_start().to_string());
        } else if let Some(current) = tag_lines.last_mut() {
            current.push('\n');
            current.push_str(line);
        }
    }
    for tag in &mut tag_lines {
        let trimmed_len = tag.trim_end().len();
        tag.truncate(trimmed_len);
    }

    RawDocblock {
        summary: if summary.is_empty() { None } else { Some(summary) },
        description,
        tag_lines,
    }
}

fn trim_blank_lines(lines: &[String]) -> &[String] {
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcre::PcreError;
    use crate::types::DescriptionToken;
    use crate::Error;

    #[test]
    fn single_line_docblock() {
        let raw = split_docblock("/** @var int */");
        assert_eq!(raw.summary, None);
        assert_eq!(raw.tag_lines, vec!["@var int"]);
    }

    #[test]
    fn summary_description_and_tags() {
        let raw = split_docblock(
            "/**\n * Fetch a user.\n *\n * Looks the user up\n *   by id.\n *\n * @param int $id\n * @return User\n */",
        );
        assert_eq!(raw.summary.as_deref(), Some("Fetch a user."));
        assert_eq!(raw.description, "Looks the user up\n  by id.");
        assert_eq!(raw.tag_lines, vec!["@param int $id", "@return User"]);
    }

    #[test]
    fn summary_ends_at_period() {
        let raw = split_docblock("/**\n * First line\n * still summary.\n * Description.\n */");
        assert_eq!(raw.summary.as_deref(), Some("First line\nstill summary."));
        assert_eq!(raw.description, "Description.");
    }

    #[test]
    fn multi_line_tags_keep_continuations() {
        let raw = split_docblock("/**\n * @param string $a first\n *        continued\n * @return void\n */");
        assert_eq!(
            raw.tag_lines,
            vec!["@param string $a first\n       continued", "@return void"]
        );
    }

    #[test]
    fn at_sign_inside_inline_tag_does_not_start_tags() {
        let raw = split_docblock("/**\n * Summary.\n *\n * See {@link\n * @internal x}\n * @api\n */");
        assert_eq!(raw.description, "See {@link\n@internal x}");
        assert_eq!(raw.tag_lines, vec!["@api"]);
    }

    #[test]
    fn crlf_is_normalised() {
        let raw = split_docblock("/**\r\n * Summary.\r\n * @api\r\n */");
        assert_eq!(raw.summary.as_deref(), Some("Summary."));
        assert_eq!(raw.tag_lines, vec!["@api"]);
    }

    #[test]
    fn empty_comment() {
        assert_eq!(split_docblock("/** */"), RawDocblock::default());
    }

    #[test]
    fn description_parser_applies_to_tag_bodies() {
        let factory = TagFactory::with_standard_handlers();
        let comment = "/**\n * @internal {@internal {@internal deep}}\n */";

        let default = DocblockParser::new(&factory).parse(comment, None);
        let body = default.tags()[0].body().description().unwrap();
        assert!(matches!(body.tokens()[0], DescriptionToken::Tag(_)));

        let shallow = DocblockParser::new(&factory)
            .with_description_parser(DescriptionParser::new(1))
            .parse(comment, None);
        let body = shallow.tags()[0].body().description().unwrap();
        assert_eq!(
            body.tokens()[0],
            DescriptionToken::Text("{@internal ".to_string())
        );
    }

    #[test]
    fn invalid_utf8_is_a_bad_utf8_error() {
        let factory = TagFactory::with_standard_handlers();
        let err = DocblockParser::new(&factory)
            .parse_bytes(b"/** \xff */", None)
            .unwrap_err();
        assert!(matches!(err, Error::Pcre(PcreError::BadUtf8)));
        assert_eq!(err.to_string(), "Bad UTF8 error");
    }
}
