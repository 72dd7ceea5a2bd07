//! Render a [`Docblock`] back into comment text.

use crate::types::Docblock;

use super::formatter::{AsIsFormatter, Formatter};

/// Writes docblocks as `/** ... */` comments.
pub struct Serializer<'a> {
    indent: String,
    formatter: &'a dyn Formatter,
}

impl Default for Serializer<'_> {
    fn default() -> Self {
        Self {
            indent: String::new(),
            formatter: &AsIsFormatter,
        }
    }
}

impl<'a> Serializer<'a> {
    pub fn new(formatter: &'a dyn Formatter) -> Self {
        Self {
            indent: String::new(),
            formatter,
        }
    }

    /// Prefix every line with `count` copies of `ch`.
    pub fn with_indent(mut self, count: usize, ch: char) -> Self {
        self.indent = std::iter::repeat_n(ch, count).collect();
        self
    }

    pub fn serialize(&self, docblock: &Docblock) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(summary) = docblock.summary() {
            sections.push(summary.to_string());
        }
        if !docblock.description().is_empty() {
            sections.push(docblock.description().render(self.formatter));
        }
        if !docblock.tags().is_empty() {
            let tags: Vec<String> = docblock
                .tags()
                .iter()
                .map(|tag| self.formatter.format_tag(tag))
                .collect();
            sections.push(tags.join("\n"));
        }

        let mut out = format!("{}/**\n", self.indent);
        for line in sections.join("\n\n").lines() {
            if line.is_empty() {
                out.push_str(&format!("{} *\n", self.indent));
            } else {
                out.push_str(&format!("{} * {}\n", self.indent, line));
            }
        }
        out.push_str(&format!("{} */", self.indent));
        out
    }
}
