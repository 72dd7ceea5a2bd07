//! Data-driven docblock tests.
//!
//! Each `tests/fixtures/*.fixture` file holds a docblock, an optional
//! `--- context` section and an `--- expect` section:
//!
//! ```text
//! /**
//!  * Summary.
//!  * @param int $x
//!  */
//! --- context
//! namespace App\Models
//! use Carbon Carbon\Carbon
//! --- expect
//! summary: Summary.
//! tag: @param int $x
//! ```
//!
//! Expected lines are `summary: ...`, `description: ...`, `tag: <rendered>`
//! and `invalid: <name>: <reason>`.  Newlines inside a value are written
//! as `\n`.

use std::path::Path;

use phpantom_docblock::{
    AsIsFormatter, Docblock, DocblockParser, Formatter, TagBody, TagFactory, TypeContext,
};

struct Fixture {
    input: String,
    context: Option<TypeContext>,
    expect: Vec<String>,
}

fn parse_fixture(contents: &str) -> Result<Fixture, String> {
    let mut input = Vec::new();
    let mut context_lines = Vec::new();
    let mut expect = Vec::new();
    let mut section = "input";

    for line in contents.lines() {
        if let Some(name) = line.strip_prefix("--- ") {
            section = match name.trim() {
                "context" => "context",
                "expect" => "expect",
                other => return Err(format!("unknown section {:?}", other)),
            };
            continue;
        }
        match section {
            "input" => input.push(line),
            "context" => context_lines.push(line),
            _ if !line.trim().is_empty() => expect.push(line.trim_end().to_string()),
            _ => {}
        }
    }

    let mut context: Option<TypeContext> = None;
    for line in context_lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let mut words = line.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("namespace"), Some(ns), None) => {
                let aliases = context.take().map(|c| c.aliases().clone()).unwrap_or_default();
                context = Some(
                    aliases
                        .iter()
                        .fold(TypeContext::new(ns), |ctx, (a, f)| ctx.with_alias(a, f)),
                );
            }
            (Some("use"), Some(alias), Some(fqn)) => {
                context = Some(context.take().unwrap_or_default().with_alias(alias, fqn));
            }
            _ => return Err(format!("bad context line {:?}", line)),
        }
    }

    Ok(Fixture {
        input: input.join("\n"),
        context,
        expect,
    })
}

fn escape(s: &str) -> String {
    s.replace('\n', "\\n")
}

fn describe(doc: &Docblock) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(summary) = doc.summary() {
        out.push(format!("summary: {}", escape(summary)));
    }
    if !doc.description().is_empty() {
        out.push(format!(
            "description: {}",
            escape(&doc.description().render(&AsIsFormatter))
        ));
    }
    for tag in doc.tags() {
        match tag.body() {
            TagBody::Invalid { reason, .. } => {
                out.push(format!("invalid: {}: {}", tag.name(), reason));
            }
            _ => out.push(format!("tag: {}", escape(&AsIsFormatter.format_tag(tag)))),
        }
    }
    out
}

fn run_fixture(path: &Path, contents: String) -> datatest_stable::Result<()> {
    let fixture = parse_fixture(&contents).map_err(|e| format!("{}: {}", path.display(), e))?;

    let factory = TagFactory::with_standard_handlers();
    let doc = DocblockParser::new(&factory).parse(&fixture.input, fixture.context.as_ref());
    let actual = describe(&doc);

    if actual != fixture.expect {
        return Err(format!(
            "{}\n--- expected\n{}\n--- actual\n{}",
            path.display(),
            fixture.expect.join("\n"),
            actual.join("\n")
        )
        .into());
    }
    Ok(())
}

datatest_stable::harness! {
    { test = run_fixture, root = "tests/fixtures", pattern = r"^.*\.fixture$" },
}
