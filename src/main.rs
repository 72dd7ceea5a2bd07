use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use phpantom_docblock::{
    Config, DocblockParser, Error, PassthroughFormatter, Serializer, TagFactory, TypeContext,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// The docblock model as JSON.
    Json,
    /// The docblock re-rendered as a comment.
    Text,
}

#[derive(Parser)]
#[command(
    name = "phpantom-docblock",
    version,
    about = "Parse a PHPDoc comment and print its structure"
)]
struct Cli {
    /// File containing the docblock.  Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Namespace used to qualify class names in types.
    #[arg(short, long)]
    namespace: Option<String>,

    /// Import alias, `Short=Fully\Qualified\Name`.  Repeatable.
    #[arg(short, long, value_parser = parse_alias)]
    alias: Vec<(String, String)>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Configuration file.  Defaults to `.phpantom-docblock.toml` in the
    /// current directory, then the user config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collapse whitespace in tag bodies when printing text.
    #[arg(long)]
    compact: bool,
}

fn parse_alias(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((short, fqn)) if !short.trim().is_empty() && !fqn.trim().is_empty() => {
            Ok((short.trim().to_string(), fqn.trim().to_string()))
        }
        _ => Err(format!("expected Short=Fully\\Qualified\\Name, got {raw:?}")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("phpantom-docblock: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, Error> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&std::env::current_dir()?)?,
    };

    let factory = TagFactory::with_standard_handlers();
    config.apply(&factory);

    let context = build_context(cli, &config);

    let mut input = Vec::new();
    match &cli.file {
        Some(path) => input = std::fs::read(path)?,
        None => {
            io::stdin().read_to_end(&mut input)?;
        }
    }

    let docblock = DocblockParser::new(&factory).parse_bytes(&input, context.as_ref())?;
    for tag in docblock.invalid_tags() {
        tracing::warn!(tag = tag.name(), "invalid tag");
    }

    match cli.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&docblock)?),
        OutputFormat::Text if cli.compact => {
            Ok(Serializer::new(&PassthroughFormatter).serialize(&docblock))
        }
        OutputFormat::Text => Ok(Serializer::default().serialize(&docblock)),
    }
}

/// Command-line namespace and aliases override the configured ones.
fn build_context(cli: &Cli, config: &Config) -> Option<TypeContext> {
    let base = match &cli.namespace {
        Some(ns) => {
            let mut ctx = TypeContext::new(ns);
            for (alias, fqn) in &config.context.aliases {
                ctx = ctx.with_alias(alias, fqn);
            }
            Some(ctx)
        }
        None => config.type_context(),
    };

    if cli.alias.is_empty() {
        return base;
    }
    let ctx = cli
        .alias
        .iter()
        .fold(base.unwrap_or_default(), |ctx, (alias, fqn)| ctx.with_alias(alias, fqn));
    Some(ctx)
}
