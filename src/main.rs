use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use redis_reply_typer::annotate::{
    annotate_file, AnnotateOptions, FileTargets, DEFAULT_LOG, DEFAULT_TARGET,
};
use redis_reply_typer::docs::{AlwaysAnswer, Confirm, DocsClient, Prompt, DEFAULT_DOCS_URL};
use redis_reply_typer::introspect::{return_annotations_of_file, TypeAliases};
use tracing_subscriber::EnvFilter;

/// Type redis-py command wrappers from the official Redis command docs
#[derive(Parser)]
#[command(name = "redis-reply-typer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite return annotations from each command's documented reply type
    Annotate(AnnotateArgs),
    /// Print every function's current return annotation as JSON
    Introspect(IntrospectArgs),
}

#[derive(Args)]
struct AnnotateArgs {
    /// Python module to rewrite in place
    #[arg(default_value = DEFAULT_TARGET)]
    file: PathBuf,

    /// Append-only log of functions that could not be typed
    #[arg(long, default_value = DEFAULT_LOG)]
    log: PathBuf,

    /// Base URL of the command reference
    #[arg(long, default_value = DEFAULT_DOCS_URL)]
    docs_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Extra function-name prefixes to skip (repeatable)
    #[arg(long = "ignore")]
    ignore: Vec<String>,

    /// Accept several returns when they all issue the same command
    #[arg(long)]
    allow_branch_returns: bool,

    /// Answer 'y' to every unreadable reply section instead of prompting
    #[arg(long, conflicts_with = "no")]
    yes: bool,

    /// Answer 'n' to every unreadable reply section instead of prompting
    #[arg(long)]
    no: bool,

    /// Do not write the file back
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct IntrospectArgs {
    /// Python module to read
    #[arg(default_value = DEFAULT_TARGET)]
    file: PathBuf,

    /// Typing module whose top-level aliases are expanded (e.g. redis/typing.py)
    #[arg(long)]
    aliases: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Annotate(args) => run_annotate(args).await,
        Command::Introspect(args) => run_introspect(args),
    }
}

async fn run_annotate(args: AnnotateArgs) -> Result<()> {
    let docs = DocsClient::new(&args.docs_url, Duration::from_secs(args.timeout_secs))?;

    let mut options = AnnotateOptions::default();
    options.ignore.extend(args.ignore);
    options.allow_branch_returns = args.allow_branch_returns;

    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AlwaysAnswer(true))
    } else if args.no {
        Box::new(AlwaysAnswer(false))
    } else {
        Box::new(Prompt)
    };

    let targets = FileTargets {
        file: args.file,
        log: args.log,
        dry_run: args.dry_run,
    };

    tracing::info!(
        file = %targets.file.display(),
        docs_url = %args.docs_url,
        dry_run = targets.dry_run,
        "Starting annotation pass"
    );

    let report = annotate_file(&targets, &docs, confirm.as_mut(), &options).await?;

    tracing::info!(
        changed = report.changed.len(),
        not_changed = report.not_changed.len(),
        not_documented = report.not_documented.len(),
        no_exec = report.no_exec.len(),
        no_return = report.no_return.len(),
        unrecognized = report.unrecognized.len(),
        "Done"
    );

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("Cannot serialize report")?;
        println!("{text}");
    }
    Ok(())
}

fn run_introspect(args: IntrospectArgs) -> Result<()> {
    let aliases = args
        .aliases
        .as_deref()
        .map(TypeAliases::from_file)
        .transpose()?;
    if let Some(aliases) = &aliases {
        tracing::info!(count = aliases.len(), "Loaded type aliases");
    }

    let annotations = return_annotations_of_file(&args.file, aliases.as_ref())?;
    let text = serde_json::to_string_pretty(&annotations).context("Cannot serialize annotations")?;
    println!("{text}");
    Ok(())
}
