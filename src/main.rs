use anyhow::{Context, Result};
use clap::Parser;
use revise::areas::refs::HEAD_REF_NAME;
use revise::areas::repository::Repository;
use revise::artifacts::merge::MergeStrategy;
use revise::commands::porcelain::amend::AmendRequest;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "revise",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Reword commits without a working-tree rebase",
    long_about = "Rewrites a commit in place and replays every later commit of the \
    reference on top of it, working directly on the object database. \
    The working tree and the index are never touched.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(index = 1, help = "The commit to amend (any revision git understands)")]
    target: Option<String>,
    #[arg(long = "ref", default_value = HEAD_REF_NAME, help = "The reference to rewrite")]
    reference: String,
    #[arg(
        short,
        long,
        conflicts_with = "file",
        help = "New message paragraph, repeat for more paragraphs"
    )]
    message: Vec<String>,
    #[arg(long, help = "Read `<target> <message>` edits from a file, one per line")]
    file: Option<PathBuf>,
    #[arg(long, help = "Merge tree entries on a worker pool")]
    parallel: bool,
    #[arg(long, requires = "parallel", help = "Number of merge workers")]
    jobs: Option<NonZeroUsize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("REVISE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();

    let strategy = if cli.parallel {
        MergeStrategy::parallel(cli.jobs)
    } else {
        MergeStrategy::Sequential
    };

    let pwd = std::env::current_dir()?;
    let repository = Repository::discover(&pwd, Box::new(std::io::stdout()))?;

    match &cli.file {
        Some(file) => {
            let script = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            repository.amend_batch(&cli.reference, &script, strategy)?;
        }
        None => {
            let request = AmendRequest {
                target: cli.target,
                reference: cli.reference,
                message_lines: cli.message,
            };
            repository.amend(&request, strategy)?;
        }
    }

    Ok(())
}
