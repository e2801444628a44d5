use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reportpdf::pipeline::{DEFAULT_INPUT, read_source};
use reportpdf::{Config, Job};

#[derive(Parser)]
#[command(name = "reportpdf")]
#[command(about = "Convert a Markdown report to a styled PDF")]
struct Cli {
    /// Input Markdown file
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output PDF file (defaults to input name with .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the intermediate HTML document
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,

    /// Settings file (defaults to report.toml next to the input, if present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log conversion details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Config::discover(input_dir(&cli.input)),
    };

    let mut job = Job::new(&cli.input);
    if let Some(output) = cli.output {
        job = job.with_output(output);
    }
    if let Some(html) = cli.html {
        job = job.with_html(html);
    }

    // Nothing is printed for an input that cannot be read
    let markdown = read_source(&job.input)?;
    println!("Converting {} to PDF...", job.input.display());
    job.render(&markdown, &config)
        .with_context(|| format!("Failed to convert {}", job.input.display()))?;
    println!("Successfully created {}", job.output.display());
    Ok(())
}

fn input_dir(input: &Path) -> &Path {
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
