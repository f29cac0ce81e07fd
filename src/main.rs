//! caption-harvester: collect image captions from a dataset tree as JSON.
//!
//! Logs go to stderr (`RUST_LOG` controls verbosity); the merged mapping is
//! written to stdout or to `--output`.

use caption_harvester::CaptionCollector;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "caption-harvester")]
#[command(author, version, about = "Collect image captions from XLSX, CSV and JSON datasets")]
struct Cli {
    /// Root directory to scan for caption files
    base_dir: PathBuf,

    /// Keep entries even when the image file does not exist
    #[arg(long)]
    no_validate: bool,

    /// Process files in path order so repeated images resolve deterministically
    #[arg(long)]
    sorted: bool,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let captions = CaptionCollector::new(&cli.base_dir)
        .with_validation(!cli.no_validate)
        .with_sorted_walk(cli.sorted)
        .collect();

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    if cli.pretty {
        serde_json::to_writer_pretty(&mut writer, &captions)?;
    } else {
        serde_json::to_writer(&mut writer, &captions)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = &cli.output {
        eprintln!(
            "Wrote {} images ({} captions) to {}",
            captions.len(),
            captions.caption_count(),
            path.display()
        );
    }
    Ok(())
}
