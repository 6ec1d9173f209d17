//! sortjson CLI.
//!
//! Reads a JSON document from a file or stdin and writes it back with all
//! object keys sorted by their raw UTF-8 byte order.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use sortjson::{DuplicatePolicy, Sorter, SorterFactory};

#[derive(Parser)]
#[command(name = "sortjson")]
#[command(about = "Sort JSON object keys by raw UTF-8 byte order", long_about = None)]
#[command(version)]
struct Cli {
    /// Input file; reads stdin when omitted
    input: Option<PathBuf>,

    /// Output file; writes stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Memory budget in bytes for strategy selection
    #[arg(long, default_value_t = 100 * 1024 * 1024)]
    max_memory: u64,

    /// Drop all but the first of entries sharing a key
    #[arg(long)]
    skip_duplicates: bool,

    /// Fail when an object contains the same key twice
    #[arg(long, conflicts_with = "skip_duplicates")]
    fail_on_duplicates: bool,
}

impl Cli {
    fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.skip_duplicates {
            DuplicatePolicy::Skip
        } else if self.fail_on_duplicates {
            DuplicatePolicy::Error
        } else {
            DuplicatePolicy::Preserve
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let factory = SorterFactory::new(cli.max_memory)?;

    let mut stdin_data = Vec::new();
    let mut sorter = match &cli.input {
        Some(path) => factory
            .sorter_for_file(path)
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => {
            io::stdin()
                .read_to_end(&mut stdin_data)
                .context("failed to read stdin")?;
            factory.sorter_for_bytes(&stdin_data)?
        }
    }
    .with_duplicate_policy(cli.duplicate_policy());

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            sorter.sort_into(&mut out)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            sorter.sort_into(&mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}
