//! Main entry point for the vfsunpack CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vfsunpack::{Cli, LocalArchive, VfsExtractor, VfsReader};

/// Parses arguments, sets up logging, then lists or extracts the archive.
///
/// Any error is returned from `main`, which prints the full chain to stderr
/// and exits with a non-zero status.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let output_dir = cli.output_dir();
    info!("Input VFS: {}", cli.file.display());

    // The archive handle lives inside the extractor and is closed when it
    // drops, on every path out of this function.
    let (file, size) = LocalArchive::open(&cli.file)
        .with_context(|| format!("Initialization error for '{}'", cli.file.display()))?
        .into_parts();
    let mut extractor = VfsExtractor::new(VfsReader::new(file, size), &output_dir);

    if cli.list {
        return list_files(&mut extractor);
    }

    info!("Output Directory: {}", output_dir.display());
    extractor.run().context("Error during unpacking")?;
    Ok(())
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print one line per entry: index, size, data offset and name.
fn list_files<R: std::io::Read + std::io::Seek>(extractor: &mut VfsExtractor<R>) -> Result<()> {
    println!("{:>6}  {:>10}  {:>10}  Name", "Index", "Length", "Offset");
    println!("{}", "-".repeat(50));

    let mut total = 0u64;
    let header = extractor
        .list(|index, entry| {
            println!(
                "{:>6}  {:>10}  {:>#10X}  {}",
                index, entry.file_size, entry.file_offset, entry.name
            );
            total += u64::from(entry.file_size);
        })
        .context("Error while listing")?;

    println!("{}", "-".repeat(50));
    println!("{:>6}  {:>10}  {:>10}  {} files", "", total, "", header.file_count);
    Ok(())
}
