use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "vfsunpack")]
#[command(version)]
#[command(about = "Unpack LP1C VFS game asset archives", long_about = None)]
#[command(after_help = "If OUTPUT is not specified, a directory named after the VFS file\n\
(without extension) in the current location is used.\n\n\
Examples:\n  \
  vfsunpack Sounds.vfs                    extract into ./Sounds\n  \
  vfsunpack Sounds.vfs extracted_sounds   extract into ./extracted_sounds\n  \
  vfsunpack -l Textures.vfs               list files without extracting")]
pub struct Cli {
    /// Path to the VFS file
    #[arg(value_name = "ARCHIVE")]
    pub file: PathBuf,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// List files instead of extracting them
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Show debug output
    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report warnings and errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// The directory files are extracted into.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output {
            Some(dir) => dir.clone(),
            None => default_output_dir(&self.file),
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// The archive's file name without its extension, relative to the current
/// directory.
pub fn default_output_dir(archive: &Path) -> PathBuf {
    archive
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
