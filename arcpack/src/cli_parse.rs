use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main operations available for the utility.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Archives and compresses one or more files/directories.
    #[clap(alias = "a")]
    Archive {
        /// Files or directories to archive (directories are walked recursively).
        targets: Vec<PathBuf>,
        /// Output archive file path.
        #[arg(short, long)]
        output: PathBuf,
        /// Suppresses per-file and overall progress output.
        #[arg(short = 'P', long = "no-progress")]
        no_progress: bool,
        /// Enables statistics output, such as compression ratio and timing.
        #[arg(short, long)]
        stats: bool,
    },

    /// Decompresses and extracts an archive produced by `archive`.
    #[clap(alias = "u")]
    Unarchive {
        /// Archive file to extract.
        archive: PathBuf,
        /// Destination directory (default: current directory).
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Suppresses per-file and overall progress output.
        #[arg(short = 'P', long = "no-progress")]
        no_progress: bool,
        /// Enables statistics output, such as compression ratio and timing.
        #[arg(short, long)]
        stats: bool,
    },
}

/// The main command line argument structure for the archiving utility.
/// This delegates all file arguments and flags to the subcommands
/// (`archive`/`unarchive`) since there are no global options.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Huffman/LZ77 archiver for files and directories.",
    long_about = "A utility that archives one or more files/directories into a single \
                  container, compressing each file with a deflate-style LZ77 + canonical \
                  Huffman codec, and can later extract that container back to disk.",
    after_help = "
    COMMON USAGE:
      To use, start with the COMMAND (archive/unarchive), followed by its paths.

    EXAMPLES:
    # 1. Archive a directory
    arcpack archive my_project/ -o my_project.arh

    # 2. Archive several targets and show statistics
    arcpack archive src/ README.md -o backup.arh -s

    # 3. Extract an archive into a destination directory
    arcpack unarchive backup.arh -o restored/

    # 4. Using the short alias for archive, without progress output
    arcpack a src/ -o src.arh -P
"
)]
pub struct CliArgs {
    /// The primary operation (archive or unarchive) and its arguments.
    #[command(subcommand)]
    pub command: Commands,
}

impl CliArgs {
    /// Validates the command line arguments after parsing, specifically ensuring:
    /// 1. Every archive target exists.
    /// 2. The archive file to extract exists and is a file.
    pub fn validate(&self) -> Result<(), CliError> {
        match &self.command {
            Commands::Archive { targets, .. } => {
                for target in targets {
                    if !target.exists() {
                        return Err(CliError::InputNotFound(target.clone()));
                    }
                }
                Ok(())
            }
            Commands::Unarchive { archive, .. } => {
                if !archive.exists() {
                    return Err(CliError::InputNotFound(archive.clone()));
                }
                if !archive.is_file() {
                    return Err(CliError::InputNotFile(archive.clone()));
                }
                Ok(())
            }
        }
    }
}

/// Errors encountered during command line argument processing or validation,
/// ahead of any archive-level or codec-level failure.
#[derive(Debug)]
pub enum CliError {
    /// A named target (archive source, or the archive file to extract) does not exist.
    InputNotFound(PathBuf),
    /// The archive file to extract exists, but is not a regular file.
    InputNotFile(PathBuf),
    /// An error originating directly from the argument parsing library (clap).
    ClapError(clap::Error),
}

/// Allows for seamless conversion of a `clap::Error` directly into a `CliError`.
/// This is typically used when handling the result of `CliArgs::parse()`.
impl From<clap::Error> for CliError {
    fn from(error: clap::Error) -> Self {
        CliError::ClapError(error)
    }
}

/// Public function to parse and validate CLI arguments.
/// This is the entry point for argument handling from the main module.
pub fn parse_args() -> Result<CliArgs, CliError> {
    let args = CliArgs::try_parse()?;
    args.validate()?;
    Ok(args)
}
