mod cli_parse;
mod progress;

use std::fs::File;
use std::process::ExitCode;
use std::time::Instant;

use archive_module::{
    collect_entries, extract_archive, write_archive, ArchiveError, ArchiveTotals, ProgressEvent,
};
use cli_parse::{CliArgs, CliError, Commands};
use progress::PerFileProgress;
use shared_files::stats::format_bytes;

fn main() -> ExitCode {
    let args = match cli_parse::parse_args() {
        Ok(args) => args,
        Err(CliError::ClapError(e)) => e.exit(),
        Err(e) => {
            print_cli_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Archive {
            targets,
            output,
            no_progress,
            stats,
        } => run_archive(&targets, &output, !no_progress, stats),
        Commands::Unarchive {
            archive,
            output,
            no_progress,
            stats,
        } => run_unarchive(&archive, &output, !no_progress, stats),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[!] {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_cli_error(e: &CliError) {
    match e {
        CliError::InputNotFound(p) => {
            eprintln!(
                "[!] You selected a file or directory that does not exist: {}",
                p.display()
            );
        }
        CliError::InputNotFile(p) => {
            eprintln!("[!] Not a regular file: {}", p.display());
        }
        CliError::ClapError(_) => unreachable!("handled by CliError::ClapError arm in main"),
    }
}

fn run_archive(
    targets: &[std::path::PathBuf],
    output: &std::path::Path,
    show_progress: bool,
    show_stats: bool,
) -> Result<(), ArchiveError> {
    let entries = collect_entries(targets)?;
    let mut out = File::create(output)?;

    let start = Instant::now();
    let totals = if show_progress {
        let mut reporter = PerFileProgress::new("Archiving");
        let mut forward = |event: ProgressEvent| reporter.report(&event);
        let totals = write_archive(&mut out, &entries, Some(&mut forward))?;
        progress::finish_progress_line();
        totals
    } else {
        write_archive(&mut out, &entries, None)?
    };
    let elapsed = start.elapsed();

    print_totals_summary(&totals);
    if show_stats {
        print_run_stats("LZ77+Huffman", totals, elapsed, true);
    }
    Ok(())
}

fn run_unarchive(
    archive: &std::path::Path,
    dest_dir: &std::path::Path,
    show_progress: bool,
    show_stats: bool,
) -> Result<(), ArchiveError> {
    let mut file = File::open(archive).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArchiveError::NotFound(archive.to_path_buf())
        } else {
            ArchiveError::Io(e)
        }
    })?;

    let start = Instant::now();
    let totals = if show_progress {
        let mut reporter = PerFileProgress::new("Extracting");
        let mut forward = |event: ProgressEvent| reporter.report(&event);
        let totals = extract_archive(&mut file, dest_dir, Some(&mut forward))?;
        progress::finish_progress_line();
        totals
    } else {
        extract_archive(&mut file, dest_dir, None)?
    };
    let elapsed = start.elapsed();

    if show_stats {
        print_run_stats("LZ77+Huffman", totals, elapsed, false);
    }
    Ok(())
}

/// Mirrors the original archiver's post-run summary lines.
fn print_totals_summary(totals: &ArchiveTotals) {
    println!(
        "Size before compression: {}",
        format_bytes(totals.total_uncompressed as usize)
    );
    println!(
        "Size after compression: {}",
        format_bytes(totals.total_compressed as usize)
    );
    if totals.total_compressed > 0 {
        println!(
            "Compression ratio: {:.2}",
            totals.total_uncompressed as f64 / totals.total_compressed as f64
        );
    }
}

fn print_run_stats(
    algorithm_name: &'static str,
    totals: ArchiveTotals,
    duration: std::time::Duration,
    is_compression: bool,
) {
    use shared_files::stats::CompressionStatsBuilder;

    // `CompressionStats` interprets `original_len`/`processed_len` relative
    // to `is_compression`: (original, processed) = (uncompressed, compressed)
    // when compressing, and (compressed, uncompressed) when decompressing.
    let (original_len, processed_len) = if is_compression {
        (totals.total_uncompressed, totals.total_compressed)
    } else {
        (totals.total_compressed, totals.total_uncompressed)
    };

    let build = CompressionStatsBuilder::new()
        .algorithm_name(algorithm_name)
        .algorithm_id(1)
        .version_used(archive_module::CURRENT_VERSION)
        .original_len(original_len as usize)
        .processed_len(processed_len as usize)
        .duration(duration)
        .is_compression(is_compression)
        .build();

    match build {
        Ok(stats) => println!("{}", stats),
        Err(e) => eprintln!("[!] could not compute run statistics: {}", e),
    }
}
