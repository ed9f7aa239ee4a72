//! Single-line, in-place progress rendering for archive/extract runs.
//!
//! Mirrors the original archiver's `PerFileProgress`: a percentage bucket
//! is tracked per file so the line only re-renders when the integer
//! percentage actually changes, instead of flooding stdout on every token.

use std::io::Write;

/// Formats a completion percentage as e.g. `" 12.34%"` (width 6, 2 decimals).
fn fmt_pct(done: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    let pct = 100.0 * (done as f64 / total as f64);
    format!("{:6.2}%", pct)
}

/// Tracks the current file's path and last reported percentage bucket so
/// repeated calls with the same rounded percentage are silently dropped,
/// and a new file always gets at least one rendered line.
pub struct PerFileProgress {
    label: &'static str,
    current_arc_path: String,
    last_reported: i64,
}

impl PerFileProgress {
    pub fn new(label: &'static str) -> Self {
        PerFileProgress {
            label,
            current_arc_path: String::new(),
            last_reported: -1,
        }
    }

    /// Renders one line for `archive_module::ProgressEvent`, throttled to
    /// one render per integer percentage bucket of the current file. A
    /// change in `arc_path` (a new file starting) always resets the bucket.
    pub fn report(&mut self, event: &archive_module::ProgressEvent) {
        if event.file_total == 0 {
            return;
        }
        if event.arc_path != self.current_arc_path {
            self.current_arc_path = event.arc_path.to_string();
            self.last_reported = -1;
        }

        let bucket = (event.file_done as i64 * 100) / event.file_total as i64;
        if bucket == self.last_reported {
            return;
        }
        self.last_reported = bucket;

        let line = format!(
            "{} {}  {}  | Overall {}",
            self.label,
            event.arc_path,
            fmt_pct(event.file_done as u64, event.file_total as u64),
            fmt_pct(event.overall_done, event.overall_total),
        );
        print!("\r{}", line);
        let _ = std::io::stdout().flush();
    }
}

/// Terminates the in-place progress line with a trailing newline.
pub fn finish_progress_line() {
    println!();
}
