use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ::time::format_description::well_known;

use crate::sink::ScanStats;
use crate::types::ScanResult;

/// Receives each finished result for presentation.
pub trait Reporter: Send + Sync {
    /// `ordinal` is the session-wide completion count including this result.
    fn result(&self, result: &ScanResult, ordinal: u64);
}

/// Discards everything; handy for library callers and tests.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn result(&self, _result: &ScanResult, _ordinal: u64) {}
}

/// Plain-text live output on stdout.
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl Reporter for ConsoleReporter {
    fn result(&self, result: &ScanResult, ordinal: u64) {
        if let Some(line) = render_result(result, ordinal, self.verbose) {
            println!("{line}");
        }
    }
}

/// Render one result. Failures only render in verbose mode.
pub fn render_result(result: &ScanResult, ordinal: u64, verbose: bool) -> Option<String> {
    if let Some(err) = &result.error {
        return verbose.then(|| format!("[ERROR] {} - {}", result.url, err));
    }

    let mut line = format!("[{ordinal}] [{}] {}", result.status, result.url);
    if let Some(n) = result.redirect_count {
        let _ = write!(line, " [{n}r]");
    }
    if !result.technologies.is_empty() {
        let _ = write!(line, " [T{}]", result.technologies.len());
    }
    if let Some(sec) = &result.security {
        let _ = write!(line, " [S{}]", sec.score);
    }
    if let Some(sens) = &result.sensitive_data {
        let _ = write!(line, " [!{}]", sens.count);
    }
    let _ = write!(line, " ({:?}s)", result.elapsed_seconds);

    if verbose {
        if let Some(sec) = &result.security {
            let _ = write!(
                line,
                "\n  Security: Score {} - {}",
                sec.score,
                sec.rating.label()
            );
        }
        if let Some(sens) = &result.sensitive_data {
            let _ = write!(line, "\n  Sensitive: Found {} items", sens.count);
        }
    }
    Some(line)
}

/// End-of-run figures derived from a stats snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: u64,
    pub errors: u64,
    pub redirects: u64,
    pub started_at: String,
    pub duration_secs: f64,
    pub rate: f64,
    pub status_codes: Vec<(String, u64)>,
    pub results_path: Option<PathBuf>,
    pub interrupted: bool,
}

impl Summary {
    pub fn from_stats(stats: &ScanStats, results_path: Option<&Path>, interrupted: bool) -> Self {
        let duration_secs = stats.elapsed().as_secs_f64();
        Self::with_duration(stats, duration_secs, results_path, interrupted)
    }

    pub fn with_duration(
        stats: &ScanStats,
        duration_secs: f64,
        results_path: Option<&Path>,
        interrupted: bool,
    ) -> Self {
        let rate = if duration_secs > 0.0 {
            stats.total as f64 / duration_secs
        } else {
            0.0
        };
        Self {
            total: stats.total,
            errors: stats.errors,
            redirects: stats.redirects,
            started_at: stats
                .started_at
                .format(&well_known::Rfc3339)
                .unwrap_or_default(),
            duration_secs,
            rate,
            status_codes: stats
                .status_codes
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            results_path: results_path.map(Path::to_path_buf),
            interrupted,
        }
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let title = if self.interrupted {
            "[!] SCAN INTERRUPTED"
        } else {
            "[+] SCAN COMPLETE"
        };
        let mut out = format!("\n{rule}\n{title}\n{rule}\n");
        let _ = writeln!(out, "Total URLs: {}", self.total);
        let _ = writeln!(out, "Errors: {}", self.errors);
        let _ = writeln!(out, "Redirects: {}", self.redirects);
        let _ = writeln!(out, "Started: {}", self.started_at);
        let _ = writeln!(out, "Duration: {:.2}s", self.duration_secs);
        let _ = writeln!(out, "Rate: {:.1} URLs/sec", self.rate);
        if !self.status_codes.is_empty() {
            out.push_str("\nStatus Codes:\n");
            for (code, count) in &self.status_codes {
                let _ = writeln!(out, "  {code}: {count}");
            }
        }
        if let Some(path) = &self.results_path {
            let _ = writeln!(out, "\nResults saved to: {}", path.display());
        }
        out
    }
}
