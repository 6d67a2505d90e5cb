use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// Default number of list-scan fetches in flight.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Knobs the scanner core takes from its caller.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub output_dir: PathBuf,
    pub verbose: bool,
    pub concurrency: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            verbose: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// What to scan; exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    Url(String),
    Domain(String),
    List(PathBuf),
}

impl ScanMode {
    /// Pick the mode from the three mutually exclusive inputs.
    pub fn from_inputs(
        url: Option<String>,
        domain: Option<String>,
        list: Option<PathBuf>,
    ) -> Option<Self> {
        match (url, domain, list) {
            (Some(u), None, None) => Some(ScanMode::Url(u)),
            (None, Some(d), None) => Some(ScanMode::Domain(d)),
            (None, None, Some(l)) => Some(ScanMode::List(l)),
            _ => None,
        }
    }
}
