use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyzer::analyze;
use crate::config::{ScanConfig, ScanMode};
use crate::error::ScanError;
use crate::fetcher::Fetcher;
use crate::report::Reporter;
use crate::sink::ResultSink;
use crate::types::{ScanResult, ScanTarget};

/// Paths probed by a domain sweep, in probe order.
pub const PROBE_PATHS: [&str; 10] = [
    "/",
    "/robots.txt",
    "/sitemap.xml",
    "/admin",
    "/api",
    "/login",
    "/.env",
    "/.git/config",
    "/backup",
    "/test",
];

/// Runs fetch -> analyze -> record for one or many URLs.
///
/// - Single URL and domain sweeps run sequentially.
/// - List scans run under a `Semaphore` with at most `config.concurrency` fetches in flight.
/// - Cancelling the token stops admitting new URLs and abandons in-flight fetches;
///   a result that already started recording is always written in full.
#[derive(Clone)]
pub struct Scanner {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<ResultSink>,
    reporter: Arc<dyn Reporter>,
    config: ScanConfig,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<ResultSink>,
        reporter: Arc<dyn Reporter>,
        config: ScanConfig,
    ) -> Self {
        Self {
            fetcher,
            sink,
            reporter,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Variant that accepts a `CancellationToken` to allow external cancellation.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn sink(&self) -> &Arc<ResultSink> {
        &self.sink
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Dispatch to the entry point matching `mode`.
    pub async fn run(&self, mode: &ScanMode) -> Result<Vec<ScanResult>, ScanError> {
        match mode {
            ScanMode::Url(url) => Ok(self.scan_one(url).await.into_iter().collect()),
            ScanMode::Domain(domain) => self.scan_domain(domain).await,
            ScanMode::List(path) => self.scan_list(path).await,
        }
    }

    /// Scan a single URL with GET. `None` only if the scan was cancelled before recording.
    pub async fn scan_one(&self, url: &str) -> Option<ScanResult> {
        self.scan_target(ScanTarget::get(url)).await
    }

    pub async fn scan_target(&self, target: ScanTarget) -> Option<ScanResult> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let result = self.fetch_and_analyze(&target).await?;
        let ordinal = self.sink.record(&result).await;
        self.reporter.result(&result, ordinal);
        Some(result)
    }

    /// Probe the fixed path list on one host, in order.
    pub async fn scan_domain(&self, domain: &str) -> Result<Vec<ScanResult>, ScanError> {
        let urls = domain_urls(domain)?;
        info!(domain, paths = urls.len(), "scanning domain");

        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            if self.cancel.is_cancelled() {
                break;
            }
            if let Some(result) = self.scan_one(&url).await {
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Read newline-delimited URLs from `path` and scan them concurrently.
    pub async fn scan_list(&self, path: &Path) -> Result<Vec<ScanResult>, ScanError> {
        let urls = load_url_list(path).await?;
        info!(
            list = %path.display(),
            urls = urls.len(),
            concurrency = self.config.concurrency,
            "scanning URL list"
        );
        Ok(self.scan_urls(urls).await)
    }

    /// Scan `urls` with at most `config.concurrency` in flight; returns once all have finished.
    ///
    /// Results come back in completion order.
    pub async fn scan_urls(&self, urls: Vec<String>) -> Vec<ScanResult> {
        let sem = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut set = JoinSet::new();

        for url in urls {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let scanner = self.clone();
            set.spawn(async move {
                let _permit = permit; // keep permit until task completes
                scanner.scan_target(ScanTarget::get(url)).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => warn!("scan task ended abnormally: {e}"),
            }
        }
        results
    }

    /// Fetch and analyze on a separate task so a panic there becomes a failure record.
    async fn fetch_and_analyze(&self, target: &ScanTarget) -> Option<ScanResult> {
        let start = Instant::now();
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.config.timeout;
        let job_target = target.clone();

        let mut job = tokio::spawn(async move {
            match fetcher.fetch(&job_target, timeout).await {
                Ok(response) => {
                    let analysis = analyze(&response);
                    ScanResult::success(&job_target, response, analysis)
                }
                Err(e) => {
                    debug!(url = %job_target.url, "fetch failed: {e}");
                    ScanResult::failure(&job_target, start.elapsed().as_secs_f64(), e.to_string())
                }
            }
        });

        tokio::select! {
            _ = self.cancel.cancelled() => {
                job.abort();
                debug!(url = %target.url, "scan abandoned on cancel");
                None
            }
            joined = &mut job => Some(joined.unwrap_or_else(|e| {
                warn!(url = %target.url, "scan task failed: {e}");
                ScanResult::failure(target, start.elapsed().as_secs_f64(), format!("scan task failed: {e}"))
            })),
        }
    }
}

/// Prefix `https://` when no scheme is given.
pub fn normalize_domain(domain: &str) -> Result<String, ScanError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ScanError::InvalidDomain(domain.to_string()));
    }
    if domain.starts_with("http://") || domain.starts_with("https://") {
        Ok(domain.to_string())
    } else {
        Ok(format!("https://{domain}"))
    }
}

/// Expand a domain into one URL per entry of [`PROBE_PATHS`].
pub fn domain_urls(domain: &str) -> Result<Vec<String>, ScanError> {
    let base = normalize_domain(domain)?;
    let base = base.trim_end_matches('/');
    Ok(PROBE_PATHS
        .iter()
        .map(|path| format!("{base}{path}"))
        .collect())
}

/// One URL per non-blank line, surrounding whitespace stripped.
pub fn parse_url_list(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load a URL list from a file. Errors if the file cannot be read or holds no URLs.
pub async fn load_url_list(path: &Path) -> Result<Vec<String>, ScanError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ScanError::UnreadableList {
            path: path.to_path_buf(),
            source,
        })?;
    let urls = parse_url_list(&content);
    if urls.is_empty() {
        return Err(ScanError::EmptyList(path.to_path_buf()));
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_gets_https_and_ten_paths() {
        let urls = domain_urls("example.com").unwrap();
        assert_eq!(urls.len(), 10);
        assert_eq!(urls[0], "https://example.com/");
        assert_eq!(urls[1], "https://example.com/robots.txt");
        assert_eq!(urls[7], "https://example.com/.git/config");
        assert_eq!(urls[9], "https://example.com/test");
    }

    #[test]
    fn explicit_scheme_and_trailing_slash_kept_clean() {
        let urls = domain_urls("http://10.0.0.1:8080/").unwrap();
        assert_eq!(urls[0], "http://10.0.0.1:8080/");
        assert_eq!(urls[4], "http://10.0.0.1:8080/api");
    }

    #[test]
    fn blank_domain_rejected() {
        assert!(matches!(
            normalize_domain("   "),
            Err(ScanError::InvalidDomain(_))
        ));
    }

    #[test]
    fn url_list_skips_blank_lines() {
        let input = "https://a.example/\n\n   \n  https://b.example/x  \r\nhttps://c.example\n";
        assert_eq!(
            parse_url_list(input),
            vec![
                "https://a.example/",
                "https://b.example/x",
                "https://c.example"
            ]
        );
    }

    #[tokio::test]
    async fn missing_list_is_input_error() {
        let err = load_url_list(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::UnreadableList { .. }));
    }
}
