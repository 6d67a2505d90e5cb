use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use httpxray_rs::config::{ScanConfig, ScanMode, DEFAULT_CONCURRENCY};
use httpxray_rs::fetcher::{HttpFetcher, DEFAULT_USER_AGENT};
use httpxray_rs::report::{ConsoleReporter, Summary};
use httpxray_rs::scanner::Scanner;
use httpxray_rs::sink::ResultSink;

/// Exit status when the run was cut short by Ctrl-C.
const INTERRUPTED_EXIT: u8 = 130;

/// httpxray-rs — lightweight HTTP reconnaissance scanner.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "httpxray-rs",
    version,
    about = "Lightweight HTTP reconnaissance scanner: tech fingerprints, security headers, sensitive-data hints.",
    long_about = None,
    group(ArgGroup::new("target").required(true).args(["url", "domain", "list"]))
)]
struct Cli {
    /// Single URL to scan.
    #[arg(short, long)]
    url: Option<String>,

    /// Domain to sweep across common paths (https:// assumed when no scheme is given).
    #[arg(short, long)]
    domain: Option<String>,

    /// File containing one URL per line.
    #[arg(short, long)]
    list: Option<PathBuf>,

    /// Verbose output: failures, security and sensitive-data details, debug logs.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Max concurrent requests for list scans.
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY as u64, value_parser = clap::value_parser!(u64).range(1..))]
    threads: u64,

    /// Output directory for results.jsonl.
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs", default_value_t = 10)]
    timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[arg(long = "user-agent", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

enum Outcome {
    Completed,
    Interrupted,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Interrupted) => ExitCode::from(INTERRUPTED_EXIT),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "httpxray_rs=debug"
    } else {
        "httpxray_rs=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<Outcome> {
    let Some(mode) = ScanMode::from_inputs(cli.url.clone(), cli.domain.clone(), cli.list.clone())
    else {
        bail!("no input provided: use one of --url, --domain or --list");
    };

    let config = ScanConfig {
        output_dir: cli.output.clone(),
        verbose: cli.verbose,
        concurrency: cli.threads as usize,
        timeout: Duration::from_secs(cli.timeout_secs),
        user_agent: cli.user_agent.clone(),
    };

    println!("httpxray-rs configuration:");
    println!("  target       : {}", describe_mode(&mode));
    println!("  output       : {}", config.output_dir.display());
    println!("  concurrency  : {}", config.concurrency);
    println!("  timeout_secs : {}", cli.timeout_secs);
    println!("  verbose      : {}", config.verbose);
    println!();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;
    let sink = Arc::new(ResultSink::open(&config.output_dir).await?);
    let fetcher = HttpFetcher::new(&config.user_agent).context("failed to build HTTP client")?;
    let reporter = ConsoleReporter {
        verbose: config.verbose,
    };

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping scan");
            cancel_ctrlc.cancel();
        }
    });

    let scanner = Scanner::new(Arc::new(fetcher), sink.clone(), Arc::new(reporter), config)
        .with_cancel(cancel.clone());
    scanner.run(&mode).await?;

    let interrupted = cancel.is_cancelled();
    let stats = sink.snapshot().await;
    print!("{}", Summary::from_stats(&stats, sink.path(), interrupted).render());

    Ok(if interrupted {
        Outcome::Interrupted
    } else {
        Outcome::Completed
    })
}

fn describe_mode(mode: &ScanMode) -> String {
    match mode {
        ScanMode::Url(url) => format!("url {url}"),
        ScanMode::Domain(domain) => format!("domain {domain}"),
        ScanMode::List(path) => format!("list {}", path.display()),
    }
}
