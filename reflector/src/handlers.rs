use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reflector_core::{
    DEFAULT_CONCURRENCY, ReportFormat, Reporter, ScanOptions, ScanSummary, execute_scan,
    render_report,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;

const BANNER: &str = r#"
              ___________  __              __
 _______  ____\_   _____/ |  |   ____  ___/  |_  ___________
 \_  __ \/ __ \|    __)   |  | _/ __ \/ ___\  __\/  _ \_  __ \
  |  | \/  ___/|     \    |  |_\  ___/ \___|  | (  <_> )  | \/
  |__|   \___  >___  /    |____/\___  >___  >__|  \____/|__|
             \/    \/               \/    \/
"#;

pub fn print_banner() {
    println!("{}", BANNER.cyan());
    println!(
        "{}",
        format!(
            "    Reflected parameter finder v{}\n",
            env!("CARGO_PKG_VERSION")
        )
        .cyan()
    );
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    // A second init (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Combine `--url` values and the hosts file, in that order.
pub fn load_targets(urls: &[String], hosts_file: Option<&PathBuf>) -> Result<Vec<String>> {
    let mut targets: Vec<String> = urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if let Some(path) = hosts_file {
        targets.extend(load_targets_from_file(path)?);
    }

    if targets.is_empty() {
        bail!("Either --url or --hosts-file must provide at least one target");
    }

    Ok(targets)
}

/// One target per line. Blank lines and `#` comments are skipped. Lines are not
/// validated here; a bad one is reported and skipped when the scan reaches it.
pub fn load_targets_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let targets: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    if targets.is_empty() {
        bail!("No targets found in {}", path.display());
    }

    Ok(targets)
}

pub fn scan_options_from_matches(matches: &ArgMatches) -> Result<ScanOptions> {
    let urls: Vec<String> = matches
        .get_many::<String>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let targets = load_targets(&urls, matches.get_one::<PathBuf>("hosts-file"))?;

    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(".");
    let output_root = PathBuf::from(shellexpand::tilde(output).as_ref());

    Ok(ScanOptions {
        targets,
        allow_subdomains: matches.get_flag("subdomains"),
        max_pages: matches.get_one::<usize>("max-pages").copied(),
        concurrency: matches
            .get_one::<usize>("concurrency")
            .copied()
            .unwrap_or(DEFAULT_CONCURRENCY),
        timeout: matches
            .get_one::<u64>("timeout")
            .map(|secs| Duration::from_secs(*secs)),
        output_root,
        marker: matches
            .get_one::<String>("marker")
            .cloned()
            .unwrap_or_else(|| ScanOptions::default().marker),
    })
}

/// Prints reporter messages above a spinner that tracks crawl progress.
pub struct ConsoleReporter {
    spinner: ProgressBar,
    to_stderr: bool,
}

impl ConsoleReporter {
    pub fn new(to_stderr: bool) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("static template"),
        );
        Self { spinner, to_stderr }
    }

    fn emit(&self, line: String) {
        self.spinner.suspend(|| {
            if self.to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        });
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, msg: &str) {
        self.emit(format!("{} {}", "[*]".yellow().bold(), msg.yellow()));
    }

    fn warn(&self, msg: &str) {
        self.emit(format!("{} {}", "[-]".red().bold(), msg.red()));
    }

    fn success(&self, msg: &str) {
        self.emit(format!("{} {}", "[+]".green().bold(), msg.green()));
    }

    fn error(&self, msg: &str) {
        self.emit(format!("{} {}", "[!]".red().bold(), msg.bright_red()));
    }

    fn progress(&self, visited: usize, url: &str) {
        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());
        self.spinner
            .set_message(format!("Crawling... {} pages ({})", visited, path));
        self.spinner.tick();
    }
}

/// Runs the scan and returns the process exit code.
pub async fn handle_scan(matches: &ArgMatches) -> i32 {
    let options = match scan_options_from_matches(matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {:#}", "[!]".red().bold(), e);
            return 1;
        }
    };

    let format = matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let reporter = Arc::new(ConsoleReporter::new(format == ReportFormat::Json));
    let summary = match execute_scan(options, reporter.clone()).await {
        Ok(summary) => summary,
        Err(e) => {
            reporter.finish();
            eprintln!("{} Scan failed: {}", "[!]".red().bold(), e);
            return 1;
        }
    };
    reporter.finish();

    match render_report(&summary, format) {
        Ok(report) => print!("{}", report),
        Err(e) => {
            eprintln!("{} Could not render report: {}", "[!]".red().bold(), e);
            return 1;
        }
    }

    exit_code(&summary)
}

/// Non-zero only when every target failed.
pub fn exit_code(summary: &ScanSummary) -> i32 {
    if summary.targets.is_empty() && !summary.failures.is_empty() {
        1
    } else {
        0
    }
}
