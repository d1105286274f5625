//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use leecher_core::config::FileConfig;
use leecher_core::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_ITEM_DELAY, READ_TIMEOUT_SECS,
};
use leecher_core::orchestrator::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_PAGES, DEFAULT_TERM_DELAY, MIN_YEAR, latest_supported_year,
};
use leecher_core::{ClientConfig, CrawlPlan, SearchQuery, YearRange};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "leecher.log";

/// Crawl public exam archives into an organized folder tree.
///
/// Exam papers and answer keys are saved under
/// `<output>/<board>/<institution>_<year>/{exams,gabaritos}/` with an
/// `info.txt` index per contest.
#[derive(Parser, Debug)]
#[command(name = "leecher")]
#[command(author, version, about)]
pub struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors and hide the progress spinner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/leecher/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file (default: leecher.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Root directory for downloaded documents (default: current directory)
    #[arg(short = 'o', long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-16)
    #[arg(short = 'c', long, global = true, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: Option<u8>,

    /// Minimum delay between downloads from the same host in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, global = true, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit_ms: Option<u64>,

    /// Maximum result pages fetched per search (1-500)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=500))]
    pub max_pages: Option<u32>,

    /// Override the site base URL (mirrors and local testing)
    #[arg(long, global = true, hide = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl every year × term combination and download all results
    Crawl(CrawlArgs),
    /// Run a single search and download its results
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct CrawlArgs {
    /// Site to crawl
    #[arg(long, value_enum, default_value_t = Site::Pci)]
    pub site: Site,

    /// Newest year to crawl (default: current year + 2)
    #[arg(long, value_parser = parse_year)]
    pub from_year: Option<i32>,

    /// Oldest year to crawl (default: 1990)
    #[arg(long, value_parser = parse_year)]
    pub to_year: Option<i32>,

    /// Search term; repeat for several (default: built-in subject list)
    #[arg(short = 't', long = "term")]
    pub terms: Vec<String>,

    /// Keep only results from this examining board
    #[arg(long)]
    pub board: Option<String>,

    /// Skip the answer-key listing
    #[arg(long)]
    pub no_answer_keys: bool,

    /// Stop after this many year/term searches
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_queries: Option<u64>,

    /// Pause after each term in milliseconds (max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub term_delay_ms: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search term
    pub term: String,

    /// Keep only results from this year
    #[arg(long, value_parser = parse_year)]
    pub year: Option<i32>,

    /// Keep only results from this examining board
    #[arg(long)]
    pub board: Option<String>,

    /// Site to search
    #[arg(long, value_enum, default_value_t = Site::Pci)]
    pub site: Site,

    /// Skip the answer-key listing
    #[arg(long)]
    pub no_answer_keys: bool,
}

/// Crawlable sites.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// Public HTML archive (no login)
    Pci,
    /// Question-bank API (login via QCONCURSOS_EMAIL / QCONCURSOS_PASSWORD)
    Qconcursos,
}

fn parse_year(raw: &str) -> Result<i32, String> {
    let year: i32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a year"))?;
    let latest = latest_supported_year();
    if (MIN_YEAR..=latest).contains(&year) {
        Ok(year)
    } else {
        Err(format!("year must be within {MIN_YEAR}..={latest}"))
    }
}

impl Args {
    /// Site selected by the subcommand.
    #[must_use]
    pub fn site(&self) -> Site {
        match &self.command {
            Command::Crawl(crawl) => crawl.site,
            Command::Search(search) => search.site,
        }
    }

    /// Log file: flag, then config file, then [`DEFAULT_LOG_FILE`].
    #[must_use]
    pub fn log_file(&self, file: &FileConfig) -> PathBuf {
        self.log_file
            .clone()
            .or_else(|| file.log_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }

    /// HTTP client settings from the config file or built-in timeouts.
    #[must_use]
    pub fn client_config(file: &FileConfig) -> ClientConfig {
        ClientConfig::with_timeouts(
            file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        )
    }

    /// Builds the run plan; flags win over the config file, which wins over
    /// built-in defaults.
    #[must_use]
    pub fn plan(&self, file: &FileConfig) -> CrawlPlan {
        let output_dir = self
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut plan = CrawlPlan::new(output_dir);

        plan.max_pages = self
            .max_pages
            .or(file.max_pages)
            .unwrap_or(DEFAULT_MAX_PAGES);
        plan.concurrency = self
            .concurrency
            .map(usize::from)
            .or(file.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        plan.item_delay = self
            .rate_limit_ms
            .or(file.rate_limit_ms)
            .map_or(DEFAULT_ITEM_DELAY, Duration::from_millis);
        plan.term_delay = file
            .term_delay_ms
            .map_or(DEFAULT_TERM_DELAY, Duration::from_millis);
        if let Some(terms) = &file.terms {
            plan.terms.clone_from(terms);
        }

        match &self.command {
            Command::Crawl(crawl) => {
                let defaults = YearRange::default();
                plan.years = YearRange::new(
                    crawl.from_year.unwrap_or(defaults.newest()),
                    crawl.to_year.unwrap_or(defaults.oldest()),
                );
                if !crawl.terms.is_empty() {
                    plan.terms.clone_from(&crawl.terms);
                }
                plan.board = crawl
                    .board
                    .clone()
                    .filter(|board| !board.trim().is_empty());
                plan.include_answer_keys = !crawl.no_answer_keys;
                plan.max_queries = crawl
                    .max_queries
                    .map(|cap| usize::try_from(cap).unwrap_or(usize::MAX));
                if let Some(ms) = crawl.term_delay_ms {
                    plan.term_delay = Duration::from_millis(ms);
                }
            }
            Command::Search(search) => {
                plan.include_answer_keys = !search.no_answer_keys;
            }
        }
        plan
    }

    /// The single query of `search`, or `None` for `crawl`.
    #[must_use]
    pub fn query(&self, max_pages: u32) -> Option<SearchQuery> {
        let Command::Search(search) = &self.command else {
            return None;
        };
        let mut query = SearchQuery::new(search.term.as_str(), max_pages);
        if let Some(year) = search.year {
            query = query.with_year(year.to_string());
        }
        if let Some(board) = &search.board {
            query = query.with_board(board.as_str());
        }
        Some(query)
    }
}
