//! Note-Harvester main entry point
//!
//! This is the command-line interface for the note harvester.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use note_harvester::config::{load_config_with_hash, Config};
use note_harvester::crawler::{
    ChannelProgressSink, CrawlEngine, SubmitOutcome, TaskController, TaskOutcome,
};
use note_harvester::model::{
    CrawlRequest, CrawlSource, DistanceFilter, Geo, NoteTypeFilter, RangeFilter, SaveMode,
    SearchParams, SortOrder, TimeFilter,
};
use note_harvester::output::{load_statistics, print_statistics, report_path};
use note_harvester::reference::parse_reference_list;
use note_harvester::storage::open_report;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code for requests rejected before anything ran
const EXIT_INVALID: u8 = 2;

/// Exit code for a busy controller
const EXIT_BUSY: u8 = 3;

/// Note-Harvester: a rate-limited harvester for social platform notes
///
/// Fetches notes from an explicit list of links, a user's whole timeline or
/// a search query, then saves their media and a report.
#[derive(Parser, Debug)]
#[command(name = "note-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A rate-limited harvester for social platform notes", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl an explicit list of note links
    Notes {
        /// Note links
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// File with one note link per line
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Crawl every note on a user's timeline
    User {
        /// Profile page of the user
        #[arg(value_name = "URL")]
        target: String,

        /// Maximum number of scroll steps (0 scrolls until the page stops growing)
        #[arg(long, value_name = "N")]
        scroll_limit: Option<u32>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Crawl the results of a keyword search
    Search {
        /// Search keywords
        #[arg(value_name = "QUERY")]
        query: String,

        /// Number of results to fetch
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// general, latest, most-liked, most-commented or most-collected
        #[arg(long, default_value = "general")]
        sort: SortOrder,

        /// any, video or normal
        #[arg(long, default_value = "any")]
        note_type: NoteTypeFilter,

        /// any, day, week or half-year
        #[arg(long, default_value = "any")]
        time: TimeFilter,

        /// any, viewed, unviewed or followed
        #[arg(long, default_value = "any")]
        range: RangeFilter,

        /// any, same-city or nearby (needs --lat and --lng)
        #[arg(long, default_value = "any")]
        distance: DistanceFilter,

        /// Latitude for the distance filter
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude for the distance filter
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Show statistics of a written report
    Stats {
        /// Report file, or report name inside the report directory
        #[arg(value_name = "REPORT")]
        report: String,
    },
}

/// Options shared by the crawl commands
#[derive(Args, Debug)]
struct SaveArgs {
    /// all, media, media-video, media-image or excel
    #[arg(long = "save", value_name = "MODE", default_value = "all")]
    save_mode: SaveMode,

    /// Report name (defaults to the user id or the search query)
    #[arg(long = "report", value_name = "NAME")]
    report_name: Option<String>,

    /// Maximum number of notes to fetch (0 is unlimited)
    #[arg(long, value_name = "N")]
    max_notes: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no command given; use --help to list commands");
    };

    let request = match command {
        Command::Stats { report } => {
            handle_stats(&config, &report)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Notes { urls, file, save } => {
            let mut lines = urls;
            if let Some(file) = file {
                let content = std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                lines.extend(content.lines().map(str::to_string));
            }
            let references = match parse_reference_list(&lines) {
                Ok(references) => references,
                Err(e) => {
                    eprintln!("invalid request: {}", e);
                    return Ok(ExitCode::from(EXIT_INVALID));
                }
            };
            build_request(CrawlSource::Urls(references), save)
        }
        Command::User {
            target,
            scroll_limit,
            save,
        } => build_request(
            CrawlSource::User {
                target,
                scroll_limit,
            },
            save,
        ),
        Command::Search {
            query,
            count,
            sort,
            note_type,
            time,
            range,
            distance,
            lat,
            lng,
            save,
        } => {
            let mut params = SearchParams::new(query, count);
            params.sort = sort;
            params.note_type = note_type;
            params.time = time;
            params.range = range;
            params.distance = distance;
            params.geo = lat.zip(lng).map(|(latitude, longitude)| Geo {
                latitude,
                longitude,
            });
            build_request(CrawlSource::Search(params), save)
        }
    };

    handle_crawl(&config, request).await
}

fn build_request(source: CrawlSource, save: SaveArgs) -> CrawlRequest {
    let mut request = CrawlRequest::new(source, save.save_mode);
    request.report_name = save.report_name;
    request.cap = save.max_notes;
    request
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("note_harvester=info,warn"),
            1 => EnvFilter::new("note_harvester=debug,info"),
            2 => EnvFilter::new("note_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config) {
    println!("=== Note-Harvester Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Web URL: {}", config.api.web_url);
    println!("  Timeout: {}s", config.api.timeout_secs);
    println!(
        "  Cookies: {}",
        if config.auth.cookies.trim().is_empty() {
            "not set"
        } else {
            "set"
        }
    );
    println!(
        "  Proxy: {}",
        config.network.proxy.as_deref().unwrap_or("none")
    );

    println!("\nRate Limit:");
    if config.rate_limit.max_per_window == 0 {
        println!("  Window: off");
    } else {
        println!(
            "  Window: {} calls per {}s",
            config.rate_limit.max_per_window, config.rate_limit.window_seconds
        );
    }
    println!("  Minimum interval: {}s", config.rate_limit.min_interval);

    println!("\nHarvest:");
    println!("  Scroll pause: {}ms", config.harvest.scroll_pause_ms);
    println!("  Stable rounds: {}", config.harvest.stable_rounds);
    println!("  Page timeout: {}s", config.harvest.page_timeout_secs);
    println!("  Headless: {}", config.harvest.headless);
    println!("  Anchor selector: {}", config.harvest.anchor_selector);
    println!("  Skip video: {}", config.harvest.skip_video);

    println!("\nOutput:");
    println!("  Media: {}", config.output.media_dir);
    println!("  Reports: {}", config.output.report_dir);
    match config.crawl.max_notes {
        0 => println!("  Max notes: unlimited"),
        n => println!("  Max notes: {}", n),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the stats command: shows statistics of one report
fn handle_stats(config: &Config, report: &str) -> anyhow::Result<()> {
    let direct = Path::new(report);
    let path = if direct.is_file() {
        direct.to_path_buf()
    } else {
        report_path(Path::new(&config.output.report_dir), report)
    };
    if !path.is_file() {
        anyhow::bail!("report not found: {}", path.display());
    }

    println!("Report: {}\n", path.display());
    let store = open_report(&path)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles a crawl: submits it and prints progress until it ends
async fn handle_crawl(config: &Config, request: CrawlRequest) -> anyhow::Result<ExitCode> {
    let engine = Arc::new(CrawlEngine::from_config(config)?);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let controller = TaskController::new(Arc::new(ChannelProgressSink::new(tx)));
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("{}", line);
        }
    });

    let code = match controller.submit_crawl(engine, request) {
        Ok(SubmitOutcome::Accepted) => match controller.wait().await {
            Some(TaskOutcome::Failed(_)) => ExitCode::FAILURE,
            Some(TaskOutcome::Completed) | None => ExitCode::SUCCESS,
        },
        Ok(SubmitOutcome::RejectedBusy) => ExitCode::from(EXIT_BUSY),
        Err(e) => {
            eprintln!("invalid request: {}", e);
            ExitCode::from(EXIT_INVALID)
        }
    };

    drop(controller);
    if let Err(e) = printer.await {
        tracing::warn!("Progress printer ended abnormally: {}", e);
    }

    Ok(code)
}
