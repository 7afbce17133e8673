// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use polyharvest::app_config::{self, CacheStoreKind, Config};
use polyharvest::collector::Collector;
use polyharvest::database::Repository;
use polyharvest::file_utils::FileManager;
use polyharvest::keywords::KeywordMatcher;
use polyharvest::report::RunReport;
use polyharvest::sources;
use polyharvest::translation::cache::CacheOptions;
use polyharvest::translation::{CacheStore, JsonFileStore, SqliteCacheStore, TranslationCache, TranslationOrchestrator};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every command that reads the configuration
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// SQLite database path (overrides the config)
    #[arg(long, env = "POLYHARVEST_DB")]
    database: Option<String>,
}

#[derive(Args, Debug)]
struct CollectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Source to collect; repeat to collect several (overrides the config list)
    #[arg(short, long = "source", value_name = "SOURCE")]
    sources: Vec<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Collect without translating
    #[arg(long)]
    no_translate: bool,

    /// Collect and report without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Directory for the run report (overrides the config)
    #[arg(long)]
    report_dir: Option<String>,
}

#[derive(Args, Debug)]
struct TranslateKeywordsArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output file (defaults to keywords_file from the config, then keywords.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Language to translate into; repeat for several (defaults to the configured languages)
    #[arg(long = "language", value_name = "LANG")]
    languages: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect, translate, match and store content from the configured sources
    Collect(CollectArgs),

    /// Translate the default keyword set into other languages
    TranslateKeywords(TranslateKeywordsArgs),

    /// Print statistics about the stored collection
    Stats(CommonArgs),

    /// Generate shell completions for polyharvest
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// polyharvest - multilingual collection and persistence pipeline
///
/// Collects posts and replies from community feeds, translates non-target-language
/// content, flags topic keywords and stores everything in SQLite.
#[derive(Parser, Debug)]
#[command(name = "polyharvest")]
#[command(version)]
#[command(about = "Multilingual community content collection pipeline")]
#[command(long_about = "polyharvest collects posts from community feeds, detects their language, translates
non-target-language content and stores keyword-flagged records in SQLite.

EXAMPLES:
    polyharvest collect                              # Collect every configured source
    polyharvest collect -s askTO -s toronto          # Collect two sources only
    polyharvest collect --no-translate --dry-run     # Match only, store nothing
    polyharvest translate-keywords --language es     # Build a Spanish keyword set
    polyharvest stats                                # Summarize the stored collection
    polyharvest completions bash > polyharvest.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => ("", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {}{}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "polyharvest", &mut std::io::stdout());
            Ok(())
        }
        Commands::Collect(args) => run_collect(args).await,
        Commands::TranslateKeywords(args) => run_translate_keywords(args).await,
        Commands::Stats(args) => run_stats(args).await,
    }
}

/// Load the configuration (creating a default one if missing) and apply
/// the common CLI overrides
fn load_config(common: &CommonArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &common.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.level_filter());
    }

    let config_path = &common.config_path;
    let mut config = if Path::new(config_path).exists() {
        FileManager::read_json(config_path)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        FileManager::write_json_atomic(config_path, &config)
            .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(log_level) = &common.log_level {
        config.log_level = log_level.clone().into();
    }

    if let Some(database) = &common.database {
        config.database.path = Some(database.clone());
    }

    Ok(config)
}

/// Validate and apply the configured log level
fn finish_config(config: &Config, common: &CommonArgs) -> Result<()> {
    config.validate().context("Configuration validation failed")?;

    if common.log_level.is_none() {
        log::set_max_level(config.log_level.level_filter());
    }

    Ok(())
}

/// Open the durable store; failure here aborts the run
fn open_repository(config: &Config) -> Result<Repository> {
    let path = config.database_path()?;
    Repository::open(&path).with_context(|| format!("Durable store unreachable at {:?}", path))
}

/// Open the translation cache; a corrupt artifact aborts the run
fn open_cache(config: &Config) -> Result<Arc<TranslationCache>> {
    let path = config.cache_path()?;
    FileManager::ensure_parent_dir(&path)?;

    let store: Box<dyn CacheStore> = match config.cache.store {
        CacheStoreKind::Json => Box::new(JsonFileStore::new(&path)),
        CacheStoreKind::Sqlite => Box::new(SqliteCacheStore::open(&path)?),
    };

    let options = CacheOptions {
        flush_every: config.cache.flush_every,
        max_entries: config.cache.max_entries,
    };

    let cache = TranslationCache::open(store, options)
        .with_context(|| format!("Failed to open translation cache at {:?}", path))?;
    Ok(Arc::new(cache))
}

fn build_matcher(config: &Config) -> Result<KeywordMatcher> {
    let mut matcher = KeywordMatcher::with_defaults(&config.target_language);

    if let Some(path) = &config.keywords_file {
        if Path::new(path).exists() {
            matcher.load_file(path)?;
        } else {
            warn!("Keyword file {} not found, using built-in keyword sets", path);
        }
    }

    Ok(matcher)
}

fn close_cache(cache: &TranslationCache) {
    if let Err(e) = cache.close() {
        error!("Failed to flush translation cache: {}", e);
    }
}

async fn run_collect(args: CollectArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;

    if let Some(target_language) = &args.target_language {
        config.target_language = target_language.clone();
    }
    if args.no_translate {
        config.translation.enabled = false;
    }
    if let Some(report_dir) = &args.report_dir {
        config.report_dir = report_dir.clone();
    }
    if !args.sources.is_empty() {
        config.sources = args.sources.clone();
    }

    finish_config(&config, &args.common)?;

    // Fatal failures surface before any item is processed
    let repository = if args.dry_run {
        info!("Dry run: nothing will be written to the database");
        None
    } else {
        Some(open_repository(&config)?)
    };
    let cache = open_cache(&config)?;
    let matcher = build_matcher(&config)?;
    let connector = sources::build_connector(&config)?;

    let orchestrator = Arc::new(TranslationOrchestrator::from_config(&config, cache.clone()));
    let mut collector = Collector::from_config(&config, matcher, connector, orchestrator.clone()).with_progress(true);
    if let Some(repository) = &repository {
        collector = collector.with_repository(repository.clone());
    }

    let started_at = Utc::now();
    let summary = collector.collect(&config.sources).await;

    let persistence = match &repository {
        Some(repository) => Some(
            repository
                .bulk_upsert(&summary.records)
                .await
                .with_upstream_skips(&summary.skipped_by_source()),
        ),
        None => None,
    };

    close_cache(&cache);

    let report =
        RunReport::build(started_at, &summary, &orchestrator.stats(), persistence.as_ref()).with_cache(cache.stats());
    report.log_summary();
    report.write(&config.report_dir)?;

    if summary.all_failed() {
        return Err(anyhow!("Every source failed; see the run report for details"));
    }

    Ok(())
}

async fn run_translate_keywords(args: TranslateKeywordsArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    finish_config(&config, &args.common)?;

    let cache = open_cache(&config)?;
    let orchestrator = TranslationOrchestrator::from_config(&config, cache.clone());
    let matcher = KeywordMatcher::with_defaults(&config.target_language);

    let targets = if args.languages.is_empty() {
        config.languages.clone()
    } else {
        args.languages.clone()
    };

    let keywords = matcher.default_terms();
    info!("Translating {} keywords into {}", keywords.len(), targets.join(", "));
    let translated = orchestrator
        .translate_keywords(&keywords, &config.target_language, &targets)
        .await;

    close_cache(&cache);

    let output = args
        .output
        .or_else(|| config.keywords_file.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("keywords.json"));
    FileManager::write_json_atomic(&output, &translated)
        .with_context(|| format!("Failed to write keyword file {:?}", output))?;

    for (language, terms) in &translated {
        info!("  {}: {} keywords", language, terms.len());
    }
    info!("Keyword sets written to {:?}", output);
    Ok(())
}

async fn run_stats(args: CommonArgs) -> Result<()> {
    let config = load_config(&args)?;
    finish_config(&config, &args)?;

    let repository = open_repository(&config)?;
    let stats = repository.collection_stats().await?;
    let database = repository.connection().stats()?;

    print!("{}", stats);
    println!("{}", database);
    Ok(())
}
