// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use layout_translator::Document;
use layout_translator::app_config::{self, Config};
use layout_translator::app_controller::Controller;
use layout_translator::document::extract_layout;

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

/// CLI Wrapper for CacheBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliCacheBackend {
    Memory,
    Sqlite,
    Disabled,
}

impl From<CliCacheBackend> for app_config::CacheBackend {
    fn from(cli_backend: CliCacheBackend) -> Self {
        match cli_backend {
            CliCacheBackend::Memory => app_config::CacheBackend::Memory,
            CliCacheBackend::Sqlite => app_config::CacheBackend::Sqlite,
            CliCacheBackend::Disabled => app_config::CacheBackend::Disabled,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate parsed layout documents (a JSON file or a directory of them)
    Translate(TranslateArgs),

    /// Print the text blocks of a parsed document with their geometry
    Layout {
        /// Parsed document JSON
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,
    },

    /// Generate shell completions for layout-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input document or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output file (single document only; defaults to <stem>_<lang>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Target language code (e.g., 'zh', 'en', 'ja')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Number of blocks translated concurrently
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Overall deadline per document, in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Translation cache backend
    #[arg(long, value_enum)]
    cache: Option<CliCacheBackend>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", env = "LAYOUT_TRANSLATOR_CONFIG")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// layout-translator - translate parsed PDF layouts with AI
///
/// Reads the page/block/line JSON produced by a document parser and attaches a
/// translation to every text block, keeping math, Markdown and layout intact.
#[derive(Parser, Debug)]
#[command(name = "layout-translator")]
#[command(version)]
#[command(about = "AI-powered translation of parsed PDF layouts")]
#[command(long_about = "layout-translator translates the text blocks of parsed PDF layout JSON using AI providers.

EXAMPLES:
    layout-translator translate paper.json                 # Translate using default config
    layout-translator translate -t ja paper.json           # Translate into Japanese
    layout-translator translate -m qwen-max -j 8 papers/   # Whole directory, 8 parallel requests
    layout-translator layout paper.json                    # List text blocks with bounding boxes
    layout-translator completions bash > lt.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically. Providers are tried in
    the order listed; the first one with an API key is used.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation; filtering follows `log::max_level`
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger);
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "layout-translator", &mut std::io::stdout());
            Ok(())
        }
        Commands::Layout { input_file } => run_layout(&input_file),
        Commands::Translate(args) => run_translate(args).await,
    }
}

fn run_layout(input_file: &Path) -> Result<()> {
    let document = Document::load(input_file)?;
    let layout = extract_layout(&document);

    let json = serde_json::to_string_pretty(&layout).context("Failed to serialize layout")?;
    println!("{}", json);
    Ok(())
}

/// Load the config file, creating a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        Config::load(config_path)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.common.concurrent_requests = concurrency;
    }
    if let Some(deadline) = options.deadline_secs {
        config.translation.common.document_timeout_secs = Some(deadline);
    }
    if let Some(cache) = &options.cache {
        config.cache.backend = cache.clone().into();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    let model = options.model.as_deref();

    if options.input_path.is_file() {
        controller
            .run(&options.input_path, options.output.as_deref(), model, options.force_overwrite)
            .await?;
    } else if options.input_path.is_dir() {
        if options.output.is_some() {
            return Err(anyhow!("--output can only be used with a single input file"));
        }
        let summary = controller
            .run_folder(&options.input_path, model, options.force_overwrite)
            .await?;
        if !summary.failed.is_empty() {
            return Err(anyhow!("{} documents failed to translate", summary.failed.len()));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    info!("Done");
    Ok(())
}
