// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use translate_stream::app_config::{self, Config};
use translate_stream::app_controller::Controller;
use translate_stream::backend::ModelVariant;
use translate_stream::language_utils;

/// CLI Wrapper for ModelVariant to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliModelVariant {
    #[value(name = "4b")]
    Small,
    #[value(name = "12b")]
    Large,
}

impl From<CliModelVariant> for ModelVariant {
    fn from(cli_model: CliModelVariant) -> Self {
        match cli_model {
            CliModelVariant::Small => ModelVariant::Small,
            CliModelVariant::Large => ModelVariant::Large,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate text, streaming the result as it is produced
    Translate(TranslateArgs),

    /// Show backend device and model status
    Status,

    /// Ask the backend to load another model
    SwitchModel {
        /// Model variant to load
        #[arg(value_enum)]
        model: CliModelVariant,
    },

    /// Print the resolved backend endpoints
    Endpoints,

    /// Generate shell completions for translate-stream
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Text to translate; read from stdin when omitted
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// Model variant to use for translation
    #[arg(short, long, value_enum)]
    model: Option<CliModelVariant>,

    /// Source language tag (e.g., 'en', 'ja')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language tag (e.g., 'zh-TW', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Use a single request instead of the streaming socket
    #[arg(long)]
    no_stream: bool,

    /// Translate the text in an image file instead (single request only)
    #[arg(long, value_name = "FILE", requires = "no_stream", conflicts_with = "text")]
    image: Option<PathBuf>,
}

/// translate-stream - streaming client for the translation backend
#[derive(Parser, Debug)]
#[command(name = "translate-stream")]
#[command(version)]
#[command(about = "Streaming translation client")]
#[command(long_about = "translate-stream sends text to the translation backend and prints the translation as it streams back.

EXAMPLES:
    translate-stream translate \"Hello world\"                 # Translate using default config
    echo \"Hello\" | translate-stream translate -t ja          # Read text from stdin
    translate-stream translate -m 12b \"Good morning\"         # Use the larger model
    translate-stream translate --no-stream \"Hi\"              # Single request, no streaming
    translate-stream translate --no-stream --image menu.png  # Translate the text in an image
    translate-stream --api-url http://gpu-box:8002 status    # Query a specific backend
    translate-stream switch-model 12b                        # Load the 12b model
    translate-stream completions bash > translate-stream.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Origin the backend is deployed behind (e.g., https://translate.example.com)
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Explicit backend URL
    #[arg(long, env = "TRANSLATE_API_URL", global = true)]
    api_url: Option<String>,
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
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
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
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install the logger for every level; log::set_max_level does the filtering
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "translate-stream", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Translate(args) => run_translate(&controller, args).await,
        Commands::Status => run_status(&controller).await,
        Commands::SwitchModel { model } => {
            controller.switch_model(model.into()).await?;
            info!("Model switch requested");
            Ok(())
        }
        Commands::Endpoints => {
            let endpoints = controller.endpoints();
            println!("http:   {}", endpoints.http_base());
            println!("stream: {}", endpoints.stream_url());
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

// Load or create configuration, then apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", cli.config_path);
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }
    if let Some(origin) = &cli.origin {
        config.connection.origin = Some(origin.clone());
    }
    if let Some(api_url) = &cli.api_url {
        config.connection.api_url = Some(api_url.clone());
    }

    if let Commands::Translate(args) = &cli.command {
        if let Some(model) = args.model {
            config.model = model.into();
        }
        if let Some(source_lang) = &args.source_language {
            config.source_language = source_lang.clone();
        }
        if let Some(target_lang) = &args.target_language {
            config.target_language = target_lang.clone();
        }
    }

    Ok(config)
}

async fn run_translate(controller: &Controller, args: TranslateArgs) -> Result<()> {
    if let Some(image) = &args.image {
        let response = controller.translate_image(image).await?;
        println!("{}", response.translation);
        return Ok(());
    }

    let text = if args.text.is_empty() {
        read_stdin()?
    } else {
        args.text.join(" ")
    };

    let config = controller.config();
    info!(
        "{} -> {} ({})",
        language_utils::get_language_name(&config.source_language)?,
        language_utils::get_language_name(&config.target_language)?,
        config.model.model_id()
    );

    if args.no_stream {
        let response = controller.translate_once(&text).await?;
        println!("{}", response.translation);
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    controller.translate_streaming(&text, &mut stdout).await?;
    Ok(())
}

async fn run_status(controller: &Controller) -> Result<()> {
    match controller.ping().await {
        Ok(message) => info!("Backend: {}", message),
        Err(e) => warn!("Backend did not answer the health check: {}", e),
    }

    match controller.status().await {
        Some(status) => {
            println!("{}", status);
            if !status.is_ready() {
                warn!("No model is loaded yet");
            }
        }
        None => println!("Status unavailable"),
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        info!("Reading text from stdin, finish with Ctrl-D");
    }
    let mut text = String::new();
    stdin
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;
    Ok(text)
}
