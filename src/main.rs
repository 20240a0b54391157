// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use bisub::app_config::{self, AssLayout, Config, SubtitleFormat, TranslationProvider};
use bisub::app_controller::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Qwen,
    Google,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Qwen => TranslationProvider::Qwen,
            CliTranslationProvider::Google => TranslationProvider::Google,
        }
    }
}

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

#[derive(Debug, Clone, ValueEnum)]
enum CliSubtitleFormat {
    Srt,
    Ass,
}

impl From<CliSubtitleFormat> for SubtitleFormat {
    fn from(cli_format: CliSubtitleFormat) -> Self {
        match cli_format {
            CliSubtitleFormat::Srt => SubtitleFormat::Srt,
            CliSubtitleFormat::Ass => SubtitleFormat::Ass,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliAssLayout {
    Inline,
    DualTrack,
}

impl From<CliAssLayout> for AssLayout {
    fn from(cli_layout: CliAssLayout) -> Self {
        match cli_layout {
            CliAssLayout::Inline => AssLayout::Inline,
            CliAssLayout::DualTrack => AssLayout::DualTrack,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe, segment, translate and merge every video (default command)
    Generate,

    /// Merge manually translated <name>_<target>.list files
    Continue,

    /// Generate shell completions for bisub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Overrides shared by every task
#[derive(Args, Debug)]
struct RunOptions {
    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json", global = true)]
    config_path: String,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Spoken language code (e.g., 'en', 'ja')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Subtitle language code (e.g., 'zh', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Final subtitle format
    #[arg(long, value_enum, global = true)]
    subtitle_format: Option<CliSubtitleFormat>,

    /// Layout of bilingual ASS output
    #[arg(long, value_enum, global = true)]
    ass_layout: Option<CliAssLayout>,

    /// Write the translation alone
    #[arg(long, global = true)]
    only_target: bool,

    /// Stop after segmentation and leave empty translation files
    #[arg(long, global = true)]
    skip_translate: bool,

    /// Read audio files directly instead of extracting them from videos
    #[arg(long, global = true)]
    input_is_audio: bool,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Redo steps whose outputs already exist
    #[arg(short, long, global = true)]
    force_overwrite: bool,
}

/// bisub - bilingual subtitles from speech
#[derive(Parser, Debug)]
#[command(name = "bisub")]
#[command(version)]
#[command(about = "Generate bilingual subtitles from video speech")]
#[command(long_about = "bisub transcribes the speech of every video in a directory, splits it into
subtitle lines, translates them and writes bilingual SRT or ASS subtitles.

EXAMPLES:
    bisub                                   # Generate using conf.json
    bisub -p google -s ja -t en             # Japanese to English with Google
    bisub --subtitle-format ass --only-target
    bisub --skip-translate                  # Stop after segmentation
    bisub continue                          # Merge manual translations
    bisub completions bash > bisub.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. API keys may also come from OPENAI_API_KEY
    and DASHSCOPE_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: RunOptions,
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
        // Filtering is left to log::max_level so it can change after init
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "bisub", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Continue) => {
            let config = load_config(&cli.options)?;
            let mut controller = Controller::with_config(config)?;
            controller.run_continue(cli.options.force_overwrite).await?;
            Ok(())
        }
        Some(Commands::Generate) | None => {
            let config = load_config(&cli.options)?;
            let mut controller = Controller::with_config(config)?;
            controller.run_generate(cli.options.force_overwrite).await?;
            Ok(())
        }
    }
}

/// Load or create the configuration, then apply CLI overrides
fn load_config(options: &RunOptions) -> Result<Config> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    apply_overrides(&mut config, options);
    config.resolve_api_keys();

    config.validate()
        .context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    info!(
        "{} -> {} with {}",
        config.source_language,
        config.target_language,
        config.translation.provider.display_name()
    );
    Ok(config)
}

fn apply_overrides(config: &mut Config, options: &RunOptions) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(format) = &options.subtitle_format {
        config.output.subtitle_format = format.clone().into();
    }

    if let Some(layout) = &options.ass_layout {
        config.output.ass_layout = layout.clone().into();
    }

    if options.only_target {
        config.output.only_target = true;
    }

    if options.skip_translate {
        config.translation.common.skip_translate = true;
    }

    if options.input_is_audio {
        config.paths.input_is_audio = true;
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}
