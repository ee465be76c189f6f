use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rainlint_config::{apply_setting, settings_path, Config, LoadOptions, RefreshMode, SettingUpdate};
use rainlint_core::Rainlint;
use rainlint_format::ReportFormat;
use rainlint_ops::colors::color_presentation;
use rainlint_ops::logview::{clear_log, read_log, LogEntry, LogFollower, LogView};
use rainlint_ops::refresh::{ProcessEngine, RefreshOutcome, SkinEngine};
use rainlint_ops::source::read_source;
use rainlint_ops::{
    CheckOptions, CheckOutcome, FormatMode, FormatOptions, FormatOutcome, Operations, ScanOptions,
};
use rainlint_utils::atomic_write;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut options = LoadOptions::default();
    if let Some(path) = cli.config {
        options = options.with_override_path(path);
    }
    let config = Config::load(options.clone())?;
    debug!(
        working_dir = %config.sources.working_directory.display(),
        layers = config.sources.layers.len(),
        "configuration loaded"
    );
    let engine = Rainlint::bootstrap(config);

    match cli.command {
        Command::Check(args) => handle_check(engine.operations(), args),
        Command::Fmt(args) => handle_fmt(engine.operations(), args),
        Command::Fold(args) => handle_fold(&engine, args),
        Command::Colors(args) => handle_colors(&engine, args),
        Command::Complete(args) => handle_complete(&engine, args),
        Command::Log(args) => handle_log(engine.config(), args),
        Command::Refresh(args) => handle_refresh(engine.config(), args),
        Command::OnSave(args) => handle_on_save(&engine, args),
        Command::Settings(args) => handle_settings(engine.config(), &options, args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("RAINLINT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_check(ops: &Operations, args: CheckArgs) -> Result<i32> {
    let CheckArgs { path, format } = args;

    let format = match format.unwrap_or(OutputFormatValue::Plain) {
        OutputFormatValue::Plain => ReportFormat::Plain,
        OutputFormatValue::Json => ReportFormat::Json,
    };
    let options = CheckOptions {
        scan: ScanOptions { paths: path },
        format,
    };

    let CheckOutcome {
        rendered,
        exit_code,
        ..
    } = ops.check(options)?;

    emit(&rendered)?;
    Ok(exit_code)
}

fn handle_fmt(ops: &Operations, args: FmtArgs) -> Result<i32> {
    let FmtArgs {
        path,
        check,
        diff,
        write,
        quiet,
    } = args;

    let mode = match (check, diff, write) {
        (true, _, _) => FormatMode::Check,
        (_, true, _) => FormatMode::Diff,
        (_, _, true) | (false, false, false) => FormatMode::Write,
    };

    let options = FormatOptions {
        scan: ScanOptions { paths: path },
        mode,
    };
    let FormatOutcome {
        files_scanned,
        changes,
        skipped,
        exit_code,
    } = ops.format(options)?;

    for file in &skipped {
        eprintln!("error: could not read {}: {}", file.path.display(), file.reason);
    }
    for change in &changes {
        match (&change.diff, mode) {
            (Some(diff), _) => emit(diff)?,
            (None, FormatMode::Check) => println!("would reformat {}", change.path.display()),
            (None, _) => {
                if !quiet {
                    println!("formatted {}", change.path.display());
                }
            }
        }
    }
    if !quiet {
        println!(
            "{} file(s) checked, {} need formatting",
            files_scanned,
            changes.len()
        );
    }
    Ok(exit_code)
}

fn handle_fold(engine: &Rainlint, args: DocumentArgs) -> Result<i32> {
    let text = read_document(&args.file)?;
    let ranges = engine.folding(&text);

    match args.format.unwrap_or(OutputFormatValue::Plain) {
        OutputFormatValue::Json => println!("{}", serde_json::to_string_pretty(&ranges)?),
        OutputFormatValue::Plain => {
            for range in &ranges {
                println!(
                    "{}-{} {}",
                    range.start_line + 1,
                    range.end_line + 1,
                    range.kind.as_str()
                );
            }
        }
    }
    Ok(0)
}

fn handle_colors(engine: &Rainlint, args: DocumentArgs) -> Result<i32> {
    let text = read_document(&args.file)?;
    let colors = engine.colors(&text);

    match args.format.unwrap_or(OutputFormatValue::Plain) {
        OutputFormatValue::Json => {
            let payload: Vec<_> = colors
                .iter()
                .map(|info| {
                    json!({
                        "range": info.range,
                        "color": info.color,
                        "notation": info.notation,
                        "presentation": color_presentation(info.color, info.notation),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormatValue::Plain => {
            for info in &colors {
                println!(
                    "{}:{}-{} {}",
                    info.range.start.line + 1,
                    info.range.start.character + 1,
                    info.range.end.character + 1,
                    engine.color_presentation(info.color, info.notation)
                );
            }
        }
    }
    Ok(0)
}

fn handle_complete(engine: &Rainlint, args: CompleteArgs) -> Result<i32> {
    let items = engine.completions(&args.line);

    match args.format.unwrap_or(OutputFormatValue::Plain) {
        OutputFormatValue::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormatValue::Plain => {
            for item in &items {
                match &item.documentation {
                    Some(doc) => println!("{}\t{}", item.label, doc),
                    None => println!("{}", item.label),
                }
            }
        }
    }
    Ok(if items.is_empty() { 1 } else { 0 })
}

fn handle_log(config: &Config, args: LogArgs) -> Result<i32> {
    let path = args.path.unwrap_or_else(|| config.log.resolved_path());

    if args.clear {
        clear_log(&path)?;
        println!("cleared {}", path.display());
        return Ok(0);
    }

    if args.follow {
        let format = args.format.unwrap_or(OutputFormatValue::Plain);
        let interval = Duration::from_millis(args.interval_ms);
        return follow_log(&path, args.limit, format, interval);
    }

    let view = read_log(&path)?;
    if let Some(notice) = view.notice() {
        eprintln!("{notice}");
    }
    match view {
        LogView::Missing { .. } => Ok(1),
        LogView::Empty { .. } => Ok(0),
        LogView::Entries(entries) => {
            let limit = args.limit.unwrap_or(entries.len());
            let shown = &entries[..limit.min(entries.len())];
            match args.format.unwrap_or(OutputFormatValue::Plain) {
                OutputFormatValue::Json => println!("{}", serde_json::to_string_pretty(shown)?),
                OutputFormatValue::Plain => {
                    for entry in shown {
                        println!("[{}] {}", entry.level.as_str(), entry.text);
                    }
                }
            }
            Ok(0)
        }
    }
}

fn follow_log(
    path: &Path,
    limit: Option<usize>,
    format: OutputFormatValue,
    interval: Duration,
) -> Result<i32> {
    let mut follower = LogFollower::new(path);
    debug!(path = %follower.path().display(), "following log");

    let existing = follower.poll()?;
    let skip = limit.map_or(0, |limit| existing.len().saturating_sub(limit));
    print_entries(&existing[skip..], format)?;

    loop {
        thread::sleep(interval);
        print_entries(&follower.poll()?, format)?;
    }
}

/// One line per entry; JSON output is one object per line.
fn print_entries(entries: &[LogEntry], format: OutputFormatValue) -> Result<()> {
    for entry in entries {
        match format {
            OutputFormatValue::Json => println!("{}", serde_json::to_string(entry)?),
            OutputFormatValue::Plain => println!("[{}] {}", entry.level.as_str(), entry.text),
        }
    }
    Ok(())
}

fn handle_settings(config: &Config, options: &LoadOptions, args: SettingsArgs) -> Result<i32> {
    let update = match args.action {
        SettingsAction::Show => {
            let refresh = &config.refresh;
            println!("refresh.executable = {}", refresh.executable.display());
            println!("refresh.auto_refresh_on_save = {}", refresh.auto_refresh_on_save);
            println!("refresh.mode = {}", refresh.mode);
            println!("log.path = {}", config.log.resolved_path().display());
            return Ok(0);
        }
        SettingsAction::ToggleAutoRefresh => {
            SettingUpdate::AutoRefreshOnSave(!config.refresh.auto_refresh_on_save)
        }
        SettingsAction::Set(SetSetting::Executable { path }) => {
            SettingUpdate::Executable(PathBuf::from(path.trim()))
        }
        SettingsAction::Set(SetSetting::AutoRefresh { enabled }) => {
            SettingUpdate::AutoRefreshOnSave(enabled)
        }
        SettingsAction::Set(SetSetting::Mode { mode }) => SettingUpdate::RefreshMode(match mode {
            RefreshModeValue::All => RefreshMode::All,
            RefreshModeValue::Specific => RefreshMode::Specific,
        }),
        SettingsAction::Set(SetSetting::LogPath { path }) => {
            let path = path.trim();
            if path.is_empty() {
                SettingUpdate::LogPath(PathBuf::new())
            } else {
                SettingUpdate::LogPath(absolute_from_cwd(Path::new(path))?)
            }
        }
    };

    let target = settings_path(options)?;
    let existing = match fs::read_to_string(&target) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", target.display()))
        }
    };
    let updated = apply_setting(&existing, &target, &update)?;
    atomic_write(&target, updated)
        .with_context(|| format!("failed to write {}", target.display()))?;
    debug!(path = %target.display(), "settings saved");

    println!("{}", update.describe());
    Ok(0)
}

fn absolute_from_cwd(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(path))
}

fn handle_refresh(config: &Config, args: RefreshArgs) -> Result<i32> {
    let engine = ProcessEngine::from_settings(&config.refresh);
    if !engine.is_running() {
        eprintln!(
            "warning: {} does not appear to be running",
            engine
                .executable()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
    }

    let result = match &args.target {
        Some(target) => engine.refresh_target(target),
        None => engine.refresh_all(),
    };
    match result {
        Ok(()) => {
            match &args.target {
                Some(target) => println!("Rainmeter skin \"{target}\" refreshed successfully!"),
                None => println!("Rainmeter skins refreshed successfully!"),
            }
            Ok(0)
        }
        Err(err) => {
            eprintln!("warning: {err}");
            Ok(2)
        }
    }
}

fn handle_on_save(rainlint: &Rainlint, args: OnSaveArgs) -> Result<i32> {
    let engine = ProcessEngine::from_settings(&rainlint.config().refresh);
    match rainlint.saved(&args.file, &engine) {
        Ok(RefreshOutcome::Skipped) => {
            println!("skipped");
            Ok(0)
        }
        Ok(RefreshOutcome::RefreshedAll) => {
            println!("Rainmeter skins refreshed successfully!");
            Ok(0)
        }
        Ok(RefreshOutcome::RefreshedTarget(config)) => {
            println!("Rainmeter skin \"{config}\" refreshed successfully!");
            Ok(0)
        }
        Err(err) => {
            eprintln!("warning: {err}");
            Ok(2)
        }
    }
}

fn read_document(path: &Path) -> Result<String> {
    read_source(path)
        .map(|source| source.text)
        .with_context(|| format!("failed to read {}", path.display()))
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Validator and tooling for Rainmeter skin files",
    propagate_version = true
)]
struct Cli {
    /// Use this configuration file instead of discovered ones
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate skin files
    Check(CheckArgs),
    /// Format skin files
    Fmt(FmtArgs),
    /// List folding ranges of a skin file
    Fold(DocumentArgs),
    /// List color literals of a skin file
    Colors(DocumentArgs),
    /// Suggest values for a `Key=` line
    Complete(CompleteArgs),
    /// Show the Rainmeter log, newest entry first
    Log(LogArgs),
    /// Ask Rainmeter to refresh all skins or one skin config
    Refresh(RefreshArgs),
    /// Run the auto-refresh-on-save hook for a file
    OnSave(OnSaveArgs),
    /// Show or change the persisted refresh and log settings
    Settings(SettingsArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Restrict checking to specific files or directories
    #[arg(long = "path", value_name = "PATH", action = ArgAction::Append)]
    path: Vec<PathBuf>,
    /// Select report format
    #[arg(long, value_enum)]
    format: Option<OutputFormatValue>,
}

#[derive(Args)]
struct FmtArgs {
    /// Restrict formatting to specific files or directories
    #[arg(long = "path", value_name = "PATH", action = ArgAction::Append)]
    path: Vec<PathBuf>,
    /// Report files that need formatting without modifying them
    #[arg(long, conflicts_with_all = ["diff", "write"])]
    check: bool,
    /// Print unified diffs instead of writing
    #[arg(long, conflicts_with_all = ["check", "write"])]
    diff: bool,
    /// Rewrite files in place (default)
    #[arg(long, conflicts_with_all = ["check", "diff"])]
    write: bool,
    /// Suppress the summary line
    #[arg(long)]
    quiet: bool,
}

#[derive(Args)]
struct DocumentArgs {
    /// Skin file to inspect
    #[arg(value_name = "FILE")]
    file: PathBuf,
    #[arg(long, value_enum)]
    format: Option<OutputFormatValue>,
}

#[derive(Args)]
struct CompleteArgs {
    /// Current line text, e.g. `FontWeight=`
    #[arg(value_name = "LINE", allow_hyphen_values = true)]
    line: String,
    #[arg(long, value_enum)]
    format: Option<OutputFormatValue>,
}

#[derive(Args)]
struct LogArgs {
    /// Log file (defaults to the configured or standard location)
    #[arg(long, value_name = "FILE")]
    path: Option<PathBuf>,
    /// Truncate the log instead of showing it
    #[arg(long, conflicts_with = "follow")]
    clear: bool,
    /// Show at most this many entries
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Keep printing entries as they are appended, oldest first
    #[arg(long, short = 'f')]
    follow: bool,
    /// Polling interval for --follow
    #[arg(long, value_name = "MS", default_value_t = 1000, requires = "follow")]
    interval_ms: u64,
    #[arg(long, value_enum)]
    format: Option<OutputFormatValue>,
}

#[derive(Args)]
struct RefreshArgs {
    /// Skin config to refresh, e.g. `Clock\Digital`; all skins when omitted
    #[arg(long, value_name = "CONFIG")]
    target: Option<String>,
}

#[derive(Args)]
struct OnSaveArgs {
    /// File that was saved
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Args)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings
    Show,
    /// Persist one setting to the config file
    #[command(subcommand)]
    Set(SetSetting),
    /// Flip auto refresh on save
    ToggleAutoRefresh,
}

#[derive(Subcommand)]
enum SetSetting {
    /// Path to Rainmeter.exe
    Executable {
        #[arg(value_name = "PATH", allow_hyphen_values = true)]
        path: String,
    },
    /// Refresh skins when a file is saved
    AutoRefresh {
        #[arg(value_name = "BOOL", action = ArgAction::Set)]
        enabled: bool,
    },
    /// Refresh every skin or only the saved file's config
    Mode {
        #[arg(value_enum)]
        mode: RefreshModeValue,
    },
    /// Custom Rainmeter.log location
    LogPath {
        #[arg(value_name = "PATH", allow_hyphen_values = true)]
        path: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RefreshModeValue {
    All,
    Specific,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatValue {
    Plain,
    Json,
}
