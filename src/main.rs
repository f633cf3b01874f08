use chrono::{DateTime, NaiveDateTime};
use clap::{Parser, Subcommand};
use scanroll::config::{self, RunConfig};
use scanroll::convention::Convention;
use scanroll::imaging::RustBackend;
use scanroll::metadata::{ExifTool, MetadataWriter};
use scanroll::process::{self, ProcessOptions};
use scanroll::reindex::FrameOrder;
use scanroll::timeline::TimestampCursor;
use scanroll::{output, plan};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code when some candidates were skipped or failed.
const EXIT_INCOMPLETE: u8 = 1;
/// Exit code for a run-fatal error (nothing or only part of the run applied).
const EXIT_FATAL: u8 = 2;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "scanroll")]
#[command(about = "Canonical names and capture timestamps for film-scanner exports")]
#[command(long_about = "\
Canonical names and capture timestamps for film-scanner exports

Every recognized frame is renamed to R<roll>F<frame> and tagged with a
strictly increasing EXIF capture time, so photo managers show each roll in
scan order.

Source layouts:

  directory (a):
    scans/
    └── Customer001234/            # <order><6-digit roll>
        ├── 000001.jpg             # 6-digit frame counter
        └── 000002.jpg
    → Customer001234/R1234F1.jpg, R1234F2.jpg

  filename (b):
    scans/
    └── Smith_001234/              # <customer>_<6-digit order>
        ├── R1-00131-0001.JPG      # R1-<5-digit roll>-<frame label>
        └── R1-00131-0002.JPG
    → Smith_001234/R131F01.JPG, R131F02.JPG

With --reorg, rolls move to <order>/<YYYYMMDD>/<roll>/ under the source.

Run 'scanroll plan' first to see what would happen.
Run 'scanroll gen-config' to generate a documented scanroll.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding the scanner export
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override `scanroll.toml`.
#[derive(clap::Args, Clone, Default)]
struct Overrides {
    /// Source layout
    #[arg(long, value_enum, global = true)]
    convention: Option<Convention>,

    /// First capture timestamp, e.g. 2024-03-15T14:30:00 (default: now)
    #[arg(long, value_parser = parse_start, global = true)]
    start: Option<NaiveDateTime>,

    /// Milliseconds between consecutive frames
    #[arg(long, global = true)]
    step_ms: Option<u32>,

    /// Move rolls into <order>/<date>/<roll>/ under the source
    #[arg(long, global = true)]
    reorg: bool,

    /// What decides frame numbers within a roll
    #[arg(long, value_enum, global = true)]
    frame_order: Option<FrameOrder>,

    /// Minimum digits for roll numbers in output names
    #[arg(long, global = true)]
    roll_padding: Option<usize>,

    /// Minimum digits for frame numbers in output names
    #[arg(long, global = true)]
    frame_padding: Option<usize>,

    /// Scanner make written to EXIF:Make
    #[arg(long, global = true)]
    make: Option<String>,

    /// Scanner model written to EXIF:Model
    #[arg(long, global = true)]
    model: Option<String>,

    /// Skip writing capture metadata
    #[arg(long, global = true)]
    no_tags: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show the planned renames and timestamps without touching any file
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert, tag, and rename every recognized frame
    Run,
    /// Print a stock scanroll.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let source = cli.source;
    let mut run_config = config::load_config(&source)?;
    apply_overrides(&mut run_config, &cli.overrides);
    run_config.validate()?;

    let mut cursor = match cli.overrides.start {
        Some(start) => TimestampCursor::new(start, run_config.timeline.step_ms)?,
        None => TimestampCursor::starting_now(run_config.timeline.step_ms)?,
    };
    let options = run_config.plan_options(&source);
    let outcome = plan::plan_directory(&source, &options, &mut cursor)?;

    match cli.command {
        Command::Plan { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.plan)?);
            } else {
                output::print_plan(&outcome.plan, &outcome.skipped, &source);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run => {
            for line in output::format_skipped(&outcome.skipped, &source) {
                println!("{}", line);
            }

            init_thread_pool(&run_config.processing);
            let exiftool = run_config
                .tags
                .enabled
                .then(|| ExifTool::new(run_config.tags.tool.clone()));
            let writer = exiftool.as_ref().map(|w| w as &dyn MetadataWriter);
            let process_options = ProcessOptions {
                tags: run_config.tag_options(),
                prune_empty_under: run_config.reorg.then(|| source.clone()),
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer_root = source.clone();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event, &printer_root) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::process(
                &outcome.plan,
                &process_options,
                &RustBackend::new(),
                writer,
                Some(tx),
            );
            printer.join().ok();
            let result = result?;

            output::print_summary(&result, outcome.skipped.len());
            Ok(ExitCode::from(run_status(
                outcome.skipped.len(),
                result.failures.len(),
            )))
        }
        Command::GenConfig => Ok(ExitCode::SUCCESS),
    }
}

/// A run is only clean when every candidate file was renamed.
fn run_status(skipped: usize, failed: usize) -> u8 {
    if skipped > 0 || failed > 0 {
        EXIT_INCOMPLETE
    } else {
        0
    }
}

/// Command-line flags win over `scanroll.toml`.
fn apply_overrides(run_config: &mut RunConfig, overrides: &Overrides) {
    if let Some(convention) = overrides.convention {
        run_config.convention = convention;
    }
    if overrides.reorg {
        run_config.reorg = true;
    }
    if let Some(step_ms) = overrides.step_ms {
        run_config.timeline.step_ms = step_ms;
    }
    let active = run_config.active_mut();
    if let Some(frame_order) = overrides.frame_order {
        active.frame_order = frame_order;
    }
    if let Some(roll_padding) = overrides.roll_padding {
        active.roll_padding = roll_padding;
    }
    if let Some(frame_padding) = overrides.frame_padding {
        active.frame_padding = frame_padding;
    }
    if let Some(make) = &overrides.make {
        run_config.tags.make = Some(make.clone());
    }
    if let Some(model) = &overrides.model {
        run_config.tags.model = Some(model.clone());
    }
    if overrides.no_tags {
        run_config.tags.enabled = false;
    }
}

/// Accepts RFC 3339 (offset dropped, wall-clock kept) or
/// `YYYY-MM-DDTHH:MM:SS[.fff]`, with `T` or a space.
fn parse_start(value: &str) -> Result<NaiveDateTime, String> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok(with_offset.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM:SS[.fff], got '{value}'"))
}

/// Diagnostics go to stderr so `plan --json` stays machine-readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "scanroll=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_formats() {
        let t = parse_start("2024-03-15T14:30:00").unwrap();
        assert_eq!(t.to_string(), "2024-03-15 14:30:00");
        let t = parse_start("2024-03-15 14:30:00.250").unwrap();
        assert_eq!(t.to_string(), "2024-03-15 14:30:00.250");
        let t = parse_start("2024-03-15T14:30:00+01:00").unwrap();
        assert_eq!(t.to_string(), "2024-03-15 14:30:00");
        assert!(parse_start("15/03/2024").is_err());
    }

    #[test]
    fn skips_and_failures_make_run_incomplete() {
        assert_eq!(run_status(0, 0), 0);
        assert_eq!(run_status(1, 0), EXIT_INCOMPLETE);
        assert_eq!(run_status(0, 3), EXIT_INCOMPLETE);
        assert_eq!(run_status(2, 1), EXIT_INCOMPLETE);
    }

    #[test]
    fn overrides_target_active_convention() {
        let mut run_config = RunConfig::default();
        let overrides = Overrides {
            convention: Some(Convention::Filename),
            frame_padding: Some(3),
            model: Some("SP-3000".into()),
            no_tags: true,
            ..Overrides::default()
        };
        apply_overrides(&mut run_config, &overrides);
        assert_eq!(run_config.convention, Convention::Filename);
        assert_eq!(run_config.filename.frame_padding, 3);
        assert_eq!(run_config.directory.frame_padding, 1);
        assert_eq!(run_config.tags.model.as_deref(), Some("SP-3000"));
        assert!(!run_config.tags.enabled);
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from([
            "scanroll",
            "--source",
            "/scans",
            "--convention",
            "b",
            "--start",
            "2024-03-15T14:30:00",
            "plan",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.source, PathBuf::from("/scans"));
        assert_eq!(cli.overrides.convention, Some(Convention::Filename));
        assert!(matches!(cli.command, Command::Plan { json: true }));
    }
}
