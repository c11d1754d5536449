use std::{
    io::Read,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use reelcut_core::{
    ClipPlan, Config, EmptyReason, Provider, ReelcutError, TimeRange, assemble_highlight, burn_in,
    default_config_path, ensure_source_subtitles, format_timestamp, load_srt, normalize,
    resubtitle, select_clips,
};

mod editor;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, ValueEnum)]
enum CliProvider {
    Openai,
    Ollama,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Openai => Provider::Openai,
            CliProvider::Ollama => Provider::Ollama,
        }
    }
}

#[derive(Parser)]
#[command(name = "reelcut")]
#[command(
    about = "Cut AI-selected highlights from a video and burn in re-synced subtitles"
)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the whole workflow on a video
    Run(RunArgs),
    /// Normalize a language-model reply and print the resulting clip list
    Plan(PlanArgs),
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Per-run overrides of config file values
#[derive(Args)]
struct Overrides {
    /// Seconds of padding added before and after each selected range
    #[arg(long)]
    buffer: Option<f64>,

    /// Clips shorter than this many seconds are dropped after merging
    #[arg(long)]
    min_duration: Option<f64>,

    /// Ranges closer than this many seconds are merged into one clip
    #[arg(long)]
    merge_gap: Option<f64>,

    /// Drop ranges whose timestamps fail to parse instead of reading them as 0
    #[arg(long)]
    strict_timestamps: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Source video
    video: PathBuf,

    /// AI provider used to select highlights
    #[arg(short, long)]
    provider: Option<CliProvider>,

    /// Directory for the merged video and subtitles
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Re-transcribe the source even if a subtitle file exists next to it
    #[arg(short, long)]
    force: bool,

    /// Skip opening the subtitles in $EDITOR
    #[arg(long)]
    no_edit: bool,

    /// Burn in subtitles without asking
    #[arg(short, long, conflicts_with = "no_burn")]
    yes: bool,

    /// Stop after writing the merged video and its subtitles
    #[arg(long)]
    no_burn: bool,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Args)]
struct PlanArgs {
    /// File holding the reply text; reads stdin when omitted or "-"
    input: Option<PathBuf>,

    /// Print the clip list as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(buffer) = self.buffer {
            config.buffer_time = buffer;
        }
        if let Some(min_duration) = self.min_duration {
            config.min_duration = min_duration;
        }
        if let Some(merge_gap) = self.merge_gap {
            config.merge_gap = merge_gap;
        }
        if self.strict_timestamps {
            config.skip_malformed_timestamps = true;
        }
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn done(msg: impl std::fmt::Display, started: Instant) -> String {
    format!(
        "{} {} {}",
        style("✓").green().bold(),
        msg,
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    )
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn total_duration(ranges: &[TimeRange]) -> f64 {
    ranges.iter().map(TimeRange::duration).sum()
}

fn empty_plan_hint(reason: &EmptyReason) -> &'static str {
    match reason {
        EmptyReason::NoMatchesFound => {
            "Check that the prompt template asks for HH:MM:SS.mmm - HH:MM:SS.mmm lines."
        }
        EmptyReason::EmptyAfterNormalization { .. } => {
            "Try a larger --buffer or a smaller --min-duration."
        }
    }
}

fn report_empty_plan(reason: EmptyReason, reply: &str) -> anyhow::Error {
    eprintln!(
        "{} {}",
        style("No clips:").yellow().bold(),
        style(empty_plan_hint(&reason)).dim()
    );
    eprintln!("{}\n{}", style("Reply was:").dim(), reply);
    ReelcutError::NoClips(reason).into()
}

async fn run(config: Config, args: RunArgs) -> Result<()> {
    if !args.video.is_file() {
        fail(format!("video not found: {}", args.video.display()));
    }

    println!(
        "\n{}  {}\n",
        style("reelcut").cyan().bold(),
        style("Highlight Cutter").dim()
    );
    let total_start = Instant::now();

    // Step 1: Source subtitles (reuse the sibling .srt when present)
    let step_start = Instant::now();
    let spinner = create_spinner("Checking subtitles...");
    let source = ensure_source_subtitles(&config, &args.video, args.force).await?;
    let origin = if source.generated {
        style("(transcribed)").yellow()
    } else {
        style("(existing)").dim()
    };
    spinner.finish_with_message(done(
        format!("Subtitles: {} cues {}", source.cues.len(), origin),
        step_start,
    ));

    // Step 2: Let the language model pick ranges
    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Selecting highlights with {}...",
        config.provider.name()
    ));
    let selection = select_clips(&config, &source.cues).await?;
    let ranges = match selection.plan {
        ClipPlan::Ready(ranges) => ranges,
        ClipPlan::Empty(reason) => {
            spinner.finish_and_clear();
            return Err(report_empty_plan(reason, &selection.reply));
        }
    };
    spinner.finish_with_message(done(
        format!(
            "Selected {} clips, {:.1}s total ({})",
            ranges.len(),
            total_duration(&ranges),
            config.provider.name()
        ),
        step_start,
    ));

    // Step 3: Cut and concatenate
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Cutting {} clips...", ranges.len()));
    let merged_video = assemble_highlight(&config, &args.video, &ranges).await?;
    spinner.finish_with_message(done(
        format!("Merged: {}", style(merged_video.display()).dim()),
        step_start,
    ));

    // Step 4: Fresh subtitles for the merged video
    let step_start = Instant::now();
    let spinner = create_spinner("Transcribing highlight...");
    let subtitle_path = resubtitle(&config, &merged_video).await?;
    spinner.finish_with_message(done(
        format!("Subtitles: {}", style(subtitle_path.display()).dim()),
        step_start,
    ));

    // Step 5: Human-in-the-loop edit
    if !args.no_edit {
        println!(
            "{} Opening subtitles in {}...",
            style("✎").cyan().bold(),
            editor::editor_command()
        );
        editor::edit_file(&subtitle_path).await?;
        let cues = load_srt(&subtitle_path).await?;
        println!("{} Edited: {} cues", style("✓").green().bold(), cues.len());
    }

    if args.no_burn {
        print_saved(&[merged_video.as_path(), subtitle_path.as_path()]);
        return Ok(());
    }

    // Step 6: Burn in
    if !args.yes
        && !editor::confirm("Burn the subtitles into the video? This re-encodes the video.")?
    {
        println!("{} Burn-in skipped", style("–").dim());
        print_saved(&[merged_video.as_path(), subtitle_path.as_path()]);
        return Ok(());
    }

    let step_start = Instant::now();
    let spinner = create_spinner("Burning in subtitles...");
    let final_video = burn_in(&config, &merged_video, &subtitle_path).await?;
    spinner.finish_with_message(done("Subtitles burned in", step_start));

    println!(
        "\n{} {}",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    print_saved(&[final_video.as_path(), subtitle_path.as_path()]);
    Ok(())
}

fn print_saved(paths: &[&Path]) {
    for path in paths {
        println!("{} {}", style("Saved:").dim(), style(path.display()).cyan());
    }
}

fn read_reply(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut reply = String::new();
            std::io::stdin()
                .read_to_string(&mut reply)
                .context("failed to read stdin")?;
            Ok(reply)
        }
    }
}

fn plan(config: Config, args: PlanArgs) -> Result<()> {
    let reply = read_reply(args.input.as_deref())?;
    let ranges = match normalize(&reply, &config.range_params()) {
        ClipPlan::Ready(ranges) => ranges,
        ClipPlan::Empty(reason) => {
            eprintln!(
                "{} {}",
                style("No clips:").yellow().bold(),
                style(empty_plan_hint(&reason)).dim()
            );
            return Err(ReelcutError::NoClips(reason).into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranges)?);
        return Ok(());
    }

    for (i, range) in ranges.iter().enumerate() {
        println!(
            "{:>3}  {} - {}  {}",
            i,
            format_timestamp(range.start()),
            format_timestamp(range.end()),
            style(format!("{:.3}s", range.duration())).dim()
        );
    }
    println!(
        "{}",
        style(format!(
            "{} clips, {:.3}s total",
            ranges.len(),
            total_duration(&ranges)
        ))
        .dim()
    );
    Ok(())
}

async fn config_command(config: Config, path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut shown = config;
            if !shown.openai_api_key.is_empty() {
                shown.openai_api_key = "********".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                fail(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            Config::default().save(path).await?;
            println!("{} {}", style("Saved:").dim(), style(path.display()).cyan());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path).await?;

    match cli.command {
        Command::Run(args) => {
            args.overrides.apply(&mut config);
            if let Some(provider) = args.provider.clone() {
                config.provider = provider.into();
            }
            if let Some(output_dir) = &args.output_dir {
                config.output_dir = output_dir.clone();
            }

            // Validate early, before any transcription or API call
            if let Err(e) = config.validate() {
                fail(e);
            }
            run(config, args).await
        }
        Command::Plan(args) => {
            args.overrides.apply(&mut config);
            plan(config, args)
        }
        Command::Config { action } => config_command(config, &config_path, action).await,
    }
}
