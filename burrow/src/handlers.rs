use anyhow::{Context, Result, anyhow};
use burrow_core::report::save_report;
use burrow_core::{
    CancelToken, FilterMode, ProgressCallback, ReportFormat, ResumeState, ScanConfig, ScanEvent,
    ScanMode, ScanOutcome, ScanPlan, ScanStats, Scheduler, ShowField, load_config, render,
};
use burrow_scanner::HttpRequester;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_STATE_FILE: &str = "burrow-state.json";

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
/// Conventional exit status for a process stopped by SIGINT
pub const EXIT_INTERRUPTED: i32 = 130;

/// Where and how the final report goes
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

#[derive(Debug)]
pub enum RunSummary {
    Completed {
        stats: ScanStats,
        discovered: usize,
        report: String,
    },
    Interrupted {
        stats: ScanStats,
        depth: usize,
        state_file: Option<PathBuf>,
    },
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunSummary::Completed { .. } => EXIT_OK,
            RunSummary::Interrupted { .. } => EXIT_INTERRUPTED,
        }
    }
}

pub fn print_banner() {
    println!(
        "{} {}",
        "burrow".bright_green().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}\n", "depth-synchronized content discovery".dimmed());
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let default_level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when running under a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

pub fn output_options(matches: &ArgMatches, quiet: bool) -> Result<OutputOptions> {
    let format_name = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("tree");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;

    Ok(OutputOptions {
        format,
        output: matches.get_one::<PathBuf>("output").map(|p| expand_path(p)),
        quiet,
    })
}

/// Merges the optional TOML config with command-line flags. Flags win; list
/// flags replace the corresponding list from the file.
pub fn build_config(matches: &ArgMatches) -> Result<ScanConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            let path = expand_path(path);
            load_config(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => ScanConfig::default(),
    };

    if let Some(url) = matches.get_one::<String>("url") {
        config.url = url.clone();
    }
    if let Some(paths) = matches.get_many::<PathBuf>("wordlist") {
        config.wordlists = paths.cloned().collect();
    }
    config.wordlists = config.wordlists.iter().map(|p| expand_path(p)).collect();

    if let Some(depth) = matches.get_one::<usize>("depth") {
        config.max_depth = *depth;
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = *threads;
    }
    if let Some(throttle) = matches.get_one::<u32>("throttle") {
        config.throttle = *throttle;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.timeout_secs = *timeout;
    }
    if let Some(grace) = matches.get_one::<u64>("grace-period") {
        config.grace_period_ms = *grace;
    }

    if let Some(filters) = matches.get_many::<String>("filter") {
        config.filters = filters.cloned().collect();
    }
    if matches.get_flag("or") {
        config.filter_mode = FilterMode::Or;
    }
    if let Some(filters) = matches.get_many::<String>("wordlist-filter") {
        config.wordlist_filters = filters.cloned().collect();
    }
    if let Some(transforms) = matches.get_many::<String>("transform") {
        config.transforms = transforms.cloned().collect();
    }
    config.unique |= matches.get_flag("unique");

    if let Some(placeholder) = matches.get_one::<String>("placeholder") {
        config.placeholder = placeholder.clone();
    }
    config.permutations |= matches.get_flag("permutations");
    if let Some(mode) = matches.get_one::<String>("mode") {
        config.mode =
            ScanMode::from_str(mode).ok_or_else(|| anyhow!("Unknown scan mode '{}'", mode))?;
    }

    if let Some(fields) = matches.get_many::<String>("show") {
        config.show = fields
            .map(|f| ShowField::from_str(f).ok_or_else(|| anyhow!("Unknown show field '{}'", f)))
            .collect::<Result<_>>()?;
    }

    if let Some(headers) = matches.get_many::<String>("header") {
        config.headers = headers.cloned().collect();
    }
    if let Some(agent) = matches.get_one::<String>("user-agent") {
        config.user_agent = Some(agent.clone());
    }
    config.follow_redirects |= matches.get_flag("follow-redirects");

    let state_file = matches
        .get_one::<PathBuf>("state-file")
        .cloned()
        .or(config.state_file.take())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));
    config.state_file = Some(expand_path(&state_file));

    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

/// Runs a compiled plan to completion or interruption. Ctrl-C cancels the
/// scan; in-flight requests get the configured grace period.
pub async fn execute(
    plan: ScanPlan,
    resume: Option<ResumeState>,
    options: &OutputOptions,
) -> Result<RunSummary> {
    let requester = HttpRequester::new(plan.request_options()?)?;
    let show = plan.config.show.clone();
    let state_file = plan.config.state_file.clone();

    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight requests");
            signal_token.cancel();
        }
    });

    let mut scheduler = Scheduler::new(plan, Arc::new(requester)).with_cancel_token(cancel);

    let pb = (!options.quiet).then(progress_bar);
    if let Some(pb) = pb.clone() {
        let callback: ProgressCallback = Arc::new(move |event: ScanEvent| match event {
            ScanEvent::LevelStarted { depth, units } => {
                pb.set_length(units as u64);
                pb.set_position(0);
                pb.set_message(format!("depth {}", depth));
            }
            ScanEvent::UnitCompleted { url, status, kept } => {
                pb.inc(1);
                if kept && let Some(status) = status {
                    pb.println(format!("{} {}", format!("[{}]", status).green(), url));
                }
            }
            ScanEvent::State(_) => {}
        });
        scheduler = scheduler.with_progress_callback(callback);
    }

    let outcome = match resume {
        Some(state) => scheduler.resume(state).await,
        None => scheduler.run().await,
    };
    signal_task.abort();
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    match outcome? {
        ScanOutcome::Completed { tree, stats } => {
            let report = render(&tree, options.format, &show)?;
            if let Some(path) = &options.output {
                save_report(&report, path)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
            }
            Ok(RunSummary::Completed {
                stats,
                discovered: tree.discovered().count(),
                report,
            })
        }
        ScanOutcome::Interrupted { state, stats } => Ok(RunSummary::Interrupted {
            stats,
            depth: state.depth,
            state_file,
        }),
    }
}

fn print_summary(summary: &RunSummary, options: &OutputOptions) {
    match summary {
        RunSummary::Completed {
            stats,
            discovered,
            report,
        } => {
            match &options.output {
                Some(path) if !options.quiet => {
                    println!("Report written to {}", path.display());
                }
                Some(_) => {}
                None => print!("{}", report),
            }
            if !options.quiet {
                println!(
                    "\n{} {} discovered, {} request(s), {} failed",
                    "✓ Scan complete:".green(),
                    discovered,
                    stats.requests,
                    stats.failed
                );
            }
        }
        RunSummary::Interrupted {
            stats,
            depth,
            state_file,
        } => {
            eprintln!(
                "\n{} at depth {} after {} request(s)",
                "⚠ Scan interrupted".yellow(),
                depth,
                stats.requests
            );
            if let Some(path) = state_file {
                eprintln!("Resume with: burrow resume --state {}", path.display());
            }
        }
    }
}

pub async fn handle_scan(sub_matches: &ArgMatches, quiet: bool) -> Result<i32> {
    let config = build_config(sub_matches)?;
    let options = output_options(sub_matches, quiet)?;
    let plan = ScanPlan::from_config(config)?;

    if !quiet {
        println!(
            "Scanning {} ({} strategy)",
            plan.config.url.bold(),
            plan.strategy.name()
        );
        println!(
            "Words: {}  Candidates: {}  Workers: {}  Depth: {}\n",
            plan.words.len(),
            plan.candidates.len(),
            plan.threads(),
            plan.strategy.levels()
        );
    }

    let summary = execute(plan, None, &options).await?;
    print_summary(&summary, &options);
    Ok(summary.exit_code())
}

pub async fn handle_resume(sub_matches: &ArgMatches, quiet: bool) -> Result<i32> {
    let path = sub_matches
        .get_one::<PathBuf>("state")
        .map(|p| expand_path(p))
        .ok_or_else(|| anyhow!("--state is required"))?;
    let options = output_options(sub_matches, quiet)?;

    let state = ResumeState::load(&path)?;
    let plan = ScanPlan::compile(state.config.clone(), state.words.clone())?;

    if !quiet {
        println!(
            "Resuming {} at depth {} from {}\n",
            plan.config.url.bold(),
            state.depth,
            path.display()
        );
    }

    let summary = execute(plan, Some(state), &options).await?;
    print_summary(&summary, &options);
    Ok(summary.exit_code())
}

pub fn report_error(err: &anyhow::Error) -> i32 {
    eprintln!("{} {:#}", "✗".red(), err);
    EXIT_ERROR
}
