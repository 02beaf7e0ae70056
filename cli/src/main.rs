use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use reactbench_core::{
    BenchError, CandidateRegistry, HaltPolicy, RunConfig, TimingConfig, extract,
    report::{RunReport, SuiteOutcome, TrialResult},
    rt::Runtime,
    scenario::{self, Scenario},
    scheduler::Scheduler,
    suite::SuiteObserver,
};

static LOG_INIT: Once = Once::new();
const DEFAULT_LOG_FILTER: &str = "reactbench_core=warn,reactbench_engines=warn";


#[derive(Debug, Parser)]
#[command(
    name = "reactbench",
    author,
    version,
    about = "Compare update latency of reactive state engines",
    long_about = None
)]
struct CliArgs {
    /// `list` or `summarize FILE`; runs the benchmarks when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// Scenario key to run; repeat to run several, in the given order
    #[arg(long = "scenario", short = 's', value_name = "KEY")]
    scenarios: Vec<String>,

    /// Candidate engine to include; repeat to compare a subset
    #[arg(long = "candidate", short = 'c', value_name = "NAME")]
    candidates: Vec<String>,

    /// Keep running the remaining suites after one errors
    #[arg(long)]
    keep_going: bool,

    /// Short measurement windows for smoke runs
    #[arg(long)]
    quick: bool,

    /// Measured time per candidate before sampling may stop
    #[arg(long, value_name = "MS")]
    max_time_ms: Option<u64>,

    /// How long a single async trial may take to settle
    #[arg(long, value_name = "MS")]
    trial_timeout_ms: Option<u64>,

    /// Also write the run report as JSON
    #[arg(long, value_name = "FILE", value_parser = parse_file_arg)]
    json: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the scenario catalog and the registered candidates.
    List,
    /// Print the winners of every suite found in a saved run log.
    Summarize {
        #[arg(value_name = "FILE", value_parser = parse_file_arg)]
        file: PathBuf,
    },
}

/// Reject report and log paths that climb out of the working tree.
fn checked_file_arg(raw: &str) -> anyhow::Result<PathBuf> {
    let path = Path::new(raw);
    if path.components().any(|c| c == Component::ParentDir) {
        anyhow::bail!("'{}': report and log paths may not contain '..'", raw);
    }
    Ok(path.to_path_buf())
}

fn parse_file_arg(raw: &str) -> Result<PathBuf, String> {
    checked_file_arg(raw).map_err(|e| e.to_string())
}

fn init_logging() {
    LOG_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = std::env::var("REACTBENCH_LOG")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_LOG_FILTER),
        };

        let _ = builder.try_init();
    });
}

impl RunArgs {
    fn to_config(&self) -> RunConfig {
        let mut timing = if self.quick {
            TimingConfig::quick()
        } else {
            TimingConfig::default()
        };
        if let Some(ms) = self.max_time_ms {
            timing = timing.with_max_time(Duration::from_millis(ms));
        }
        if let Some(ms) = self.trial_timeout_ms {
            timing = timing.with_trial_timeout(Duration::from_millis(ms));
        }
        RunConfig {
            timing,
            policy: if self.keep_going {
                HaltPolicy::Continue
            } else {
                HaltPolicy::Halt
            },
            scenarios: self.scenarios.clone(),
            candidates: self.candidates.clone(),
        }
    }
}

/// Prints suite progress as plain text lines.
struct ConsoleReporter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> ConsoleReporter<W> {
    fn new(out: W) -> Self {
        Self { out, error: None }
    }

    fn line(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", text) {
            self.error = Some(e);
        }
    }

    /// Flush and surface the first write error, if any.
    fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> SuiteObserver for ConsoleReporter<W> {
    fn on_start(&mut self, scenario: &Scenario) {
        self.line(&format!("# {}: {}", scenario.key(), scenario.title()));
    }

    fn on_cycle(&mut self, _scenario: &Scenario, result: &TrialResult) {
        self.line(&result.cycle_line());
    }

    fn on_complete(&mut self, outcome: &SuiteOutcome) {
        self.line(&outcome.summary());
        for result in &outcome.results {
            let c = result.counters;
            self.line(&format!(
                "counters {}: creates={} reads={} reactions={} last={}",
                result.candidate, c.creates, c.reads, c.reactions, c.last_observed
            ));
        }
        self.line("");
    }
}

fn list<W: Write>(out: &mut W, registry: &CandidateRegistry) -> io::Result<()> {
    writeln!(out, "scenarios:")?;
    for scenario in scenario::catalog() {
        writeln!(out, "  {:<28} {:<6} {}", scenario.key(), scenario.kind().to_string(), scenario.title())?;
    }
    writeln!(out, "candidates:")?;
    for engine in registry.all() {
        let traits = engine.traits();
        writeln!(
            out,
            "  {:<8} runs-on-subscribe={:<3} batches={:<3} {}",
            engine.name(),
            yes_no(traits.runs_on_subscribe),
            yes_no(traits.batches),
            engine.description()
        )?;
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Pair every `# key: title` header in a run log with the winners printed
/// for that suite. Errored suites have no winner line and are left out.
fn summarize(log: &str) -> Result<Vec<(String, Vec<String>)>, BenchError> {
    // Fails with a parse error when the log has no winner line at all.
    extract::extract(log)?;

    let mut current: Option<String> = None;
    let mut rows = Vec::new();
    for line in log.lines() {
        if let Some(header) = line.strip_prefix("# ") {
            let key = header.split_once(':').map_or(header, |(key, _)| key);
            current = Some(key.trim().to_string());
        } else if line.contains("Fastest is [") {
            let winners = extract::extract(line)?;
            let key = current.take().unwrap_or_else(|| "-".to_string());
            rows.push((key, winners));
        }
    }
    Ok(rows)
}

fn run<W: Write>(args: &RunArgs, out: W) -> anyhow::Result<(RunReport, W)> {
    let registry = reactbench_engines::default_registry()?;
    let config = args.to_config();
    let mut scheduler = Scheduler::from_config(&config, &registry)?;
    let runtime = Runtime::new()?;

    let mut reporter = ConsoleReporter::new(out);
    let report = runtime.run(&mut scheduler, &mut reporter);
    let mut out = reporter.finish().context("write suite output")?;

    if !report.skipped.is_empty() {
        writeln!(out, "Skipped: {}", report.skipped.join(", "))?;
    }
    if let Some(path) = &args.json {
        report.write_json(path)?;
    }
    Ok((report, out))
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let CliArgs { command, run: run_args } = CliArgs::parse();

    match command {
        Some(Commands::List) => {
            let registry = reactbench_engines::default_registry()?;
            list(&mut io::stdout().lock(), &registry)?;
        }
        Some(Commands::Summarize { file }) => {
            let log = fs::read_to_string(&file).with_context(|| format!("Failed to read '{}'", file.display()))?;
            match summarize(&log) {
                Ok(rows) => {
                    let mut out = io::stdout().lock();
                    for (key, winners) in rows {
                        writeln!(out, "{}: {}", key, winners.join(", "))?;
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            let (report, _) = run(&run_args, io::stdout().lock())?;
            if !report.is_success() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
