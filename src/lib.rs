pub mod array;
pub mod batch;
pub mod config;
pub mod error;
pub mod job;
pub mod launcher;
pub mod local;
pub mod response;
pub mod scheduler;
pub mod template;

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{info, warn};

pub use batch::{BatchSummary, JobBatch};
pub use config::{GridConfig, GridOpts};
pub use error::{Error, Result};
pub use job::{ArraySize, JobId, JobSpec, LaunchedJob};
pub use launcher::{JobRecorder, Launcher, ProcessSubmitter, Submitter, TracingRecorder};
pub use scheduler::{GridEngine, Scheduler};
pub use template::{InputSource, Template};

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit shell commands to a grid engine or run them locally")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project code charged for each submission.
    #[arg(long, global = true, env = "GRIDRUN_PROJECT_CODE", default_value = config::DEFAULT_PROJECT_CODE)]
    pub project_code: String,

    /// Program used to submit jobs.
    #[arg(long, global = true, env = "GRIDRUN_SUBMIT_PROGRAM", default_value = "qsub")]
    pub submit_program: String,

    /// Parallel environment used for threaded jobs.
    #[arg(long, global = true, env = "GRIDRUN_PARALLEL_ENV", default_value = "threaded")]
    pub parallel_env: String,

    /// Directory to submit from; defaults to the current directory.
    #[arg(long, global = true, env = "GRIDRUN_WORKDIR")]
    pub workdir: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command template on the grid, once per input.
    ///
    /// Inputs follow `:::` on the command line or are read from stdin, one
    /// per line. Placeholders: {} input, {.} without extension, {_} first
    /// part, {/} basename, {/.} basename without extension, {/_} basename
    /// first part, {#} sequence number. Quote a template containing `>` to
    /// redirect each job's output, e.g. `gridrun run "zcat {} > {.}" ::: *.gz`.
    Run(RunArgs),

    /// Run a file of commands, one per line, as an array job.
    #[command(arg_required_else_help = true)]
    Array(ArrayArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub grid: GridOpts,

    /// Run the commands as local processes instead of submitting them.
    #[arg(long)]
    pub local: bool,

    /// Print what would be submitted without running the submit command.
    #[arg(long)]
    pub dry_run: bool,

    /// Command template, optionally followed by `:::` and its inputs.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ArrayArgs {
    #[command(flatten)]
    pub grid: GridOpts,

    /// Print what would be submitted without running the submit command.
    #[arg(long)]
    pub dry_run: bool,

    /// File with one command per line.
    pub commands: PathBuf,
}

impl Cli {
    pub fn grid_config(&self) -> Result<GridConfig> {
        let workdir = match &self.workdir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(GridConfig {
            project_code: self.project_code.clone(),
            submit_program: self.submit_program.clone(),
            parallel_env: self.parallel_env.clone(),
            workdir,
        })
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = cli.grid_config()?;
    match cli.command {
        Commands::Run(args) => run_templated(args, &config),
        Commands::Array(args) => run_array(args, &config),
    }
}

fn run_templated(args: RunArgs, config: &GridConfig) -> Result<()> {
    let (template, source) = InputSource::from_args(&args.args);
    let tokens = source.tokens(io::stdin().lock())?;
    let expansions: Vec<_> = template.expand_all(&tokens).collect();

    if args.local {
        if expansions.is_empty() {
            return Err(Error::EmptyBatch);
        }
        for flag in ignored_locally(&args.grid) {
            warn!("{} has no effect with --local", flag);
        }
        info!("running {} command(s) locally", expansions.len());
        local::LocalGroup::from_expansions(expansions, &config.workdir)?.run()?;
        return Ok(());
    }

    let specs = expansions
        .into_iter()
        .map(|e| e.into_spec(&args.grid))
        .collect();
    let batch = JobBatch::new(specs, &config.workdir)?;
    submit(batch, config, args.dry_run)
}

/// Scheduler resource flags that a local run cannot honor.
fn ignored_locally(opts: &GridOpts) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if opts.queue != config::DEFAULT_QUEUE {
        flags.push("--queue");
    }
    if opts.threaded.is_some() {
        flags.push("--threaded");
    }
    flags
}

fn run_array(args: ArrayArgs, config: &GridConfig) -> Result<()> {
    let spec = array::prepare(&args.commands, &args.grid, &config.workdir)?;
    submit(JobBatch::new(vec![spec], &config.workdir)?, config, args.dry_run)
}

fn submit(batch: JobBatch, config: &GridConfig, dry_run: bool) -> Result<()> {
    let engine = GridEngine::new(config);

    if dry_run {
        for spec in batch.specs() {
            println!("[dry-run] {}", engine.submission_line(spec));
        }
        return Ok(());
    }

    batch
        .submit(&engine, &ProcessSubmitter, &TracingRecorder)
        .into_result()
        .map(|_| ())
}
