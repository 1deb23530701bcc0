use std::path::PathBuf;

use clap::Args;

/// Project code charged for every submission.
pub const DEFAULT_PROJECT_CODE: &str = "04048";

/// Queue value meaning "no special resource request".
pub const DEFAULT_QUEUE: &str = "default";

/// Site-wide submission settings, shared by every job of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    pub project_code: String,
    pub submit_program: String,
    pub parallel_env: String,
    /// Directory submissions are made from and relative output paths resolve against.
    pub workdir: PathBuf,
}

impl GridConfig {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            project_code: DEFAULT_PROJECT_CODE.to_string(),
            submit_program: "qsub".to_string(),
            parallel_env: "threaded".to_string(),
            workdir: workdir.into(),
        }
    }
}

/// Resource options accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GridOpts {
    /// Resource request passed to the scheduler, e.g. "himem".
    #[arg(short = 'l', long, default_value = DEFAULT_QUEUE)]
    pub queue: String,

    /// Request a parallel environment with this many slots.
    #[arg(short = 't', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub threaded: Option<u32>,
}

impl Default for GridOpts {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            threaded: None,
        }
    }
}
