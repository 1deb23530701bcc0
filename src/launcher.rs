//! Submitting a single job and recording what was launched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::job::{JobSpec, LaunchedJob};
use crate::scheduler::Scheduler;

/// Runs a rendered submission line and hands back its stdout.
pub trait Submitter {
    fn submit(&self, line: &str, workdir: &Path) -> Result<String>;
}

/// Executes the submission tool as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSubmitter;

impl Submitter for ProcessSubmitter {
    fn submit(&self, line: &str, workdir: &Path) -> Result<String> {
        let parts = shlex::split(line).ok_or_else(|| Error::Unsplittable(line.to_string()))?;
        let (program, args) = parts.split_first().ok_or(Error::EmptySubmission)?;

        let output = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .output()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "{} failed: {}", program, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Receives one record per launched job.
pub trait JobRecorder {
    fn record(&self, job: &LaunchedJob);
}

/// Emits launched jobs as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl JobRecorder for TracingRecorder {
    fn record(&self, job: &LaunchedJob) {
        if job.id.is_assigned() {
            info!(job_id = %job.id, "{}", job.summary());
        } else {
            warn!(job_id = %job.id, "no job id returned: {}", job.summary());
        }
    }
}

/// Turns job specs into launched jobs.
pub struct Launcher<'a> {
    scheduler: &'a dyn Scheduler,
    submitter: &'a dyn Submitter,
    recorder: &'a dyn JobRecorder,
    workdir: &'a Path,
}

impl<'a> Launcher<'a> {
    pub fn new(
        scheduler: &'a dyn Scheduler,
        submitter: &'a dyn Submitter,
        recorder: &'a dyn JobRecorder,
        workdir: &'a Path,
    ) -> Self {
        Self {
            scheduler,
            submitter,
            recorder,
            workdir,
        }
    }

    /// Blocks until the submission tool returns, not until the job finishes.
    pub fn launch(&self, spec: JobSpec) -> Result<LaunchedJob> {
        let line = self.scheduler.submission_line(&spec);
        debug!("submitting: {}", line);

        let mut stale: Vec<&str> = Vec::new();
        for path in [&spec.output_file, &spec.error_file].into_iter().flatten() {
            if !stale.contains(&path.as_str()) {
                stale.push(path);
            }
        }
        for path in stale {
            match backup(&self.workdir.join(path)) {
                Ok(Some(target)) => info!("moved existing {} to {}", path, target.display()),
                Ok(None) => {}
                Err(e) => warn!("could not back up {}: {}", path, e),
            }
        }

        let stdout = self.submitter.submit(&line, self.workdir)?;
        let id = self.scheduler.interpret(&spec, &stdout)?;

        let job = LaunchedJob { id, spec };
        self.recorder.record(&job);
        Ok(job)
    }
}

/// Moves an existing file to `<name>.<timestamp>.bak`, returning the new
/// location. Missing files are left alone.
pub fn backup(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let base = format!("{}.{}", path.display(), stamp);
    let mut target = PathBuf::from(format!("{base}.bak"));
    let mut n = 1;
    while target.exists() {
        target = PathBuf::from(format!("{base}.{n}.bak"));
        n += 1;
    }

    fs::rename(path, &target)?;
    Ok(Some(target))
}
