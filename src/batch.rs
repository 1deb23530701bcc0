use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::job::{JobSpec, LaunchedJob};
use crate::launcher::{JobRecorder, Launcher, Submitter};
use crate::scheduler::Scheduler;

/// Jobs submitted one after another from a single working directory.
#[derive(Debug, Clone)]
pub struct JobBatch {
    specs: Vec<JobSpec>,
    workdir: PathBuf,
}

impl JobBatch {
    pub fn new(specs: Vec<JobSpec>, workdir: impl Into<PathBuf>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::EmptyBatch);
        }
        Ok(Self {
            specs,
            workdir: workdir.into(),
        })
    }

    /// Pairs each command with an output file. An empty `outfiles` means
    /// no command redirects its output.
    pub fn from_commands(
        commands: Vec<String>,
        outfiles: Vec<Option<String>>,
        workdir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let outfiles = if outfiles.is_empty() {
            vec![None; commands.len()]
        } else if outfiles.len() != commands.len() {
            return Err(Error::OutfileMismatch {
                commands: commands.len(),
                outfiles: outfiles.len(),
            });
        } else {
            outfiles
        };

        let specs = commands
            .into_iter()
            .zip(outfiles)
            .map(|(command, outfile)| JobSpec::new(command).output_file(outfile))
            .collect();
        Self::new(specs, workdir)
    }

    pub fn specs(&self) -> &[JobSpec] {
        &self.specs
    }

    /// Submits every job in order. A failed submission is recorded and the
    /// rest of the batch still goes out.
    pub fn submit(
        &self,
        scheduler: &dyn Scheduler,
        submitter: &dyn Submitter,
        recorder: &dyn JobRecorder,
    ) -> BatchSummary {
        let launcher = Launcher::new(scheduler, submitter, recorder, &self.workdir);
        let mut summary = BatchSummary::default();

        for (index, spec) in self.specs.iter().enumerate() {
            let command = spec.command.clone();
            match launcher.launch(spec.clone()) {
                Ok(job) => summary.launched.push(job),
                Err(error) => {
                    error!("submission {} failed ({}): {}", index, command, error);
                    summary.failures.push(BatchFailure {
                        index,
                        command,
                        error,
                    });
                }
            }
        }

        summary.log();
        summary
    }
}

#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub command: String,
    pub error: Error,
}

/// Outcome of submitting a batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub launched: Vec<LaunchedJob>,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.launched.len() + self.failures.len()
    }

    /// Jobs the scheduler accepted silently, without an id.
    pub fn unassigned(&self) -> impl Iterator<Item = &LaunchedJob> {
        self.launched.iter().filter(|job| !job.id.is_assigned())
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unassigned().next().is_none()
    }

    /// Fails when any submission hit a hard error.
    pub fn into_result(self) -> Result<Vec<LaunchedJob>> {
        if self.failures.is_empty() {
            Ok(self.launched)
        } else {
            Err(Error::BatchFailed {
                failed: self.failures.len(),
                total: self.total(),
            })
        }
    }

    fn log(&self) {
        let unassigned = self.unassigned().count();
        if self.is_clean() {
            info!("submitted {} job(s)", self.total());
        } else {
            warn!(
                "submitted {} job(s): {} without job id, {} failed",
                self.total(),
                unassigned,
                self.failures.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use super::*;
    use crate::config::GridConfig;
    use crate::launcher::tests::{CannedSubmitter, MemoryRecorder};
    use crate::scheduler::GridEngine;

    /// Replays responses in order, one per submission.
    struct ScriptedSubmitter {
        responses: Vec<&'static str>,
        next: Cell<usize>,
    }

    impl Submitter for ScriptedSubmitter {
        fn submit(&self, _line: &str, _workdir: &Path) -> Result<String> {
            let i = self.next.get();
            self.next.set(i + 1);
            Ok(self.responses[i].to_string())
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            JobBatch::new(Vec::new(), "/tmp"),
            Err(Error::EmptyBatch)
        ));
        assert!(matches!(
            JobBatch::from_commands(Vec::new(), Vec::new(), "/tmp"),
            Err(Error::EmptyBatch)
        ));
    }

    #[test]
    fn outfiles_must_line_up() {
        let err = JobBatch::from_commands(
            vec!["a".into(), "b".into()],
            vec![Some("a.out".into())],
            "/tmp",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::OutfileMismatch {
                commands: 2,
                outfiles: 1
            }
        ));
    }

    #[test]
    fn submits_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let batch = JobBatch::from_commands(
            vec!["first".into(), "second".into()],
            vec![Some("1.out".into()), None],
            dir.path(),
        )
        .unwrap();
        let engine = GridEngine::new(&GridConfig::new(dir.path()));
        let submitter = CannedSubmitter::new("Your job 9 (\"x\") has been submitted");
        let recorder = MemoryRecorder::default();

        let summary = batch.submit(&engine, &submitter, &recorder);

        assert!(summary.is_clean());
        assert_eq!(
            submitter.lines.borrow().as_slice(),
            [
                "qsub -P 04048 -cwd -o 1.out first",
                "qsub -P 04048 -cwd second"
            ]
        );
        assert_eq!(summary.into_result().unwrap().len(), 2);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let batch = JobBatch::from_commands(
            vec!["a".into(), "b".into(), "c".into()],
            Vec::new(),
            dir.path(),
        )
        .unwrap();
        let engine = GridEngine::new(&GridConfig::new(dir.path()));
        let submitter = ScriptedSubmitter {
            responses: vec![
                "",
                "error: no such queue",
                "Your job 3 (\"c\") has been submitted",
            ],
            next: Cell::new(0),
        };
        let recorder = MemoryRecorder::default();

        let summary = batch.submit(&engine, &submitter, &recorder);

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.unassigned().count(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].index, 1);
        assert_eq!(summary.failures[0].command, "b");
        assert_eq!(summary.launched[1].id.as_str(), "3");
        assert!(matches!(
            summary.into_result(),
            Err(Error::BatchFailed {
                failed: 1,
                total: 3
            })
        ));
    }
}
