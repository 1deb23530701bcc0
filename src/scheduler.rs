//! Rendering job specs into scheduler submission lines.

use crate::config::GridConfig;
use crate::error::Result;
use crate::job::{JobId, JobSpec};
use crate::response::ResponseKind;

/// A batch scheduler reachable through a submission command.
pub trait Scheduler {
    /// The full submission invocation for `spec`, as shell words.
    fn submission_line(&self, spec: &JobSpec) -> String;

    /// Recovers the job id from what the submission tool printed.
    fn interpret(&self, spec: &JobSpec, stdout: &str) -> Result<JobId>;
}

/// Grid Engine style `qsub`.
#[derive(Debug, Clone)]
pub struct GridEngine {
    program: String,
    project_code: String,
    parallel_env: String,
}

impl GridEngine {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            program: config.submit_program.clone(),
            project_code: config.project_code.clone(),
            parallel_env: config.parallel_env.clone(),
        }
    }
}

impl Scheduler for GridEngine {
    fn submission_line(&self, spec: &JobSpec) -> String {
        let mut words = vec![
            self.program.clone(),
            "-P".to_string(),
            self.project_code.clone(),
            "-cwd".to_string(),
        ];

        if let Some(queue) = &spec.queue {
            words.extend(["-l".to_string(), queue.clone()]);
        }
        if let Some(threads) = spec.threads {
            words.extend(["-pe".to_string(), self.parallel_env.clone(), threads.to_string()]);
        }
        if let Some(size) = spec.array_size {
            words.extend(["-t".to_string(), format!("1-{}", size.get())]);
        }

        if let Some(input) = &spec.input_file {
            words.extend(["-i".to_string(), shell_quote(input)]);
        }
        let same = spec.output_file.is_some() && spec.output_file == spec.error_file;
        if same {
            words.extend(["-j".to_string(), "y".to_string()]);
        }
        if let Some(output) = &spec.output_file {
            words.extend(["-o".to_string(), shell_quote(output)]);
        }
        if let Some(error) = spec.error_file.as_ref().filter(|_| !same) {
            words.extend(["-e".to_string(), shell_quote(error)]);
        }

        words.push(shell_wrap(&spec.command));
        words.join(" ")
    }

    fn interpret(&self, spec: &JobSpec, stdout: &str) -> Result<JobId> {
        ResponseKind::for_array(spec.is_array()).interpret(stdout)
    }
}

/// Pipelines and `&&`/`||` chains only make sense to a shell, so they run
/// under `sh -c`. The quote is `'` unless the command already contains one.
/// A command holding both quote characters is wrapped unescaped and will
/// not split back into the original text.
pub fn shell_wrap(command: &str) -> String {
    if command.contains('|') || command.contains("&&") {
        let quote = if command.contains('\'') { '"' } else { '\'' };
        format!("sh -c {quote}{command}{quote}")
    } else {
        command.to_string()
    }
}

pub(crate) fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.bytes().all(|b| b.is_ascii_alphanumeric() || b"@%_+=:,./-".contains(&b)) {
        return s.to_string();
    }
    let escaped = s.replace('\'', "'\\''");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ArraySize;

    fn engine() -> GridEngine {
        GridEngine::new(&GridConfig::new("/tmp"))
    }

    #[test]
    fn plain_command() {
        let line = engine().submission_line(&JobSpec::new("process a.fastq"));
        assert_eq!(line, "qsub -P 04048 -cwd process a.fastq");
    }

    #[test]
    fn resources_and_array_range() {
        let spec = JobSpec::new("array.sh")
            .queue("himem")
            .threads(Some(8))
            .array_size(ArraySize::new(12).unwrap());
        assert_eq!(
            engine().submission_line(&spec),
            "qsub -P 04048 -cwd -l himem -pe threaded 8 -t 1-12 array.sh"
        );
    }

    #[test]
    fn identical_output_and_error_are_joined() {
        let spec = JobSpec::new("zcat x.gz")
            .output_file(Some("x".into()))
            .error_file(Some("x".into()));
        let line = engine().submission_line(&spec);
        assert_eq!(line, "qsub -P 04048 -cwd -j y -o x zcat x.gz");
        assert_eq!(line.matches("-j y").count(), 1);
        assert!(!line.contains(" -e "));
    }

    #[test]
    fn separate_redirections() {
        let spec = JobSpec::new("run")
            .input_file("in.txt")
            .output_file(Some("out.txt".into()))
            .error_file(Some("err.txt".into()));
        assert_eq!(
            engine().submission_line(&spec),
            "qsub -P 04048 -cwd -i in.txt -o out.txt -e err.txt run"
        );

        let only_err = JobSpec::new("run").error_file(Some("err.txt".into()));
        assert_eq!(
            engine().submission_line(&only_err),
            "qsub -P 04048 -cwd -e err.txt run"
        );
    }

    #[test]
    fn scheduler_variables_in_paths_are_quoted() {
        let out = Some("$TASK_ID.out".to_string());
        let spec = JobSpec::new("array.sh")
            .output_file(out.clone())
            .error_file(out);
        let line = engine().submission_line(&spec);
        assert_eq!(line, "qsub -P 04048 -cwd -j y -o '$TASK_ID.out' array.sh");
        let words = shlex::split(&line).unwrap();
        assert_eq!(words[7], "$TASK_ID.out");
    }

    #[test]
    fn pipelines_run_under_a_shell() {
        let line = engine().submission_line(&JobSpec::new("cmdA | cmdB"));
        assert_eq!(line, "qsub -P 04048 -cwd sh -c 'cmdA | cmdB'");
        let words = shlex::split(&line).unwrap();
        assert_eq!(words.last().map(String::as_str), Some("cmdA | cmdB"));
    }

    #[test]
    fn wrap_picks_the_unused_quote() {
        assert_eq!(shell_wrap("a && b"), "sh -c 'a && b'");
        assert_eq!(shell_wrap("a || b"), "sh -c 'a || b'");
        assert_eq!(shell_wrap("echo 'x' | wc"), "sh -c \"echo 'x' | wc\"");
        assert_eq!(shell_wrap("echo a; echo b"), "echo a; echo b");
    }

    #[test]
    fn configured_program_and_project() {
        let mut config = GridConfig::new("/tmp");
        config.submit_program = "/opt/sge/bin/qsub".into();
        config.project_code = "99".into();
        config.parallel_env = "smp".into();
        let spec = JobSpec::new("ls").threads(Some(2));
        assert_eq!(
            GridEngine::new(&config).submission_line(&spec),
            "/opt/sge/bin/qsub -P 99 -cwd -pe smp 2 ls"
        );
    }
}
