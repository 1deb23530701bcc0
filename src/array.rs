//! Array jobs driven by a file with one command per line.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::config::GridOpts;
use crate::error::Result;
use crate::job::{ArraySize, JobSpec};

/// Wrapper script written next to the submission, relative to the workdir.
pub const RUN_SCRIPT: &str = "array.sh";

/// Output of each task, expanded by the scheduler per task.
pub const TASK_OUTPUT: &str = "$TASK_ID.out";

/// Shell script that runs line `$SGE_TASK_ID` of `commands`.
pub fn run_script(commands: &str) -> String {
    format!(
        "#!/bin/bash\n\nCMD=`awk \"NR==$SGE_TASK_ID\" {}`\n$CMD\n",
        commands
    )
}

/// Counts newline-separated lines without decoding them.
pub fn count_lines(path: &Path) -> io::Result<u64> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut n = 0;
    for line in reader.split(b'\n') {
        line?;
        n += 1;
    }
    Ok(n)
}

/// Writes the wrapper script into `workdir` and returns the array job that
/// runs it, one task per command.
pub fn prepare(commands: &Path, opts: &GridOpts, workdir: &Path) -> Result<JobSpec> {
    let size = ArraySize::new(count_lines(&workdir.join(commands))?)?;

    let script = workdir.join(RUN_SCRIPT);
    fs::write(&script, run_script(&commands.to_string_lossy()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&script)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms)?;
    }
    info!("run script written to {}", script.display());

    Ok(JobSpec::new(RUN_SCRIPT)
        .grid_opts(opts)
        .array_size(size)
        .output_file(Some(TASK_OUTPUT.to_string()))
        .error_file(Some(TASK_OUTPUT.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn script_looks_up_task_line() {
        assert_eq!(
            run_script("cmds.list"),
            "#!/bin/bash\n\nCMD=`awk \"NR==$SGE_TASK_ID\" cmds.list`\n$CMD\n"
        );
    }

    #[test]
    fn prepares_array_job() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cmds.list"), "echo a\necho b\necho c").unwrap();
        let opts = GridOpts {
            queue: "himem".into(),
            threaded: Some(2),
        };

        let spec = prepare(Path::new("cmds.list"), &opts, dir.path()).unwrap();

        assert_eq!(spec.command, RUN_SCRIPT);
        assert_eq!(spec.array_size.map(ArraySize::get), Some(3));
        assert_eq!(spec.queue.as_deref(), Some("himem"));
        assert_eq!(spec.threads, Some(2));
        assert_eq!(spec.output_file.as_deref(), Some(TASK_OUTPUT));
        assert_eq!(spec.error_file.as_deref(), Some(TASK_OUTPUT));
        let script = fs::read_to_string(dir.path().join(RUN_SCRIPT)).unwrap();
        assert!(script.contains("cmds.list"));
    }

    #[test]
    fn counts_lines_that_are_not_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.list");
        fs::write(&path, b"echo caf\xe9\necho na\xefve\nls").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);
    }

    #[test]
    fn single_command_is_not_an_array() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.list"), "echo a\n").unwrap();
        let err = prepare(Path::new("one.list"), &GridOpts::default(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidArraySize(1)));
        assert!(!dir.path().join(RUN_SCRIPT).exists());
    }
}
