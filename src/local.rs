//! Running commands as concurrent processes on this machine.

use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::template::Expansion;

/// A fixed set of commands that start together and are waited on together.
#[derive(Debug, Default)]
pub struct LocalGroup {
    commands: Vec<Command>,
}

impl LocalGroup {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Builds `sh -c` invocations, sending stdout and stderr to the
    /// expansion's output file when it has one.
    pub fn from_expansions(expansions: Vec<Expansion>, workdir: &Path) -> Result<Self> {
        let mut commands = Vec::with_capacity(expansions.len());
        for expansion in expansions {
            let mut command = Command::new("sh");
            command.arg("-c").arg(&expansion.command).current_dir(workdir);
            if let Some(output) = &expansion.output_file {
                let file = File::create(workdir.join(output))?;
                command.stderr(Stdio::from(file.try_clone()?));
                command.stdout(Stdio::from(file));
            }
            commands.push(command);
        }
        Ok(Self::new(commands))
    }

    /// Starts every command, then waits for all of them. No timeout and no
    /// cancellation; exit statuses are returned in command order.
    pub fn run(self) -> Result<Vec<ExitStatus>> {
        let mut children: Vec<Child> = Vec::with_capacity(self.commands.len());
        let mut spawn_error = None;

        for mut command in self.commands {
            let program = command.get_program().to_string_lossy().into_owned();
            match command.spawn() {
                Ok(child) => {
                    debug!(pid = child.id(), "started {}", program);
                    children.push(child);
                }
                Err(source) => {
                    spawn_error = Some(Error::Spawn { program, source });
                    break;
                }
            }
        }

        let mut statuses = Vec::with_capacity(children.len());
        for mut child in children {
            let status = child.wait()?;
            if !status.success() {
                warn!(pid = child.id(), "process exited with {}", status);
            }
            statuses.push(status);
        }

        match spawn_error {
            Some(e) => Err(e),
            None => Ok(statuses),
        }
    }
}
