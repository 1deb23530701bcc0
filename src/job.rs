use std::fmt;

use crate::config::{GridOpts, DEFAULT_QUEUE};
use crate::error::{Error, Result};

/// Number of tasks in an array job. Always within `2..=99999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySize(u32);

impl ArraySize {
    pub fn new(size: u64) -> Result<Self> {
        if 1 < size && size < 100_000 {
            Ok(Self(size as u32))
        } else {
            Err(Error::InvalidArraySize(size))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// What to submit and how the scheduler should run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub command: String,
    /// `None` when no special resource request is made.
    pub queue: Option<String>,
    pub threads: Option<u32>,
    pub array_size: Option<ArraySize>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub error_file: Option<String>,
}

impl JobSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            queue: None,
            threads: None,
            array_size: None,
            input_file: None,
            output_file: None,
            error_file: None,
        }
    }

    /// Sets the resource request; the `default` sentinel clears it.
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        let queue = queue.into();
        self.queue = (queue != DEFAULT_QUEUE).then_some(queue);
        self
    }

    pub fn threads(mut self, threads: Option<u32>) -> Self {
        self.threads = threads;
        self
    }

    pub fn array_size(mut self, size: ArraySize) -> Self {
        self.array_size = Some(size);
        self
    }

    pub fn input_file(mut self, path: impl Into<String>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    pub fn output_file(mut self, path: Option<String>) -> Self {
        self.output_file = path;
        self
    }

    pub fn error_file(mut self, path: Option<String>) -> Self {
        self.error_file = path;
        self
    }

    pub fn grid_opts(self, opts: &GridOpts) -> Self {
        self.queue(opts.queue.clone()).threads(opts.threaded)
    }

    pub fn is_array(&self) -> bool {
        self.array_size.is_some()
    }
}

/// Identifier handed back by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Recorded when the submission tool printed nothing.
    pub const UNASSIGNED: &'static str = "-1";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn unassigned() -> Self {
        Self(Self::UNASSIGNED.to_string())
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != Self::UNASSIGNED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedJob {
    pub id: JobId,
    pub spec: JobSpec,
}

impl LaunchedJob {
    /// One-line description in shell redirection notation.
    pub fn summary(&self) -> String {
        let mut msg = format!("[{}] {}", self.id, self.spec.command);
        if let Some(input) = &self.spec.input_file {
            msg.push_str(&format!(" < {input}"));
        }
        if let Some(output) = &self.spec.output_file {
            msg.push_str(&format!(" > {output}"));
        }
        if let Some(error) = &self.spec.error_file {
            msg.push_str(&format!(" 2> {error}"));
        }
        msg
    }
}

impl fmt::Display for LaunchedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![self.id.as_str(), self.spec.command.as_str()];
        if let Some(output) = &self.spec.output_file {
            fields.push(output);
        }
        write!(f, "{}", fields.join("\t"))
    }
}
