use std::io;

use thiserror::Error;

use crate::response::ResponseKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("array size must satisfy 1 < size < 100000, got {0}")]
    InvalidArraySize(u64),

    #[error("job batch has no commands")]
    EmptyBatch,

    #[error("{outfiles} output files given for {commands} commands")]
    OutfileMismatch { commands: usize, outfiles: usize },

    #[error("unrecognized {kind} submission response: {response:?}")]
    UnrecognizedResponse { kind: ResponseKind, response: String },

    #[error("could not parse submission command (check shell quoting): {0}")]
    Unsplittable(String),

    #[error("submission command is empty")]
    EmptySubmission,

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{failed} of {total} submissions failed")]
    BatchFailed { failed: usize, total: usize },

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
