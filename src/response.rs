//! Recovering job identifiers from the submission tool's confirmation text.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::job::JobId;

static SINGLE_JOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Your job (?P<id>[0-9]*) ").expect("valid regex"));

static ARRAY_JOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Your job-array (?P<id>\S*) ").expect("valid regex"));

/// Shape of confirmation the scheduler prints for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// `Your job 12345 ("name") has been submitted`
    Single,
    /// `Your job-array 67.1-10:1 ("name") has been submitted`
    Array,
}

impl ResponseKind {
    pub fn for_array(is_array: bool) -> Self {
        if is_array {
            Self::Array
        } else {
            Self::Single
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Single => &*SINGLE_JOB,
            Self::Array => &*ARRAY_JOB,
        }
    }

    /// Blank output yields the unassigned id; anything else must match.
    pub fn interpret(self, stdout: &str) -> Result<JobId> {
        if stdout.trim().is_empty() {
            return Ok(JobId::unassigned());
        }
        self.pattern()
            .captures(stdout)
            .and_then(|caps| caps.name("id"))
            .map(|id| JobId::new(id.as_str()))
            .ok_or_else(|| Error::UnrecognizedResponse {
                kind: self,
                response: stdout.trim().to_string(),
            })
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("job"),
            Self::Array => f.write_str("job-array"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_job_id() {
        let out = "Your job 12345 (\"process\") has been submitted\n";
        let id = ResponseKind::Single.interpret(out).unwrap();
        assert_eq!(id.as_str(), "12345");
    }

    #[test]
    fn array_job_id() {
        let out = "Your job-array 67 (\"array.sh\") has been submitted\n";
        assert_eq!(ResponseKind::Array.interpret(out).unwrap().as_str(), "67");

        let ranged = "Your job-array 68.1-10:1 (\"array.sh\") has been submitted\n";
        assert_eq!(
            ResponseKind::Array.interpret(ranged).unwrap().as_str(),
            "68.1-10:1"
        );
    }

    #[test]
    fn blank_output_is_unassigned() {
        for out in ["", "  \n"] {
            let id = ResponseKind::Single.interpret(out).unwrap();
            assert!(!id.is_assigned());
            assert_eq!(id.as_str(), "-1");
        }
    }

    #[test]
    fn unexpected_output_is_an_error() {
        let err = ResponseKind::Single
            .interpret("Unable to run job: denied\n")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnrecognizedResponse { kind: ResponseKind::Single, ref response }
                if response == "Unable to run job: denied"
        ));
    }

    #[test]
    fn kinds_do_not_cross_match() {
        let array = "Your job-array 67 (\"array.sh\") has been submitted";
        assert!(ResponseKind::Single.interpret(array).is_err());
        let single = "Your job 12345 (\"x\") has been submitted";
        assert!(ResponseKind::Array.interpret(single).is_err());
    }
}
