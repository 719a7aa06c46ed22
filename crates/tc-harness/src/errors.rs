use std::path::PathBuf;
use tc_core::{InvokeError, ValueError};
use tc_store::StoreError;
use thiserror::Error;

/// Failures of the harness itself, as opposed to a candidate producing the
/// wrong answer (see [`crate::VerifyOutcome::Mismatch`]).
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot prepare corpus at {}: {source}", .root.display())]
    Setup {
        root: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("case {case}: `{solution}` failed: {source}")]
    Invocation {
        case: String,
        solution: String,
        #[source]
        source: InvokeError,
    },
    #[error("case {case}: cannot encode {direction}: {source}")]
    Encode {
        case: String,
        direction: &'static str,
        #[source]
        source: ValueError,
    },
    #[error("case {case}: recorded {direction} does not fit `{solution}`: {source}")]
    Decode {
        case: String,
        direction: &'static str,
        solution: String,
        #[source]
        source: ValueError,
    },
    #[error("case {case}: {source}")]
    Persistence {
        case: String,
        #[source]
        source: StoreError,
    },
    #[error("cannot read corpus at {}: {source}", .root.display())]
    Corpus {
        root: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("cannot write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Stem of the case being processed, for per-case failures.
    #[must_use]
    pub fn case(&self) -> Option<&str> {
        match self {
            Self::Invocation { case, .. }
            | Self::Encode { case, .. }
            | Self::Decode { case, .. }
            | Self::Persistence { case, .. } => Some(case),
            Self::Setup { .. } | Self::Corpus { .. } | Self::Report { .. } => None,
        }
    }
}
