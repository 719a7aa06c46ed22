#![forbid(unsafe_code)]

//! Generation and replay of persisted test-case corpora.
//!
//! A [`CaseRegistry`] holds argument tuples in two categories. Generating
//! runs a reference [`Solution`] over each tuple and writes the input and
//! output records under the configured corpus root. Verifying replays every
//! persisted input through a candidate and stops at the first output that
//! differs from the recorded one.

pub mod errors;
pub mod generate;
pub mod registry;
pub mod verify;

pub use errors::HarnessError;
pub use generate::{GenerationReport, generate_corpus};
pub use registry::CaseRegistry;
pub use verify::{
    CaseMismatch, VerifyOutcome, VerifyReport, run_corpus_test, verify_corpus, write_verify_report,
};

pub use tc_core::{CaseArgs, CaseValue, Solution, Value, case_record};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tc_store::CorpusStore;

/// Environment variable overriding the corpus directory.
pub const CORPUS_DIR_ENV: &str = "TCGEN_CORPUS_DIR";

pub const DEFAULT_CORPUS_DIR: &str = "tc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub corpus_root: PathBuf,
}

impl HarnessConfig {
    /// `$TCGEN_CORPUS_DIR` when set and non-empty, else `tc` relative to the
    /// working directory.
    #[must_use]
    pub fn default_paths() -> Self {
        let corpus_root = std::env::var_os(CORPUS_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CORPUS_DIR), PathBuf::from);
        Self { corpus_root }
    }

    #[must_use]
    pub fn with_corpus_root(corpus_root: impl Into<PathBuf>) -> Self {
        Self {
            corpus_root: corpus_root.into(),
        }
    }

    #[must_use]
    pub fn store(&self) -> CorpusStore {
        CorpusStore::new(&self.corpus_root)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

/// Sample cases are the worked examples of a problem statement; every
/// other case falls in [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sample,
    Other,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Other => "tc",
        }
    }

    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sample" => Some(Self::Sample),
            "tc" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category plus zero-based insertion index within it. Orders samples first,
/// then by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId {
    pub category: Category,
    pub index: usize,
}

impl CaseId {
    #[must_use]
    pub fn new(category: Category, index: usize) -> Self {
        Self { category, index }
    }

    /// File stem shared by the case's `.in` and `.out` records.
    #[must_use]
    pub fn stem(&self) -> String {
        format!("{}_{}", self.category.file_prefix(), self.index)
    }

    /// Inverse of [`CaseId::stem`]. Stems with a foreign prefix or a
    /// non-canonical index such as `tc_01` yield `None`.
    #[must_use]
    pub fn parse_stem(stem: &str) -> Option<Self> {
        let (prefix, index) = stem.rsplit_once('_')?;
        let category = Category::from_prefix(prefix)?;
        let index: usize = index.parse().ok()?;
        let case = Self::new(category, index);
        (case.stem() == stem).then_some(case)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.category.file_prefix(), self.index)
    }
}
