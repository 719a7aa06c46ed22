use crate::{CaseId, HarnessConfig, HarnessError};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tc_core::{InvokeError, Solution, Value, decode_sequence, display_tuple};
use tc_store::{CorpusStore, Direction};
use tracing::{debug, info, warn};

/// A candidate output that differs from the recorded one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseMismatch {
    pub stem: String,
    /// `None` when the stem does not follow the `sample_N`/`tc_N` scheme.
    pub case: Option<CaseId>,
    /// First output position that differs, or the shorter length when one
    /// tuple is a prefix of the other.
    pub first_difference: usize,
    pub expected: Vec<Value>,
    pub actual: Vec<Value>,
}

impl CaseMismatch {
    #[must_use]
    pub fn new(stem: String, expected: Vec<Value>, actual: Vec<Value>) -> Self {
        let first_difference = expected
            .iter()
            .zip(&actual)
            .position(|(want, got)| want != got)
            .unwrap_or_else(|| expected.len().min(actual.len()));
        Self {
            case: CaseId::parse_stem(&stem),
            stem,
            first_difference,
            expected,
            actual,
        }
    }
}

impl fmt::Display for CaseMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.case {
            Some(case) => write!(f, "{} case #{} ({})", case.category, case.index, self.stem)?,
            None => write!(f, "case {}", self.stem)?,
        }
        writeln!(f, " differs at output {}", self.first_difference)?;
        writeln!(f, "Expected: {}", display_tuple(&self.expected))?;
        write!(f, "Found:    {}", display_tuple(&self.actual))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerifyOutcome {
    Passed,
    Mismatch(CaseMismatch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyReport {
    pub solution: String,
    pub corpus_root: PathBuf,
    /// Input records found in the corpus.
    pub total_cases: usize,
    /// Cases actually run; verification halts at the first mismatch.
    pub cases_run: usize,
    pub outcome: VerifyOutcome,
}

impl VerifyReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self.outcome, VerifyOutcome::Passed)
    }

    #[must_use]
    pub fn mismatch(&self) -> Option<&CaseMismatch> {
        match &self.outcome {
            VerifyOutcome::Mismatch(mismatch) => Some(mismatch),
            VerifyOutcome::Passed => None,
        }
    }
}

/// Replays every persisted input through `candidate` and compares its
/// results with the recorded outputs.
///
/// Cases run samples first, then other cases, each by ascending numeric
/// index. This departs from a plain file-name sort once an index reaches 10:
/// `tc_2` runs before `tc_10`.
/// The first mismatching case ends the run with
/// [`VerifyOutcome::Mismatch`]; later cases are not executed. A corpus that
/// cannot be read, or records that do not fit the candidate's signature,
/// are reported as [`HarnessError`] instead.
pub fn verify_corpus(
    config: &HarnessConfig,
    candidate: &Solution,
) -> Result<VerifyReport, HarnessError> {
    let store = config.store();
    let mut stems = store.input_stems().map_err(|source| HarnessError::Corpus {
        root: store.root().to_path_buf(),
        source,
    })?;
    sort_for_replay(&mut stems);
    info!(
        root = %store.root().display(),
        solution = candidate.name(),
        cases = stems.len(),
        "verifying corpus"
    );

    let mut report = VerifyReport {
        solution: candidate.name().to_owned(),
        corpus_root: store.root().to_path_buf(),
        total_cases: stems.len(),
        cases_run: 0,
        outcome: VerifyOutcome::Passed,
    };

    for stem in stems {
        let (expected, actual) = replay_case(&store, candidate, &stem)?;
        report.cases_run += 1;
        if expected != actual {
            let mismatch = CaseMismatch::new(stem, expected, actual);
            warn!(
                case = %mismatch.stem,
                position = mismatch.first_difference,
                "candidate output differs"
            );
            report.outcome = VerifyOutcome::Mismatch(mismatch);
            return Ok(report);
        }
        debug!(case = %stem, "case passed");
    }

    info!(cases = report.cases_run, "corpus verified");
    Ok(report)
}

/// Returns `(expected, actual)` for one persisted case.
fn replay_case(
    store: &CorpusStore,
    candidate: &Solution,
    stem: &str,
) -> Result<(Vec<Value>, Vec<Value>), HarnessError> {
    let signature = candidate.signature();
    let load = |direction| {
        store
            .load_record(stem, direction)
            .map_err(|source| HarnessError::Persistence {
                case: stem.to_owned(),
                source,
            })
    };
    let raw_input = load(Direction::Input)?;
    let raw_output = load(Direction::Output)?;

    if raw_input.len() != signature.params.len() {
        return Err(HarnessError::Invocation {
            case: stem.to_owned(),
            solution: candidate.name().to_owned(),
            source: InvokeError::ArityMismatch {
                expected: signature.params.len(),
                actual: raw_input.len(),
            },
        });
    }
    let decode_failure = |direction, source| HarnessError::Decode {
        case: stem.to_owned(),
        direction,
        solution: candidate.name().to_owned(),
        source,
    };
    let args = decode_sequence(&raw_input, &signature.params)
        .map_err(|source| decode_failure("input", source))?;
    let expected = decode_sequence(&raw_output, &signature.returns)
        .map_err(|source| decode_failure("output", source))?;

    debug!(case = %stem, "running case");
    let actual = candidate
        .call(args)
        .map_err(|source| HarnessError::Invocation {
            case: stem.to_owned(),
            solution: candidate.name().to_owned(),
            source,
        })?;
    Ok((expected, actual))
}

/// Recognized stems in case order, then any others by name.
fn sort_for_replay(stems: &mut [String]) {
    stems.sort_by_cached_key(|stem| {
        let case = CaseId::parse_stem(stem);
        (case.is_none(), case, stem.clone())
    });
}

/// Verifies the corpus and panics if any case fails, for use inside a
/// `#[test]` function.
///
/// # Panics
///
/// Panics with the mismatch rendering when the candidate's output differs
/// from the recorded one, and with the error message on any harness
/// failure.
pub fn run_corpus_test(config: &HarnessConfig, candidate: &Solution) {
    match verify_corpus(config, candidate) {
        Ok(report) => {
            if let VerifyOutcome::Mismatch(mismatch) = report.outcome {
                panic!("wrong answer: {mismatch}");
            }
        }
        Err(err) => panic!("harness failure: {err}"),
    }
}

/// Writes `report` as pretty JSON.
pub fn write_verify_report(path: &Path, report: &VerifyReport) -> Result<(), HarnessError> {
    let report_failure = |source| HarnessError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(report_failure)?;
    }
    let raw = serde_json::to_vec_pretty(report)
        .map_err(std::io::Error::other)
        .map_err(report_failure)?;
    fs::write(path, raw).map_err(report_failure)
}

#[cfg(test)]
mod tests {
    use super::{CaseMismatch, sort_for_replay};
    use crate::{CaseId, Category};
    use tc_core::Value;

    #[test]
    fn replay_order_is_numeric_with_samples_first() {
        let mut stems: Vec<String> = ["tc_10", "tc_2", "sample_1", "zz", "sample_0", "tc_0"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        sort_for_replay(&mut stems);
        assert_eq!(stems, ["sample_0", "sample_1", "tc_0", "tc_2", "tc_10", "zz"]);
    }

    #[test]
    fn mismatch_locates_first_difference() {
        let mismatch = CaseMismatch::new(
            "tc_4".to_owned(),
            vec![Value::Int(1), Value::Int(2)],
            vec![Value::Int(1), Value::Int(3)],
        );
        assert_eq!(mismatch.case, Some(CaseId::new(Category::Other, 4)));
        assert_eq!(mismatch.first_difference, 1);
    }

    #[test]
    fn mismatch_on_length_points_past_common_prefix() {
        let mismatch = CaseMismatch::new("odd".to_owned(), vec![Value::Int(1)], Vec::new());
        assert_eq!(mismatch.case, None);
        assert_eq!(mismatch.first_difference, 0);
    }

    #[test]
    fn mismatch_renders_expected_and_found() {
        let mismatch = CaseMismatch::new(
            "sample_0".to_owned(),
            vec![Value::Int(7)],
            vec![Value::Int(8)],
        );
        let rendered = mismatch.to_string();
        assert_eq!(
            rendered,
            "sample case #0 (sample_0) differs at output 0\nExpected: [7]\nFound:    [8]"
        );
    }
}
