use crate::{CaseId, CaseRegistry, HarnessConfig, HarnessError};
use serde::Serialize;
use std::path::PathBuf;
use tc_core::{Solution, Value, encode_sequence};
use tc_store::CorpusStore;
use tracing::{debug, info, warn};

/// Summary of one generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub solution: String,
    pub corpus_root: PathBuf,
    pub sample_cases: usize,
    pub other_cases: usize,
    /// SHA-256 over the written corpus. Equal registries and reference
    /// outputs give equal digests.
    pub digest_hex: String,
}

impl GenerationReport {
    #[must_use]
    pub fn total_cases(&self) -> usize {
        self.sample_cases + self.other_cases
    }
}

/// Rebuilds the corpus from scratch: removes anything under the corpus
/// root, then runs `reference` over every registered case and writes one
/// `.in`/`.out` pair per case.
///
/// The pass is all-or-nothing. On any error the partially written corpus
/// is removed before the error is returned.
pub fn generate_corpus(
    config: &HarnessConfig,
    registry: &CaseRegistry,
    reference: &Solution,
) -> Result<GenerationReport, HarnessError> {
    let store = config.store();
    info!(
        root = %store.root().display(),
        solution = reference.name(),
        signature = %reference.signature(),
        cases = registry.len(),
        "generating corpus"
    );

    store.reset().map_err(|source| HarnessError::Setup {
        root: store.root().to_path_buf(),
        source,
    })?;
    let guard = PartialCorpus::new(&store);

    for (case, args) in registry.cases() {
        generate_case(&store, reference, case, args)?;
    }

    let digest_hex = store.digest_hex().map_err(|source| HarnessError::Corpus {
        root: store.root().to_path_buf(),
        source,
    })?;
    guard.commit();

    let report = GenerationReport {
        solution: reference.name().to_owned(),
        corpus_root: store.root().to_path_buf(),
        sample_cases: registry.samples().len(),
        other_cases: registry.others().len(),
        digest_hex,
    };
    info!(
        samples = report.sample_cases,
        others = report.other_cases,
        digest = %report.digest_hex,
        "corpus generated"
    );
    Ok(report)
}

fn generate_case(
    store: &CorpusStore,
    reference: &Solution,
    case: CaseId,
    args: &[Value],
) -> Result<(), HarnessError> {
    let outputs = reference
        .call(args.to_vec())
        .map_err(|source| HarnessError::Invocation {
            case: case.stem(),
            solution: reference.name().to_owned(),
            source,
        })?;

    let input = encode_sequence(args).map_err(|source| HarnessError::Encode {
        case: case.stem(),
        direction: "input",
        source,
    })?;
    let output = encode_sequence(&outputs).map_err(|source| HarnessError::Encode {
        case: case.stem(),
        direction: "output",
        source,
    })?;

    store
        .store_pair(case.category.file_prefix(), case.index, &input, &output)
        .map_err(|source| HarnessError::Persistence {
            case: case.stem(),
            source,
        })?;
    debug!(%case, inputs = args.len(), outputs = outputs.len(), "generated case");
    Ok(())
}

/// Removes the corpus on drop unless committed.
struct PartialCorpus<'a> {
    store: &'a CorpusStore,
    committed: bool,
}

impl<'a> PartialCorpus<'a> {
    fn new(store: &'a CorpusStore) -> Self {
        Self {
            store,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialCorpus<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        warn!(root = %self.store.root().display(), "removing partially generated corpus");
        if let Err(err) = self.store.remove() {
            warn!(error = %err, "could not remove partial corpus");
        }
    }
}
