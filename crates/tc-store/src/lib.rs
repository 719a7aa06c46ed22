#![forbid(unsafe_code)]

//! Persistence for generated test-case corpora.
//!
//! A corpus is one flat directory of record files named
//! `{prefix}_{index}.in` / `{prefix}_{index}.out`. Each file holds a single
//! JSON array; the store hands those back as opaque raw records and leaves
//! typing to the caller.

use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
        }
    }

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Input => ".in",
            Self::Output => ".out",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("corpus directory {} does not exist", .path.display())]
    CorpusMissing { path: PathBuf },
    #[error("i/o failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} does not hold a JSON record sequence: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `.in` / `.out` files that are missing their counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingReport {
    pub paired: usize,
    pub orphan_inputs: Vec<String>,
    pub orphan_outputs: Vec<String>,
}

impl PairingReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.orphan_inputs.is_empty() && self.orphan_outputs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    #[must_use]
    pub fn record_name(prefix: &str, index: usize, direction: Direction) -> String {
        format!("{prefix}_{index}.{}", direction.extension())
    }

    #[must_use]
    pub fn record_path(&self, prefix: &str, index: usize, direction: Direction) -> PathBuf {
        self.root.join(Self::record_name(prefix, index, direction))
    }

    /// Deletes the corpus directory, if any, and recreates it empty.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.remove()?;
        fs::create_dir_all(&self.root).map_err(|source| StoreError::io(&self.root, source))
    }

    pub fn remove(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::io(&self.root, source)),
        }
    }

    pub fn store(
        &self,
        prefix: &str,
        index: usize,
        bytes: &[u8],
        direction: Direction,
    ) -> Result<PathBuf, StoreError> {
        let path = self.record_path(prefix, index, direction);
        fs::write(&path, bytes).map_err(|source| StoreError::io(&path, source))?;
        debug!(path = %path.display(), bytes = bytes.len(), "stored record");
        Ok(path)
    }

    /// Writes the `.in` and `.out` halves of one case. If the output write
    /// fails the input file is removed again before the error is returned.
    pub fn store_pair(
        &self,
        prefix: &str,
        index: usize,
        input: &[u8],
        output: &[u8],
    ) -> Result<(), StoreError> {
        let input_path = self.store(prefix, index, input, Direction::Input)?;
        let pending = PendingInput::new(input_path);
        self.store(prefix, index, output, Direction::Output)?;
        pending.commit();
        Ok(())
    }

    /// Reads one record file as an ordered sequence of raw records. A file
    /// holding `null` reads as an empty sequence.
    pub fn load_all(&self, filename: &str) -> Result<Vec<Box<RawValue>>, StoreError> {
        let path = self.root.join(filename);
        let raw = fs::read(&path).map_err(|source| StoreError::io(&path, source))?;
        let records = serde_json::from_slice::<Option<Vec<Box<RawValue>>>>(&raw)
            .map_err(|source| StoreError::Malformed {
                path: path.clone(),
                source,
            })?;
        Ok(records.unwrap_or_default())
    }

    pub fn load_record(
        &self,
        stem: &str,
        direction: Direction,
    ) -> Result<Vec<Box<RawValue>>, StoreError> {
        self.load_all(&format!("{stem}{}", direction.suffix()))
    }

    /// File names in the corpus directory, sorted.
    pub fn file_names(&self) -> Result<Vec<String>, StoreError> {
        if !self.exists() {
            return Err(StoreError::CorpusMissing {
                path: self.root.clone(),
            });
        }

        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::io(&self.root, source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::io(&self.root, source))?;
            let is_file = entry
                .file_type()
                .map_err(|source| StoreError::io(&entry.path(), source))?
                .is_file();
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!(?name, "skipping non utf-8 corpus entry"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Stems of every input record, sorted lexicographically.
    pub fn input_stems(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.stems(Direction::Input)?.into_iter().collect())
    }

    fn stems(&self, direction: Direction) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .file_names()?
            .into_iter()
            .filter_map(|name| name.strip_suffix(direction.suffix()).map(str::to_owned))
            .collect())
    }

    pub fn check_pairing(&self) -> Result<PairingReport, StoreError> {
        let inputs = self.stems(Direction::Input)?;
        let outputs = self.stems(Direction::Output)?;

        Ok(PairingReport {
            paired: inputs.intersection(&outputs).count(),
            orphan_inputs: inputs.difference(&outputs).cloned().collect(),
            orphan_outputs: outputs.difference(&inputs).cloned().collect(),
        })
    }

    /// SHA-256 over every file in the corpus, in name order. Each file
    /// contributes its name, its length and its bytes.
    pub fn digest_hex(&self) -> Result<String, StoreError> {
        let mut hasher = Sha256::new();
        for name in self.file_names()? {
            let path = self.root.join(&name);
            let bytes = fs::read(&path).map_err(|source| StoreError::io(&path, source))?;
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(&bytes);
        }
        Ok(bytes_to_hex(&hasher.finalize()))
    }
}

/// Removes a freshly written `.in` file unless committed.
struct PendingInput {
    path: Option<PathBuf>,
}

impl PendingInput {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn commit(mut self) {
        self.path = None;
    }
}

impl Drop for PendingInput {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed unpaired input record"),
            Err(err) => warn!(path = %path.display(), %err, "failed to remove unpaired input record"),
        }
    }
}

#[must_use]
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    const HEX_LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX_LUT[(byte >> 4) as usize] as char);
        out.push(HEX_LUT[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{CorpusStore, Direction, StoreError};
    use std::fs;

    fn temp_store() -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CorpusStore::new(dir.path().join("tc"));
        store.reset().expect("reset");
        (dir, store)
    }

    #[test]
    fn record_names_follow_layout() {
        assert_eq!(
            CorpusStore::record_name("sample", 0, Direction::Input),
            "sample_0.in"
        );
        assert_eq!(CorpusStore::record_name("tc", 12, Direction::Output), "tc_12.out");
    }

    #[test]
    fn reset_discards_previous_contents() {
        let (_dir, store) = temp_store();
        store
            .store("tc", 0, b"[1]", Direction::Input)
            .expect("store");
        store.reset().expect("second reset");
        assert!(store.file_names().expect("list").is_empty());
    }

    #[test]
    fn load_all_returns_raw_records_in_order() {
        let (_dir, store) = temp_store();
        store
            .store("sample", 0, br#"[3,{"a":[1,2]},"x"]"#, Direction::Input)
            .expect("store");
        let records = store.load_all("sample_0.in").expect("load");
        let raw: Vec<&str> = records.iter().map(|record| record.get()).collect();
        assert_eq!(raw, vec!["3", r#"{"a":[1,2]}"#, r#""x""#]);
    }

    #[test]
    fn null_file_loads_as_empty_sequence() {
        let (_dir, store) = temp_store();
        store.store("tc", 0, b"null", Direction::Input).expect("store");
        assert!(store.load_all("tc_0.in").expect("load").is_empty());
    }

    #[test]
    fn malformed_file_is_reported() {
        let (_dir, store) = temp_store();
        store.store("tc", 0, b"{\"a\":1}", Direction::Input).expect("store");
        let err = store.load_all("tc_0.in").expect_err("object is not a sequence");
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn missing_corpus_is_distinct_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CorpusStore::new(dir.path().join("absent"));
        let err = store.input_stems().expect_err("no corpus directory");
        assert!(matches!(err, StoreError::CorpusMissing { .. }));
    }

    #[test]
    fn input_stems_skip_outputs_and_sort() {
        let (_dir, store) = temp_store();
        store.store_pair("tc", 1, b"[]", b"[]").expect("pair");
        store.store_pair("sample", 0, b"[]", b"[]").expect("pair");
        store.store_pair("tc", 0, b"[]", b"[]").expect("pair");
        assert_eq!(
            store.input_stems().expect("stems"),
            vec!["sample_0", "tc_0", "tc_1"]
        );
    }

    #[test]
    fn failed_output_write_removes_input_half() {
        let (_dir, store) = temp_store();
        // a directory where the output file should go makes the write fail
        fs::create_dir(store.record_path("tc", 0, Direction::Output)).expect("blocker");

        let err = store
            .store_pair("tc", 0, b"[1]", b"[2]")
            .expect_err("output write should fail");
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.record_path("tc", 0, Direction::Input).exists());
    }

    #[test]
    fn pairing_report_lists_orphans() {
        let (_dir, store) = temp_store();
        store.store_pair("tc", 0, b"[]", b"[]").expect("pair");
        store.store("tc", 1, b"[]", Direction::Input).expect("orphan in");
        store.store("sample", 3, b"[]", Direction::Output).expect("orphan out");

        let report = store.check_pairing().expect("pairing");
        assert_eq!(report.paired, 1);
        assert_eq!(report.orphan_inputs, vec!["tc_1"]);
        assert_eq!(report.orphan_outputs, vec!["sample_3"]);
        assert!(!report.is_complete());
    }

    #[test]
    fn digest_tracks_content() {
        let (_dir, store) = temp_store();
        store.store_pair("tc", 0, b"[1]", b"[2]").expect("pair");
        let first = store.digest_hex().expect("digest");
        assert_eq!(first.len(), 64);
        assert_eq!(first, store.digest_hex().expect("digest again"));

        store.store("tc", 0, b"[3]", Direction::Output).expect("overwrite");
        assert_ne!(first, store.digest_hex().expect("digest after change"));
    }
}
