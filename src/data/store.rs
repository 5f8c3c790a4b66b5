// ============================================================
// Layer 4 — Feature Store (CSV tables)
// ============================================================
// Persists preprocessed features so training and inference can
// run without re-tokenizing the corpus.
//
// Files written to the save directory:
//
//   preprocessed_train.csv       input_ids,token_type_ids,attention_mask,
//                                start_positions,end_positions
//   preprocessed_validation.csv  input_ids,token_type_ids,attention_mask,
//   preprocessed_test.csv        offset_mapping,example_id
//   validation_examples.json     Examples, to re-join contexts and
//   test_examples.json           references when decoding
//
// Sequence columns hold JSON arrays, e.g. "[101,2054,102]";
// absent offsets are JSON null: "[[0,0],null,[0,5]]".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::example::Example;
use crate::domain::feature::{EvalFeature, Offset, TrainFeature};

pub const TRAIN_FILE: &str = "preprocessed_train.csv";

/// Evaluation splits share one table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalSplit {
    Validation,
    Test,
}

impl EvalSplit {
    pub fn features_file(self) -> &'static str {
        match self {
            EvalSplit::Validation => "preprocessed_validation.csv",
            EvalSplit::Test       => "preprocessed_test.csv",
        }
    }

    pub fn examples_file(self) -> &'static str {
        match self {
            EvalSplit::Validation => "validation_examples.json",
            EvalSplit::Test       => "test_examples.json",
        }
    }
}

/// Serialize a value as a JSON string inside one CSV cell.
mod json_column {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        let text = serde_json::to_string(value).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        serde_json::from_str(&text).map_err(D::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TrainRow {
    #[serde(with = "json_column")]
    input_ids:       Vec<u32>,
    #[serde(with = "json_column")]
    token_type_ids:  Vec<u32>,
    #[serde(with = "json_column")]
    attention_mask:  Vec<u32>,
    start_positions: usize,
    end_positions:   usize,
}

impl From<&TrainFeature> for TrainRow {
    fn from(f: &TrainFeature) -> Self {
        Self {
            input_ids:       f.input_ids.clone(),
            token_type_ids:  f.token_type_ids.clone(),
            attention_mask:  f.attention_mask.clone(),
            start_positions: f.start_position,
            end_positions:   f.end_position,
        }
    }
}

impl From<TrainRow> for TrainFeature {
    fn from(r: TrainRow) -> Self {
        Self {
            input_ids:      r.input_ids,
            token_type_ids: r.token_type_ids,
            attention_mask: r.attention_mask,
            start_position: r.start_positions,
            end_position:   r.end_positions,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EvalRow {
    #[serde(with = "json_column")]
    input_ids:      Vec<u32>,
    #[serde(with = "json_column")]
    token_type_ids: Vec<u32>,
    #[serde(with = "json_column")]
    attention_mask: Vec<u32>,
    #[serde(with = "json_column")]
    offset_mapping: Vec<Offset>,
    example_id:     String,
}

impl From<&EvalFeature> for EvalRow {
    fn from(f: &EvalFeature) -> Self {
        Self {
            input_ids:      f.input_ids.clone(),
            token_type_ids: f.token_type_ids.clone(),
            attention_mask: f.attention_mask.clone(),
            offset_mapping: f.offset_mapping.clone(),
            example_id:     f.example_id.clone(),
        }
    }
}

impl From<EvalRow> for EvalFeature {
    fn from(r: EvalRow) -> Self {
        Self {
            input_ids:      r.input_ids,
            token_type_ids: r.token_type_ids,
            attention_mask: r.attention_mask,
            offset_mapping: r.offset_mapping,
            example_id:     r.example_id,
        }
    }
}

fn write_rows<R: Serialize>(path: &Path, rows: impl IntoIterator<Item = R>) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    tracing::info!("Wrote {} rows to '{}'", count, path.display());
    Ok(count)
}

fn read_rows<R: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<R>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Bad row {} in '{}'", i + 1, path.display())))
        .collect()
}

/// Read a validation/test feature table from any path.
pub fn read_eval_features(path: impl AsRef<Path>) -> Result<Vec<EvalFeature>> {
    let rows: Vec<EvalRow> = read_rows(path.as_ref())?;
    Ok(rows.into_iter().map(EvalFeature::from).collect())
}

/// Read an Examples JSON file from any path.
pub fn read_examples(path: impl AsRef<Path>) -> Result<Vec<Example>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read examples '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed examples file '{}'", path.display()))
}

/// All preprocessed tables of one run live under a single directory.
pub struct FeatureStore {
    dir: PathBuf,
}

impl FeatureStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Like `new`, but creates the directory first.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_train(&self, features: &[TrainFeature]) -> Result<usize> {
        write_rows(&self.dir.join(TRAIN_FILE), features.iter().map(TrainRow::from))
    }

    pub fn read_train(&self) -> Result<Vec<TrainFeature>> {
        let rows: Vec<TrainRow> = read_rows(&self.dir.join(TRAIN_FILE))?;
        Ok(rows.into_iter().map(TrainFeature::from).collect())
    }

    pub fn write_eval(&self, split: EvalSplit, features: &[EvalFeature]) -> Result<usize> {
        write_rows(&self.dir.join(split.features_file()), features.iter().map(EvalRow::from))
    }

    pub fn read_eval(&self, split: EvalSplit) -> Result<Vec<EvalFeature>> {
        read_eval_features(self.dir.join(split.features_file()))
    }

    pub fn write_examples(&self, split: EvalSplit, examples: &[Example]) -> Result<()> {
        let path = self.dir.join(split.examples_file());
        fs::write(&path, serde_json::to_string(examples)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved {} examples to '{}'", examples.len(), path.display());
        Ok(())
    }

    pub fn read_examples(&self, split: EvalSplit) -> Result<Vec<Example>> {
        read_examples(self.dir.join(split.examples_file()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("squad_qa_store_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_train_table_header_and_rows() {
        let store = FeatureStore::create(scratch_dir("train")).unwrap();
        let f = TrainFeature {
            input_ids:      vec![101, 7, 102],
            token_type_ids: vec![0, 0, 1],
            attention_mask: vec![1, 1, 1],
            start_position: 1,
            end_position:   1,
        };
        store.write_train(&[f.clone()]).unwrap();

        let text = fs::read_to_string(store.dir().join(TRAIN_FILE)).unwrap();
        assert!(text.starts_with(
            "input_ids,token_type_ids,attention_mask,start_positions,end_positions"
        ));
        assert_eq!(store.read_train().unwrap(), vec![f]);
    }

    #[test]
    fn test_eval_table_keeps_absent_offsets() {
        let store = FeatureStore::create(scratch_dir("eval")).unwrap();
        let f = EvalFeature {
            input_ids:      vec![101, 7, 102],
            token_type_ids: vec![0, 1, 1],
            attention_mask: vec![1, 1, 1],
            offset_mapping: vec![Some((0, 0)), Some((0, 5)), None],
            example_id:     "q,1".to_string(),
        };
        store.write_eval(EvalSplit::Test, &[f.clone()]).unwrap();

        let text = fs::read_to_string(store.dir().join("preprocessed_test.csv")).unwrap();
        assert!(text.contains("[[0,0],[0,5],null]"));
        assert_eq!(store.read_eval(EvalSplit::Test).unwrap(), vec![f]);
    }

    #[test]
    fn test_examples_file_round_trip() {
        let store = FeatureStore::create(scratch_dir("examples")).unwrap();
        let ex = vec![Example::answered("q1", "Paris is nice.", "Where?", 0, "Paris")];
        store.write_examples(EvalSplit::Validation, &ex).unwrap();
        assert_eq!(store.read_examples(EvalSplit::Validation).unwrap(), ex);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let store = FeatureStore::new(scratch_dir("missing"));
        assert!(store.read_train().is_err());
    }
}
