// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Resolves the pretrained tokenizer named by
// `--pretrained_model_name` and keeps a copy next to the
// preprocessed data, so training and inference use exactly the
// vocabulary the features were built with.
//
// A name resolves, in order, to:
//   1. a tokenizer.json file path
//   2. a directory containing tokenizer.json
//   3. a Hugging Face Hub identifier (downloaded)

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Load a tokenizer from a file, a model directory or the Hub.
pub fn load_pretrained(name: &str) -> Result<Tokenizer> {
    let path = Path::new(name);
    let local = if path.is_file() {
        Some(path.to_path_buf())
    } else if path.join(TOKENIZER_FILE).is_file() {
        Some(path.join(TOKENIZER_FILE))
    } else {
        None
    };

    match local {
        Some(file) => {
            tracing::info!("Loading tokenizer from '{}'", file.display());
            Tokenizer::from_file(&file).map_err(|e| {
                anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", file.display())
            })
        }
        None => {
            tracing::info!("Fetching tokenizer '{}' from the Hub", name);
            Tokenizer::from_pretrained(name, None)
                .map_err(|e| anyhow::anyhow!("Cannot fetch tokenizer '{name}': {e}"))
        }
    }
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Use the stored copy if present, else resolve `name`.
    pub fn load_or_fetch(&self, name: &str) -> Result<Tokenizer> {
        let path = self.path();
        if path.is_file() {
            tracing::info!("Loading stored tokenizer from '{}'", path.display());
            self.load()
        } else {
            load_pretrained(name)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        let path = self.path();
        tokenizer
            .save(&path, false)
            .map_err(|e| anyhow::anyhow!("Cannot write tokenizer to '{}': {e}", path.display()))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokenizers::models::wordlevel::WordLevel;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("squad_qa_tok_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn tiny_tokenizer() -> Tokenizer {
        let vocab: HashMap<String, u32> = [("[UNK]", 0), ("paris", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let model = WordLevel::builder()
            .vocab(vocab)
            .unk_token("[UNK]".to_string())
            .build()
            .unwrap();
        Tokenizer::new(model)
    }

    #[test]
    fn test_saved_tokenizer_is_preferred() {
        let dir   = scratch_dir("store");
        let store = TokenizerStore::new(&dir);
        store.save(&tiny_tokenizer()).unwrap();

        // the name is never consulted once a copy exists
        let tok = store.load_or_fetch("no/such-model").unwrap();
        assert_eq!(tok.get_vocab_size(true), 2);
    }

    #[test]
    fn test_load_pretrained_from_directory() {
        let dir = scratch_dir("dir");
        TokenizerStore::new(&dir).save(&tiny_tokenizer()).unwrap();
        assert!(load_pretrained(dir.to_str().unwrap()).is_ok());
    }
}
