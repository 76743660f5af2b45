// ============================================================
// Layer 4 — Word-Level Corpus Reader
// ============================================================
// Reads a corpus directory laid out as
//
//   data_dir/
//     train.txt
//     valid.txt
//     test.txt
//
// and turns each split into a flat, ordered sequence of token ids.
//
// Tokenisation rules:
//   - every line is split on whitespace
//   - every line ends with an <eos> token (blank lines included)
//   - ids are assigned in first-seen order, train → valid → test,
//     so the dictionary is shared by all three splits
//
// The vocabulary size is simply the number of distinct words seen.
//
// Reference: Rust Book §8 (HashMap), §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{collections::HashMap, fs, path::Path};

/// End-of-sentence marker appended to every line.
pub const EOS_TOKEN: &str = "<eos>";

/// Bidirectional word ↔ id table.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    word_to_id: HashMap<String, u32>,
    id_to_word: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `word`, assigning the next free id if unseen.
    pub fn add_word(&mut self, word: &str) -> u32 {
        if let Some(&id) = self.word_to_id.get(word) {
            return id;
        }
        let id = self.id_to_word.len() as u32;
        self.id_to_word.push(word.to_string());
        self.word_to_id.insert(word.to_string(), id);
        id
    }

    #[cfg(test)]
    pub fn id(&self, word: &str) -> Option<u32> {
        self.word_to_id.get(word).copied()
    }

    #[cfg(test)]
    pub fn word(&self, id: u32) -> Option<&str> {
        self.id_to_word.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }
}

/// Three tokenised splits plus the dictionary that produced them.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub dictionary: Dictionary,
    pub train:      Vec<u32>,
    pub valid:      Vec<u32>,
    pub test:       Vec<u32>,
}

impl Corpus {
    /// Load train.txt, valid.txt and test.txt from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| -> Result<String> {
            let path = dir.join(name);
            fs::read_to_string(&path)
                .with_context(|| format!("Cannot read corpus split '{}'", path.display()))
        };

        let train = read("train.txt")?;
        let valid = read("valid.txt")?;
        let test  = read("test.txt")?;

        let corpus = Self::from_texts(&train, &valid, &test);
        if corpus.dictionary.is_empty() {
            bail!("Corpus in '{}' contains no tokens", dir.display());
        }
        tracing::info!(
            "Corpus '{}': vocab={} train={} valid={} test={} tokens",
            dir.display(),
            corpus.vocab_size(),
            corpus.train.len(),
            corpus.valid.len(),
            corpus.test.len(),
        );
        Ok(corpus)
    }

    /// Tokenise three in-memory splits with one shared dictionary.
    pub fn from_texts(train: &str, valid: &str, test: &str) -> Self {
        let mut dictionary = Dictionary::new();
        let train = tokenize(&mut dictionary, train);
        let valid = tokenize(&mut dictionary, valid);
        let test  = tokenize(&mut dictionary, test);
        Self { dictionary, train, valid, test }
    }

    pub fn vocab_size(&self) -> usize {
        self.dictionary.len()
    }
}

fn tokenize(dictionary: &mut Dictionary, text: &str) -> Vec<u32> {
    let mut ids = Vec::new();
    for line in text.lines() {
        for word in line.split_whitespace() {
            ids.push(dictionary.add_word(word));
        }
        ids.push(dictionary.add_word(EOS_TOKEN));
    }
    ids
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_line_ends_with_eos() {
        let corpus = Corpus::from_texts("the cat\nsat", "", "");
        let eos    = corpus.dictionary.id(EOS_TOKEN).unwrap();
        // the cat <eos> sat <eos>
        assert_eq!(corpus.train.len(), 5);
        assert_eq!(corpus.train[2], eos);
        assert_eq!(corpus.train[4], eos);
    }

    #[test]
    fn test_ids_are_first_seen_and_shared_across_splits() {
        let corpus = Corpus::from_texts("a b a", "b c", "d");
        let d = &corpus.dictionary;
        assert_eq!(d.id("a"), Some(0));
        assert_eq!(d.id("b"), Some(1));
        assert_eq!(d.id(EOS_TOKEN), Some(2));
        assert_eq!(d.id("c"), Some(3));
        assert_eq!(d.id("d"), Some(4));
        assert_eq!(corpus.valid, vec![1, 3, 2]);
        assert_eq!(corpus.vocab_size(), 5);
        assert_eq!(d.word(3), Some("c"));
    }

    #[test]
    fn test_blank_line_is_a_lone_eos() {
        let corpus = Corpus::from_texts("x\n\ny", "", "");
        let eos    = corpus.dictionary.id(EOS_TOKEN).unwrap();
        assert_eq!(corpus.train[1..3], [eos, eos]);
    }

    #[test]
    fn test_load_reads_three_splits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.txt"), "one two three\nfour").unwrap();
        fs::write(dir.path().join("valid.txt"), "two four").unwrap();
        fs::write(dir.path().join("test.txt"), "five").unwrap();

        let corpus = Corpus::load(dir.path()).unwrap();
        assert_eq!(corpus.train.len(), 6);
        assert_eq!(corpus.valid.len(), 3);
        assert_eq!(corpus.test.len(), 2);
        assert_eq!(corpus.vocab_size(), 6);
    }

    #[test]
    fn test_load_reports_missing_split() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.txt"), "a").unwrap();
        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("valid.txt"));
    }

    #[test]
    fn test_load_rejects_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["train.txt", "valid.txt", "test.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no tokens"));
    }
}
