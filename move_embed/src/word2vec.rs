//! Skip-gram embedding with negative sampling
//!
//! Each center token is trained to predict the tokens around it. The context
//! window is shrunk at random per position, and negative samples are drawn
//! from the unigram distribution raised to the 3/4 power. Training runs on a
//! seeded generator, so the same corpus and configuration give the same
//! vectors.

use crate::{EmbedError, Result};
use ndarray::{Array2, ArrayView1};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Skip-gram hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipGramConfig {
    /// Embedding dimension
    pub vector_size: usize,
    /// Maximum distance between center and context token
    pub window: usize,
    /// Tokens seen fewer times are dropped from the vocabulary
    pub min_count: usize,
    /// Negative samples per positive pair
    pub negative: usize,
    /// Initial learning rate, decayed linearly across epochs
    pub learning_rate: f32,
    /// Passes over the corpus
    pub epochs: usize,
    /// Seed for initialisation and sampling
    pub seed: u64,
}

impl Default for SkipGramConfig {
    fn default() -> Self {
        Self {
            vector_size: 50,
            window: 5,
            min_count: 1,
            negative: 5,
            learning_rate: 0.025,
            epochs: 5,
            seed: 42,
        }
    }
}

impl SkipGramConfig {
    fn validate(&self) -> Result<()> {
        if self.vector_size == 0 {
            return Err(EmbedError::InvalidParameter(
                "vector_size must be greater than zero".to_string(),
            ));
        }
        if self.window == 0 {
            return Err(EmbedError::InvalidParameter(
                "window must be greater than zero".to_string(),
            ));
        }
        if self.epochs == 0 {
            return Err(EmbedError::InvalidParameter(
                "epochs must be greater than zero".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(EmbedError::InvalidParameter(
                "learning_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Skip-gram model over a token vocabulary
#[derive(Debug, Clone)]
pub struct Word2Vec {
    config: SkipGramConfig,
    word2idx: HashMap<String, usize>,
    idx2word: Vec<String>,
    word_counts: Vec<usize>,
    /// Input (token) vectors
    syn0: Option<Array2<f32>>,
    /// Output (context) vectors
    syn1neg: Option<Array2<f32>>,
}

/// On-disk form: configuration, vocabulary and token vectors
#[derive(Serialize, Deserialize)]
struct SavedModel {
    config: SkipGramConfig,
    words: Vec<String>,
    counts: Vec<usize>,
    vectors: Vec<Vec<f32>>,
}

impl Word2Vec {
    /// Create an untrained model
    pub fn new(config: SkipGramConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            word2idx: HashMap::new(),
            idx2word: Vec::new(),
            word_counts: Vec::new(),
            syn0: None,
            syn1neg: None,
        })
    }

    /// Model configuration
    pub fn config(&self) -> &SkipGramConfig {
        &self.config
    }

    /// Build the vocabulary, most frequent tokens first (ties by token)
    pub fn build_vocab(&mut self, sentences: &[Vec<String>]) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sentence in sentences {
            for word in sentence {
                *counts.entry(word.as_str()).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_count)
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        self.word2idx.clear();
        self.idx2word.clear();
        self.word_counts.clear();
        for (idx, (word, count)) in words.into_iter().enumerate() {
            self.word2idx.insert(word.to_string(), idx);
            self.idx2word.push(word.to_string());
            self.word_counts.push(count);
        }
        self.syn0 = None;
        self.syn1neg = None;

        log::info!("Vocabulary size: {}", self.vocab_size());
    }

    /// Train on the sentences for the configured number of epochs
    pub fn train(&mut self, sentences: &[Vec<String>]) -> Result<()> {
        if self.idx2word.is_empty() {
            return Err(EmbedError::EmptyCorpus);
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let dim = self.config.vector_size;
        let vocab = self.vocab_size();

        let scale = 1.0 / dim as f32;
        let mut syn0 = Array2::from_shape_fn((vocab, dim), |_| (rng.gen::<f32>() - 0.5) * scale);
        let mut syn1neg = Array2::<f32>::zeros((vocab, dim));

        let sampler = WeightedIndex::new(
            self.word_counts
                .iter()
                .map(|&count| (count as f64).powf(0.75)),
        )
        .map_err(|e| EmbedError::InvalidParameter(format!("Sampling table: {}", e)))?;

        let encoded: Vec<Vec<usize>> = sentences
            .iter()
            .map(|s| s.iter().filter_map(|w| self.word2idx.get(w).copied()).collect())
            .collect();

        let epochs = self.config.epochs;
        let base_lr = self.config.learning_rate;
        let mut step = SkipGramStep {
            window: self.config.window,
            negative: self.config.negative,
            neu1e: vec![0.0; dim],
        };

        for epoch in 0..epochs {
            let lr = (base_lr * (1.0 - epoch as f32 / epochs as f32)).max(base_lr * 0.0001);
            for indices in &encoded {
                step.train_sentence(&mut syn0, &mut syn1neg, indices, lr, &sampler, &mut rng);
            }
            log::debug!("Epoch {}/{} done, lr {:.5}", epoch + 1, epochs, lr);
        }

        self.syn0 = Some(syn0);
        self.syn1neg = Some(syn1neg);
        log::info!(
            "Trained {} vectors of size {} over {} sentences",
            vocab,
            dim,
            sentences.len()
        );
        Ok(())
    }

    /// Number of tokens in the vocabulary
    pub fn vocab_size(&self) -> usize {
        self.idx2word.len()
    }

    /// Tokens, most frequent first
    pub fn words(&self) -> &[String] {
        &self.idx2word
    }

    /// Whether a token is in the vocabulary
    pub fn contains(&self, word: &str) -> bool {
        self.word2idx.contains_key(word)
    }

    /// Corpus count of a token
    pub fn count(&self, word: &str) -> Option<usize> {
        self.word2idx.get(word).map(|&idx| self.word_counts[idx])
    }

    fn vectors(&self) -> Result<&Array2<f32>> {
        self.syn0.as_ref().ok_or(EmbedError::NotTrained)
    }

    fn index(&self, word: &str) -> Result<usize> {
        self.word2idx
            .get(word)
            .copied()
            .ok_or_else(|| EmbedError::WordNotFound(word.to_string()))
    }

    /// Embedding vector of a token
    pub fn vector(&self, word: &str) -> Result<Vec<f32>> {
        let vectors = self.vectors()?;
        Ok(vectors.row(self.index(word)?).to_vec())
    }

    /// Cosine similarity of two tokens
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let vectors = self.vectors()?;
        Ok(cosine_similarity(
            vectors.row(self.index(a)?),
            vectors.row(self.index(b)?),
        ))
    }

    /// The `top_n` tokens closest to `word`, excluding `word` itself
    pub fn most_similar(&self, word: &str, top_n: usize) -> Result<Vec<(String, f32)>> {
        let vectors = self.vectors()?;
        let target = self.index(word)?;
        let query = vectors.row(target);

        let mut scored: Vec<(usize, f32)> = (0..self.vocab_size())
            .filter(|&i| i != target)
            .map(|i| (i, cosine_similarity(query, vectors.row(i))))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(i, sim)| (self.idx2word[i].clone(), sim))
            .collect())
    }

    /// Save vocabulary and token vectors as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let vectors = self.vectors()?;
        let saved = SavedModel {
            config: self.config.clone(),
            words: self.idx2word.clone(),
            counts: self.word_counts.clone(),
            vectors: vectors.rows().into_iter().map(|r| r.to_vec()).collect(),
        };

        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(writer, &saved)?;
        log::info!("Saved model to {}", path.as_ref().display());
        Ok(())
    }

    /// Load a model written by [`Word2Vec::save`].
    ///
    /// Loaded models answer queries; calling `train` again starts from fresh
    /// vectors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let saved: SavedModel = serde_json::from_reader(reader)?;
        saved.config.validate()?;

        let dim = saved.config.vector_size;
        if saved.words.len() != saved.vectors.len()
            || saved.words.len() != saved.counts.len()
            || saved.vectors.iter().any(|v| v.len() != dim)
        {
            return Err(EmbedError::InvalidParameter(
                "Saved model has inconsistent shapes".to_string(),
            ));
        }

        let flat: Vec<f32> = saved.vectors.into_iter().flatten().collect();
        let syn0 = Array2::from_shape_vec((saved.words.len(), dim), flat)
            .map_err(|e| EmbedError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            word2idx: saved
                .words
                .iter()
                .enumerate()
                .map(|(i, w)| (w.clone(), i))
                .collect(),
            idx2word: saved.words,
            word_counts: saved.counts,
            config: saved.config,
            syn0: Some(syn0),
            syn1neg: None,
        })
    }
}

/// Scratch state for one skip-gram pass
struct SkipGramStep {
    window: usize,
    negative: usize,
    neu1e: Vec<f32>,
}

impl SkipGramStep {
    fn train_sentence<R: Rng>(
        &mut self,
        syn0: &mut Array2<f32>,
        syn1neg: &mut Array2<f32>,
        indices: &[usize],
        lr: f32,
        sampler: &WeightedIndex<f64>,
        rng: &mut R,
    ) {
        if indices.len() < 2 {
            return;
        }

        for (pos, &center) in indices.iter().enumerate() {
            let reduced = rng.gen_range(1..=self.window);
            let start = pos.saturating_sub(reduced);
            let end = (pos + reduced + 1).min(indices.len());

            for (ctx_pos, &context) in indices.iter().enumerate().take(end).skip(start) {
                if ctx_pos == pos {
                    continue;
                }

                self.neu1e.iter_mut().for_each(|v| *v = 0.0);
                self.update_pair(syn0, syn1neg, center, context, 1.0, lr);

                for _ in 0..self.negative {
                    let target = sampler.sample(rng);
                    if target == context {
                        continue;
                    }
                    self.update_pair(syn0, syn1neg, center, target, 0.0, lr);
                }

                let mut row = syn0.row_mut(center);
                for (v, e) in row.iter_mut().zip(&self.neu1e) {
                    *v += e;
                }
            }
        }
    }

    /// Accumulate the center gradient and update the output vector of `target`
    fn update_pair(
        &mut self,
        syn0: &Array2<f32>,
        syn1neg: &mut Array2<f32>,
        center: usize,
        target: usize,
        label: f32,
        lr: f32,
    ) {
        let input = syn0.row(center);
        let mut output = syn1neg.row_mut(target);

        let dot = input.dot(&output);
        let g = (label - sigmoid(dot)) * lr;

        for ((e, o), i) in self.neu1e.iter_mut().zip(output.iter_mut()).zip(input.iter()) {
            *e += g * *o;
            *o += g * *i;
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm == 0.0 {
        0.0
    } else {
        a.dot(&b) / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sentences() -> Vec<Vec<String>> {
        ["up down up up flat", "down down up flat up", "flat up down up down"]
            .iter()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_vocab_order_and_counts() {
        let mut model = Word2Vec::new(SkipGramConfig::default()).unwrap();
        model.build_vocab(&sentences());

        assert_eq!(model.words(), &["up", "down", "flat"]);
        assert_eq!(model.count("up"), Some(7));
        assert_eq!(model.count("flat"), Some(3));
        assert!(!model.contains("sideways"));
    }

    #[test]
    fn test_min_count_filters() {
        let config = SkipGramConfig {
            min_count: 4,
            ..SkipGramConfig::default()
        };
        let mut model = Word2Vec::new(config).unwrap();
        model.build_vocab(&sentences());
        assert_eq!(model.vocab_size(), 2);
    }

    #[test]
    fn test_train_and_query() {
        let mut model = Word2Vec::new(SkipGramConfig::default()).unwrap();
        let corpus = sentences();
        model.build_vocab(&corpus);
        model.train(&corpus).unwrap();

        assert_eq!(model.vector("up").unwrap().len(), 50);
        assert!(model.vector("up").unwrap().iter().all(|v| v.is_finite()));

        let similar = model.most_similar("up", 3).unwrap();
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|(w, _)| w != "up"));
        assert!(similar[0].1 >= similar[1].1);

        assert_relative_eq!(model.similarity("down", "down").unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_training_is_deterministic() {
        let corpus = sentences();
        let train = || {
            let mut model = Word2Vec::new(SkipGramConfig::default()).unwrap();
            model.build_vocab(&corpus);
            model.train(&corpus).unwrap();
            model.vector("flat").unwrap()
        };
        assert_eq!(train(), train());
    }

    #[test]
    fn test_errors() {
        let mut model = Word2Vec::new(SkipGramConfig::default()).unwrap();
        assert!(matches!(model.train(&sentences()), Err(EmbedError::EmptyCorpus)));

        model.build_vocab(&sentences());
        assert!(matches!(model.vector("up"), Err(EmbedError::NotTrained)));

        model.train(&sentences()).unwrap();
        assert!(matches!(
            model.vector("sideways"),
            Err(EmbedError::WordNotFound(_))
        ));

        let bad = SkipGramConfig {
            vector_size: 0,
            ..SkipGramConfig::default()
        };
        assert!(Word2Vec::new(bad).is_err());
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let zero = ndarray::arr1(&[0.0f32, 0.0]);
        let one = ndarray::arr1(&[1.0f32, 0.0]);
        assert_eq!(cosine_similarity(zero.view(), one.view()), 0.0);
    }
}
