//! # Move Embed
//!
//! Turns candles into `up`/`down`/`flat` movement symbols, groups them into
//! sequences, and learns a skip-gram embedding for the symbols.
//!
//! ```no_run
//! use move_embed::movement::{movements, sliding_sequences};
//! use move_embed::{SkipGramConfig, Word2Vec};
//! use minute_data::loader::load_minute_data;
//!
//! let candles = load_minute_data("ohlc_data.csv")?;
//! let sentences = sliding_sequences(&movements(&candles), 10);
//!
//! let mut model = Word2Vec::new(SkipGramConfig::default())?;
//! model.build_vocab(&sentences);
//! model.train(&sentences)?;
//!
//! println!("{:?}", model.most_similar("up", 3)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

pub mod movement;
pub mod word2vec;

pub use movement::Movement;
pub use word2vec::{SkipGramConfig, Word2Vec};

/// Errors from sequence building and embedding training
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Corpus is empty or no word reaches min_count")]
    EmptyCorpus,

    #[error("Word not in vocabulary: {0}")]
    WordNotFound(String),

    #[error("Model has not been trained")]
    NotTrained,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type with the crate error
pub type Result<T> = std::result::Result<T, EmbedError>;
