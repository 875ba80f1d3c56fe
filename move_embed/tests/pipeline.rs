use approx::assert_relative_eq;
use minute_data::utils::seeded_minute_data;
use minute_data::{SessionRule, Stock, StockOptions};
use move_embed::movement::{daily_sequences, movements, sliding_sequences};
use move_embed::{EmbedError, SkipGramConfig, Word2Vec};
use tempfile::TempDir;

fn stock() -> Stock {
    let candles = seeded_minute_data(3, 4, &SessionRule::default());
    Stock::from_candles(candles, "sbin.csv", &StockOptions::default()).unwrap()
}

fn small_config() -> SkipGramConfig {
    SkipGramConfig {
        vector_size: 16,
        epochs: 2,
        ..SkipGramConfig::default()
    }
}

#[test]
fn test_windows_cover_every_candle_run() {
    let stock = stock();
    let moves = movements(&stock.candles);
    let sentences = sliding_sequences(&moves, 10);

    assert_eq!(moves.len(), stock.total_candles);
    assert_eq!(sentences.len(), stock.total_candles - 9);
    assert!(sentences.iter().all(|s| s.len() == 10));

    let days = daily_sequences(&stock);
    assert_eq!(days.len(), stock.traded_days);
    assert!(days.iter().all(|d| d.len() == stock.candles_per_day));
}

#[test]
fn test_train_save_and_reload() {
    let stock = stock();
    let sentences = sliding_sequences(&movements(&stock.candles), 10);

    let mut model = Word2Vec::new(small_config()).unwrap();
    model.build_vocab(&sentences);
    model.train(&sentences).unwrap();

    assert!(model.contains("up"));
    assert!(model.contains("down"));
    let up = model.vector("up").unwrap();
    assert_eq!(up.len(), 16);

    let neighbours = model.most_similar("up", 3).unwrap();
    assert!(!neighbours.is_empty());
    assert!(neighbours.iter().all(|(word, _)| word != "up"));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movement.w2v.json");
    model.save(&path).unwrap();

    let loaded = Word2Vec::load(&path).unwrap();
    assert_eq!(loaded.words(), model.words());
    assert_eq!(loaded.config(), model.config());
    for (a, b) in loaded.vector("up").unwrap().iter().zip(&up) {
        assert_relative_eq!(*a, *b);
    }
    assert_relative_eq!(
        loaded.similarity("up", "down").unwrap(),
        model.similarity("up", "down").unwrap(),
        epsilon = 1e-6
    );
}

#[test]
fn test_untrained_model_cannot_be_saved() {
    let mut model = Word2Vec::new(small_config()).unwrap();
    model.build_vocab(&[vec!["up".to_string()]]);

    let dir = TempDir::new().unwrap();
    let result = model.save(dir.path().join("model.json"));
    assert!(matches!(result, Err(EmbedError::NotTrained)));
}
