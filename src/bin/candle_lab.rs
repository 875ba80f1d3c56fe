//! Candle Lab CLI
//!
//! Loads a minute candle CSV, drops incomplete trading days, and inspects,
//! charts or embeds what is left.

use anyhow::{bail, Context, Result};
use candle_charts::{
    plot_candle_pair, plot_field_histogram, plot_price_action, plot_single_candle, DEFAULT_BINS,
};
use candle_lab::config::LabConfig;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use env_logger::Env;
use minute_data::frame::union_candles;
use minute_data::loader::{format_timestamp, load_minute_data, parse_timestamp, write_minute_data};
use minute_data::{CandleField, Stock};
use move_embed::movement::{daily_sequences, movements, sliding_sequences};
use move_embed::Word2Vec;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "candle_lab")]
#[command(about = "Clean, chart and embed minute OHLCV candles")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print candle duration, day counts and incomplete days
    Summary {
        /// Candle CSV
        input: PathBuf,
    },

    /// Show what is known about one trading day
    Day {
        /// Candle CSV
        input: PathBuf,

        /// Trading date (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Write candles and their shape features to a CSV
    Features {
        /// Candle CSV
        input: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Draw an SVG chart
    Plot {
        #[command(subcommand)]
        chart: PlotCommand,
    },

    /// Train a movement embedding and print the neighbours of `up`
    Embed {
        /// Candle CSV
        input: PathBuf,

        /// Where to save the trained model (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// One sentence per trading day instead of sliding windows
        #[arg(long)]
        daily: bool,

        /// Number of neighbours to print
        #[arg(short, long, default_value = "3")]
        top_n: usize,
    },

    /// Merge two candle CSVs, keeping the first file's rows on overlap
    Union {
        left: PathBuf,
        right: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum PlotCommand {
    /// Histogram of one column
    Hist {
        input: PathBuf,

        /// Column name, e.g. `body` or `head_pct_ema`
        #[arg(short, long, default_value = "body")]
        field: CandleField,

        #[arg(short, long, default_value_t = DEFAULT_BINS)]
        bins: usize,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// A single candle close up
    Candle {
        input: PathBuf,

        /// Candle timestamp; a bare date means the session open
        #[arg(long, value_parser = parse_when)]
        at: NaiveDateTime,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Two candles side by side on the same scale
    Pair {
        input: PathBuf,

        #[arg(long, value_parser = parse_when)]
        first: NaiveDateTime,

        #[arg(long, value_parser = parse_when)]
        second: NaiveDateTime,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Candlesticks and volume between two timestamps
    Range {
        input: PathBuf,

        #[arg(long, value_parser = parse_when)]
        start: NaiveDateTime,

        #[arg(long, value_parser = parse_when)]
        end: NaiveDateTime,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_when(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_timestamp(raw).map_err(|e| e.to_string())
}

fn load_stock(path: &Path, config: &LabConfig) -> Result<Stock> {
    let options = config.stock_options()?;
    let stock = Stock::from_csv(path, &options)
        .with_context(|| format!("Failed to load candles from {}", path.display()))?;
    log::info!(
        "{}: {} candles over {} days",
        stock.label(),
        stock.total_candles,
        stock.traded_days
    );
    Ok(stock)
}

fn summary(stock: &Stock) {
    println!("Source:          {}", stock.source.display());
    println!("Symbol:          {}", stock.symbol.as_deref().unwrap_or("-"));
    println!("Company:         {}", stock.company_name.as_deref().unwrap_or("-"));
    println!("Candle duration: {}s", stock.duration.seconds);
    println!("Candles per day: {}", stock.candles_per_day);
    println!("Total candles:   {}", stock.total_candles);
    println!("Traded days:     {}", stock.traded_days);
    if let (Some(first), Some(last)) = (stock.candles.first(), stock.candles.last()) {
        println!(
            "Period:          {} .. {}",
            format_timestamp(&first.timestamp),
            format_timestamp(&last.timestamp)
        );
    }

    if stock.incomplete_day_dates.is_empty() {
        println!("Incomplete days: none");
    } else {
        println!("Incomplete days: {}", stock.incomplete_day_dates.len());
        for date in &stock.incomplete_day_dates {
            println!("  {}", date);
        }
    }
}

fn write_features(stock: &mut Stock, span: usize, output: &Path) -> Result<()> {
    stock.add_features(span)?;
    let features = stock
        .features()
        .context("Features missing after computation")?;

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Cannot create {}", output.display()))?;

    let mut header = vec!["timestamp".to_string()];
    header.extend(CandleField::ALL.iter().map(|f| f.name().to_string()));
    writer.write_record(&header)?;

    for (candle, feature) in stock.candles.iter().zip(features) {
        let mut row = vec![format_timestamp(&candle.timestamp)];
        row.extend(CandleField::ALL.iter().map(|field| {
            field
                .value(candle, Some(feature))
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }
    writer.flush()?;

    println!("Wrote {} rows to {}", stock.candles.len(), output.display());
    Ok(())
}

fn plot(chart: PlotCommand, config: &LabConfig) -> Result<()> {
    match chart {
        PlotCommand::Hist {
            input,
            field,
            bins,
            output,
        } => {
            let mut stock = load_stock(&input, config)?;
            if field.is_feature() {
                stock.add_features(config.ema_span)?;
            }
            plot_field_histogram(&output, &stock, field, bins, &config.chart)?;
        }

        PlotCommand::Candle { input, at, output } => {
            let stock = load_stock(&input, config)?;
            plot_single_candle(&output, stock.candle_at(at)?, &config.chart)?;
        }

        PlotCommand::Pair {
            input,
            first,
            second,
            output,
        } => {
            let stock = load_stock(&input, config)?;
            plot_candle_pair(
                &output,
                stock.candle_at(first)?,
                stock.candle_at(second)?,
                &config.chart,
            )?;
        }

        PlotCommand::Range {
            input,
            start,
            end,
            output,
        } => {
            let stock = load_stock(&input, config)?;
            let candles = stock.range(start, end)?;
            let title = format!(
                "{} : {} to {}",
                stock.label(),
                format_timestamp(&candles[0].timestamp),
                format_timestamp(&candles[candles.len() - 1].timestamp)
            );
            plot_price_action(&output, &title, candles, stock.rule.open(), &config.chart)?;
        }
    }

    Ok(())
}

fn embed(stock: &Stock, config: &LabConfig, output: &Path, daily: bool, top_n: usize) -> Result<()> {
    let sentences = if daily {
        daily_sequences(stock)
    } else {
        sliding_sequences(&movements(&stock.candles), config.sequence_length)
    };
    if sentences.is_empty() {
        bail!(
            "{} candles are too few for sequences of length {}",
            stock.total_candles,
            config.sequence_length
        );
    }
    log::info!("Built {} sentences", sentences.len());

    let mut model = Word2Vec::new(config.embedding.clone())?;
    model.build_vocab(&sentences);
    model.train(&sentences)?;
    model.save(output)?;

    for word in model.words() {
        println!("{:<5} count {}", word, model.count(word).unwrap_or(0));
    }

    let up = model.vector("up")?;
    let preview: Vec<String> = up.iter().take(5).map(|v| format!("{:.4}", v)).collect();
    println!("Vector for 'up' (first 5 of {}): [{}]", up.len(), preview.join(", "));

    println!("Most similar to 'up':");
    for (word, similarity) in model.most_similar("up", top_n)? {
        println!("  {:<5} {:.4}", word, similarity);
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = LabConfig::load(cli.config.as_deref()).context("Failed to read configuration")?;

    match cli.command {
        Commands::Summary { input } => {
            let stock = load_stock(&input, &config)?;
            summary(&stock);
        }

        Commands::Day { input, date } => {
            let stock = load_stock(&input, &config)?;
            let info = stock.trading_day_info(date);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Features { input, output } => {
            let mut stock = load_stock(&input, &config)?;
            write_features(&mut stock, config.ema_span, &output)?;
        }

        Commands::Plot { chart } => plot(chart, &config)?,

        Commands::Embed {
            input,
            output,
            daily,
            top_n,
        } => {
            let stock = load_stock(&input, &config)?;
            embed(&stock, &config, &output, daily, top_n)?;
        }

        Commands::Union {
            left,
            right,
            output,
        } => {
            let left_candles = load_minute_data(&left)
                .with_context(|| format!("Failed to load {}", left.display()))?;
            let right_candles = load_minute_data(&right)
                .with_context(|| format!("Failed to load {}", right.display()))?;
            let merged = union_candles(&left_candles, &right_candles)?;
            write_minute_data(&output, &merged)?;
            println!(
                "{} + {} rows -> {} rows in {}",
                left_candles.len(),
                right_candles.len(),
                merged.len(),
                output.display()
            );
        }
    }

    Ok(())
}
