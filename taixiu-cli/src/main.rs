mod display;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use taixiu_data::{shape_history, RawRecord, Round};
use taixiu_engine::config::EngineConfig;
use taixiu_engine::Engine;

#[derive(Parser)]
#[command(name = "taixiu", about = "Tài/Xỉu ensemble forecasting (statistical toy, no guarantee)")]
struct Cli {
    /// Optional engine configuration file (JSON); defaults apply otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict the next round from a history file
    Predict {
        /// JSON array of raw round records
        input: PathBuf,

        /// Emit the full report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Walk-forward backtest over the trailing rounds
    Backtest {
        /// JSON array of raw round records
        input: PathBuf,

        /// Number of trailing rounds to replay
        #[arg(short, long, default_value = "160")]
        lookback: usize,

        /// Also simulate a Kelly-staked bankroll
        #[arg(long)]
        bankroll: bool,

        /// Emit the full report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent rounds of a history file
    History {
        /// JSON array of raw round records
        input: PathBuf,

        /// Number of rounds to show
        #[arg(short, long, default_value = "10")]
        last: usize,
    },
}

/// JSON output wrapper carrying the report plus a timestamp.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    generated_at: String,
    #[serde(flatten)]
    report: T,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Predict { input, json } => cmd_predict(config, &input, json),
        Command::Backtest { input, lookback, bankroll, json } => {
            cmd_backtest(config, &input, lookback, bankroll, json)
        }
        Command::History { input, last } => cmd_history(&input, last),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn load_history(path: &Path) -> Result<Vec<Round>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read history file {}", path.display()))?;
    let records: Vec<RawRecord> = serde_json::from_str(&text)
        .with_context(|| format!("history file {} is not a JSON record array", path.display()))?;
    let history = shape_history(&records);
    if history.is_empty() {
        bail!("no usable rounds in {}", path.display());
    }
    Ok(history)
}

fn cmd_predict(config: EngineConfig, input: &Path, json: bool) -> Result<()> {
    let history = load_history(input)?;
    let engine = Engine::new(config);
    let report = engine.predict(&history)?;

    if json {
        let envelope = Envelope { generated_at: Utc::now().to_rfc3339(), report };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        display::display_prediction(&report, &history);
    }
    Ok(())
}

fn cmd_backtest(
    config: EngineConfig,
    input: &Path,
    lookback: usize,
    bankroll: bool,
    json: bool,
) -> Result<()> {
    let history = load_history(input)?;
    let engine = Engine::new(config);
    let report = engine.backtest(&history, lookback, bankroll)?;

    if json {
        let envelope = Envelope { generated_at: Utc::now().to_rfc3339(), report };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        display::display_backtest(&report);
    }
    Ok(())
}

fn cmd_history(input: &Path, last: usize) -> Result<()> {
    let history = load_history(input)?;
    display::display_history(&history, last);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("taixiu-cli-test-{name}"));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.warm_threshold, EngineConfig::default().warm_threshold);
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let path = temp_file("config.json", r#"{"optimizer_iters": 50}"#);
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.optimizer_iters, 50);
        assert_eq!(config.markov_window, EngineConfig::default().markov_window);
    }

    #[test]
    fn test_load_history_rejects_missing_file() {
        assert!(load_history(Path::new("/nonexistent/history.json")).is_err());
    }

    #[test]
    fn test_load_history_parses_records() {
        let path = temp_file(
            "history.json",
            r#"[
                {"Phien": 2, "Xuc_xac_1": 5, "Xuc_xac_2": 4, "Xuc_xac_3": 5, "Tong": 14, "Ket_qua": "Tài"},
                {"Phien": "1", "Xuc_xac_1": "2", "Xuc_xac_2": 2, "Xuc_xac_3": 3, "Tong": "7", "Ket_qua": "x"}
            ]"#,
        );
        let history = load_history(&path).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].index, 1);
        assert_eq!(history[1].total, 14);
    }

    #[test]
    fn test_load_history_rejects_all_malformed() {
        let path = temp_file("bad.json", r#"[{"Phien": 1}]"#);
        assert!(load_history(&path).is_err());
    }
}
