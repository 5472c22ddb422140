use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use taixiu_data::{Outcome, Round};
use taixiu_engine::ensemble::backtest::BacktestReport;
use taixiu_engine::ensemble::{PredictionReport, RiskLevel};

const DISCLAIMER: &str =
    "Statistical toy: dice rounds are independent, nothing here guarantees a correct or profitable call.";

fn outcome_cell(outcome: Outcome) -> Cell {
    match outcome {
        Outcome::Tai => Cell::new("Tài").fg(Color::Red),
        Outcome::Xiu => Cell::new("Xỉu").fg(Color::Blue),
    }
}

fn risk_cell(risk: RiskLevel) -> Cell {
    match risk {
        RiskLevel::Low => Cell::new("Low").fg(Color::Green),
        RiskLevel::Medium => Cell::new("Medium").fg(Color::Yellow),
        RiskLevel::High => Cell::new("High").fg(Color::Red),
    }
}

pub fn display_prediction(report: &PredictionReport, history: &[Round]) {
    println!("\n== Next-round prediction ==\n");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Rounds seen", "Prediction", "Confidence", "Risk"]);
    table.add_row(vec![
        Cell::new(history.len()),
        outcome_cell(report.prediction),
        Cell::new(format!("{:.1}%", report.confidence * 100.0)),
        risk_cell(report.risk_level),
    ]);
    println!("{table}");

    println!("\n== Per-predictor breakdown ==\n");
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Predictor", "Prediction", "Conf", "Weight", "Vote", "Rationale"]);
    for b in &report.per_predictor {
        let prediction = match b.prediction {
            Some(o) => outcome_cell(o),
            None => Cell::new("—").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&b.name),
            prediction,
            Cell::new(format!("{:.0}%", b.confidence * 100.0)),
            Cell::new(format!("{:.3}", b.weight)),
            Cell::new(format!("{:.3}", b.vote_score)),
            Cell::new(b.rationale.first().map(String::as_str).unwrap_or("")),
        ]);
    }
    println!("{table}");

    let d = &report.diagnostics;
    println!("\nDiagnostics:");
    println!("  entropy (last 30): {:.3}   streak: {}", d.entropy, d.streak);
    let transitions: Vec<String> = d
        .transition_probabilities
        .iter()
        .map(|(k, p)| format!("{k}={:.2}", p))
        .collect();
    println!("  transitions: {}", transitions.join("  "));
    let patterns: Vec<String> = d
        .top_patterns
        .iter()
        .map(|p| format!("{}({})", p.pattern, p.count))
        .collect();
    println!("  top dice patterns: {}", patterns.join(", "));
    println!("  optimizer accuracy on recent window: {:.1}%", d.optimized_accuracy * 100.0);

    println!("\n{DISCLAIMER}");
}

pub fn display_backtest(report: &BacktestReport) {
    println!("\n== Walk-forward backtest ==\n");
    println!(
        "accuracy: {:.1}% over {} rounds",
        report.accuracy * 100.0,
        report.sample_size
    );
    if report.rounds.is_empty() {
        println!("(window too small for a replay; placeholder accuracy reported)");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Round", "Predicted", "Actual", "Hit", "Conf"]);
        // The tail is the interesting part; cap the table at 20 rows.
        let shown = &report.rounds[report.rounds.len().saturating_sub(20)..];
        for r in shown {
            table.add_row(vec![
                Cell::new(r.index),
                outcome_cell(r.predicted),
                outcome_cell(r.actual),
                if r.correct {
                    Cell::new("✓").fg(Color::Green)
                } else {
                    Cell::new("✗").fg(Color::Red)
                },
                Cell::new(format!("{:.0}%", r.confidence * 100.0)),
            ]);
        }
        println!("{table}");
    }

    if let Some(bankroll) = &report.bankroll {
        println!("\n== Kelly bankroll simulation ==\n");
        println!(
            "start {:.1} → final {:.1}   peak {:.1}   max drawdown {:.1}%",
            bankroll.initial,
            bankroll.final_bankroll,
            bankroll.peak,
            bankroll.max_drawdown * 100.0
        );
    }

    println!("\n{DISCLAIMER}");
}

pub fn display_history(history: &[Round], last: usize) {
    let shown = &history[history.len().saturating_sub(last)..];
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Round", "Dice", "Total", "Outcome"]);
    for r in shown {
        table.add_row(vec![
            Cell::new(r.index),
            Cell::new(format!("{} {} {}", r.dice[0], r.dice[1], r.dice[2])),
            Cell::new(r.total),
            outcome_cell(r.outcome),
        ]);
    }
    println!("{table}");
}
