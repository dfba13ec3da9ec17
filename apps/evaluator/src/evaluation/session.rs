//! Interview sessions: evaluate a list of answers and summarize them.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::errors::EvalError;
use crate::evaluation::aggregator::round2;
use crate::evaluation::orchestrator::EvaluationEngine;
use crate::models::evaluation::{EvaluationResult, ScoreBand, Signal};
use crate::models::question::ResponseInput;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_questions: usize,
    /// Answers that were not blank.
    pub answered: usize,
    pub average_score: f64,
    /// Band of the average score.
    pub performance_band: ScoreBand,
    /// Mean normalized value per signal over answered questions.
    pub signal_averages: BTreeMap<Signal, f64>,
    pub strongest_signal: Option<Signal>,
    pub weakest_signal: Option<Signal>,
    pub band_distribution: BTreeMap<ScoreBand, usize>,
}

/// Evaluates every input in order. The first failure aborts the batch.
pub async fn evaluate_batch(
    engine: &EvaluationEngine,
    inputs: &[ResponseInput],
) -> Result<Vec<EvaluationResult>, EvalError> {
    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        results.push(engine.evaluate_input(input).await?);
    }
    Ok(results)
}

pub fn summarize_session(
    engine: &EvaluationEngine,
    results: &[EvaluationResult],
) -> SessionSummary {
    let aggregator = engine.aggregator();

    let average_score = if results.is_empty() {
        aggregator.range.min
    } else {
        round2(results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64)
    };

    let answered: Vec<&EvaluationResult> = results.iter().filter(|r| !r.degenerate).collect();

    let signal_averages: BTreeMap<Signal, f64> = if answered.is_empty() {
        BTreeMap::new()
    } else {
        Signal::ALL
            .iter()
            .map(|&signal| {
                let total: f64 = answered.iter().map(|r| r.signal_value(signal)).sum();
                (signal, round2(total / answered.len() as f64))
            })
            .collect()
    };

    // Signal::ALL order breaks ties.
    let mut strongest: Option<(Signal, f64)> = None;
    let mut weakest: Option<(Signal, f64)> = None;
    for signal in Signal::ALL {
        let Some(&value) = signal_averages.get(&signal) else {
            continue;
        };
        if strongest.map_or(true, |(_, best)| value > best) {
            strongest = Some((signal, value));
        }
        if weakest.map_or(true, |(_, worst)| value < worst) {
            weakest = Some((signal, value));
        }
    }

    let mut band_distribution: BTreeMap<ScoreBand, usize> =
        ScoreBand::ALL.into_iter().map(|b| (b, 0)).collect();
    for r in results {
        *band_distribution.entry(r.band).or_default() += 1;
    }

    let summary = SessionSummary {
        total_questions: results.len(),
        answered: answered.len(),
        average_score,
        performance_band: aggregator.band_for(average_score),
        signal_averages,
        strongest_signal: strongest.map(|(s, _)| s),
        weakest_signal: weakest.map(|(s, _)| s),
        band_distribution,
    };

    info!(
        "Session summary: {} questions, {} answered, average {:.2} ({})",
        summary.total_questions,
        summary.answered,
        summary.average_score,
        summary.performance_band.as_str()
    );

    summary
}
