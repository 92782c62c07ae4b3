use super::{Label, SentimentError, SentimentResult, TREND_THRESHOLD};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub mean_score: f64,
    pub trend: Label,
}

impl SentimentSummary {
    pub fn total(&self) -> usize {
        self.positive_count + self.negative_count + self.neutral_count
    }
}

/// Overall trend for a mean score.
pub fn trend_for(mean_score: f64) -> Label {
    Label::from_score(mean_score, TREND_THRESHOLD)
}

/// Tally labels and average scores. Fails with [`SentimentError::EmptyInput`]
/// rather than producing a mean for zero results.
pub fn aggregate(results: &[SentimentResult]) -> Result<SentimentSummary, SentimentError> {
    if results.is_empty() {
        return Err(SentimentError::EmptyInput);
    }

    let (mut positive_count, mut negative_count, mut neutral_count) = (0, 0, 0);
    let mut total = 0.0;
    for r in results {
        match r.label {
            Label::Positive => positive_count += 1,
            Label::Negative => negative_count += 1,
            Label::Neutral => neutral_count += 1,
        }
        total += r.score;
    }
    let mean_score = total / results.len() as f64;

    Ok(SentimentSummary {
        positive_count,
        negative_count,
        neutral_count,
        mean_score,
        trend: trend_for(mean_score),
    })
}
