//! Headline sentiment: per-article classification and aggregate summaries.
//!
//! Scoring is delegated to a [`PolarityScorer`]; everything here is pure and
//! safe to call repeatedly on the same input.

mod aggregate;
pub mod lexicon;

use crate::news::Article;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub use aggregate::{SentimentSummary, aggregate};
pub use lexicon::LexiconScorer;

/// Per-article threshold. Scores strictly above/below it leave Neutral.
pub const ARTICLE_THRESHOLD: f64 = 0.1;

/// Aggregate trend threshold; the Neutral band is smaller than for
/// [`ARTICLE_THRESHOLD`], so fewer means read as neutral.
pub const TREND_THRESHOLD: f64 = 0.05;

#[derive(Debug, Error, PartialEq)]
pub enum SentimentError {
    #[error("no sentiment results to aggregate")]
    EmptyInput,
}

/// A source of polarity scores in `[-1.0, 1.0]`.
pub trait PolarityScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    Positive,
    Negative,
    Neutral,
}

impl Label {
    fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Label::Positive
        } else if score < -threshold {
            Label::Negative
        } else {
            Label::Neutral
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Label::Positive => "🟢",
            Label::Negative => "🔴",
            Label::Neutral => "🟡",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Label::Positive => "Positive",
            Label::Negative => "Negative",
            Label::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    pub article: Article,
    pub label: Label,
    pub score: f64,
}

pub struct Classifier<S> {
    scorer: S,
}

impl<S: PolarityScorer> Classifier<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    /// Score and label a piece of text. Never fails: anything the scorer
    /// cannot evaluate ends up as `(Neutral, 0.0)`.
    pub fn classify(&self, text: &str) -> (Label, f64) {
        let raw = if text.trim().is_empty() {
            0.0
        } else {
            self.scorer.score(text)
        };
        let score = if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 };
        (Label::from_score(score, ARTICLE_THRESHOLD), score)
    }

    pub fn classify_article(&self, article: &Article) -> SentimentResult {
        let text = format!("{} {}", article.title, article.summary);
        let (label, score) = self.classify(&text);
        tracing::trace!(title = %article.title, %label, score, "classified article");
        SentimentResult {
            article: article.clone(),
            label,
            score,
        }
    }

    pub fn classify_all(&self, articles: &[Article]) -> Vec<SentimentResult> {
        articles.iter().map(|a| self.classify_article(a)).collect()
    }
}
