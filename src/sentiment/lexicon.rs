//! Word-list polarity scorer.
//!
//! Each known word carries a polarity in `[-1, 1]`. The text score is the
//! mean over known words after applying intensifiers ("very good") and
//! negations ("not good"). Text without any known word scores `0.0`.

use super::PolarityScorer;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

const NEGATION_FACTOR: f64 = -0.5;
const NEGATION_WINDOW: usize = 2;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z]+)?").expect("token regex"));

const BUILTIN_WORDS: &[(&str, f64)] = &[
    // general
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("best", 1.0),
    ("better", 0.5),
    ("positive", 0.23),
    ("success", 0.3),
    ("successful", 0.75),
    ("win", 0.8),
    ("wins", 0.8),
    ("happy", 0.8),
    ("optimistic", 0.6),
    ("confident", 0.5),
    ("bad", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("poor", -0.4),
    ("terrible", -1.0),
    ("negative", -0.3),
    ("fail", -0.5),
    ("fails", -0.5),
    ("failure", -0.3),
    ("fear", -0.6),
    ("fears", -0.6),
    ("worry", -0.5),
    ("worries", -0.5),
    ("concern", -0.3),
    ("concerns", -0.3),
    ("uncertain", -0.3),
    ("uncertainty", -0.3),
    ("pessimistic", -0.6),
    ("risky", -0.4),
    ("crisis", -0.6),
    ("disappointing", -0.6),
    ("weak", -0.4),
    ("strong", 0.43),
    ("stronger", 0.5),
    // markets
    ("gain", 0.4),
    ("gains", 0.4),
    ("surge", 0.6),
    ("surges", 0.6),
    ("soar", 0.7),
    ("soars", 0.7),
    ("jump", 0.4),
    ("jumps", 0.4),
    ("rally", 0.5),
    ("rallies", 0.5),
    ("rebound", 0.4),
    ("record", 0.3),
    ("growth", 0.4),
    ("profit", 0.4),
    ("profits", 0.4),
    ("beat", 0.3),
    ("beats", 0.3),
    ("upgrade", 0.5),
    ("upgraded", 0.5),
    ("bullish", 0.7),
    ("boom", 0.6),
    ("outperform", 0.5),
    ("recovery", 0.4),
    ("dividend", 0.2),
    ("loss", -0.4),
    ("losses", -0.4),
    ("drop", -0.4),
    ("drops", -0.4),
    ("fall", -0.4),
    ("falls", -0.4),
    ("plunge", -0.7),
    ("plunges", -0.7),
    ("slump", -0.6),
    ("slumps", -0.6),
    ("tumble", -0.6),
    ("tumbles", -0.6),
    ("crash", -0.8),
    ("selloff", -0.6),
    ("recession", -0.6),
    ("downgrade", -0.5),
    ("downgraded", -0.5),
    ("bearish", -0.7),
    ("miss", -0.3),
    ("misses", -0.3),
    ("layoffs", -0.5),
    ("bankruptcy", -0.8),
    ("default", -0.5),
    ("inflation", -0.2),
    ("volatile", -0.3),
    ("lawsuit", -0.4),
    ("probe", -0.3),
    ("tariffs", -0.3),
    ("underperform", -0.5),
];

const BUILTIN_INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("really", 1.2),
    ("sharply", 1.4),
    ("significantly", 1.3),
    ("slightly", 0.5),
    ("somewhat", 0.7),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "nor", "without"];

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lexicon {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("polarity for '{word}' must be within [-1, 1], got {value}")]
    OutOfRange { word: String, value: f64 },
    #[error("intensifier '{word}' must be positive, got {value}")]
    BadIntensifier { word: String, value: f64 },
}

/// On-disk lexicon extension.
#[derive(Debug, Default, Deserialize)]
struct LexiconFile {
    #[serde(default)]
    words: HashMap<String, f64>,
    #[serde(default)]
    intensifiers: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct LexiconScorer {
    words: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self {
            words: BUILTIN_WORDS.iter().map(|(w, p)| (w.to_string(), *p)).collect(),
            intensifiers: BUILTIN_INTENSIFIERS
                .iter()
                .map(|(w, f)| (w.to_string(), *f))
                .collect(),
        }
    }
}

impl LexiconScorer {
    /// Built-in lexicon extended (and overridden) by the entries in `path`.
    pub fn from_file(path: &Path) -> Result<Self, LexiconError> {
        let txt = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut scorer = Self::default();
        scorer.extend_from_toml(&txt).map_err(|e| match e {
            LexiconError::Parse { source, .. } => LexiconError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), words = scorer.words.len(), "loaded lexicon");
        Ok(scorer)
    }

    pub fn extend_from_toml(&mut self, txt: &str) -> Result<(), LexiconError> {
        let file: LexiconFile = toml::from_str(txt).map_err(|source| LexiconError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        for (word, value) in &file.words {
            if !(-1.0..=1.0).contains(value) {
                return Err(LexiconError::OutOfRange {
                    word: word.clone(),
                    value: *value,
                });
            }
        }
        for (word, value) in &file.intensifiers {
            if !(*value > 0.0 && value.is_finite()) {
                return Err(LexiconError::BadIntensifier {
                    word: word.clone(),
                    value: *value,
                });
            }
        }
        self.words
            .extend(file.words.into_iter().map(|(w, p)| (w.to_lowercase(), p)));
        self.intensifiers
            .extend(file.intensifiers.into_iter().map(|(w, f)| (w.to_lowercase(), f)));
        Ok(())
    }

    fn is_negation(token: &str) -> bool {
        NEGATIONS.contains(&token) || token.ends_with("n't")
    }
}

impl PolarityScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        // Feeds mostly use typographic apostrophes ("isn’t").
        let lower = text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
        let tokens: Vec<&str> = TOKEN_RE.find_iter(&lower).map(|m| m.as_str()).collect();

        let mut sum = 0.0;
        let mut hits = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&polarity) = self.words.get(*token) else {
                continue;
            };
            let mut value = polarity;
            if let Some(factor) = i
                .checked_sub(1)
                .and_then(|j| self.intensifiers.get(tokens[j]))
            {
                value *= factor;
            }
            let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
            if window.iter().any(|t| Self::is_negation(t)) {
                value *= NEGATION_FACTOR;
            }
            sum += value;
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (sum / hits as f64).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_unknown_or_empty_text_scores_zero() {
        let s = LexiconScorer::default();
        assert_eq!(s.score(""), 0.0);
        assert_eq!(s.score("the quarterly report was published on tuesday"), 0.0);
    }

    #[test]
    fn test_mean_over_known_words() {
        let s = LexiconScorer::default();
        // good 0.7, bad -0.7
        assert!(approx(s.score("good and bad"), 0.0));
        assert!(approx(s.score("Stocks RALLY"), 0.5));
    }

    #[test]
    fn test_negation_flips_and_dampens() {
        let s = LexiconScorer::default();
        assert!(approx(s.score("not good"), -0.35));
        assert!(approx(s.score("this isn't good"), -0.35));
        assert!(approx(s.score("never a bad day"), 0.35));
    }

    #[test]
    fn test_curly_apostrophe_negates() {
        let s = LexiconScorer::default();
        assert!(approx(s.score("Outlook isn\u{2019}t good"), -0.35));
        assert_eq!(s.score("Outlook isn\u{2019}t good"), s.score("Outlook isn't good"));
        assert!(approx(s.score("The recovery isn\u{2019}t good \u{2013} analysts"), 0.025));
    }

    #[test]
    fn test_intensifier_scales_and_clamps() {
        let s = LexiconScorer::default();
        assert!(approx(s.score("very good"), 0.7 * 1.3));
        assert_eq!(s.score("extremely excellent"), 1.0);
        assert!(s.score("slightly bad") > s.score("bad"));
    }

    #[test]
    fn test_punctuation_does_not_hide_words() {
        let s = LexiconScorer::default();
        assert!(approx(s.score("Surge!"), 0.6));
        assert!(approx(s.score("(crash)"), -0.8));
    }

    #[test]
    fn test_extension_file_overrides_entries() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[words]\ngood = 0.2\nmoonshot = 0.9\n\n[intensifiers]\nsuper = 2.0").unwrap();
        let s = LexiconScorer::from_file(f.path()).unwrap();
        assert!(approx(s.score("good"), 0.2));
        assert!(approx(s.score("Moonshot"), 0.9));
        assert_eq!(s.score("super great"), 1.0);
    }

    #[test]
    fn test_out_of_range_entry_is_rejected() {
        let mut s = LexiconScorer::default();
        let err = s.extend_from_toml("[words]\nwow = 1.5").unwrap_err();
        assert!(matches!(err, LexiconError::OutOfRange { ref word, .. } if word == "wow"));

        let err = s.extend_from_toml("[intensifiers]\nbarely = 0.0").unwrap_err();
        assert!(matches!(err, LexiconError::BadIntensifier { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LexiconScorer::from_file(Path::new("/nonexistent/lexicon.toml")).unwrap_err();
        assert!(matches!(err, LexiconError::Io { .. }));
    }
}
