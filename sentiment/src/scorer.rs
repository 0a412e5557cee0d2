//! Text scoring.
//!
//! A [`SentimentScorer`] maps a piece of text to a polarity in `[-1.0, 1.0]`.
//! [`LexiconScorer`] is the bundled implementation: a word-valence lexicon
//! with negation and intensifier handling, normalised the same way as the
//! VADER compound score.

use std::collections::HashMap;
use tracker_core::CoreError;

/// Normalisation constant for the compound score.
const ALPHA: f64 = 15.0;
/// Valence multiplier applied to a word preceded by a negation.
const NEGATION_SCALAR: f64 = -0.74;
/// Valence added by an intensifier, in the direction of the word it modifies.
const BOOST: f64 = 0.293;
/// How many preceding tokens are searched for negations and intensifiers.
const LOOKBACK: usize = 3;

pub trait SentimentScorer {
    fn name(&self) -> &str;

    /// Polarity of `text`, expected in `[-1.0, 1.0]`.
    fn score(&self, text: &str) -> Result<f64, CoreError>;
}

impl<S: SentimentScorer + ?Sized> SentimentScorer for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, text: &str) -> Result<f64, CoreError> {
        (**self).score(text)
    }
}

impl<S: SentimentScorer + ?Sized> SentimentScorer for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, text: &str) -> Result<f64, CoreError> {
        (**self).score(text)
    }
}

/// Lexicon-based scorer tuned for retail-investor forum language.
pub struct LexiconScorer {
    valences: HashMap<&'static str, f64>,
    negations: &'static [&'static str],
    intensifiers: &'static [&'static str],
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            valences: Self::build_lexicon(),
            negations: &[
                "not", "no", "never", "none", "nobody", "nothing", "neither", "nor",
                "without", "cannot", "dont", "don't", "isnt", "isn't", "wont", "won't",
                "cant", "can't", "aint", "ain't", "didnt", "didn't", "wasnt", "wasn't",
            ],
            intensifiers: &[
                "very", "really", "extremely", "so", "super", "totally", "absolutely",
                "incredibly", "hugely", "massively", "fucking", "insanely",
            ],
        }
    }

    /// Adds or replaces a lexicon entry.
    pub fn with_word(mut self, word: &'static str, valence: f64) -> Self {
        self.valences.insert(word, valence);
        self
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|token| !token.is_empty())
            .map(|token| token.trim_matches('\'').to_lowercase())
            .filter(|token| !token.is_empty())
            .collect()
    }

    fn word_valence(&self, tokens: &[String], index: usize) -> f64 {
        let Some(&base) = self.valences.get(tokens[index].as_str()) else {
            return 0.0;
        };

        let mut valence = base;
        let window = &tokens[index.saturating_sub(LOOKBACK)..index];

        for previous in window {
            if self.intensifiers.contains(&previous.as_str()) {
                valence += BOOST * base.signum();
            }
        }
        if window
            .iter()
            .any(|previous| self.negations.contains(&previous.as_str()))
        {
            valence *= NEGATION_SCALAR;
        }
        valence
    }

    fn compound(sum: f64) -> f64 {
        let normalized = sum / (sum * sum + ALPHA).sqrt();
        normalized.clamp(-1.0, 1.0)
    }

    fn build_lexicon() -> HashMap<&'static str, f64> {
        [
            // Positive
            ("good", 1.9), ("great", 3.1), ("excellent", 3.2), ("amazing", 2.8),
            ("awesome", 3.1), ("love", 3.2), ("like", 1.5), ("happy", 2.7),
            ("win", 2.8), ("winning", 2.4), ("won", 2.7), ("gain", 2.4),
            ("gains", 2.4), ("profit", 1.9), ("profits", 1.9), ("up", 0.8),
            ("bull", 1.5), ("bullish", 2.1), ("moon", 2.0), ("mooning", 2.3),
            ("rocket", 1.8), ("tendies", 2.2), ("printing", 1.7), ("rally", 1.9),
            ("strong", 2.3), ("beat", 1.2), ("record", 1.0), ("buy", 0.6),
            ("calls", 0.5), ("hold", 0.4), ("diamond", 1.1), ("best", 3.2),
            ("nice", 1.8), ("lol", 1.8), ("yes", 1.7), ("safe", 1.9),
            ("confident", 2.2), ("optimistic", 2.3), ("recover", 1.4),
            ("recovery", 1.6), ("green", 1.2), ("rich", 2.6),
            // Negative
            ("bad", -2.5), ("terrible", -2.1), ("awful", -2.0), ("hate", -2.7),
            ("loss", -1.3), ("losses", -1.7), ("lose", -1.7), ("losing", -1.6),
            ("lost", -1.3), ("down", -0.9), ("bear", -1.2), ("bearish", -2.0),
            ("crash", -1.7), ("crashing", -2.0), ("dump", -1.6), ("dumping", -1.8),
            ("puts", -0.5), ("sell", -0.6), ("selling", -0.8), ("red", -1.0),
            ("bagholder", -1.9), ("bagholding", -1.9), ("rekt", -2.4),
            ("broke", -1.8), ("bankrupt", -2.6), ("fear", -2.2), ("panic", -2.3),
            ("worst", -3.1), ("scam", -2.5), ("fraud", -2.8), ("fail", -2.5),
            ("failed", -2.3), ("weak", -1.9), ("recession", -2.1), ("risk", -1.1),
            ("worried", -1.9), ("sad", -2.1), ("drill", -1.2), ("drilling", -1.4),
            ("wiped", -1.9), ("no", -1.2), ("miss", -1.0), ("missed", -1.1),
        ]
        .into_iter()
        .collect()
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for LexiconScorer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn score(&self, text: &str) -> Result<f64, CoreError> {
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return Ok(0.0);
        }

        let sum: f64 = (0..tokens.len())
            .map(|index| self.word_valence(&tokens, index))
            .sum();
        Ok(Self::compound(sum))
    }
}
