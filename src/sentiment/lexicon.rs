use super::SentimentScorer;
use std::collections::HashMap;

/// Word polarities, roughly in line with common English opinion lexicons.
const WORDS: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("celebrate", 0.5),
    ("congratulations", 0.6),
    ("cool", 0.35),
    ("delighted", 0.7),
    ("easy", 0.43),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("excited", 0.4),
    ("exciting", 0.3),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("hope", 0.3),
    ("impressive", 1.0),
    ("incredible", 0.9),
    ("interesting", 0.5),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("loving", 0.6),
    ("lucky", 0.33),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleased", 0.5),
    ("positive", 0.23),
    ("proud", 0.8),
    ("safe", 0.5),
    ("strong", 0.43),
    ("success", 0.3),
    ("successful", 0.75),
    ("thank", 0.2),
    ("thanks", 0.2),
    ("true", 0.35),
    ("useful", 0.3),
    ("well", 0.2),
    ("win", 0.8),
    ("winning", 0.5),
    ("wonderful", 1.0),
    ("wow", 0.1),
    ("afraid", -0.6),
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("crash", -0.6),
    ("crisis", -0.5),
    ("dangerous", -0.6),
    ("dead", -0.2),
    ("death", -0.5),
    ("difficult", -0.5),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("disaster", -0.8),
    ("dumb", -0.38),
    ("fail", -0.5),
    ("failed", -0.5),
    ("failure", -0.32),
    ("fake", -0.5),
    ("fear", -0.4),
    ("hard", -0.3),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("hurt", -0.4),
    ("ill", -0.5),
    ("lose", -0.4),
    ("lost", -0.3),
    ("mad", -0.63),
    ("negative", -0.3),
    ("pain", -0.5),
    ("poor", -0.4),
    ("problem", -0.3),
    ("sad", -0.5),
    ("scary", -0.5),
    ("sick", -0.71),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("tragic", -0.75),
    ("ugly", -0.7),
    ("unfortunately", -0.5),
    ("upset", -0.4),
    ("wasted", -0.2),
    ("weak", -0.38),
    ("worried", -0.4),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

/// Multiply the polarity of the following sentiment word.
const INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("incredibly", 1.4),
    ("quite", 1.1),
    ("really", 1.3),
    ("so", 1.2),
    ("super", 1.3),
    ("too", 1.2),
    ("totally", 1.3),
    ("very", 1.3),
    ("barely", 0.5),
    ("slightly", 0.6),
    ("somewhat", 0.8),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "neither", "nor", "cannot", "don't", "dont",
    "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt", "aren't", "arent", "wasn't",
    "wasnt", "won't", "wont", "can't", "cant", "couldn't", "shouldn't", "wouldn't",
];

/// Flipping a negated word also dampens it: "not good" is milder than "bad".
const NEGATION_FACTOR: f64 = -0.5;

/// Tokens after a negator that it still reaches.
const NEGATION_WINDOW: usize = 3;

/// Ceiling for a run of stacked intensifiers.
const MAX_MODIFIER: f64 = 4.0;

/// Lexicon-based polarity: the mean of the (modified) polarities of every
/// sentiment-bearing word, clamped to `[-1, 1]`. Text without sentiment words
/// scores exactly `0.0`.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    words: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            words: WORDS
                .iter()
                .map(|(w, s)| (w.to_string(), *s))
                .collect(),
            intensifiers: INTENSIFIERS
                .iter()
                .map(|(w, m)| (w.to_string(), *m))
                .collect(),
        }
    }

    /// Add or override word polarities. Scores are clamped to `[-1, 1]`;
    /// non-finite scores are ignored.
    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        for (word, score) in words {
            if !score.is_finite() {
                continue;
            }
            self.words
                .insert(word.as_ref().to_lowercase(), score.clamp(-1.0, 1.0));
        }
        self
    }

    fn is_negator(word: &str) -> bool {
        NEGATORS.contains(&word)
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        let mut modifier = 1.0;
        let mut since_negation: Option<usize> = None;

        for token in tokenize(text) {
            if Self::is_negator(&token) {
                since_negation = Some(0);
                continue;
            }

            if let Some(m) = self.intensifiers.get(&token) {
                modifier = (modifier * m).min(MAX_MODIFIER);
                continue;
            }

            if let Some(base) = self.words.get(&token) {
                let mut score = (base * modifier).clamp(-1.0, 1.0);
                if since_negation.is_some_and(|n| n < NEGATION_WINDOW) {
                    score *= NEGATION_FACTOR;
                }
                total += score;
                count += 1;
                modifier = 1.0;
                since_negation = None;
                continue;
            }

            modifier = 1.0;
            since_negation = since_negation
                .map(|n| n + 1)
                .filter(|n| *n < NEGATION_WINDOW);
        }

        if count == 0 {
            0.0
        } else {
            (total / count as f64).clamp(-1.0, 1.0)
        }
    }
}
