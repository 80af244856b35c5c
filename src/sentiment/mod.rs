mod lexicon;

pub use lexicon::LexiconScorer;

/// Anything that can turn cleaned text into a polarity in `[-1.0, 1.0]`.
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Exactly zero is neutral; there is no tolerance band around it.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            SentimentLabel::Positive
        } else if polarity < 0.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}
