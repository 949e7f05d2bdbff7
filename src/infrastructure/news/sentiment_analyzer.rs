//! Headline sentiment using VADER with equity-market keyword boosting.
//!
//! A ticker's score is the mean of per-headline votes: each headline is scored, mapped to
//! Bullish (+1), Neutral (0) or Bearish (-1), and the votes averaged.

use crate::domain::sentiment::SentimentLabel;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Headlines considered per ticker.
pub const MAX_HEADLINES: usize = 5;

/// Equity-news jargon VADER's general lexicon misses.
const BULLISH_KEYWORDS: &[(&str, f64)] = &[
    ("surge", 0.4),
    ("surges", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soar", 0.5),
    ("soars", 0.5),
    ("beats estimates", 0.5),
    ("beat estimates", 0.5),
    ("tops estimates", 0.5),
    ("raises guidance", 0.5),
    ("raised guidance", 0.5),
    ("record revenue", 0.4),
    ("record high", 0.4),
    ("all-time high", 0.5),
    ("upgrade", 0.3),
    ("upgraded", 0.3),
    ("outperform", 0.3),
    ("buyback", 0.3),
    ("dividend hike", 0.4),
    ("breakout", 0.3),
    ("bullish", 0.5),
    ("approval", 0.3),
];

const BEARISH_KEYWORDS: &[(&str, f64)] = &[
    ("plunge", -0.5),
    ("plunges", -0.5),
    ("tumble", -0.4),
    ("tumbles", -0.4),
    ("slump", -0.4),
    ("misses estimates", -0.5),
    ("missed estimates", -0.5),
    ("cuts guidance", -0.5),
    ("lowers guidance", -0.5),
    ("profit warning", -0.5),
    ("downgrade", -0.3),
    ("downgraded", -0.3),
    ("underperform", -0.3),
    ("lawsuit", -0.4),
    ("investigation", -0.3),
    ("recall", -0.3),
    ("layoffs", -0.3),
    ("bankruptcy", -0.6),
    ("fraud", -0.5),
    ("sell-off", -0.4),
    ("selloff", -0.4),
    ("bearish", -0.5),
];

/// VADER compound score plus keyword boost, clamped to `[-1, 1]`.
pub struct SentimentAnalyzer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn financial_boost(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        BULLISH_KEYWORDS
            .iter()
            .chain(BEARISH_KEYWORDS)
            .filter(|(keyword, _)| text_lower.contains(keyword))
            .map(|(_, score)| score)
            .sum()
    }

    /// Score of one piece of text in `[-1, 1]`; blank text is neutral.
    pub fn analyze(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let scores = self.analyzer.polarity_scores(text);
        let vader_score = scores["compound"];
        (vader_score + self.financial_boost(text) * 0.5).clamp(-1.0, 1.0)
    }

    pub fn label(&self, text: &str) -> SentimentLabel {
        SentimentLabel::from_score(self.analyze(text))
    }

    /// Mean vote over the first `MAX_HEADLINES` headlines; 0.0 when there are none.
    pub fn score_headlines<S: AsRef<str>>(&self, headlines: &[S]) -> f64 {
        let votes: Vec<f64> = headlines
            .iter()
            .take(MAX_HEADLINES)
            .map(|h| self.label(h.as_ref()).vote())
            .collect();
        if votes.is_empty() {
            return 0.0;
        }
        votes.iter().sum::<f64>() / votes.len() as f64
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
