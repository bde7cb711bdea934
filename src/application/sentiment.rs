//! Headline sentiment scoring using VADER plus a financial word lexicon.
//!
//! Every article is scored by two independent methods: a hand-tuned
//! financial lexicon (polarity + subjectivity) and the VADER valence
//! scorer (compound + pos/neg/neu proportions). The combined score is the
//! mean of lexicon polarity and VADER compound.

use crate::domain::types::{AnnotatedArticle, Article, DailySentiment, SentimentLabel};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::info;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Financial words with (polarity, subjectivity) weights. General-purpose
/// lexicons miss much of this jargon, so the table leans financial.
const FINANCIAL_LEXICON: &[(&str, f64, f64)] = &[
    // bullish
    ("surge", 0.5, 0.6),
    ("surges", 0.5, 0.6),
    ("rally", 0.5, 0.6),
    ("rallies", 0.5, 0.6),
    ("soar", 0.6, 0.7),
    ("soars", 0.6, 0.7),
    ("bullish", 0.6, 0.8),
    ("breakout", 0.4, 0.5),
    ("breakthrough", 0.5, 0.6),
    ("upgrade", 0.4, 0.5),
    ("upgraded", 0.4, 0.5),
    ("beat", 0.4, 0.5),
    ("beats", 0.4, 0.5),
    ("record", 0.3, 0.4),
    ("profit", 0.4, 0.4),
    ("profits", 0.4, 0.4),
    ("growth", 0.4, 0.4),
    ("gain", 0.3, 0.4),
    ("gains", 0.3, 0.4),
    ("strong", 0.4, 0.5),
    ("opportunity", 0.3, 0.5),
    ("partnership", 0.2, 0.3),
    ("adoption", 0.2, 0.3),
    ("good", 0.5, 0.6),
    ("great", 0.8, 0.75),
    ("positive", 0.4, 0.5),
    // bearish
    ("crash", -0.6, 0.7),
    ("crashes", -0.6, 0.7),
    ("plunge", -0.6, 0.7),
    ("plunges", -0.6, 0.7),
    ("collapse", -0.7, 0.8),
    ("collapses", -0.7, 0.8),
    ("bearish", -0.6, 0.8),
    ("selloff", -0.5, 0.6),
    ("downgrade", -0.5, 0.6),
    ("downgraded", -0.5, 0.6),
    ("miss", -0.4, 0.5),
    ("misses", -0.4, 0.5),
    ("loss", -0.4, 0.4),
    ("losses", -0.4, 0.4),
    ("fall", -0.3, 0.4),
    ("falls", -0.3, 0.4),
    ("drop", -0.3, 0.4),
    ("drops", -0.3, 0.4),
    ("weak", -0.4, 0.5),
    ("lawsuit", -0.5, 0.6),
    ("fraud", -0.7, 0.8),
    ("scandal", -0.6, 0.7),
    ("panic", -0.6, 0.8),
    ("fear", -0.4, 0.7),
    ("recession", -0.5, 0.6),
    ("bad", -0.5, 0.6),
    ("terrible", -0.9, 0.9),
    ("negative", -0.4, 0.5),
];

/// Which scorer's thresholds apply when mapping a score to a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMethod {
    Lexicon,
    Vader,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconScore {
    pub polarity: f64,
    pub subjectivity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaderScore {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

pub struct SentimentAnalyzer {
    vader: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            vader: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Strip everything except letters and whitespace, lowercase, and
    /// collapse whitespace runs. Idempotent.
    pub fn clean(text: &str) -> String {
        let kept: String = text
            .chars()
            .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
            .collect();
        kept.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lexicon scorer: mean polarity/subjectivity over matched tokens.
    pub fn score_lexicon(&self, text: &str) -> LexiconScore {
        let cleaned = Self::clean(text);
        let mut polarity_sum = 0.0;
        let mut subjectivity_sum = 0.0;
        let mut matched = 0usize;

        for token in cleaned.split_whitespace() {
            if let Some((_, pol, subj)) = FINANCIAL_LEXICON.iter().find(|(w, _, _)| *w == token) {
                polarity_sum += pol;
                subjectivity_sum += subj;
                matched += 1;
            }
        }

        if matched == 0 {
            return LexiconScore {
                polarity: 0.0,
                subjectivity: 0.0,
            };
        }
        LexiconScore {
            polarity: polarity_sum / matched as f64,
            subjectivity: subjectivity_sum / matched as f64,
        }
    }

    /// VADER scorer on cleaned text. Empty text short-circuits to zeros.
    pub fn score_vader(&self, text: &str) -> VaderScore {
        let cleaned = Self::clean(text);
        if cleaned.is_empty() {
            return VaderScore {
                compound: 0.0,
                positive: 0.0,
                negative: 0.0,
                neutral: 0.0,
            };
        }

        let scores = self.vader.polarity_scores(&cleaned);
        VaderScore {
            compound: scores.get("compound").copied().unwrap_or(0.0),
            positive: scores.get("pos").copied().unwrap_or(0.0),
            negative: scores.get("neg").copied().unwrap_or(0.0),
            neutral: scores.get("neu").copied().unwrap_or(0.0),
        }
    }

    /// Map a score to a label with method-specific thresholds: the lexicon
    /// uses strict +/-0.1, VADER uses inclusive +/-0.05.
    pub fn label(score: f64, method: ScoringMethod) -> SentimentLabel {
        match method {
            ScoringMethod::Lexicon => {
                if score > 0.1 {
                    SentimentLabel::Positive
                } else if score < -0.1 {
                    SentimentLabel::Negative
                } else {
                    SentimentLabel::Neutral
                }
            }
            ScoringMethod::Vader => {
                if score >= 0.05 {
                    SentimentLabel::Positive
                } else if score <= -0.05 {
                    SentimentLabel::Negative
                } else {
                    SentimentLabel::Neutral
                }
            }
        }
    }

    /// Annotate every article with both score sets, both labels, the
    /// combined score, and the final label from the combined score.
    pub fn analyze(&self, articles: &[Article]) -> Vec<AnnotatedArticle> {
        info!("Scoring sentiment for {} articles", articles.len());

        articles
            .iter()
            .map(|article| {
                let lex = self.score_lexicon(&article.headline);
                let vader = self.score_vader(&article.headline);
                let combined = (lex.polarity + vader.compound) / 2.0;

                AnnotatedArticle {
                    article: article.clone(),
                    polarity: lex.polarity,
                    subjectivity: lex.subjectivity,
                    lexicon_label: Self::label(lex.polarity, ScoringMethod::Lexicon),
                    compound: vader.compound,
                    positive: vader.positive,
                    negative: vader.negative,
                    neutral: vader.neutral,
                    vader_label: Self::label(vader.compound, ScoringMethod::Vader),
                    combined,
                    final_label: Self::label(combined, ScoringMethod::Lexicon),
                }
            })
            .collect()
    }

    /// Aggregate annotated articles into one row per calendar day, sorted
    /// by date. The dominant label is the most frequent final label; ties
    /// go to the label seen first in original article order.
    pub fn aggregate_daily(annotated: &[AnnotatedArticle]) -> Vec<DailySentiment> {
        let mut by_date: BTreeMap<NaiveDate, Vec<&AnnotatedArticle>> = BTreeMap::new();
        for row in annotated {
            by_date.entry(row.article.date).or_default().push(row);
        }

        by_date
            .into_iter()
            .map(|(date, rows)| {
                let n = rows.len();
                let combined: Vec<f64> = rows.iter().map(|r| r.combined).collect();
                let mean = combined.iter().sum::<f64>() / n as f64;

                let std = if n > 1 {
                    let var = combined.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                        / (n as f64 - 1.0);
                    Some(var.sqrt())
                } else {
                    None
                };

                DailySentiment {
                    date,
                    avg_sentiment: mean,
                    sentiment_std: std,
                    article_count: n,
                    avg_polarity: rows.iter().map(|r| r.polarity).sum::<f64>() / n as f64,
                    avg_compound: rows.iter().map(|r| r.compound).sum::<f64>() / n as f64,
                    dominant_label: Self::dominant_label(&rows),
                }
            })
            .collect()
    }

    fn dominant_label(rows: &[&AnnotatedArticle]) -> SentimentLabel {
        let mut counts: HashMap<SentimentLabel, (usize, usize)> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            let entry = counts.entry(row.final_label).or_insert((0, idx));
            entry.0 += 1;
        }

        // Highest count wins; ties resolved by earliest first occurrence.
        counts
            .into_iter()
            .min_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)))
            .map(|(label, _)| label)
            .unwrap_or(SentimentLabel::Neutral)
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
