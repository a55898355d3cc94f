//! Fan sentiment scoring over recent social posts.
//!
//! Each post gets a polarity in [-1, 1] from a small football lexicon; a team
//! score is the engagement-weighted mean over its posts, so a widely liked
//! post counts for more than one nobody saw.

use serde::{Deserialize, Serialize};

use crate::providers::SocialPost;

const POSITIVE: &[&str] = &[
    "win", "won", "winning", "brilliant", "class", "quality", "superb", "great", "love",
    "proud", "unstoppable", "clinical", "masterclass", "deserved", "fantastic", "world-class",
    "best", "incredible", "amazing", "dominant", "confident", "buzzing", "believe", "magic",
];

const NEGATIVE: &[&str] = &[
    "lose", "lost", "losing", "awful", "terrible", "disgrace", "shambles", "sack",
    "poor", "useless", "embarrassing", "worst", "woeful", "bottled", "clueless", "rubbish",
    "dreadful", "pathetic", "hate", "injured", "injury", "crisis", "robbed",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamSentiment {
    /// -1 (hostile) to 1 (euphoric).
    pub score: f64,
    pub posts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSentiment {
    pub home: Option<TeamSentiment>,
    pub away: Option<TeamSentiment>,
}

impl MatchSentiment {
    /// Mean of whichever team scores are known.
    pub fn overall(&self) -> Option<f64> {
        let scores: Vec<f64> = [self.home, self.away]
            .iter()
            .flatten()
            .map(|s| s.score)
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

/// Polarity of one post; 0 when no lexicon word appears.
pub fn polarity(text: &str) -> f64 {
    let (mut positive, mut negative) = (0u32, 0u32);
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if POSITIVE.contains(&word.as_str()) {
            positive += 1;
        } else if NEGATIVE.contains(&word.as_str()) {
            negative += 1;
        }
    }
    let total = positive + negative;
    if total == 0 {
        0.0
    } else {
        (f64::from(positive) - f64::from(negative)) / f64::from(total)
    }
}

fn weight(post: &SocialPost) -> f64 {
    1.0 + ((post.likes + post.reposts + post.replies) as f64).ln_1p()
}

/// `None` for an empty sample.
pub fn score(posts: &[SocialPost]) -> Option<TeamSentiment> {
    if posts.is_empty() {
        return None;
    }
    let (weighted, total_weight) = posts.iter().fold((0.0, 0.0), |(sum, w), post| {
        let weight = weight(post);
        (sum + polarity(&post.text) * weight, w + weight)
    });
    Some(TeamSentiment {
        score: (weighted / total_weight).clamp(-1.0, 1.0),
        posts: posts.len(),
    })
}
