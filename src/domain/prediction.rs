// ============================================================
// Layer 3 — Prediction Record
// ============================================================
// The human-readable result for one example, as written to
// `predict.{tag}.json`. Key names are flat per head so the
// output can be loaded straight into a dataframe:
//
//   { "text": "play some jazz", "sent_embed": [...],
//     "intent_label": "play_music", "intent_predict": "play_music",
//     "intent_score": 0.93, "intent_probs": [...], ... }

use serde::{Deserialize, Serialize};

/// Decoded output of one classification head for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadPrediction {
    /// Gold label, absent for unlabelled test data
    pub gold:    Option<String>,
    pub predict: String,
    pub score:   f32,
    pub probs:   Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub text:       String,
    pub sent_embed: Vec<f32>,

    pub intent_label:   Option<String>,
    pub intent_predict: String,
    pub intent_score:   f32,
    pub intent_probs:   Vec<f32>,

    pub topic_label:   Option<String>,
    pub topic_predict: String,
    pub topic_score:   f32,
    pub topic_probs:   Vec<f32>,

    pub ability_label:   Option<String>,
    pub ability_predict: String,
    pub ability_score:   f32,
    pub ability_probs:   Vec<f32>,
}

impl PredictionRecord {
    pub fn new(
        text:       String,
        sent_embed: Vec<f32>,
        intent:     HeadPrediction,
        topic:      HeadPrediction,
        ability:    HeadPrediction,
    ) -> Self {
        Self {
            text,
            sent_embed,
            intent_label:    intent.gold,
            intent_predict:  intent.predict,
            intent_score:    intent.score,
            intent_probs:    intent.probs,
            topic_label:     topic.gold,
            topic_predict:   topic.predict,
            topic_score:     topic.score,
            topic_probs:     topic.probs,
            ability_label:   ability.gold,
            ability_predict: ability.predict,
            ability_score:   ability.score,
            ability_probs:   ability.probs,
        }
    }
}
