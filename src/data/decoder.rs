// ============================================================
// Layer 4 — Prediction Decoder
// ============================================================
// Turns raw per-example model output back into readable JSON.
//
// Text is rebuilt from the wordpiece ids rather than taken from
// the corpus, so the output shows exactly what the model saw
// (lowercased, truncated, [UNK] for unknown pieces):
//
//   ids:    [CLS] play ##ing the music [SEP] [PAD] [PAD]
//   mask:   1     1    1     1   1     1     0     0
//   text:   "playing the music"
//
// Walking stops at the first zero in the mask; everything after
// is padding.

use anyhow::{Context, Result};

use crate::data::dataset::Feature;
use crate::domain::label::{LabelKind, LabelVocabs};
use crate::domain::prediction::{HeadPrediction, PredictionRecord};
use crate::domain::traits::{WordpieceTokenizer, CLS_TOKEN, CONTINUATION_PREFIX, SEP_TOKEN};

/// Numeric output of one head for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeadOutput {
    pub predict_id: usize,
    pub score:      f32,
    pub probs:      Vec<f32>,
}

/// Numeric output of the classifier for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub sent_embed: Vec<f32>,
    pub intent:     RawHeadOutput,
    pub topic:      RawHeadOutput,
    pub ability:    RawHeadOutput,
}

impl RawPrediction {
    pub fn head(&self, kind: LabelKind) -> &RawHeadOutput {
        match kind {
            LabelKind::Intent  => &self.intent,
            LabelKind::Topic   => &self.topic,
            LabelKind::Ability => &self.ability,
        }
    }
}

/// Rebuild text from wordpieces, honouring the attention mask.
pub fn detokenize<S: AsRef<str>>(tokens: &[S], mask: &[u32]) -> String {
    let mut words: Vec<String> = Vec::new();

    for (token, &m) in tokens.iter().zip(mask) {
        if m == 0 {
            break;
        }
        let token = token.as_ref();
        if token == CLS_TOKEN || token == SEP_TOKEN {
            continue;
        }
        match (token.strip_prefix(CONTINUATION_PREFIX), words.last_mut()) {
            (Some(rest), Some(prev)) => prev.push_str(rest),
            // A continuation with nothing before it starts its own word
            (Some(rest), None)       => words.push(rest.to_string()),
            (None, _)                => words.push(token.to_string()),
        }
    }

    words.join(" ")
}

/// Decode features and their predictions, pairwise and in order.
/// Both slices must already be cut to the real (non-padding) count.
pub fn decode_predictions<T: WordpieceTokenizer>(
    features:    &[Feature],
    predictions: &[RawPrediction],
    vocabs:      &LabelVocabs,
    tokenizer:   &T,
) -> Result<Vec<PredictionRecord>> {
    features
        .iter()
        .zip(predictions)
        .enumerate()
        .map(|(i, (feature, raw))| {
            decode_one(feature, raw, vocabs, tokenizer)
                .with_context(|| format!("Cannot decode prediction {i}"))
        })
        .collect()
}

fn decode_one<T: WordpieceTokenizer>(
    feature:   &Feature,
    raw:       &RawPrediction,
    vocabs:    &LabelVocabs,
    tokenizer: &T,
) -> Result<PredictionRecord> {
    let tokens = tokenizer.convert_ids_to_tokens(&feature.input_ids);
    let text   = detokenize(&tokens, &feature.input_mask);

    let head = |kind: LabelKind| -> Result<HeadPrediction> {
        let vocab = vocabs.get(kind);
        let out   = raw.head(kind);
        let gold  = feature
            .label_ids
            .get(kind)
            .map(|id| vocab.label(id).map(str::to_string))
            .transpose()?;
        Ok(HeadPrediction {
            gold,
            predict: vocab.label(out.predict_id)?.to_string(),
            score:   out.score,
            probs:   out.probs.clone(),
        })
    };

    Ok(PredictionRecord::new(
        text,
        raw.sent_embed.clone(),
        head(LabelKind::Intent)?,
        head(LabelKind::Topic)?,
        head(LabelKind::Ability)?,
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::converter::{tests::test_vocabs, FeatureConverter};
    use crate::domain::example::{Example, ExampleId, InputExample};
    use crate::infra::tokenizer_store::tests::test_tokenizer;

    fn raw(intent: usize, topic: usize, ability: usize) -> RawPrediction {
        let head = |id: usize, n: usize| RawHeadOutput {
            predict_id: id,
            score:      0.5,
            probs:      vec![1.0 / n as f32; n],
        };
        RawPrediction {
            sent_embed: vec![0.25, -0.5],
            intent:     head(intent, 5),
            topic:      head(topic, 4),
            ability:    head(ability, 3),
        }
    }

    #[test]
    fn test_continuation_joins_previous_word() {
        assert_eq!(detokenize(&["play", "##ing"], &[1, 1]), "playing");
    }

    #[test]
    fn test_markers_dropped_and_mask_stops_walk() {
        let tokens = ["[CLS]", "new", "york", "[SEP]", "city", "city"];
        assert_eq!(detokenize(&tokens, &[1, 1, 1, 1, 0, 1]), "new york");
    }

    #[test]
    fn test_leading_continuation_starts_word() {
        assert_eq!(detokenize(&["[CLS]", "##ly", "loud"], &[1, 1, 1]), "ly loud");
    }

    #[test]
    fn test_convert_then_decode_roundtrip() {
        let vocabs = test_vocabs();
        let tok    = test_tokenizer();
        let conv   = FeatureConverter::new(&vocabs, &tok, 10).unwrap();

        let example: InputExample = Example::new(ExampleId::Num(1), "New York City")
            .with_labels("ask", "city", "search")
            .into();
        let feature = conv.convert(0, &example).unwrap();

        let records = decode_predictions(&[feature], &[raw(2, 1, 0)], &vocabs, &tok).unwrap();
        let r = &records[0];
        assert_eq!(r.text, "new york city");
        assert_eq!(r.intent_label.as_deref(), Some("ask"));
        assert_eq!(r.intent_predict, "ask");
        assert_eq!(r.topic_predict, "city");
        assert_eq!(r.ability_label.as_deref(), Some("search"));
        assert_eq!(r.ability_predict, "media");
        assert_eq!(r.sent_embed, vec![0.25, -0.5]);
        assert_eq!(r.intent_probs.len(), 5);
    }

    #[test]
    fn test_unlabelled_gold_is_null() {
        let vocabs = test_vocabs();
        let tok    = test_tokenizer();
        let conv   = FeatureConverter::new(&vocabs, &tok, 6).unwrap();

        let feature = conv.convert(0, &Example::new(ExampleId::Num(7), "play").into()).unwrap();
        let records = decode_predictions(&[feature], &[raw(0, 0, 0)], &vocabs, &tok).unwrap();

        assert_eq!(records[0].topic_label, None);
        let json = serde_json::to_value(&records[0]).unwrap();
        assert!(json["topic_label"].is_null());
        assert_eq!(json["intent_predict"], "play");
    }

    #[test]
    fn test_out_of_range_prediction_is_an_error() {
        let vocabs  = test_vocabs();
        let tok     = test_tokenizer();
        let feature = Feature::padding(4);
        assert!(decode_predictions(&[feature], &[raw(9, 0, 0)], &vocabs, &tok).is_err());
    }
}
