//! Tolerant decoding of the model's free-text reply.

use std::collections::BTreeSet;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::forecast::ForecastPrediction;
use crate::ingest::values;

/// Used when a prediction carries no confidence of its own.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Structured part of a model reply. Predictions stay untyped until
/// [`ForecastReply::predictions`] coerces them one by one.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ForecastReply {
    #[serde(default)]
    pub predictions: Vec<Value>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub confidence_scores: Vec<Value>,
}

impl ForecastReply {
    fn unusable(note: impl Into<String>) -> Self {
        Self { explanation: note.into(), ..Self::default() }
    }

    /// Typed predictions in chronological order, one per date.
    ///
    /// Entries whose date or numeric fields cannot be coerced are dropped
    /// individually; the first entry wins when dates repeat.
    pub fn predictions(&self) -> Vec<ForecastPrediction> {
        let mut seen = BTreeSet::new();
        let mut predictions: Vec<ForecastPrediction> = self
            .predictions
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                coerce_prediction(value, self.confidence_scores.get(index).and_then(number))
            })
            .filter(|prediction| seen.insert(prediction.date))
            .collect();
        predictions.sort_by_key(|prediction| prediction.date);
        predictions
    }
}

/// Decodes the substring between the first `{` and the last `}`.
///
/// Never fails: an unusable reply comes back with no predictions and a note
/// in `explanation`.
pub fn parse_reply(raw: &str) -> ForecastReply {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return ForecastReply::unusable("model reply contained no JSON object");
    };
    if end < start {
        return ForecastReply::unusable("model reply contained no JSON object");
    }

    match serde_json::from_str::<ForecastReply>(&raw[start..=end]) {
        Ok(reply) => reply,
        Err(error) => ForecastReply::unusable(format!("model reply could not be decoded: {error}")),
    }
}

fn coerce_prediction(value: &Value, fallback_confidence: Option<f64>) -> Option<ForecastPrediction> {
    let object = value.as_object()?;

    let date = values::parse_date(object.get("date")?.as_str()?)?;

    let predicted_units = match object.get("predicted_units") {
        None | Some(Value::Null) => 0,
        Some(units) => {
            let units = number(units)?;
            if units.is_sign_negative() {
                0
            } else {
                units.trunc().min(f64::from(u32::MAX)) as u32
            }
        }
    };

    let predicted_revenue = match object.get("predicted_revenue") {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(Value::String(text)) => values::parse_revenue(text)?,
        Some(revenue) => Decimal::from_f64(number(revenue)?)?,
    };
    let predicted_revenue = predicted_revenue.max(Decimal::ZERO).round_dp(2);

    let confidence = match object.get("confidence") {
        None | Some(Value::Null) => fallback_confidence.unwrap_or(DEFAULT_CONFIDENCE),
        Some(confidence) => number(confidence)?,
    }
    .clamp(0.0, 1.0);

    let predicted_temp = object.get("predicted_temp").and_then(number);

    Some(ForecastPrediction { date, predicted_units, predicted_revenue, confidence, predicted_temp })
}

/// Numbers and numeric strings; anything non-finite is rejected.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{parse_reply, DEFAULT_CONFIDENCE};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).expect("valid date")
    }

    #[test]
    fn extracts_json_wrapped_in_commentary() {
        let raw = r#"Sure! Here is the forecast:
```json
{"predictions": [
  {"date": "2024-02-02", "predicted_units": 4, "predicted_revenue": 12000.5, "confidence": 0.9},
  {"date": "2024-02-01", "predicted_units": "3", "predicted_revenue": "9000", "predicted_temp": -12.5}
], "explanation": "cold snap ahead", "confidence_scores": [0.9, 0.7]}
```
Hope this helps."#;

        let reply = parse_reply(raw);
        assert_eq!(reply.explanation, "cold snap ahead");

        let predictions = reply.predictions();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].date, date(1));
        assert_eq!(predictions[0].predicted_units, 3);
        assert_eq!(predictions[0].predicted_revenue, Decimal::new(9_000, 0));
        assert!((predictions[0].confidence - 0.7).abs() < f64::EPSILON);
        assert_eq!(predictions[0].predicted_temp, Some(-12.5));
        assert_eq!(predictions[1].predicted_revenue, Decimal::new(1_200_050, 2));
    }

    #[test]
    fn reply_without_braces_yields_no_predictions_and_a_note() {
        let reply = parse_reply("The model is currently overloaded.");
        assert!(reply.predictions.is_empty());
        assert!(reply.explanation.contains("no JSON"));
    }

    #[test]
    fn undecodable_json_yields_no_predictions() {
        let reply = parse_reply("{ predictions: [oops }");
        assert!(reply.predictions().is_empty());
        assert!(reply.explanation.contains("could not be decoded"));
    }

    #[test]
    fn bad_entries_are_dropped_individually() {
        let raw = r#"{"predictions": [
            {"date": "tomorrow", "predicted_units": 1},
            {"date": "2024-02-03", "predicted_units": "many"},
            {"date": "2024-02-04", "predicted_units": -2, "predicted_revenue": -10, "confidence": 1.7},
            {"date": "2024-02-04", "predicted_units": 8},
            "not an object",
            {"date": "2024-02-05"}
        ]}"#;

        let predictions = parse_reply(raw).predictions();
        assert_eq!(predictions.len(), 2);

        assert_eq!(predictions[0].date, date(4));
        assert_eq!(predictions[0].predicted_units, 0);
        assert_eq!(predictions[0].predicted_revenue, Decimal::ZERO);
        assert!((predictions[0].confidence - 1.0).abs() < f64::EPSILON);

        assert_eq!(predictions[1].date, date(5));
        assert!((predictions[1].confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }
}
