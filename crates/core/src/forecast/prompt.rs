use chrono::NaiveDate;

use crate::domain::forecast::ForecastRequest;
use crate::domain::sales::SalesRecord;
use crate::forecast::summary::HistorySummary;

/// Detailed rows quoted verbatim in the prompt.
pub const PROMPT_DETAIL_ROWS: usize = 10;

const REPLY_SCHEMA: &str = r#"{
  "predictions": [
    {
      "date": "YYYY-MM-DD",
      "predicted_units": 5,
      "predicted_revenue": 15000.0,
      "confidence": 0.85,
      "predicted_temp": -18.5
    }
  ],
  "explanation": "Short explanation of the forecast logic",
  "confidence_scores": [0.85, 0.82]
}"#;

/// Renders the natural-language forecasting prompt.
///
/// `history` is most-recent-first; `first_day` is the first forecast date.
pub fn build_prompt(
    request: &ForecastRequest,
    history: &[SalesRecord],
    summary: &HistorySummary,
    first_day: NaiveDate,
) -> String {
    let days = request.period.days();
    let mut prompt = String::new();

    prompt.push_str("You are an expert in retail sales forecasting for seasonal apparel.\n");
    prompt.push_str(&format!(
        "Analyse the sales history below and produce a daily sales forecast for the next {days} days.\n\n"
    ));

    prompt.push_str("HISTORY SUMMARY:\n");
    prompt.push_str(&format!("SKU: {}\n", request.sku_id));
    prompt.push_str(&format!("Forecast horizon: {days} days\n"));
    prompt.push_str(&format!("Historical records: {}\n", summary.record_count));
    prompt.push_str(&format!("Total units sold: {}\n", summary.total_units));
    prompt.push_str(&format!("Total revenue: {:.2}\n", summary.total_revenue));
    prompt.push_str(&format!("Average units per day: {:.1}\n", summary.mean_units));
    prompt.push_str(&format!("Average revenue per day: {:.2}\n", summary.mean_revenue));
    prompt.push_str(&format!("Trend: {}\n\n", summary.trend));

    prompt.push_str("RECENT RECORDS (most recent first):\n");
    if history.is_empty() {
        prompt.push_str("No sales history is available for this SKU.\n");
    }
    for record in history.iter().take(PROMPT_DETAIL_ROWS) {
        let temperature = record
            .weather_temp
            .map(|temp| format!("{temp:.1}°C"))
            .unwrap_or_else(|| "N/A".to_string());
        prompt.push_str(&format!(
            "Date: {}, Units sold: {}, Revenue: {:.2}, Temperature: {}, Season: {}\n",
            record.date,
            record.units_sold,
            record.revenue,
            temperature,
            record.season.as_deref().unwrap_or("N/A"),
        ));
    }

    if let Some(context) = request.context.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\nADDITIONAL CONTEXT: {context}\n"));
    }

    prompt.push_str("\nTASK:\n");
    prompt.push_str(&format!(
        "Forecast each of the {days} days starting on {first_day}, taking into account seasonality, \
         the effect of temperature on demand and the trend in the history.\n"
    ));
    prompt.push_str("Confidence values must lie between 0 and 1.\n\n");
    prompt.push_str("REPLY FORMAT (strict JSON):\n");
    prompt.push_str(REPLY_SCHEMA);
    prompt.push_str("\n\nReply with the JSON object only, without any commentary.\n");

    prompt
}
