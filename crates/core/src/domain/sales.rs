use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock-keeping unit identifier. Always trimmed and non-empty once constructed
/// through [`SkuId::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuId(pub String);

impl SkuId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SkuId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One day of sales for one SKU. `(sku_id, date)` is the natural key used for
/// upserts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub sku_id: SkuId,
    pub date: NaiveDate,
    pub units_sold: u32,
    pub revenue: Decimal,
    pub weather_temp: Option<f64>,
    pub season: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::SkuId;

    #[test]
    fn sku_parse_trims_and_rejects_blank() {
        assert_eq!(SkuId::parse("  JACKET-1 "), Some(SkuId("JACKET-1".to_string())));
        assert_eq!(SkuId::parse("   "), None);
        assert_eq!(SkuId::parse(""), None);
    }
}
