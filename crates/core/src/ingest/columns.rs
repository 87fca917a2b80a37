use std::collections::BTreeMap;
use std::fmt;

/// Normalized field a source column can be mapped onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    SkuId,
    Date,
    UnitsSold,
    Revenue,
    WeatherTemp,
    Season,
}

impl CanonicalField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkuId => "sku_id",
            Self::Date => "date",
            Self::UnitsSold => "units_sold",
            Self::Revenue => "revenue",
            Self::WeatherTemp => "weather_temp",
            Self::Season => "season",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Self::SkuId | Self::Date | Self::UnitsSold | Self::Revenue)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header aliases per canonical field, in priority order. Matching is
/// case-insensitive and whitespace-trimmed; the first alias present wins.
pub const COLUMN_ALIASES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::SkuId, &["sku_id", "sku", "product_id", "id"]),
    (CanonicalField::Date, &["date", "sales_date", "transaction_date"]),
    (CanonicalField::UnitsSold, &["units_sold", "quantity", "qty", "units"]),
    (CanonicalField::Revenue, &["revenue", "sales", "amount", "total"]),
    (CanonicalField::WeatherTemp, &["weather_temp", "temperature", "temp"]),
    (CanonicalField::Season, &["season", "period", "season_name"]),
];

/// Canonical field -> source column, derived once per upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<CanonicalField, (usize, String)>,
}

impl ColumnMapping {
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Self {
        let normalized: Vec<String> =
            headers.iter().map(|header| header.as_ref().trim().to_lowercase()).collect();

        let mut columns = BTreeMap::new();
        for (field, aliases) in COLUMN_ALIASES {
            let found = aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|header| header == alias));
            if let Some(index) = found {
                columns.insert(*field, (index, headers[index].as_ref().to_string()));
            }
        }

        Self { columns }
    }

    pub fn index_of(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).map(|(index, _)| *index)
    }

    pub fn source_column(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(|(_, name)| name.as_str())
    }

    /// Required canonical fields with no matching header, in canonical order.
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        COLUMN_ALIASES
            .iter()
            .map(|(field, _)| *field)
            .filter(|field| field.is_required() && !self.columns.contains_key(field))
            .collect()
    }

    pub fn describe(&self) -> String {
        self.columns
            .iter()
            .map(|(field, (_, source))| format!("{field}<-{source}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalField, ColumnMapping};

    #[test]
    fn detects_aliases_case_insensitively() {
        let mapping = ColumnMapping::detect(&["Product_ID", " QTY ", "Sales_Date", "Amount"]);

        assert_eq!(mapping.index_of(CanonicalField::SkuId), Some(0));
        assert_eq!(mapping.index_of(CanonicalField::UnitsSold), Some(1));
        assert_eq!(mapping.index_of(CanonicalField::Date), Some(2));
        assert_eq!(mapping.index_of(CanonicalField::Revenue), Some(3));
        assert_eq!(mapping.source_column(CanonicalField::UnitsSold), Some(" QTY "));
        assert!(mapping.missing_required().is_empty());
    }

    #[test]
    fn earlier_alias_wins_over_later_alias() {
        let mapping = ColumnMapping::detect(&["id", "sku", "date", "units", "total"]);
        assert_eq!(mapping.index_of(CanonicalField::SkuId), Some(1));
    }

    #[test]
    fn reports_missing_required_fields_only() {
        let mapping = ColumnMapping::detect(&["sku_id", "date", "units_sold"]);
        assert_eq!(mapping.missing_required(), vec![CanonicalField::Revenue]);
        assert_eq!(mapping.index_of(CanonicalField::WeatherTemp), None);
    }
}
