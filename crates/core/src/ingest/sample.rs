pub const SAMPLE_FILE_NAME: &str = "sample_sales_data.csv";

pub const SAMPLE_HEADER: [&str; 6] =
    ["sku_id", "date", "units_sold", "revenue", "weather_temp", "season"];

const SAMPLE_ROWS: [[&str; 6]; 4] = [
    ["DOWN_JACKET_001", "2024-01-15", "5", "15000.00", "-15.5", "winter"],
    ["DOWN_JACKET_002", "2024-01-16", "3", "9500.00", "-12.0", "winter"],
    ["DOWN_JACKET_001", "2024-01-17", "7", "21000.00", "-18.2", "winter"],
    ["DOWN_JACKET_003", "2024-01-18", "2", "8000.00", "-10.5", "winter"],
];

/// Canonical example upload: the fixed header plus four illustrative rows.
pub fn sample_csv() -> String {
    std::iter::once(SAMPLE_HEADER)
        .chain(SAMPLE_ROWS)
        .map(|row| row.join(","))
        .fold(String::new(), |mut output, line| {
            output.push_str(&line);
            output.push_str("\r\n");
            output
        })
}
