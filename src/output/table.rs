//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// One field of a single record, for key/value tables
#[derive(Debug, Tabled)]
struct FieldRow<'a> {
    #[tabled(rename = "FIELD")]
    field: &'a str,
    #[tabled(rename = "VALUE")]
    value: &'a str,
}

/// Format data as a table
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Format the fields of one record as a two-column table
pub fn format_fields(fields: &[(String, String)]) -> String {
    let rows: Vec<FieldRow<'_>> = fields
        .iter()
        .map(|(field, value)| FieldRow { field, value })
        .collect();
    format_table(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Tabled)]
    struct DeviceRow {
        #[tabled(rename = "DEVICE")]
        device: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
    }

    fn row(device: &str, address: &str) -> DeviceRow {
        DeviceRow {
            device: device.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn test_format_table_empty() {
        let items: Vec<DeviceRow> = vec![];
        assert_eq!(format_table(&items), "No results found.");
    }

    #[test]
    fn test_format_table_rows_and_headers() {
        let result = format_table(&[row("kitchen", "192.168.1.20"), row("garage", "10.0.0.5")]);

        assert!(result.contains("DEVICE"));
        assert!(result.contains("ADDRESS"));
        assert!(result.contains("kitchen"));
        assert!(result.contains("10.0.0.5"));
        // Rounded style uses ╭ for top-left corner
        assert!(result.contains("╭"));
    }

    #[test]
    fn test_format_fields() {
        let result = format_fields(&[
            ("id".to_string(), "shellyplus1pm".to_string()),
            ("ver".to_string(), "1.0.8".to_string()),
        ]);

        assert!(result.contains("FIELD"));
        assert!(result.contains("shellyplus1pm"));
        assert!(result.contains("1.0.8"));
    }
}
