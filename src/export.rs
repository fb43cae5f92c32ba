// 📤 CSV Export - history as a flat spreadsheet

use crate::calculator::{FIXED_COSTS, SELLING_PRICE, UNITS_SOLD, VARIABLE_COST_UNIT};
use crate::store::FinancialRecord;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    created_at: String,
    updated_at: String,
    industry_type: &'a str,
    selling_price: f64,
    variable_cost_unit: f64,
    units_sold: f64,
    fixed_costs: f64,
    revenue: f64,
    cm1_margin: f64,
    cm1_total: f64,
    cm2_margin: f64,
}

impl<'a> From<&'a FinancialRecord> for ExportRow<'a> {
    fn from(record: &'a FinancialRecord) -> Self {
        let inputs = record.inputs();
        let results = record.results();
        ExportRow {
            id: record.id(),
            created_at: record.created_at().to_rfc3339(),
            updated_at: record.updated_at().to_rfc3339(),
            industry_type: inputs.industry_type().unwrap_or(""),
            selling_price: inputs.get(SELLING_PRICE),
            variable_cost_unit: inputs.get(VARIABLE_COST_UNIT),
            units_sold: inputs.get(UNITS_SOLD),
            fixed_costs: inputs.get(FIXED_COSTS),
            revenue: results.revenue,
            cm1_margin: results.cm1_margin,
            cm1_total: results.cm1_total,
            cm2_margin: results.cm2_margin,
        }
    }
}

/// Write records as CSV (header row first). Returns the number of rows.
pub fn write_csv<W: Write>(records: &[FinancialRecord], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    for record in records {
        wtr.serialize(ExportRow::from(record))
            .with_context(|| format!("Failed to write record {}", record.id()))?;
    }
    if records.is_empty() {
        // serialize() only emits headers alongside the first row
        wtr.write_record(HEADERS)?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(records.len())
}

pub fn export_to_file(records: &[FinancialRecord], path: &Path) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    let rows = write_csv(records, file)?;
    tracing::info!(rows, path = %path.display(), "Exported records to CSV");
    Ok(rows)
}

const HEADERS: [&str; 12] = [
    "id",
    "created_at",
    "updated_at",
    "industry_type",
    "selling_price",
    "variable_cost_unit",
    "units_sold",
    "fixed_costs",
    "revenue",
    "cm1_margin",
    "cm1_total",
    "cm2_margin",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::FinancialInput;

    fn record(price: f64, units: f64) -> FinancialRecord {
        FinancialRecord::new(
            FinancialInput::new()
                .with_industry("SaaS")
                .with(SELLING_PRICE, price)
                .with(VARIABLE_COST_UNIT, 2.0)
                .with(UNITS_SOLD, units)
                .with(FIXED_COSTS, 10.0),
        )
    }

    #[test]
    fn test_header_and_one_row_per_record() {
        let records = vec![record(10.0, 5.0), record(20.0, 3.0)];
        let mut out = Vec::new();

        let rows = write_csv(&records, &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADERS.join(","));
        assert!(lines[1].starts_with(records[0].id()));
        assert!(lines[1].contains(",SaaS,10.0,2.0,5.0,10.0,50.0,8.0,40.0,30.0"));
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&[], &mut out).unwrap(), 0);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim_end(), HEADERS.join(","));
    }

    #[test]
    fn test_csv_reads_back() {
        let records = vec![record(10.0, 5.0)];
        let mut out = Vec::new();
        write_csv(&records, &mut out).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], records[0].id());
        assert_eq!(row[11].parse::<f64>().unwrap(), 30.0);
    }
}
