// 🗄️ Database - SQLite persistence for financial records

use crate::calculator::{FinancialInput, FIXED_COSTS, SELLING_PRICE, UNITS_SOLD, VARIABLE_COST_UNIT};
use crate::store::{FinancialRecord, RecordStore, StoreError, StoreResult};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Financials Table
    // Baseline columns stay queryable; the full flat input lives in `inputs`
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS financials (
            id TEXT PRIMARY KEY,
            industry_type TEXT,
            selling_price REAL NOT NULL DEFAULT 0,
            variable_cost_unit REAL NOT NULL DEFAULT 0,
            units_sold INTEGER NOT NULL DEFAULT 0,
            fixed_costs REAL NOT NULL DEFAULT 0,
            revenue REAL,
            cm1_margin REAL,
            cm1_total REAL,
            cm2_margin REAL,
            inputs TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create financials table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_financials_created_at ON financials(created_at)",
        [],
    )?;

    Ok(())
}

// Fixed-width timestamps so text ordering matches time ordering
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row) -> rusqlite::Result<FinancialRecord> {
    let id: String = row.get(0)?;
    let inputs_json: String = row.get(1)?;
    let inputs: FinancialInput = serde_json::from_str(&inputs_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(FinancialRecord::restore(
        id,
        parse_time(row, 2)?,
        parse_time(row, 3)?,
        inputs,
    ))
}

const SELECT_RECORD: &str = "SELECT id, inputs, created_at, updated_at FROM financials";

/// Insert a new record
pub fn insert_record(conn: &Connection, record: &FinancialRecord) -> StoreResult<()> {
    let inputs = record.inputs();
    let results = record.results();

    conn.execute(
        "INSERT INTO financials (
            id, industry_type, selling_price, variable_cost_unit, units_sold, fixed_costs,
            revenue, cm1_margin, cm1_total, cm2_margin, inputs, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.id(),
            inputs.industry_type(),
            inputs.get(SELLING_PRICE),
            inputs.get(VARIABLE_COST_UNIT),
            inputs.get(UNITS_SOLD) as i64,
            inputs.get(FIXED_COSTS),
            results.revenue,
            results.cm1_margin,
            results.cm1_total,
            results.cm2_margin,
            serde_json::to_string(inputs)?,
            format_time(record.created_at()),
            format_time(record.updated_at()),
        ],
    )?;

    Ok(())
}

/// Overwrite inputs and derived columns of an existing record
pub fn update_record(conn: &Connection, record: &FinancialRecord) -> StoreResult<()> {
    let inputs = record.inputs();
    let results = record.results();

    let changed = conn.execute(
        "UPDATE financials SET
            industry_type = ?2, selling_price = ?3, variable_cost_unit = ?4,
            units_sold = ?5, fixed_costs = ?6, revenue = ?7, cm1_margin = ?8,
            cm1_total = ?9, cm2_margin = ?10, inputs = ?11, updated_at = ?12
         WHERE id = ?1",
        params![
            record.id(),
            inputs.industry_type(),
            inputs.get(SELLING_PRICE),
            inputs.get(VARIABLE_COST_UNIT),
            inputs.get(UNITS_SOLD) as i64,
            inputs.get(FIXED_COSTS),
            results.revenue,
            results.cm1_margin,
            results.cm1_total,
            results.cm2_margin,
            serde_json::to_string(inputs)?,
            format_time(record.updated_at()),
        ],
    )?;

    if changed == 0 {
        return Err(StoreError::NotFound(record.id().to_string()));
    }
    Ok(())
}

/// Get records, newest first
pub fn get_records(conn: &Connection, limit: Option<usize>) -> StoreResult<Vec<FinancialRecord>> {
    // SQLite treats a negative LIMIT as "no limit"
    let limit = limit.map(|n| n as i64).unwrap_or(-1);

    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        SELECT_RECORD
    ))?;

    let records = stmt
        .query_map([limit], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn get_record(conn: &Connection, id: &str) -> StoreResult<Option<FinancialRecord>> {
    let record = conn
        .query_row(&format!("{} WHERE id = ?1", SELECT_RECORD), [id], record_from_row)
        .optional()?;
    Ok(record)
}

pub fn delete_record(conn: &Connection, id: &str) -> StoreResult<bool> {
    let deleted = conn.execute("DELETE FROM financials WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

/// Count records in database
pub fn count_records(conn: &Connection) -> StoreResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM financials", [], |row| row.get(0))?;
    Ok(count)
}

impl RecordStore for Connection {
    fn insert(&self, record: &FinancialRecord) -> StoreResult<()> {
        insert_record(self, record)
    }

    fn fetch_all(&self, limit: Option<usize>) -> StoreResult<Vec<FinancialRecord>> {
        get_records(self, limit)
    }

    fn fetch(&self, id: &str) -> StoreResult<Option<FinancialRecord>> {
        get_record(self, id)
    }

    fn replace(&self, record: &FinancialRecord) -> StoreResult<()> {
        update_record(self, record)
    }

    fn remove(&self, id: &str) -> StoreResult<bool> {
        delete_record(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::compute;
    use crate::store::{self, list_records};
    use serde_json::json;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn input(price: f64, cost: f64, units: f64, fixed: f64) -> FinancialInput {
        FinancialInput::new()
            .with(SELLING_PRICE, price)
            .with(VARIABLE_COST_UNIT, cost)
            .with(UNITS_SOLD, units)
            .with(FIXED_COSTS, fixed)
    }

    fn assert_identities(record: &FinancialRecord) {
        let i = record.inputs();
        let r = record.results();
        assert_eq!(r.revenue, i.get(SELLING_PRICE) * i.get(UNITS_SOLD));
        assert_eq!(r.cm1_margin, i.get(SELLING_PRICE) - i.get(VARIABLE_COST_UNIT));
        assert_eq!(r.cm1_total, r.cm1_margin * i.get(UNITS_SOLD));
        assert_eq!(r.cm2_margin, r.cm1_total - i.get(FIXED_COSTS));
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = test_db();
        setup_database(&conn).unwrap();
        assert_eq!(count_records(&conn).unwrap(), 0);
    }

    #[test]
    fn test_create_appends_history() {
        let conn = test_db();

        let first = store::compute_and_persist(&conn, input(100.0, 40.0, 50.0, 1000.0)).unwrap();
        let second = store::compute_and_persist(&conn, input(100.0, 40.0, 50.0, 1000.0)).unwrap();

        assert_ne!(first.id(), second.id(), "identical submissions are never merged");
        assert_eq!(count_records(&conn).unwrap(), 2);
    }

    #[test]
    fn test_list_newest_first() {
        let conn = test_db();

        let a = store::compute_and_persist(&conn, input(1.0, 0.0, 1.0, 0.0)).unwrap();
        let b = store::compute_and_persist(&conn, input(2.0, 0.0, 1.0, 0.0)).unwrap();
        let c = store::compute_and_persist(&conn, input(3.0, 0.0, 1.0, 0.0)).unwrap();

        let ids: Vec<String> = list_records(&conn)
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec![c.id(), b.id(), a.id()]);

        let latest = store::latest_record(&conn).unwrap().unwrap();
        assert_eq!(latest.id(), c.id());

        let two = conn.fetch_all(Some(2)).unwrap();
        assert_eq!(two.len(), 2);
    }

    #[test]
    fn test_latest_on_empty_store() {
        let conn = test_db();
        assert!(store::latest_record(&conn).unwrap().is_none());
    }

    #[test]
    fn test_roundtrip_preserves_inputs() {
        let conn = test_db();
        let dirty = FinancialInput::from_json(&json!({
            "industry_type": "SaaS & Digital Product",
            "selling_price": "49",
            "variable_cost_unit": 9,
            "units_sold": "120",
            "fixed_costs": 3000,
            "cloud_costs": "oops",
            "total_customers": 120
        }));

        let saved = store::compute_and_persist(&conn, dirty.clone()).unwrap();
        let loaded = get_record(&conn, saved.id()).unwrap().unwrap();

        assert_eq!(loaded.inputs(), &dirty);
        assert_eq!(loaded.results(), saved.results());
        assert_eq!(loaded.created_at(), saved.created_at());
        assert_eq!(loaded.inputs().industry_type(), Some("SaaS & Digital Product"));
    }

    #[test]
    fn test_recompute_leaves_no_stale_values() {
        let conn = test_db();
        let saved = store::compute_and_persist(&conn, input(100.0, 40.0, 50.0, 1000.0)).unwrap();

        let new_input = input(10.0, 10.0, 5.0, 0.0);
        let updated = store::recompute(&conn, saved.id(), new_input.clone()).unwrap();
        assert_eq!(updated.id(), saved.id());

        let listed = list_records(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].results(), &compute(&new_input));
        assert_identities(&listed[0]);

        // Queryable columns were rewritten too
        let cm2: f64 = conn
            .query_row("SELECT cm2_margin FROM financials WHERE id = ?1", [saved.id()], |r| r.get(0))
            .unwrap();
        assert_eq!(cm2, 0.0);
    }

    #[test]
    fn test_recompute_unknown_id() {
        let conn = test_db();
        let err = store::recompute(&conn, "missing", input(1.0, 1.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn test_delete_record() {
        let conn = test_db();
        let saved = store::compute_and_persist(&conn, input(5.0, 1.0, 10.0, 0.0)).unwrap();

        assert!(store::delete_record(&conn, saved.id()).unwrap());
        assert!(!store::delete_record(&conn, saved.id()).unwrap());
        assert_eq!(count_records(&conn).unwrap(), 0);
    }

    #[test]
    fn test_reads_recompute_from_inputs() {
        let conn = test_db();
        let saved = store::compute_and_persist(&conn, input(100.0, 40.0, 50.0, 1000.0)).unwrap();

        // Simulate a row left behind by an older formula set
        conn.execute("UPDATE financials SET revenue = 1 WHERE id = ?1", [saved.id()])
            .unwrap();

        let loaded = get_record(&conn, saved.id()).unwrap().unwrap();
        assert_eq!(loaded.results().revenue, 5000.0);
        assert_identities(&loaded);
    }
}
