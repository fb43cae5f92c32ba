// 💾 Record Store - persisted compute history
// One record per "compute & save"; edits recompute in place.

use crate::calculator::{compute, FinancialInput, FinancialResult};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Timestamps are kept at microsecond precision, the resolution they are stored at
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ============================================================================
// FINANCIAL RECORD
// ============================================================================

/// A saved input together with the metrics computed from it.
///
/// Fields are private: a record can only be built or revised through the
/// calculator, so its derived fields always match its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    inputs: FinancialInput,
    #[serde(flatten)]
    results: FinancialResult,
}

impl FinancialRecord {
    /// New record with a fresh identity
    pub fn new(inputs: FinancialInput) -> Self {
        let now = now();
        let results = compute(&inputs);
        FinancialRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            inputs,
            results,
        }
    }

    /// Same identity, new inputs, recomputed metrics
    pub fn revise(&self, inputs: FinancialInput) -> Self {
        let results = compute(&inputs);
        FinancialRecord {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: now(),
            inputs,
            results,
        }
    }

    /// Rehydrate a stored record. Metrics are recomputed from the stored
    /// inputs so a row written by an older formula set never surfaces stale.
    pub(crate) fn restore(
        id: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        inputs: FinancialInput,
    ) -> Self {
        let results = compute(&inputs);
        FinancialRecord {
            id,
            created_at,
            updated_at,
            inputs,
            results,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn inputs(&self) -> &FinancialInput {
        &self.inputs
    }

    pub fn results(&self) -> &FinancialResult {
        &self.results
    }
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Persistence for financial records. The store owns record lifetime;
/// callers only ever hold copies.
pub trait RecordStore {
    fn insert(&self, record: &FinancialRecord) -> StoreResult<()>;

    /// Newest first; `limit` of None returns everything
    fn fetch_all(&self, limit: Option<usize>) -> StoreResult<Vec<FinancialRecord>>;

    fn fetch(&self, id: &str) -> StoreResult<Option<FinancialRecord>>;

    /// Overwrite an existing record. Errors with NotFound if the id is gone.
    fn replace(&self, record: &FinancialRecord) -> StoreResult<()>;

    /// Returns false when nothing was deleted
    fn remove(&self, id: &str) -> StoreResult<bool>;

    fn fetch_latest(&self) -> StoreResult<Option<FinancialRecord>> {
        Ok(self.fetch_all(Some(1))?.into_iter().next())
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Compute metrics and store them as a new history entry
pub fn compute_and_persist<S: RecordStore + ?Sized>(
    store: &S,
    inputs: FinancialInput,
) -> StoreResult<FinancialRecord> {
    let record = FinancialRecord::new(inputs);
    store.insert(&record)?;
    tracing::info!(id = %record.id(), revenue = record.results().revenue, "Saved financial record");
    Ok(record)
}

/// Replace an existing record's inputs and recompute its metrics
pub fn recompute<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
    inputs: FinancialInput,
) -> StoreResult<FinancialRecord> {
    let existing = store
        .fetch(id)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

    let revised = existing.revise(inputs);
    store.replace(&revised)?;
    tracing::info!(id = %id, "Recomputed financial record");
    Ok(revised)
}

pub fn list_records<S: RecordStore + ?Sized>(store: &S) -> StoreResult<Vec<FinancialRecord>> {
    store.fetch_all(None)
}

pub fn latest_record<S: RecordStore + ?Sized>(store: &S) -> StoreResult<Option<FinancialRecord>> {
    store.fetch_latest()
}

pub fn delete_record<S: RecordStore + ?Sized>(store: &S, id: &str) -> StoreResult<bool> {
    let deleted = store.remove(id)?;
    if deleted {
        tracing::info!(id = %id, "Deleted financial record");
    } else {
        tracing::warn!(id = %id, "Delete requested for unknown record");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{FIXED_COSTS, SELLING_PRICE, UNITS_SOLD, VARIABLE_COST_UNIT};

    fn input(price: f64, cost: f64, units: f64, fixed: f64) -> FinancialInput {
        FinancialInput::new()
            .with(SELLING_PRICE, price)
            .with(VARIABLE_COST_UNIT, cost)
            .with(UNITS_SOLD, units)
            .with(FIXED_COSTS, fixed)
    }

    #[test]
    fn test_new_record_carries_computed_metrics() {
        let record = FinancialRecord::new(input(100.0, 40.0, 50.0, 1000.0));

        assert_eq!(record.id().len(), 36);
        assert_eq!(record.created_at(), record.updated_at());
        assert_eq!(record.results().revenue, 5000.0);
        assert_eq!(record.results().cm2_margin, 2000.0);
    }

    #[test]
    fn test_revise_keeps_identity_and_recomputes() {
        let record = FinancialRecord::new(input(100.0, 40.0, 50.0, 1000.0));
        let revised = record.revise(input(10.0, 10.0, 5.0, 0.0));

        assert_eq!(revised.id(), record.id());
        assert_eq!(revised.created_at(), record.created_at());
        assert!(revised.updated_at() >= record.updated_at());
        assert_eq!(revised.results(), &compute(revised.inputs()));
        assert_eq!(revised.results().cm2_margin, 0.0);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = FinancialRecord::new(input(100.0, 40.0, 50.0, 1000.0).with_industry("General"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], serde_json::json!(record.id()));
        assert_eq!(json["industry_type"], serde_json::json!("General"));
        assert_eq!(json["selling_price"], serde_json::json!(100.0));
        assert_eq!(json["cm1_total"], serde_json::json!(3000.0));
        assert!(json.get("created_at").is_some());
    }
}
