// 🧮 Financial Calculator - Unit Economics
// Pure transformation: FinancialInput -> FinancialResult

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// FIELD NAMES
// ============================================================================

pub const SELLING_PRICE: &str = "selling_price";
pub const VARIABLE_COST_UNIT: &str = "variable_cost_unit";
pub const UNITS_SOLD: &str = "units_sold";
pub const FIXED_COSTS: &str = "fixed_costs";
pub const INDUSTRY_TYPE: &str = "industry_type";

/// Older builder forms send the unit cost under this name
const COST_PER_UNIT_ALIAS: &str = "cost_per_unit";

/// Variable spend summed into `variable_cost_total`
pub const VARIABLE_COST_FIELDS: &[&str] = &[
    "marketing_spend",
    "variable_costs",
    "sales_spend",
    "utilities",
    "logistics_cost",
    "variable_salaries",
    "cloud_costs",
    "payment_fees",
    "support_costs",
    "fuel_costs",
    "driver_overtime",
    "vehicle_maintenance",
    "cogs",
    "transaction_fees",
];

/// Recurring overheads summed into `fixed_cost_total`
pub const FIXED_COST_FIELDS: &[&str] = &[
    "fixed_costs_opex_rent_salaries",
    "tools",
    "other_fixed_costs",
    "developer_salaries",
    "software_licenses",
    "office_rent",
    "fleet_insurance",
    "warehouse_lease",
    "store_rent",
    "staff_salaries",
    "marketing_budget",
];

/// One-time asset purchases summed into `capex_total`
pub const CAPEX_FIELDS: &[&str] = &[
    "machinery",
    "server",
    "vehicles",
    "office_setup",
    "other_capex",
    "fleet_financing",
];

/// Fields parsed as whole numbers (fractions are truncated toward zero)
const COUNT_FIELDS: &[&str] = &[UNITS_SOLD, "total_customers", "churned_customers"];

/// Keys that never count as inputs: record bookkeeping and derived outputs.
/// Edit forms echo whole records back, so these have to be dropped on the way in.
const RECORD_KEYS: &[&str] = &["id", "created_at", "updated_at", "createdAt", "updatedAt"];

pub const DERIVED_FIELDS: &[&str] = &[
    "revenue",
    "cm1_margin",
    "cm1_total",
    "cm2_margin",
    "variable_cost_total",
    "fixed_cost_total",
    "capex_total",
    "direct_variable_cost",
    "cm1_unit",
    "cm2_unit",
    "cm3_unit",
    "profit_per_unit",
    "profit_per_customer",
    "variable_cost_ratio",
    "fixed_cost_ratio",
    "capex_ratio",
    "profit_growth_pct",
    "revenue_growth_pct",
    "runway_months",
    "burn_rate",
    "net_burn",
    "break_even_units",
    "churn_rate_pct",
    "arpu",
    "ltv",
    "mrr",
    "arr",
];

// ============================================================================
// COERCION
// ============================================================================

/// Coerce a user-typed value to a number.
///
/// Numbers pass through, numeric strings are parsed, everything else
/// (null, booleans, garbage text, NaN, infinities) becomes 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn normalize(key: &str, value: f64) -> f64 {
    let value = if value.is_finite() { value } else { 0.0 };
    if COUNT_FIELDS.contains(&key) {
        value.trunc()
    } else {
        value
    }
}

// ============================================================================
// FINANCIAL INPUT
// ============================================================================

/// Flat mapping of named numeric parameters.
///
/// Fields are industry dependent; anything not set reads as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialInput {
    industry_type: Option<String>,
    fields: BTreeMap<String, f64>,
}

impl FinancialInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary JSON value. Non-objects yield an empty input.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::default(),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut input = FinancialInput::new();

        for (key, value) in map {
            if key == INDUSTRY_TYPE {
                input.industry_type = value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                continue;
            }
            if RECORD_KEYS.contains(&key.as_str()) || DERIVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            input.set(key.clone(), coerce_number(value));
        }

        if !input.fields.contains_key(VARIABLE_COST_UNIT) {
            if let Some(cost) = input.fields.get(COST_PER_UNIT_ALIAS).copied() {
                input.fields.insert(VARIABLE_COST_UNIT.to_string(), cost);
            }
        }

        input
    }

    /// Builder: set a field
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.set(key, value);
        self
    }

    /// Builder: set the industry label
    pub fn with_industry(mut self, label: impl Into<String>) -> Self {
        self.industry_type = Some(label.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        let value = normalize(&key, value);
        self.fields.insert(key, value);
    }

    pub fn set_industry_type(&mut self, label: Option<String>) {
        self.industry_type = label;
    }

    /// Read a field, 0 when unset
    pub fn get(&self, key: &str) -> f64 {
        self.fields.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn industry_type(&self) -> Option<&str> {
        self.industry_type.as_deref()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn sum(&self, keys: &[&str]) -> f64 {
        keys.iter().map(|k| self.get(k)).sum()
    }
}

impl Serialize for FinancialInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len() + usize::from(self.industry_type.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(industry) = &self.industry_type {
            map.serialize_entry(INDUSTRY_TYPE, industry)?;
        }
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FinancialInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FinancialInput::from_json(&value))
    }
}

// ============================================================================
// LIMIT (finite value or unbounded)
// ============================================================================

pub const UNBOUNDED: &str = "unbounded";

/// A metric that may have no finite value (zero burn, zero churn, ...).
///
/// Serialized as a plain number, or the string `"unbounded"`.
/// Displayed as the number, or `∞`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Finite(f64),
    Unbounded,
}

impl Limit {
    pub fn finite(self) -> Option<f64> {
        match self {
            Limit::Finite(v) => Some(v),
            Limit::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Limit::Unbounded)
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Finite(0.0)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(v) if v.fract() == 0.0 => write!(f, "{}", v),
            Limit::Finite(v) => write!(f, "{:.1}", v),
            Limit::Unbounded => write!(f, "∞"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Finite(v) => serializer.serialize_f64(*v),
            Limit::Unbounded => serializer.serialize_str(UNBOUNDED),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Limit::Finite(v)),
            Repr::Text(s) if s == UNBOUNDED => Ok(Limit::Unbounded),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"{}\", got \"{}\"",
                UNBOUNDED, s
            ))),
        }
    }
}

// ============================================================================
// FINANCIAL RESULT
// ============================================================================

/// Derived metrics. Purely a function of the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    pub revenue: f64,
    /// Per-unit contribution: price minus unit cost
    pub cm1_margin: f64,
    pub cm1_total: f64,
    /// Net profit
    pub cm2_margin: f64,

    #[serde(flatten)]
    pub extended: ExtendedMetrics,
}

/// Richer per-industry metrics. Reported alongside the baseline four
/// fields and never feeds back into them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedMetrics {
    // Aggregates
    pub variable_cost_total: f64,
    pub fixed_cost_total: f64,
    pub capex_total: f64,
    pub direct_variable_cost: f64,

    // Contribution ladder (per unit)
    pub cm1_unit: f64,
    pub cm2_unit: f64,
    pub cm3_unit: f64,

    pub profit_per_unit: f64,
    pub profit_per_customer: f64,

    // Ratios, % of revenue
    pub variable_cost_ratio: f64,
    pub fixed_cost_ratio: f64,
    pub capex_ratio: f64,

    // Month over month, %
    pub profit_growth_pct: f64,
    pub revenue_growth_pct: f64,

    // Cash
    pub runway_months: Limit,
    pub burn_rate: f64,
    pub net_burn: f64,
    pub break_even_units: Limit,

    // Customers
    pub churn_rate_pct: f64,
    pub arpu: f64,
    pub ltv: Limit,

    // Subscription
    pub mrr: f64,
    pub arr: f64,
}

// ============================================================================
// FORMULAS
// ============================================================================

/// Percentage of `whole`, 0 when there is nothing to compare against
fn ratio_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part * 100.0 / whole
    } else {
        0.0
    }
}

fn per(amount: f64, count: f64) -> f64 {
    if count > 0.0 {
        amount / count
    } else {
        0.0
    }
}

/// Spread a cost over units; with no units the full amount lands on one
fn allocate_per_unit(amount: f64, units: f64) -> f64 {
    amount / if units > 0.0 { units } else { 1.0 }
}

fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) * 100.0 / previous
    } else {
        0.0
    }
}

/// Compute all derived metrics for an input.
///
/// Never fails: missing or malformed fields already read as 0 and every
/// division is guarded.
pub fn compute(input: &FinancialInput) -> FinancialResult {
    let selling_price = input.get(SELLING_PRICE);
    let variable_cost_unit = input.get(VARIABLE_COST_UNIT);
    let units_sold = input.get(UNITS_SOLD);
    let fixed_costs = input.get(FIXED_COSTS);

    let revenue = selling_price * units_sold;
    let cm1_margin = selling_price - variable_cost_unit;
    let cm1_total = cm1_margin * units_sold;
    let cm2_margin = cm1_total - fixed_costs;

    FinancialResult {
        revenue,
        cm1_margin,
        cm1_total,
        cm2_margin,
        extended: extended_metrics(input, revenue, cm1_margin, cm1_total),
    }
}

fn extended_metrics(
    input: &FinancialInput,
    revenue: f64,
    cm1_margin: f64,
    cm1_total: f64,
) -> ExtendedMetrics {
    let units = input.get(UNITS_SOLD);
    let fixed_costs = input.get(FIXED_COSTS);

    let variable_cost_total = input.sum(VARIABLE_COST_FIELDS);
    let fixed_cost_total = input.sum(FIXED_COST_FIELDS);
    let capex_total = input.sum(CAPEX_FIELDS);

    let cm1_unit = cm1_margin;
    let cm2_unit = cm1_unit
        - allocate_per_unit(input.get("variable_salaries") + input.get("logistics_cost"), units);
    let cm3_unit = cm2_unit
        - allocate_per_unit(input.get("marketing_spend") + input.get("sales_spend"), units);

    let current_profit = input.get("current_profit");
    let customers = input.get("total_customers");

    let monthly_expenses = input.get("monthly_expenses");
    let runway_months = if monthly_expenses > 0.0 {
        Limit::Finite(input.get("cash_in_bank") / monthly_expenses)
    } else {
        Limit::Unbounded
    };

    let break_even_units = if fixed_costs <= 0.0 {
        Limit::Finite(0.0)
    } else if cm1_margin <= 0.0 {
        Limit::Unbounded
    } else {
        Limit::Finite((fixed_costs / cm1_margin).ceil())
    };

    let churn_rate_pct = ratio_pct(input.get("churned_customers"), customers);
    let arpu = per(revenue, customers);
    let ltv = lifetime_value(arpu, per(cm1_total, revenue), churn_rate_pct / 100.0);

    let mrr = input.get("subscription_mrr");

    ExtendedMetrics {
        variable_cost_total,
        fixed_cost_total,
        capex_total,
        direct_variable_cost: input.get(VARIABLE_COST_UNIT) * units,
        cm1_unit,
        cm2_unit,
        cm3_unit,
        profit_per_unit: per(current_profit, units),
        profit_per_customer: per(current_profit, customers),
        variable_cost_ratio: ratio_pct(variable_cost_total, revenue),
        fixed_cost_ratio: ratio_pct(fixed_cost_total, revenue),
        capex_ratio: ratio_pct(capex_total, revenue),
        profit_growth_pct: growth_pct(current_profit, input.get("last_profit")),
        revenue_growth_pct: growth_pct(revenue, input.get("last_revenue")),
        runway_months,
        burn_rate: monthly_expenses,
        net_burn: (monthly_expenses - revenue).max(0.0),
        break_even_units,
        churn_rate_pct,
        arpu,
        ltv,
        mrr,
        arr: mrr * 12.0,
    }
}

/// LTV = ARPU × contribution ratio / churn fraction
fn lifetime_value(arpu: f64, contribution_ratio: f64, churn: f64) -> Limit {
    if arpu <= 0.0 {
        Limit::Finite(0.0)
    } else if churn <= 0.0 {
        Limit::Unbounded
    } else {
        Limit::Finite(arpu * contribution_ratio / churn)
    }
}

// ============================================================================
// TESTS
// ============================================================================
