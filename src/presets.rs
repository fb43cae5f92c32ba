// 🏭 Preset Catalog - Industry Templates
// Static table of named input fields per industry. Data, not behavior.

use serde::Serialize;

// ============================================================================
// FIELD TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Revenue,
    Variable,
    Fixed,
    Capex,
    Metric,
}

impl FieldCategory {
    pub fn name(&self) -> &str {
        match self {
            FieldCategory::Revenue => "Revenue",
            FieldCategory::Variable => "Variable Costs",
            FieldCategory::Fixed => "Fixed Costs (OPEX)",
            FieldCategory::Capex => "Capital Expenditure (CapEx)",
            FieldCategory::Metric => "Financial Metrics",
        }
    }

    pub fn all() -> [FieldCategory; 5] {
        [
            FieldCategory::Revenue,
            FieldCategory::Variable,
            FieldCategory::Fixed,
            FieldCategory::Capex,
            FieldCategory::Metric,
        ]
    }
}

/// How a field's value is read. Only currency fields are summed into totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Currency,
    Count,
}

// ============================================================================
// FIELD DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PresetField {
    /// Input key handed to the calculator (e.g. "selling_price")
    pub key: &'static str,
    pub label: &'static str,
    pub category: FieldCategory,
    pub kind: FieldKind,
}

const fn field(
    key: &'static str,
    label: &'static str,
    category: FieldCategory,
    kind: FieldKind,
) -> PresetField {
    PresetField {
        key,
        label,
        category,
        kind,
    }
}

const fn money(key: &'static str, label: &'static str, category: FieldCategory) -> PresetField {
    field(key, label, category, FieldKind::Currency)
}

const fn count(key: &'static str, label: &'static str, category: FieldCategory) -> PresetField {
    field(key, label, category, FieldKind::Count)
}

use self::FieldCategory::{Capex, Fixed, Metric, Revenue, Variable};

/// Baseline fields every preset declares
const CORE_FIELDS: [PresetField; 4] = [
    money("selling_price", "Selling Price", Revenue),
    count("units_sold", "Units Sold", Revenue),
    money("variable_cost_unit", "Variable Cost / Unit", Variable),
    money("fixed_costs", "Fixed Costs", Fixed),
];

/// Cash position fields shared by every preset
const CASH_FIELDS: [PresetField; 5] = [
    money("cash_in_bank", "Cash in Bank", Metric),
    money("monthly_expenses", "Monthly Expenses", Metric),
    money("current_profit", "Current Month Profit", Metric),
    money("last_profit", "Last Month Profit", Metric),
    money("last_revenue", "Last Month Revenue", Metric),
];

// ============================================================================
// PRESET
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IndustryPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub fields: Vec<PresetField>,
}

impl IndustryPreset {
    fn new(
        id: &'static str,
        label: &'static str,
        description: &'static str,
        specific: &[PresetField],
    ) -> Self {
        let mut fields = Vec::with_capacity(CORE_FIELDS.len() + specific.len() + CASH_FIELDS.len());
        fields.extend_from_slice(&CORE_FIELDS);
        fields.extend_from_slice(specific);
        fields.extend_from_slice(&CASH_FIELDS);

        IndustryPreset {
            id,
            label,
            description,
            fields,
        }
    }

    pub fn field(&self, key: &str) -> Option<&PresetField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn fields_in(&self, category: FieldCategory) -> impl Iterator<Item = &PresetField> {
        self.fields.iter().filter(move |f| f.category == category)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

pub const DEFAULT_PRESET: &str = "manufacturing";

/// Keyed table of industry presets
pub struct PresetCatalog {
    presets: Vec<IndustryPreset>,
}

impl PresetCatalog {
    /// Catalog with the built-in industries
    pub fn new() -> Self {
        PresetCatalog {
            presets: vec![manufacturing(), saas(), logistics(), retail()],
        }
    }

    pub fn get(&self, id: &str) -> Option<&IndustryPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Look up a preset, falling back to manufacturing for unknown ids
    pub fn get_or_default(&self, id: &str) -> &IndustryPreset {
        self.get(id)
            .or_else(|| self.get(DEFAULT_PRESET))
            .unwrap_or(&self.presets[0])
    }

    pub fn all(&self) -> &[IndustryPreset] {
        &self.presets
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.presets.iter().map(|p| p.id).collect()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn manufacturing() -> IndustryPreset {
    IndustryPreset::new(
        "manufacturing",
        "Manufacturing & Hardware",
        "For physical product creation, factories, and assembly lines.",
        &[
            money("service_contracts", "Service Contracts", Revenue),
            money("marketing_spend", "Marketing Spend", Variable),
            money("variable_costs", "Other Variable Costs", Variable),
            money("sales_spend", "Sales Spend", Variable),
            money("utilities", "Utilities", Variable),
            money("logistics_cost", "Logistics Cost", Variable),
            money("variable_salaries", "Variable Salaries", Variable),
            money("fixed_costs_opex_rent_salaries", "OPEX (Rent + Salaries)", Fixed),
            money("tools", "Tools", Fixed),
            money("other_fixed_costs", "Other Fixed Costs", Fixed),
            money("machinery", "Machinery", Capex),
            money("server", "Servers", Capex),
            money("vehicles", "Vehicles", Capex),
            money("office_setup", "Office Setup", Capex),
            money("other_capex", "Other CapEx", Capex),
        ],
    )
}

fn saas() -> IndustryPreset {
    IndustryPreset::new(
        "saas",
        "SaaS & Digital Product",
        "For software, subscriptions, and digital services.",
        &[
            money("subscription_mrr", "Subscription MRR", Revenue),
            money("enterprise_licenses", "Enterprise Licenses", Revenue),
            money("cloud_costs", "AWS/Cloud Server Costs", Variable),
            money("payment_fees", "Payment Gateway Fees", Variable),
            money("support_costs", "Customer Support Costs", Variable),
            money("marketing_spend", "Marketing Spend", Variable),
            money("developer_salaries", "Developer Salaries", Fixed),
            money("software_licenses", "Software Licenses", Fixed),
            money("office_rent", "Office Rent (OpEx)", Fixed),
            money("server", "Servers", Capex),
            count("total_customers", "Total Customers", Metric),
            count("churned_customers", "Churned Customers", Metric),
        ],
    )
}

fn logistics() -> IndustryPreset {
    IndustryPreset::new(
        "logistics",
        "Logistics & Supply Chain",
        "For fleets, warehousing, and transportation.",
        &[
            money("freight_fees", "Freight Fees", Revenue),
            money("fuel_costs", "Fuel Costs", Variable),
            money("driver_overtime", "Driver Overtime", Variable),
            money("vehicle_maintenance", "Vehicle Maintenance", Variable),
            money("logistics_cost", "Other Logistics Cost", Variable),
            money("fleet_insurance", "Fleet Insurance", Fixed),
            money("warehouse_lease", "Warehouse Lease", Fixed),
            money("fleet_financing", "Fleet Financing", Capex),
            money("vehicles", "Vehicles", Capex),
            count("total_customers", "Total Customers", Metric),
            count("churned_customers", "Lost Customers", Metric),
        ],
    )
}

fn retail() -> IndustryPreset {
    IndustryPreset::new(
        "retail",
        "Retail & E-Commerce",
        "For shops, supermarkets, and online stores.",
        &[
            money("product_sales", "Product Sales", Revenue),
            money("cogs", "Cost of Goods Sold (COGS)", Variable),
            money("transaction_fees", "Transaction Fees", Variable),
            money("store_rent", "Store Rent", Fixed),
            money("staff_salaries", "Staff Salaries", Fixed),
            money("marketing_budget", "Marketing Budget", Fixed),
            money("office_setup", "Store Fit-Out", Capex),
            count("total_customers", "Total Customers", Metric),
        ],
    )
}

// ============================================================================
// TESTS
// ============================================================================
