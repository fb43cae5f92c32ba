// 📝 Parameter Form - edits one preset's fields, emits a FinancialInput

use crate::calculator::{coerce_number, FinancialInput};
use crate::presets::{FieldCategory, FieldKind, IndustryPreset};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Field '{field}' is not part of the {preset} preset")]
    UnknownField { preset: String, field: String },
}

/// In-progress edit of one preset's parameters.
///
/// Owned by whoever drives the onboarding flow; nothing here is global.
#[derive(Debug, Clone)]
pub struct ParameterForm<'a> {
    preset: &'a IndustryPreset,
    values: HashMap<&'static str, f64>,
}

impl<'a> ParameterForm<'a> {
    /// Start a form with every field at 0
    pub fn for_preset(preset: &'a IndustryPreset) -> Self {
        let values = preset.fields.iter().map(|f| (f.key, 0.0)).collect();
        ParameterForm { preset, values }
    }

    pub fn preset(&self) -> &IndustryPreset {
        self.preset
    }

    /// Set a field from a typed value (number or text). Garbage becomes 0.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), FormError> {
        self.set_number(key, coerce_number(value))
    }

    pub fn set_number(&mut self, key: &str, value: f64) -> Result<(), FormError> {
        let field = self.preset.field(key).ok_or_else(|| FormError::UnknownField {
            preset: self.preset.id.to_string(),
            field: key.to_string(),
        })?;

        let value = if value.is_finite() { value } else { 0.0 };
        self.values.insert(field.key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Sum of the currency fields in one category
    pub fn category_total(&self, category: FieldCategory) -> f64 {
        self.preset
            .fields_in(category)
            .filter(|f| f.kind == FieldKind::Currency)
            .map(|f| self.get(f.key))
            .sum()
    }

    /// Totals for every category, in display order
    pub fn totals(&self) -> Vec<(FieldCategory, f64)> {
        FieldCategory::all()
            .into_iter()
            .map(|c| (c, self.category_total(c)))
            .collect()
    }

    /// Finish editing: a flat input tagged with the preset label
    pub fn finish(&self) -> FinancialInput {
        let mut input = FinancialInput::new().with_industry(self.preset.label);
        for f in &self.preset.fields {
            input.set(f.key, self.get(f.key));
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::compute;
    use crate::presets::PresetCatalog;
    use serde_json::json;

    #[test]
    fn test_form_starts_at_zero() {
        let catalog = PresetCatalog::new();
        let form = ParameterForm::for_preset(catalog.get("saas").unwrap());

        for f in &form.preset().fields {
            assert_eq!(form.get(f.key), 0.0);
        }
        assert!(form.totals().iter().all(|(_, total)| *total == 0.0));
    }

    #[test]
    fn test_set_coerces_typed_values() {
        let catalog = PresetCatalog::new();
        let mut form = ParameterForm::for_preset(catalog.get("retail").unwrap());

        form.set("selling_price", &json!("25.5")).unwrap();
        form.set("store_rent", &json!("lots")).unwrap();
        form.set("cogs", &json!(300)).unwrap();

        assert_eq!(form.get("selling_price"), 25.5);
        assert_eq!(form.get("store_rent"), 0.0);
        assert_eq!(form.get("cogs"), 300.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let catalog = PresetCatalog::new();
        let mut form = ParameterForm::for_preset(catalog.get("retail").unwrap());

        let err = form.set_number("fuel_costs", 10.0).unwrap_err();
        assert_eq!(
            err,
            FormError::UnknownField {
                preset: "retail".to_string(),
                field: "fuel_costs".to_string(),
            }
        );
    }

    #[test]
    fn test_category_totals_only_count_currency() {
        let catalog = PresetCatalog::new();
        let mut form = ParameterForm::for_preset(catalog.get("manufacturing").unwrap());

        form.set_number("selling_price", 100.0).unwrap();
        form.set_number("units_sold", 500.0).unwrap();
        form.set_number("service_contracts", 2_000.0).unwrap();
        form.set_number("machinery", 10_000.0).unwrap();
        form.set_number("vehicles", 5_000.0).unwrap();

        assert_eq!(form.category_total(FieldCategory::Revenue), 2_100.0);
        assert_eq!(form.category_total(FieldCategory::Capex), 15_000.0);
    }

    #[test]
    fn test_finish_feeds_calculator() {
        let catalog = PresetCatalog::new();
        let mut form = ParameterForm::for_preset(catalog.get("manufacturing").unwrap());

        form.set_number("selling_price", 100.0).unwrap();
        form.set_number("variable_cost_unit", 40.0).unwrap();
        form.set_number("units_sold", 50.0).unwrap();
        form.set_number("fixed_costs", 1_000.0).unwrap();

        let input = form.finish();
        assert_eq!(input.industry_type(), Some("Manufacturing & Hardware"));
        assert_eq!(input.len(), form.preset().fields.len());

        let result = compute(&input);
        assert_eq!(result.revenue, 5_000.0);
        assert_eq!(result.cm2_margin, 2_000.0);
    }
}
