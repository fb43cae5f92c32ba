// 📊 Dashboard View - KPI cards and chart series for one computed input
// Pure data: the client renders, we only shape and format.

use crate::calculator::{
    FinancialInput, FinancialResult, Limit, FIXED_COSTS, UNITS_SOLD, VARIABLE_COST_UNIT,
};
use crate::store::FinancialRecord;
use serde::Serialize;

/// Break-even curve sample points, as multiples of current volume
const BREAK_EVEN_STEPS: [f64; 4] = [0.0, 0.5, 1.0, 1.2];

const PROJECTION: [(&str, f64); 6] = [
    ("Jan", 0.8),
    ("Feb", 0.85),
    ("Mar", 0.92),
    ("Apr", 1.0),
    ("May", 1.1),
    ("Jun", 1.25),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub currency_symbol: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            currency_symbol: "$".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub title: &'static str,
    pub value: Limit,
    pub display: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Plus,
    Minus,
    Subtotal,
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterfallStep {
    pub name: &'static str,
    pub value: f64,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakEvenPoint {
    pub units: f64,
    pub revenue: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub month: &'static str,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub industry_type: Option<String>,
    pub cards: Vec<KpiCard>,
    pub waterfall: Vec<WaterfallStep>,
    pub break_even: Vec<BreakEvenPoint>,
    pub projection: Vec<ProjectionPoint>,
}

impl DashboardView {
    pub fn build(
        input: &FinancialInput,
        result: &FinancialResult,
        options: &DisplayOptions,
    ) -> Self {
        let symbol = options.currency_symbol.as_str();
        let ext = &result.extended;

        let cards = vec![
            KpiCard {
                title: "Revenue",
                value: Limit::Finite(result.revenue),
                display: format_currency(result.revenue, symbol),
            },
            KpiCard {
                title: "CM1",
                value: Limit::Finite(result.cm1_total),
                display: format_currency(result.cm1_total, symbol),
            },
            KpiCard {
                title: "Net Profit",
                value: Limit::Finite(result.cm2_margin),
                display: format_currency(result.cm2_margin, symbol),
            },
            KpiCard {
                title: "Break Even",
                value: ext.break_even_units,
                display: match ext.break_even_units {
                    Limit::Finite(units) => format!("{} units", group_thousands(units)),
                    Limit::Unbounded => ext.break_even_units.to_string(),
                },
            },
            KpiCard {
                title: "Runway",
                value: ext.runway_months,
                display: match ext.runway_months {
                    Limit::Finite(months) => format!("{:.1} mo", months),
                    Limit::Unbounded => ext.runway_months.to_string(),
                },
            },
            KpiCard {
                title: "Profit Growth",
                value: Limit::Finite(ext.profit_growth_pct),
                display: format!("{:+.1}%", ext.profit_growth_pct),
            },
        ];

        let waterfall = vec![
            WaterfallStep {
                name: "Revenue",
                value: result.revenue,
                kind: StepKind::Plus,
            },
            WaterfallStep {
                name: "Var Costs",
                value: ext.direct_variable_cost,
                kind: StepKind::Minus,
            },
            WaterfallStep {
                name: "CM1",
                value: result.cm1_total,
                kind: StepKind::Subtotal,
            },
            WaterfallStep {
                name: "Fixed Costs",
                value: input.get(FIXED_COSTS),
                kind: StepKind::Minus,
            },
            WaterfallStep {
                name: "Net Profit",
                value: result.cm2_margin,
                kind: StepKind::Final,
            },
        ];

        let units = input.get(UNITS_SOLD);
        let unit_cost = input.get(VARIABLE_COST_UNIT);
        let fixed = input.get(FIXED_COSTS);
        let break_even = BREAK_EVEN_STEPS
            .iter()
            .map(|&m| BreakEvenPoint {
                units: units * m,
                revenue: result.revenue * m,
                total_cost: fixed + unit_cost * units * m,
            })
            .collect();

        let projection = PROJECTION
            .iter()
            .map(|&(month, m)| ProjectionPoint {
                month,
                revenue: result.revenue * m,
            })
            .collect();

        DashboardView {
            industry_type: input.industry_type().map(str::to_string),
            cards,
            waterfall,
            break_even,
            projection,
        }
    }

    pub fn for_record(record: &FinancialRecord, options: &DisplayOptions) -> Self {
        Self::build(record.inputs(), record.results(), options)
    }

    pub fn card(&self, title: &str) -> Option<&KpiCard> {
        self.cards.iter().find(|c| c.title == title)
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// 1234567.891 -> "1,234,567.89"; at most two decimals, trailing zeros dropped
pub fn group_thousands(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let frac_part = frac_part.trim_end_matches('0');
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Sign goes before the symbol: -$1,200
pub fn format_currency(value: f64, symbol: &str) -> String {
    let grouped = group_thousands(value);
    match grouped.strip_prefix('-') {
        Some(abs) => format!("-{}{}", symbol, abs),
        None => format!("{}{}", symbol, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{compute, SELLING_PRICE};

    fn sample() -> (FinancialInput, FinancialResult) {
        let input = FinancialInput::new()
            .with(SELLING_PRICE, 100.0)
            .with(VARIABLE_COST_UNIT, 40.0)
            .with(UNITS_SOLD, 50.0)
            .with(FIXED_COSTS, 1_000.0);
        let result = compute(&input);
        (input, result)
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(5_000.0), "5,000");
        assert_eq!(group_thousands(1_234_567.891), "1,234,567.89");
        assert_eq!(group_thousands(0.5), "0.5");
        assert_eq!(group_thousands(-1_200.0), "-1,200");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(5_000.0, "$"), "$5,000");
        assert_eq!(format_currency(-1_200.0, "$"), "-$1,200");
        assert_eq!(format_currency(12.5, "€"), "€12.5");
    }

    #[test]
    fn test_cards() {
        let (input, result) = sample();
        let view = DashboardView::build(&input, &result, &DisplayOptions::default());

        let titles: Vec<&str> = view.cards.iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["Revenue", "CM1", "Net Profit", "Break Even", "Runway", "Profit Growth"]);

        assert_eq!(view.card("Revenue").unwrap().display, "$5,000");
        assert_eq!(view.card("CM1").unwrap().display, "$3,000");
        assert_eq!(view.card("Net Profit").unwrap().display, "$2,000");
        // 1000 / 60 = 16.67 -> 17
        assert_eq!(view.card("Break Even").unwrap().display, "17 units");
        assert_eq!(view.card("Runway").unwrap().display, "∞");
        assert_eq!(view.card("Runway").unwrap().value, Limit::Unbounded);
        assert_eq!(view.card("Profit Growth").unwrap().display, "+0.0%");
    }

    #[test]
    fn test_currency_symbol_is_explicit() {
        let (input, result) = sample();
        let view = DashboardView::build(&input, &result, &DisplayOptions { currency_symbol: "£".to_string() });
        assert_eq!(view.card("Revenue").unwrap().display, "£5,000");
    }

    #[test]
    fn test_waterfall() {
        let (input, result) = sample();
        let view = DashboardView::build(&input, &result, &DisplayOptions::default());

        let steps: Vec<(&str, f64)> = view.waterfall.iter().map(|s| (s.name, s.value)).collect();
        assert_eq!(
            steps,
            vec![
                ("Revenue", 5_000.0),
                ("Var Costs", 2_000.0),
                ("CM1", 3_000.0),
                ("Fixed Costs", 1_000.0),
                ("Net Profit", 2_000.0),
            ]
        );
        assert_eq!(view.waterfall[4].kind, StepKind::Final);
    }

    #[test]
    fn test_break_even_curve_and_projection() {
        let (input, result) = sample();
        let view = DashboardView::build(&input, &result, &DisplayOptions::default());

        assert_eq!(view.break_even.len(), 4);
        assert_eq!(view.break_even[0], BreakEvenPoint { units: 0.0, revenue: 0.0, total_cost: 1_000.0 });
        assert_eq!(view.break_even[2], BreakEvenPoint { units: 50.0, revenue: 5_000.0, total_cost: 3_000.0 });

        let months: Vec<&str> = view.projection.iter().map(|p| p.month).collect();
        assert_eq!(months, vec!["Jan", "Feb", "Mar", "Apr", "May", "Jun"]);
        assert_eq!(view.projection[0].revenue, 4_000.0);
        assert_eq!(view.projection[3].revenue, 5_000.0);
        assert_eq!(view.projection[5].revenue, 6_250.0);
    }

    #[test]
    fn test_unprofitable_break_even_is_unbounded() {
        let input = FinancialInput::new()
            .with(SELLING_PRICE, 10.0)
            .with(VARIABLE_COST_UNIT, 12.0)
            .with(UNITS_SOLD, 5.0)
            .with(FIXED_COSTS, 100.0);
        let result = compute(&input);
        let view = DashboardView::build(&input, &result, &DisplayOptions::default());

        let card = view.card("Break Even").unwrap();
        assert_eq!(card.value, Limit::Unbounded);
        assert_eq!(card.display, "∞");
        assert_eq!(view.card("Net Profit").unwrap().display, "-$110");
    }

    #[test]
    fn test_view_serializes_for_client() {
        let (input, result) = sample();
        let view = DashboardView::build(&input, &result, &DisplayOptions::default());
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["waterfall"][1]["kind"], serde_json::json!("minus"));
        assert_eq!(json["cards"][4]["value"], serde_json::json!("unbounded"));
    }
}
