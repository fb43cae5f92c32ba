//! Narrative assistant backed by a locally hosted language model.
//!
//! Prompts are built deterministically from the data handed in; the model is
//! reached through a single "generate from prompt" call. Any failure is
//! logged and surfaces as [`FALLBACK_REPLY`], never as an error.

use crate::calculator::{
    FinancialInput, FinancialResult, FIXED_COSTS, SELLING_PRICE, UNITS_SOLD, VARIABLE_COST_UNIT,
};
use crate::store::FinancialRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const FALLBACK_REPLY: &str = "Error: Could not connect to local AI.";

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Assistant request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Assistant service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed assistant response: {0}")]
    MalformedResponse(String),
}

/// Anything that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

// ============================================================================
// Ollama client
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for Ollama's `/api/generate` endpoint (non-streaming)
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let resp = self.client.post(&url).json(&request).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AssistantError::Status { status, body });
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AssistantError::MalformedResponse(e.to_string()))?;

        Ok(body.response)
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// What the assistant gets to see alongside the user's message
pub enum AssistantContext<'a> {
    /// Free chat, no business data
    None,
    /// The parameters on screen and their computed metrics
    Current {
        inputs: &'a FinancialInput,
        results: &'a FinancialResult,
    },
    /// Saved records, newest first (as the store returns them)
    History(&'a [FinancialRecord]),
    /// One KPI card the user asked about
    Kpi {
        name: &'a str,
        value: &'a str,
        business: &'a FinancialInput,
    },
}

/// Trimmed view of a record; keeps the model focused on what matters
#[derive(Serialize)]
struct HistoryEntry<'a> {
    id: &'a str,
    selling_price: f64,
    variable_cost_unit: f64,
    units_sold: f64,
    revenue: f64,
    cm2_margin: f64,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a FinancialRecord> for HistoryEntry<'a> {
    fn from(record: &'a FinancialRecord) -> Self {
        let inputs = record.inputs();
        HistoryEntry {
            id: record.id(),
            selling_price: inputs.get(SELLING_PRICE),
            variable_cost_unit: inputs.get(VARIABLE_COST_UNIT),
            units_sold: inputs.get(UNITS_SOLD),
            revenue: record.results().revenue,
            cm2_margin: record.results().cm2_margin,
            created_at: record.created_at(),
        }
    }
}

/// Build the prompt sent to the model. Same data in, same prompt out.
pub fn build_prompt(message: &str, context: &AssistantContext<'_>, history_limit: usize) -> String {
    match context {
        AssistantContext::None => format!(
            "You are a helpful business assistant. The user says: \"{}\". Reply concisely.",
            message
        ),
        AssistantContext::Current { inputs, results } => current_prompt(message, inputs, results),
        AssistantContext::History(records) => history_prompt(message, records, history_limit),
        AssistantContext::Kpi {
            name,
            value,
            business,
        } => kpi_prompt(message, name, value, business),
    }
}

fn history_prompt(message: &str, records: &[FinancialRecord], limit: usize) -> String {
    let mut entries: Vec<HistoryEntry> =
        records.iter().take(limit).map(HistoryEntry::from).collect();
    entries.reverse();

    let history = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are an expert business analyst reviewing unit-economics simulations.\n\n\
         Recent simulation runs, oldest first:\n{}\n\n\
         The user asks: \"{}\"\n\n\
         Guidelines:\n\
         - Answer from the data above.\n\
         - For comparisons, weigh the latest run (last in the list) against the earlier ones.\n\
         - cm2_margin is the net profit.\n\
         - Keep the answer concise and professional.",
        history, message
    )
}

fn current_prompt(message: &str, inputs: &FinancialInput, results: &FinancialResult) -> String {
    let mut parameters = String::new();
    for (key, value) in inputs.fields() {
        parameters.push_str(&format!("- {}: {}\n", key, value));
    }

    let ext = &results.extended;
    format!(
        "You are an expert business analyst.\n\n\
         Industry: {}\n\
         Parameters:\n{}\n\
         Computed metrics:\n\
         - Revenue: {}\n\
         - CM1 per unit: {}\n\
         - CM1 total: {}\n\
         - Net profit (CM2): {}\n\
         - Break-even units: {}\n\
         - Runway (months): {}\n\n\
         The user asks: \"{}\"\n\
         Answer from these figures and keep it concise.",
        inputs.industry_type().unwrap_or("General"),
        parameters,
        results.revenue,
        results.cm1_margin,
        results.cm1_total,
        results.cm2_margin,
        ext.break_even_units,
        ext.runway_months,
        message
    )
}

fn kpi_prompt(message: &str, name: &str, value: &str, business: &FinancialInput) -> String {
    let mut prompt = format!(
        "You are a senior business analyst.\n\n\
         Context:\n\
         The user runs a business in the \"{}\" industry.\n\
         - Selling Price: ${}\n\
         - Variable Cost: ${}\n\
         - Fixed Costs: ${}\n\
         - Units Sold: {}\n\n\
         Their {} is currently {}.\n\n\
         Task:\n\
         Explain why the {} is at this level given the context above, \
         say whether it is healthy for this industry, \
         and give 2 specific actionable tips to improve it. \
         Keep the answer under 100 words.",
        business.industry_type().unwrap_or("General"),
        business.get(SELLING_PRICE),
        business.get(VARIABLE_COST_UNIT),
        business.get(FIXED_COSTS),
        business.get(UNITS_SOLD),
        name,
        value,
        name
    );

    if !message.trim().is_empty() {
        prompt.push_str(&format!("\nThe user also asks: \"{}\"", message.trim()));
    }
    prompt
}

// ============================================================================
// Assistant
// ============================================================================

#[derive(Clone)]
pub struct Assistant {
    generator: Arc<dyn TextGenerator>,
    history_limit: usize,
}

impl Assistant {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Ask the model. Best effort: failures come back as [`FALLBACK_REPLY`].
    pub async fn ask(&self, message: &str, context: &AssistantContext<'_>) -> String {
        let prompt = build_prompt(message, context, self.history_limit);
        tracing::debug!(chars = prompt.len(), "Sending prompt to assistant");

        match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Assistant unavailable, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
