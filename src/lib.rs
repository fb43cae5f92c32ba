// Unit Economics Dashboard - Core Library
// Shared by the CLI, the API server, and tests

pub mod calculator;
pub mod presets;
pub mod builder;
pub mod store;
pub mod db;
pub mod view;
pub mod assistant;
pub mod export;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use calculator::{
    compute, coerce_number, ExtendedMetrics, FinancialInput, FinancialResult, Limit,
};
pub use presets::{FieldCategory, FieldKind, IndustryPreset, PresetCatalog, PresetField};
pub use builder::{FormError, ParameterForm};
pub use store::{
    compute_and_persist, delete_record, latest_record, list_records, recompute,
    FinancialRecord, RecordStore, StoreError, StoreResult,
};
pub use db::{open_database, setup_database};
pub use view::{DashboardView, DisplayOptions};
pub use assistant::{
    Assistant, AssistantContext, AssistantError, OllamaClient, TextGenerator, FALLBACK_REPLY,
};
pub use config::{Config, LogFormat};
pub use logging::init_tracing;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
