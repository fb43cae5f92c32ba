use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::env;
use std::path::Path;
use std::sync::Arc;

use unit_economics::assistant::AssistantContext;
use unit_economics::db::count_records;
use unit_economics::export::export_to_file;
use unit_economics::{
    compute, compute_and_persist, delete_record, init_tracing, latest_record, list_records,
    open_database, recompute, Assistant, Config, DashboardView, DisplayOptions, FinancialInput,
    FinancialRecord, FinancialResult, IndustryPreset, OllamaClient, PresetCatalog, RecordStore,
};

fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);
    config.log_rejected();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let rest: &[String] = args.get(2..).unwrap_or(&[]);

    match command {
        "presets" => run_presets(rest),
        "compute" => run_compute(rest),
        "save" => run_save(&config, rest),
        "history" => run_history(&config),
        "latest" => run_latest(&config),
        "update" => run_update(&config, rest),
        "delete" => run_delete(&config, rest),
        "export" => run_export(&config, rest),
        "ask" => run_ask(&config, rest),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("📈 Unit Economics Dashboard v{}", unit_economics::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Usage: unit-economics <command> [args]\n");
    println!("  presets [id]             List industry presets, or show one");
    println!("  compute <json>           Compute metrics without saving");
    println!("  save <json>              Compute and save to history");
    println!("  history                  List saved records, newest first");
    println!("  latest                   Show the latest record as a dashboard");
    println!("  update <id> <json>       Replace a record's inputs and recompute");
    println!("  delete <id>              Delete a record");
    println!("  export <file.csv>        Export history to CSV");
    println!("  ask <message>            Ask the assistant about recent history");
}

fn parse_input(rest: &[String]) -> Result<FinancialInput> {
    let raw = rest.first().context("Missing JSON input, e.g. '{\"selling_price\": 100}'")?;
    let value: Value = serde_json::from_str(raw).context("Input is not valid JSON")?;
    Ok(FinancialInput::from_json(&value))
}

fn print_result(result: &FinancialResult) {
    let ext = &result.extended;
    println!("   Revenue:          {:>14.2}", result.revenue);
    println!("   CM1 / unit:       {:>14.2}", result.cm1_margin);
    println!("   CM1 total:        {:>14.2}", result.cm1_total);
    println!("   Net profit (CM2): {:>14.2}", result.cm2_margin);
    println!("   Break-even units: {:>14}", ext.break_even_units.to_string());
    println!("   Runway (months):  {:>14}", ext.runway_months.to_string());
}

fn print_record_line(record: &FinancialRecord) {
    println!(
        "  {}  {}  {:<28}  revenue {:>12.2}  profit {:>12.2}",
        record.id(),
        record.created_at().format("%Y-%m-%d %H:%M"),
        record.inputs().industry_type().unwrap_or("-"),
        record.results().revenue,
        record.results().cm2_margin
    );
}

fn print_preset(preset: &IndustryPreset) {
    println!("\n{} ({})", preset.label, preset.id);
    println!("  {}", preset.description);
    for field in &preset.fields {
        println!("   - {:<32} {:<10} {}", field.key, field.category.name(), field.label);
    }
}

fn run_presets(rest: &[String]) -> Result<()> {
    let catalog = PresetCatalog::new();

    println!("🏭 Industry presets");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    match rest.first() {
        Some(id) => {
            let preset = catalog.get_or_default(id);
            if preset.id != id.as_str() {
                println!("⚠️  Unknown preset '{}', showing {}", id, preset.id);
            }
            print_preset(preset);
        }
        None => catalog.all().iter().for_each(print_preset),
    }
    Ok(())
}

fn run_compute(rest: &[String]) -> Result<()> {
    let input = parse_input(rest)?;
    println!("🧮 Computed metrics (not saved)");
    print_result(&compute(&input));
    Ok(())
}

fn run_save(config: &Config, rest: &[String]) -> Result<()> {
    let input = parse_input(rest)?;
    let conn = open_database(Path::new(&config.db_path))?;

    let record = compute_and_persist(&conn, input)?;
    println!("💾 Saved record {}", record.id());
    print_result(record.results());
    Ok(())
}

fn run_history(config: &Config) -> Result<()> {
    let conn = open_database(Path::new(&config.db_path))?;
    let records = list_records(&conn)?;
    let total = count_records(&conn)?;

    println!("📜 History ({} records)", total);
    for record in &records {
        print_record_line(record);
    }
    Ok(())
}

fn run_latest(config: &Config) -> Result<()> {
    let conn = open_database(Path::new(&config.db_path))?;

    let Some(record) = latest_record(&conn)? else {
        println!("📭 No records yet. Run: unit-economics save '<json>'");
        return Ok(());
    };

    let view = DashboardView::for_record(&record, &DisplayOptions::default());
    println!("📊 Latest record {}", record.id());
    for card in &view.cards {
        println!("   {:<14} {}", card.title, card.display);
    }
    Ok(())
}

fn run_update(config: &Config, rest: &[String]) -> Result<()> {
    let id = rest.first().context("Missing record id")?;
    let input = parse_input(&rest[1..])?;
    let conn = open_database(Path::new(&config.db_path))?;

    let record = recompute(&conn, id, input)?;
    println!("✏️  Updated record {}", record.id());
    print_result(record.results());
    Ok(())
}

fn run_delete(config: &Config, rest: &[String]) -> Result<()> {
    let id = rest.first().context("Missing record id")?;
    let conn = open_database(Path::new(&config.db_path))?;

    if delete_record(&conn, id)? {
        println!("🗑️  Deleted record {}", id);
    } else {
        println!("⚠️  No record with id {}", id);
    }
    Ok(())
}

fn run_export(config: &Config, rest: &[String]) -> Result<()> {
    let path = rest.first().context("Missing output path")?;
    let conn = open_database(Path::new(&config.db_path))?;

    let records = list_records(&conn)?;
    let rows = export_to_file(&records, Path::new(path))?;
    println!("📤 Exported {} records to {}", rows, path);
    Ok(())
}

fn run_ask(config: &Config, rest: &[String]) -> Result<()> {
    if rest.is_empty() {
        bail!("Missing message");
    }
    let message = rest.join(" ");

    let conn = open_database(Path::new(&config.db_path))?;
    let history = conn.fetch_all(Some(config.history_limit))?;

    let client =
        OllamaClient::new(&config.ollama_url, &config.ollama_model, config.assistant_timeout)?;
    let assistant = Assistant::new(Arc::new(client)).with_history_limit(config.history_limit);

    let context = if history.is_empty() {
        AssistantContext::None
    } else {
        AssistantContext::History(&history)
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let reply = runtime.block_on(assistant.ask(&message, &context));

    println!("🤖 {}", reply);
    Ok(())
}
