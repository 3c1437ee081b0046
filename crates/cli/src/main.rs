use clap::{Parser, Subcommand};
use medbill_core::constants::DEFAULT_RENDER_TIMEOUT_SECS;
use medbill_core::suggestions::{fallback_codes, fallback_medications};
use medbill_core::{
    coerce_cost, format_money, BillRequest, BillService, BillingSummary, CodeStore, Encounter,
    LineItem, PatientIntake, Renderer,
};
use medbill_files::ArtifactStore;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "medbill")]
#[command(about = "MedBill billing assistant CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest codes and medications with the offline keyword rules
    Suggest {
        /// Clinical notes
        notes: String,
    },
    /// Print the billing summary for an encounter file
    Summary {
        /// Encounter file (.yaml, .yml or .json)
        file: PathBuf,
    },
    /// Render a bill for an encounter file
    Render {
        /// Encounter file (.yaml, .yml or .json)
        file: PathBuf,
        /// Directory the bill is written to
        #[arg(long, default_value = "bills")]
        out: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientSection {
    name: Option<String>,
    gender: Option<String>,
    clinical_notes: Option<String>,
    current_meds: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MedicationEntry {
    name: String,
    #[serde(default)]
    cost: serde_json::Value,
    purpose: Option<String>,
}

/// An encounter described on disk.
///
/// ```yaml
/// patient:
///   name: Jane Roe
///   clinicalNotes: Persistent cough
/// codes: ["J06.9 - Acute upper respiratory infection"]
/// medications:
///   - name: Acetaminophen 500mg
///     cost: 15.00
/// aiNotes: Rest and fluids.
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncounterFile {
    #[serde(default)]
    patient: PatientSection,
    #[serde(default)]
    codes: Vec<String>,
    #[serde(default)]
    medications: Vec<MedicationEntry>,
    ai_notes: Option<String>,
}

fn load_encounter_file(path: &Path) -> Result<EncounterFile, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&raw)?)
    } else {
        Ok(serde_yaml::from_str(&raw)?)
    }
}

fn build_store(file: &EncounterFile) -> medbill_core::CoreResult<CodeStore> {
    let mut store = CodeStore::new();
    for code in &file.codes {
        store.insert_code(medbill_core::DiagnosisCode::from_labelled(code)?);
    }
    for med in &file.medications {
        let item = LineItem::new(med.name.trim(), coerce_cost(&med.cost));
        store.add_line_item(match &med.purpose {
            Some(purpose) => item.with_purpose(purpose.as_str()),
            None => item,
        });
    }
    Ok(store)
}

fn print_summary(summary: &BillingSummary) {
    println!("Medications:      ${}", format_money(summary.per_item_total));
    println!("Consultation fee: ${}", format_money(summary.consultation_fee));
    println!(
        "Coding fee:       ${} ({} codes)",
        format_money(summary.coding_fee),
        summary.code_count
    );
    println!("Total:            ${}", format_money(summary.grand_total));
    for flagged in &summary.flagged {
        println!("  needs a cost: #{} {}", flagged.index + 1, flagged.name);
    }
}

fn render(file: EncounterFile, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = build_store(&file)?;
    let encounter = Encounter::for_billing(PatientIntake {
        name: file.patient.name,
        gender: file.patient.gender,
        clinical_notes: file.patient.clinical_notes,
        current_medications: file.patient.current_meds,
    })?;

    let service = BillService::new(
        Renderer::standard(Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS)),
        ArtifactStore::open_or_create(out)?,
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let bill = runtime.block_on(service.generate(BillRequest {
        encounter,
        store,
        ai_notes: file.ai_notes,
        client_total: None,
    }))?;

    let path = service.artifacts().directory().join(bill.record.artifact.name.as_str());
    println!("Wrote {}", path.display());
    if bill.record.degraded {
        println!("PDF rendering failed; wrote plain text instead");
    }
    print_summary(&bill.summary);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Suggest { notes }) => {
            let codes = fallback_codes(&notes);
            let medications = fallback_medications(&notes);

            println!("Codes:");
            for code in &codes {
                println!("  {}", code);
            }
            println!("Medications:");
            if medications.is_empty() {
                println!("  (none matched)");
            }
            for med in &medications {
                println!(
                    "  {} ${} {}",
                    med.name(),
                    format_money(med.cost()),
                    med.purpose().unwrap_or_default()
                );
            }

            let mut store = CodeStore::new();
            store.replace_all(codes, medications);
            print_summary(&store.summary());
        }
        Some(Commands::Summary { file }) => {
            let file = load_encounter_file(&file)?;
            let summary = build_store(&file)?.summary();
            print_summary(&summary);
            if let Err(e) = summary.ready_for_billing() {
                println!("Not ready for billing: {}", e);
            }
        }
        Some(Commands::Render { file, out }) => {
            let file = load_encounter_file(&file)?;
            render(file, &out)?;
        }
        None => {
            println!("Use 'medbill --help' for commands");
        }
    }

    Ok(())
}
