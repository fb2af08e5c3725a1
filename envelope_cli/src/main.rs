//! # Envelope CLI
//!
//! Runs the heat-loss engine on one dwelling JSON file and prints the result
//! as JSON, or as a short report with `--summary`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use envelope_core::elements::Family;
use envelope_core::{Dwelling, EnvelopeAggregator, EnvelopeResult, ReferenceData};

#[derive(Parser, Debug)]
#[command(author, version, about = "Building envelope heat-loss calculator")]
struct Cli {
    /// Dwelling description (JSON).
    dwelling: PathBuf,

    /// Load reference tables from this TOML file instead of the built-in ones.
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Match thermal-bridge references exactly (no case or whitespace folding).
    #[arg(long)]
    strict_references: bool,

    /// Do not cap the wall base transmittance.
    #[arg(long)]
    no_wall_cap: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Print the dwelling with intermediate data attached to each element, along with the result.
    #[arg(long, conflicts_with = "summary")]
    attach: bool,

    /// Print a human-readable report instead of JSON.
    #[arg(long)]
    summary: bool,
}

#[derive(Serialize)]
struct AttachedOutput<'a> {
    dwelling: &'a Dwelling,
    result: &'a EnvelopeResult,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut dwelling = load_dwelling(&cli.dwelling)?;
    if cli.strict_references {
        dwelling.context.options.lenient_references = false;
    }
    if cli.no_wall_cap {
        dwelling.context.options.cap_wall_base_transmittance = false;
    }
    dwelling
        .validate()
        .with_context(|| format!("invalid dwelling in {}", cli.dwelling.display()))?;

    let loaded;
    let reference = match &cli.tables {
        Some(path) => {
            loaded = load_tables(path)?;
            &loaded
        }
        None => ReferenceData::builtin().context("failed to load the built-in reference tables")?,
    };
    debug!(version = reference.version(), elements = dwelling.element_count(), "computing envelope");

    let result = EnvelopeAggregator::new(reference).compute(&dwelling);

    if cli.summary {
        print_summary(&result);
        return Ok(());
    }

    let json = if cli.attach {
        result.attach_to(&mut dwelling);
        to_json(
            &AttachedOutput {
                dwelling: &dwelling,
                result: &result,
            },
            cli.pretty,
        )?
    } else {
        to_json(&result, cli.pretty)?
    };
    println!("{}", json);
    Ok(())
}

fn load_dwelling(path: &Path) -> Result<Dwelling> {
    let source = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("failed to parse dwelling from {}", path.display()))
}

fn load_tables(path: &Path) -> Result<ReferenceData> {
    let source = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    ReferenceData::from_toml_str(&source)
        .with_context(|| format!("failed to load reference tables from {}", path.display()))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn print_summary(result: &EnvelopeResult) {
    println!("═══════════════════════════════════════");
    println!("  ENVELOPE HEAT LOSS ({})", result.reference_version);
    println!("═══════════════════════════════════════");
    println!();
    println!("Transmission:");
    for family in Family::ALL {
        let count = result.elements.iter().filter(|e| e.family == family).count();
        println!(
            "  {:<16} {:>3} x  {:>9.2} W/K",
            family.display_name(),
            count,
            result.subtotals.get(family)
        );
    }
    println!();
    println!("Ventilation:");
    println!("  Hvent            {:>16.2} W/K", result.ventilation.hvent);
    println!("  Hperm            {:>16.2} W/K", result.ventilation.hperm);
    println!();
    println!("Surfaces:");
    println!("  Deperditive      {:>16.2} m²", result.statistics.deperditive_area_m2);
    println!(
        "  Insulated        {:>16.2} m² / {:.2} m² not",
        result.statistics.insulated_area_m2, result.statistics.non_insulated_area_m2
    );
    println!();
    println!("═══════════════════════════════════════");
    println!("  TOTAL: {:.2} W/K", result.total_w_per_k);
    println!("═══════════════════════════════════════");

    if !result.diagnostics.is_empty() {
        println!();
        println!("Diagnostics ({}):", result.diagnostics.len());
        for d in result.diagnostics.entries() {
            println!("  [{}] {}: {} (used {})", d.kind, d.element, d.detail, d.fallback);
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
