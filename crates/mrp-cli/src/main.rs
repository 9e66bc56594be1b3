use anyhow::{bail, Result};
use clap::Parser;
use mrp_bom::AllocationContext;
use mrp_calc::{MrpConfig, MrpEngine};
use mrp_core::{DemandRepository, PartNumber, Serial};
use std::path::PathBuf;

mod data;
mod report;

#[derive(Parser)]
#[command(name = "mrp")]
#[command(about = "Serial-effective MRP planning engine")]
#[command(version)]
struct Cli {
    /// Built-in scenario instead of input files (available: demo)
    #[arg(long, value_name = "NAME", conflicts_with_all = ["items", "bom", "inventory", "demands"])]
    scenario: Option<String>,

    /// Item master CSV
    #[arg(long, value_name = "FILE")]
    items: Option<PathBuf>,

    /// BOM lines CSV
    #[arg(long, value_name = "FILE")]
    bom: Option<PathBuf>,

    /// Inventory CSV (optional; empty stockroom without it)
    #[arg(long, value_name = "FILE")]
    inventory: Option<PathBuf>,

    /// Demands CSV
    #[arg(long, value_name = "FILE")]
    demands: Option<PathBuf>,

    /// Output file (text/json) or directory (csv); stdout if not given
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output format (text, json, csv)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Also run critical-path analysis for this part
    #[arg(long, value_name = "PART")]
    critical_path: Option<String>,

    /// How many ranked paths to keep in the analysis
    #[arg(long, default_value_t = 5)]
    top_paths: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_data(cli: &Cli) -> Result<data::PlanningData> {
    if let Some(name) = &cli.scenario {
        return data::builtin_scenario(name);
    }

    let (Some(items), Some(bom), Some(demands)) = (&cli.items, &cli.bom, &cli.demands) else {
        bail!("either --scenario or all of --items, --bom and --demands are required");
    };

    let mut loaded = data::PlanningData {
        items: data::load_items(items)?,
        bom_lines: data::load_bom(bom)?,
        demands: data::load_demands(demands)?,
        ..Default::default()
    };
    if let Some(inventory) = &cli.inventory {
        let (lots, serials) = data::load_inventory(inventory)?;
        loaded.lots = lots;
        loaded.serials = serials;
    }
    Ok(loaded)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    let loaded = load_data(&cli)?;
    let (items, bom, inventory, demand_store) = loaded.into_repositories()?;
    let demands = demand_store.all_demands()?;

    let engine = MrpEngine::new(items, bom, inventory, MrpConfig::default())?;
    let plan = engine.plan(&demands)?;

    // Critical path runs against the plan's allocations so stocked
    // subtrees drop out of the effective chain
    let analysis = match &cli.critical_path {
        Some(part) => {
            let reference = demands.first();
            let target_serial = reference
                .map(|d| d.target_serial.clone())
                .unwrap_or_else(|| Serial::new("SN001"));
            let location = reference
                .map(|d| d.location.clone())
                .unwrap_or_else(|| "FACTORY".to_string());
            let context = AllocationContext::from_allocations(&plan.allocations);
            Some(engine.critical_path(
                &PartNumber::new(part.clone()),
                &target_serial,
                &location,
                cli.top_paths,
                Some(&context),
            )?)
        }
        None => None,
    };

    let report = report::Report {
        plan: &plan,
        critical_path: analysis.as_ref(),
    };

    match cli.format.as_str() {
        "json" => {
            let rendered = report::render_json(&report)?;
            match &cli.output {
                Some(path) => std::fs::write(path, rendered)?,
                None => println!("{}", rendered),
            }
        }
        "csv" => {
            let Some(dir) = &cli.output else {
                bail!("--format csv requires --output <DIR>");
            };
            report::write_csv_reports(dir, &plan)?;
        }
        "text" => {
            let rendered = report::render_text(&report);
            match &cli.output {
                Some(path) => std::fs::write(path, rendered)?,
                None => println!("{}", rendered),
            }
        }
        other => bail!("unknown output format: {}", other),
    }

    Ok(())
}
