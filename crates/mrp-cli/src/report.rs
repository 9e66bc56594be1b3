use anyhow::{Context, Result};
use colored::*;
use mrp_calc::PlanResult;
use mrp_core::{AllocationSource, CriticalPathAnalysis};
use serde::Serialize;
use std::path::Path;

/// Everything a run produced, in one serializable report
#[derive(Serialize)]
pub struct Report<'a> {
    pub plan: &'a PlanResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_path: Option<&'a CriticalPathAnalysis>,
}

pub fn render_json(report: &Report<'_>) -> Result<String> {
    serde_json::to_string_pretty(report).context("serializing report")
}

pub fn render_text(report: &Report<'_>) -> String {
    let mut out = String::new();
    let plan = report.plan;

    out.push_str(&format!("\n{}\n\n", "=== Planned Orders ===".bold().green()));
    out.push_str(&format!(
        "{}\n",
        format!(
            "{:<20} {:>8} {:<12} {:<12} {:<6} {}",
            "Part", "Qty", "Start", "Due", "Type", "Trace"
        )
        .bold()
        .cyan()
    ));
    out.push_str(&format!("{}\n", "─".repeat(100).dimmed()));
    for order in &plan.planned_orders {
        out.push_str(&format!(
            "{:<20} {:>8} {:<12} {:<12} {:<6} {}\n",
            order.part.as_str(),
            order.quantity,
            order.start_date,
            order.due_date,
            format!("{:?}", order.order_type),
            order.demand_trace.dimmed(),
        ));
    }

    out.push_str(&format!("\n{}\n\n", "=== Allocations ===".bold().green()));
    for alloc in &plan.allocations {
        if alloc.allocated_qty == 0 {
            continue;
        }
        out.push_str(&format!(
            "{:<20} {:<10} allocated {:>6}  remaining {:>6}\n",
            alloc.part.as_str(),
            alloc.location,
            alloc.allocated_qty,
            alloc.remaining_demand,
        ));
        for source in &alloc.allocated_from {
            match source {
                AllocationSource::Lot { lot_number, quantity } => {
                    out.push_str(&format!("    lot {:<16} qty {}\n", lot_number, quantity));
                }
                AllocationSource::Serialized { serial_number } => {
                    out.push_str(&format!("    serial {}\n", serial_number.as_str()));
                }
            }
        }
    }

    if plan.shortages.is_empty() {
        out.push_str(&format!("\n{}\n", "No shortages.".green()));
    } else {
        out.push_str(&format!("\n{}\n\n", "=== Shortages ===".bold().red()));
        for shortage in &plan.shortages {
            out.push_str(&format!(
                "{:<20} {:<10} short {:>6} needed {}  ({})\n",
                shortage.part.as_str().red(),
                shortage.location,
                shortage.short_qty,
                shortage.need_date,
                shortage.demand_trace.dimmed(),
            ));
        }
    }

    if let Some(analysis) = report.critical_path {
        out.push_str(&format!("\n{}\n\n", "=== Critical Path ===".bold().yellow()));
        out.push_str(&format!(
            "{} for {} toward {} ({} paths)\n",
            analysis.top_level_part.as_str().bold(),
            analysis.location,
            analysis.target_serial.as_str(),
            analysis.total_paths,
        ));
        if let Some(critical) = &analysis.critical_path {
            out.push_str(&format!(
                "critical: {}  ({} days total, {} effective, bottleneck {})\n",
                critical
                    .path
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> "),
                critical.total_lead_time,
                critical.effective_lead_time,
                critical.bottleneck_part.as_str().yellow(),
            ));
        }
        for (rank, path) in analysis.top_paths.iter().enumerate() {
            out.push_str(&format!(
                "  #{} {:>4}d effective / {:>4}d total  {}\n",
                rank + 1,
                path.effective_lead_time,
                path.total_lead_time,
                path.path
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ")
                    .dimmed(),
            ));
        }
        out.push_str(&format!(
            "inventory coverage of top paths: {:.0}%\n",
            analysis.inventory_coverage * 100.0
        ));
    }

    out.push_str(&format!(
        "\n{} {} orders, {} allocations, {} shortages (cache: {} hits / {} misses)\n",
        "Summary:".bold(),
        plan.planned_orders.len(),
        plan.allocations.len(),
        plan.shortages.len(),
        plan.cache_stats.hits,
        plan.cache_stats.misses,
    ));

    out
}

/// Write `planned_orders.csv`, `allocations.csv`, `shortages.csv` into a
/// directory
pub fn write_csv_reports(dir: &Path, plan: &PlanResult) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;

    let mut orders = csv::Writer::from_path(dir.join("planned_orders.csv"))?;
    orders.write_record([
        "part_number",
        "quantity",
        "start_date",
        "due_date",
        "order_type",
        "location",
        "target_serial",
        "demand_trace",
    ])?;
    for order in &plan.planned_orders {
        orders.write_record([
            order.part.as_str().to_string(),
            order.quantity.to_string(),
            order.start_date.to_string(),
            order.due_date.to_string(),
            format!("{:?}", order.order_type),
            order.location.clone(),
            order.target_serial.as_str().to_string(),
            order.demand_trace.clone(),
        ])?;
    }
    orders.flush()?;

    let mut allocations = csv::Writer::from_path(dir.join("allocations.csv"))?;
    allocations.write_record([
        "part_number",
        "location",
        "allocated_qty",
        "remaining_demand",
        "sources",
    ])?;
    for alloc in &plan.allocations {
        let sources: Vec<String> = alloc
            .allocated_from
            .iter()
            .map(|source| match source {
                AllocationSource::Lot { lot_number, quantity } => {
                    format!("{}:{}", lot_number, quantity)
                }
                AllocationSource::Serialized { serial_number } => {
                    serial_number.as_str().to_string()
                }
            })
            .collect();
        allocations.write_record([
            alloc.part.as_str().to_string(),
            alloc.location.clone(),
            alloc.allocated_qty.to_string(),
            alloc.remaining_demand.to_string(),
            sources.join(";"),
        ])?;
    }
    allocations.flush()?;

    let mut shortages = csv::Writer::from_path(dir.join("shortages.csv"))?;
    shortages.write_record([
        "part_number",
        "location",
        "short_qty",
        "need_date",
        "target_serial",
        "demand_trace",
    ])?;
    for shortage in &plan.shortages {
        shortages.write_record([
            shortage.part.as_str().to_string(),
            shortage.location.clone(),
            shortage.short_qty.to_string(),
            shortage.need_date.to_string(),
            shortage.target_serial.as_str().to_string(),
            shortage.demand_trace.clone(),
        ])?;
    }
    shortages.flush()?;

    Ok(())
}
